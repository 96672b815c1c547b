use crate::assembler::Params;
use crate::dns::DnsCheck;
use crate::reservation::Reservation;
use crate::template::Template;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Deserialize, Debug, Clone)]
pub(super) struct GenerateRequest {
    pub template_id: u64,
    #[serde(default)]
    pub params: Params,
    #[serde(default)]
    pub check_dns: bool,
}

#[derive(Serialize, Debug, Clone)]
pub(super) struct GenerateResult {
    pub hostname: String,
    pub sequence_num: Option<u64>,
    pub template_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_check: Option<DnsCheck>,
}

#[derive(Deserialize, Debug, Clone)]
pub(super) struct ReserveRequest {
    pub template_id: u64,
    #[serde(default)]
    pub params: Params,
}

#[derive(Serialize, Debug, Clone)]
pub(super) struct TemplateList {
    pub templates: Vec<Arc<Template>>,
    pub total: usize,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub(super) struct HostnameQuery {
    pub template_id: Option<u64>,
}

#[derive(Serialize, Debug, Clone)]
pub(super) struct HostnameList {
    pub hostnames: Vec<Reservation>,
    pub total: usize,
}

#[derive(Serialize, Debug, Clone)]
pub(super) struct NextSequence {
    pub template_id: u64,
    pub sequence_num: u64,
}
