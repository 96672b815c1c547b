use crate::assembler::{Assembler, Params};
use crate::config::ScanConfig;
use crate::dns::DnsChecker;
use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;
use time::OffsetDateTime;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

const fn default_max_concurrent() -> usize {
    10
}

/// A request to scan the hostnames of a template over a sequence range.
#[derive(Deserialize, Debug, Clone)]
pub struct ScanRequest {
    pub template_id: u64,
    pub start_seq: u64,
    /// Inclusive.
    pub end_seq: u64,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    #[serde(default)]
    pub params: Params,
}

/// The outcome of one lookup in a scan.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ScanEntry {
    pub sequence_num: u64,
    pub hostname: String,
    /// `None` when the lookup failed and existence is unknown.
    pub exists: Option<bool>,
    pub ip_address: Option<IpAddr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub checked_at: OffsetDateTime,
}

#[derive(Serialize, Debug, Clone)]
pub struct ScanReport {
    pub template_id: u64,
    pub template_name: String,
    pub total_hostnames: usize,
    pub existing_hostnames: usize,
    pub failed_lookups: usize,
    /// Ordered by sequence number.
    pub results: Vec<ScanEntry>,
    pub scan_duration: String,
    /// Set when the scan was cancelled, or ran out of time, before every lookup completed.
    pub cancelled: bool,
}

/// Checks the hostnames a template would produce over a sequence range, with at most
/// `max_concurrent` lookups in flight.
pub struct Scanner {
    assembler: Arc<Assembler>,
    checker: Arc<DnsChecker>,
    limits: ScanConfig,
}

impl Scanner {
    #[must_use]
    pub fn new(assembler: Arc<Assembler>, checker: Arc<DnsChecker>, limits: ScanConfig) -> Self {
        Self {
            assembler,
            checker,
            limits,
        }
    }

    /// Scan a sequence range. Lookup failures are recorded per entry and never fail the scan.
    ///
    /// Once `cancel` is cancelled, or the configured scan timeout passes, no further lookups
    /// are started, those in flight are abandoned, and the entries collected so far are
    /// returned with [`ScanReport::cancelled`] set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRange`] for unusable bounds or concurrency, [`Error::NotFound`]
    /// for unknown templates, parameter errors as [`Assembler::validate_params`] does, and
    /// [`Error::SequenceOverflow`] if `end_seq` doesn't fit the sequence group.
    pub async fn scan(
        &self,
        request: &ScanRequest,
        cancel: CancellationToken,
    ) -> Result<ScanReport, Error> {
        let started = Instant::now();
        self.check_bounds(request)?;

        let template = self.assembler.templates().get(request.template_id)?;
        if template.sequence_group().is_none() {
            return Err(Error::InvalidRange(format!(
                "template {} has no sequence group to scan",
                template.id
            )));
        }
        let validated = self.assembler.validate_params(&template, &request.params)?;
        // Rendering the widest value up front surfaces an overflow before any lookup starts.
        self.assembler
            .finish(&template, &validated, Some(request.end_seq))?;

        let timeout = self.limits.timeout;
        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        tracing::info!(
            "scanning template {} sequences {}..={} with {} workers",
            template.id,
            request.start_seq,
            request.end_seq,
            request.max_concurrent
        );

        let semaphore = Arc::new(Semaphore::new(request.max_concurrent));
        let mut lookups = JoinSet::new();
        let mut cancelled = false;

        for sequence_num in request.start_seq..=request.end_seq {
            let permit = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    cancelled = true;
                    break;
                }
                () = &mut deadline => {
                    tracing::warn!("scan ran out of time after {timeout:?}");
                    cancelled = true;
                    break;
                }
                permit = Arc::clone(&semaphore).acquire_owned() => permit,
            };
            let Ok(permit) = permit else {
                break;
            };
            let hostname = self
                .assembler
                .finish(&template, &validated, Some(sequence_num))?
                .hostname;
            let checker = Arc::clone(&self.checker);
            lookups.spawn(async move {
                let entry = lookup(&checker, sequence_num, hostname).await;
                drop(permit);
                entry
            });
        }

        // Lookups still running once the scan is cancelled are abandoned. Those that already
        // finished are kept in the report.
        if cancelled {
            lookups.abort_all();
        }
        let mut results = Vec::with_capacity(lookups.len());
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled(), if !cancelled => {
                    cancelled = true;
                    lookups.abort_all();
                }
                () = &mut deadline, if !cancelled => {
                    tracing::warn!("scan ran out of time after {timeout:?}");
                    cancelled = true;
                    lookups.abort_all();
                }
                joined = lookups.join_next() => match joined {
                    Some(Ok(entry)) => results.push(entry),
                    Some(Err(err)) if err.is_cancelled() => {}
                    Some(Err(err)) => tracing::error!("scan lookup task failed: {err}"),
                    None => break,
                },
            }
        }

        results.sort_by_key(|e: &ScanEntry| e.sequence_num);
        let report = ScanReport {
            template_id: template.id,
            template_name: template.name.clone(),
            total_hostnames: results.len(),
            existing_hostnames: results.iter().filter(|e| e.exists == Some(true)).count(),
            failed_lookups: results.iter().filter(|e| e.exists.is_none()).count(),
            results,
            scan_duration: format!("{:?}", started.elapsed()),
            cancelled,
        };
        tracing::info!(
            "scanned {} hostnames of template {}: {} exist, {} failed{}",
            report.total_hostnames,
            report.template_id,
            report.existing_hostnames,
            report.failed_lookups,
            if cancelled { " (cancelled)" } else { "" }
        );
        Ok(report)
    }

    fn check_bounds(&self, request: &ScanRequest) -> Result<(), Error> {
        if request.start_seq > request.end_seq {
            return Err(Error::InvalidRange(format!(
                "start_seq {} is after end_seq {}",
                request.start_seq, request.end_seq
            )));
        }
        if request.max_concurrent == 0 {
            return Err(Error::InvalidRange("max_concurrent must be at least 1".into()));
        }
        if request.max_concurrent > self.limits.max_concurrent_limit {
            return Err(Error::InvalidRange(format!(
                "max_concurrent {} exceeds the limit of {}",
                request.max_concurrent, self.limits.max_concurrent_limit
            )));
        }
        let count = (request.end_seq - request.start_seq).saturating_add(1);
        if count > self.limits.max_hostnames {
            return Err(Error::InvalidRange(format!(
                "{count} hostnames exceeds the limit of {} per scan",
                self.limits.max_hostnames
            )));
        }
        Ok(())
    }
}

async fn lookup(checker: &DnsChecker, sequence_num: u64, hostname: String) -> ScanEntry {
    match checker.check(&hostname).await {
        Ok(check) => ScanEntry {
            sequence_num,
            hostname,
            exists: Some(check.exists),
            ip_address: check.ip_address,
            error: None,
            checked_at: check.verified_at,
        },
        Err(err) => ScanEntry {
            sequence_num,
            hostname,
            exists: None,
            ip_address: None,
            error: Some(err.to_string()),
            checked_at: OffsetDateTime::now_utc(),
        },
    }
}
