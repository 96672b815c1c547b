//! DNS verification of candidate hostnames.
//!
//! # Existence checks
//!
//! A hostname "exists" when it resolves to at least one address. A negative answer (NXDOMAIN, or
//! a NOERROR answer without address records) is a definite "does not exist". Any other outcome,
//! such as a resolver timeout or a SERVFAIL, is an [`Error::ResolverError`][crate::error::Error]:
//! existence is unknown.
//!
//! [`checker::DnsChecker`] wraps a [`Resolve`] implementation with a per-lookup timeout. The
//! production resolver is [`resolver::TrustDnsResolver`], which queries the upstream servers
//! listed in the [`Config`][crate::config::Config] (or the system resolver configuration when
//! none are listed).
//!
//! # Scans
//!
//! [`scanner::Scanner`] previews the hostnames a template would produce over a range of sequence
//! numbers and checks each of them with bounded parallelism. Scanning never allocates sequence
//! numbers. E.g. with a template rendering `EUsrvdb` followed by a 3 digit sequence:
//!
//! ```bash
//! ❯ curl --json \
//!   '{"template_id":1,"start_seq":1,"end_seq":3,"max_concurrent":2,"params":{"region":"EU","role":"db"}}' \
//!   http://localhost:3000/api/dns/scan
//! {"template_id":1,"template_name":"servers","total_hostnames":3,"existing_hostnames":1,
//!  "failed_lookups":0,"results":[{"sequence_num":1,"hostname":"EUsrvdb001","exists":true,
//!  "ip_address":"10.0.0.1",...},...],"scan_duration":"12.3ms","cancelled":false}
//! ```

use crate::error::Error;
use serde::Serialize;
use std::net::IpAddr;
use std::sync::Arc;
use time::OffsetDateTime;

pub mod checker;
pub mod resolver;
pub mod scanner;

pub use checker::DnsChecker;
pub use scanner::Scanner;

/// `DynResolver` is a type alias for a [`Resolve`] implementation shared between the checker and
/// the scanner's lookup tasks.
pub type DynResolver = Arc<dyn Resolve + Send + Sync>;

/// An async trait describing a single DNS existence lookup.
#[async_trait::async_trait]
pub trait Resolve {
    /// Resolve `hostname`, returning an address if it exists and `None` if it definitely
    /// doesn't.
    async fn resolve(&self, hostname: &str) -> Result<Option<IpAddr>, Error>;
}

/// The outcome of checking one hostname.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct DnsCheck {
    pub hostname: String,
    pub exists: bool,
    pub ip_address: Option<IpAddr>,
    #[serde(with = "time::serde::rfc3339")]
    pub verified_at: OffsetDateTime,
}
