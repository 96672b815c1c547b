use crate::config::DnsConfig;
use crate::dns::Resolve;
use crate::error::Error;
use std::net::IpAddr;
use trust_dns_proto::op::ResponseCode;
use trust_dns_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use trust_dns_resolver::error::{ResolveError, ResolveErrorKind};
use trust_dns_resolver::TokioAsyncResolver;

/// A [`Resolve`] implementation backed by a trust-dns async resolver.
pub struct TrustDnsResolver {
    resolver: TokioAsyncResolver,
}

impl TrustDnsResolver {
    /// Build a resolver from the DNS section of the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the resolver can't be constructed, e.g. because no
    /// servers are configured and the system configuration can't be read.
    pub fn new(config: &DnsConfig) -> Result<Self, Error> {
        let resolver = if config.servers.is_empty() {
            TokioAsyncResolver::tokio_from_system_conf()
        } else {
            let servers = NameServerConfigGroup::from_ips_clear(&config.servers, config.port, true);
            let mut opts = ResolverOpts::default();
            opts.timeout = config.lookup_timeout;
            // Failed lookups are recorded, not retried.
            opts.attempts = 1;
            TokioAsyncResolver::tokio(ResolverConfig::from_parts(None, vec![], servers), opts)
        }
        .map_err(|err| Error::InvalidConfig(format!("can't build DNS resolver: {err}")))?;
        Ok(Self { resolver })
    }
}

#[async_trait::async_trait]
impl Resolve for TrustDnsResolver {
    async fn resolve(&self, hostname: &str) -> Result<Option<IpAddr>, Error> {
        match self.resolver.lookup_ip(hostname).await {
            Ok(lookup) => {
                let ip = lookup
                    .iter()
                    .find(IpAddr::is_ipv4)
                    .or_else(|| lookup.iter().next());
                Ok(ip)
            }
            Err(err) => not_found_or_error(hostname, &err),
        }
    }
}

fn not_found_or_error(hostname: &str, err: &ResolveError) -> Result<Option<IpAddr>, Error> {
    match err.kind() {
        ResolveErrorKind::NoRecordsFound { response_code, .. }
            if matches!(*response_code, ResponseCode::NXDomain | ResponseCode::NoError) =>
        {
            tracing::trace!("\"{hostname}\" does not exist ({response_code})");
            Ok(None)
        }
        _ => {
            tracing::debug!("lookup of \"{hostname}\" failed: {err}");
            Err(Error::ResolverError {
                hostname: hostname.to_string(),
                reason: err.to_string(),
            })
        }
    }
}
