use crate::dns::{DnsCheck, DynResolver};
use crate::error::Error;
use std::str::FromStr;
use std::time::Duration;
use time::OffsetDateTime;
use trust_dns_proto::rr::Name;

/// Checks whether hostnames exist, bounding each lookup by a timeout.
pub struct DnsChecker {
    resolver: DynResolver,
    lookup_timeout: Duration,
}

impl DnsChecker {
    #[must_use]
    pub fn new(resolver: DynResolver, lookup_timeout: Duration) -> Self {
        Self {
            resolver,
            lookup_timeout,
        }
    }

    /// Look up a single hostname.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ValidationFailure`] if `hostname` isn't a valid DNS name, and
    /// [`Error::ResolverError`] if the lookup fails or exceeds the lookup timeout.
    pub async fn check(&self, hostname: &str) -> Result<DnsCheck, Error> {
        if hostname.is_empty() {
            return Err(Error::validation("hostname", "empty hostname"));
        }
        if let Err(err) = Name::from_str(hostname) {
            return Err(Error::validation("hostname", err.to_string()));
        }

        let resolved = tokio::time::timeout(self.lookup_timeout, self.resolver.resolve(hostname))
            .await
            .map_err(|_| Error::ResolverError {
                hostname: hostname.to_string(),
                reason: format!("lookup timed out after {:?}", self.lookup_timeout),
            })??;

        Ok(DnsCheck {
            hostname: hostname.to_string(),
            exists: resolved.is_some(),
            ip_address: resolved,
            verified_at: OffsetDateTime::now_utc(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::Resolve;
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::Arc;

    struct StaticResolver;

    #[async_trait::async_trait]
    impl Resolve for StaticResolver {
        async fn resolve(&self, hostname: &str) -> Result<Option<IpAddr>, Error> {
            match hostname {
                "known" => Ok(Some(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)))),
                "slow" => {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok(None)
                }
                "broken" => Err(Error::ResolverError {
                    hostname: hostname.into(),
                    reason: "SERVFAIL".into(),
                }),
                _ => Ok(None),
            }
        }
    }

    fn checker() -> DnsChecker {
        DnsChecker::new(Arc::new(StaticResolver), Duration::from_millis(50))
    }

    #[tokio::test]
    async fn test_existing_and_missing_names() {
        let known = checker().check("known").await.unwrap();
        assert!(known.exists);
        assert_eq!(known.ip_address, Some(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))));

        let missing = checker().check("missing").await.unwrap();
        assert!(!missing.exists);
        assert_eq!(missing.ip_address, None);
    }

    #[tokio::test]
    async fn test_failures_are_resolver_errors() {
        assert!(matches!(
            checker().check("broken").await,
            Err(Error::ResolverError { .. })
        ));
        let err = checker().check("slow").await.unwrap_err();
        assert!(err.to_string().contains("timed out"), "{err}");
    }

    #[tokio::test]
    async fn test_invalid_names_are_rejected_before_lookup() {
        assert!(matches!(
            checker().check("").await,
            Err(Error::ValidationFailure { .. })
        ));
        let long_label = "a".repeat(64);
        assert!(matches!(
            checker().check(&long_label).await,
            Err(Error::ValidationFailure { .. })
        ));
    }
}
