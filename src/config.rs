use crate::error::Error;
use crate::reservation::{DynReservationStore, FileReservationStore, InMemoryReservationStore};
use crate::template::TemplateStore;
use ipnetwork::IpNetwork;
use lazy_static::lazy_static;
use serde::Deserialize;
use serde_with::{serde_as, DurationMilliSeconds, DurationSeconds};
use std::fs::File;
use std::io::BufReader;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

pub type SharedConfig = Arc<Config>;

#[serde_as]
#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    pub api_bind_addr: SocketAddr,
    #[serde_as(as = "DurationSeconds<u64>")]
    pub api_timeout: Duration,
    /// JSON file holding the template definitions.
    pub templates_path: String,
    /// JSON file the reservations are persisted to. Reservations are kept in memory only when
    /// unset.
    pub reservation_state_path: Option<String>,
    #[serde(default)]
    pub case_insensitive_lists: bool,
    #[serde(default)]
    pub dns: DnsConfig,
    #[serde(default)]
    pub scan: ScanConfig,
}

#[serde_as]
#[derive(Deserialize, Debug, Clone)]
pub struct DnsConfig {
    /// Upstream servers to query. The system resolver configuration is used when empty.
    #[serde(default)]
    pub servers: Vec<IpAddr>,
    #[serde(default = "default_dns_port")]
    pub port: u16,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(default = "default_lookup_timeout", rename = "lookup_timeout_ms")]
    pub lookup_timeout: Duration,
}

#[serde_as]
#[derive(Deserialize, Debug, Clone)]
pub struct ScanConfig {
    /// The largest `max_concurrent` a scan request may ask for.
    #[serde(default = "default_max_concurrent_limit")]
    pub max_concurrent_limit: usize,
    /// The most hostnames a single scan may cover.
    #[serde(default = "default_max_hostnames")]
    pub max_hostnames: u64,
    /// Wall-clock bound on a whole scan.
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_scan_timeout")]
    pub timeout: Duration,
}

const fn default_dns_port() -> u16 {
    53
}

const fn default_lookup_timeout() -> Duration {
    Duration::from_secs(2)
}

const fn default_max_concurrent_limit() -> usize {
    64
}

const fn default_max_hostnames() -> u64 {
    10_000
}

const fn default_scan_timeout() -> Duration {
    Duration::from_secs(300)
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            servers: Vec::new(),
            port: default_dns_port(),
            lookup_timeout: default_lookup_timeout(),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_concurrent_limit: default_max_concurrent_limit(),
            max_hostnames: default_max_hostnames(),
            timeout: default_scan_timeout(),
        }
    }
}

lazy_static! {
    // NOTE(XXX): Once the "ip" feature has stabilized we can use Ipv6Addr.is_unique_local[0].
    //            Presently this feature is unstable so we home-roll. See also RFC 4193[1].
    // [0]: https://doc.rust-lang.org/std/net/struct.Ipv6Addr.html#method.is_unique_local
    // [1]: https://www.rfc-editor.org/rfc/rfc4193.html
    static ref IPV6_UNIQUE_LOCAL_NETWORK: IpNetwork = IpNetwork::from_str("fc00::/7").unwrap();
}

impl Config {
    pub fn try_from_file(p: impl AsRef<Path>) -> Result<Self, Error> {
        let f = File::open(p)?;
        let reader = BufReader::new(f);
        let mut conf: Config = serde_json::from_reader(reader)?;
        conf.bind_addr_is_secure()?;
        conf.limits_are_sane()?;
        conf.fit_scan_timeout();
        Ok(conf)
    }

    /// Load the templates named by [`Config::templates_path`].
    ///
    /// # Errors
    ///
    /// As [`TemplateStore::try_from_file`].
    pub fn template_store(&self) -> Result<TemplateStore, Error> {
        TemplateStore::try_from_file(&self.templates_path)
    }

    /// Open the reservation store: file-backed when [`Config::reservation_state_path`] is set,
    /// in-memory otherwise.
    ///
    /// # Errors
    ///
    /// As [`FileReservationStore::try_from_file`].
    pub async fn reservation_store(&self) -> Result<DynReservationStore, Error> {
        Ok(match &self.reservation_state_path {
            Some(path) => {
                tracing::debug!("loading reservations from {path}");
                Arc::new(RwLock::new(FileReservationStore::try_from_file(path).await?))
            }
            None => {
                tracing::warn!("reservation_state_path is unset, reservations won't survive a restart");
                Arc::new(RwLock::new(InMemoryReservationStore::default()))
            }
        })
    }

    fn limits_are_sane(&self) -> Result<(), Error> {
        if self.api_timeout.is_zero() {
            return Err(Error::InvalidConfig("api_timeout must be positive".into()));
        }
        if self.scan.max_concurrent_limit == 0 {
            return Err(Error::InvalidConfig(
                "scan.max_concurrent_limit must be at least 1".into(),
            ));
        }
        if self.scan.max_hostnames == 0 {
            return Err(Error::InvalidConfig(
                "scan.max_hostnames must be at least 1".into(),
            ));
        }
        if self.dns.lookup_timeout.is_zero() {
            return Err(Error::InvalidConfig(
                "dns.lookup_timeout_ms must be positive".into(),
            ));
        }
        Ok(())
    }

    // A scan must finish inside the API timeout, or its partial report is never returned.
    fn fit_scan_timeout(&mut self) {
        if self.scan.timeout >= self.api_timeout {
            let fitted = self.api_timeout * 9 / 10;
            tracing::warn!(
                "scan.timeout ({:?}) is not below api_timeout ({:?}), using {fitted:?}",
                self.scan.timeout,
                self.api_timeout
            );
            self.scan.timeout = fitted;
        }
    }

    fn bind_addr_is_secure(&self) -> Result<(), Error> {
        match self.api_bind_addr {
            SocketAddr::V4(v4_addr) => {
                let ip = v4_addr.ip();
                if !ip.is_loopback() && !ip.is_private() {
                    return Err(Error::InsecureAPIBind(IpAddr::V4(*ip)));
                }
                Ok(())
            }
            SocketAddr::V6(v6_addr) => {
                let ip = v6_addr.ip();
                if !ip.is_loopback() && !IPV6_UNIQUE_LOCAL_NETWORK.contains(IpAddr::V6(*ip)) {
                    return Err(Error::InsecureAPIBind(IpAddr::V6(*ip)));
                }
                Ok(())
            }
        }
    }
}
