//! URL safety validation
//!
//! Every URL is checked here before it is fetched: the seed and every link
//! discovered mid-crawl. A URL is safe only when its scheme is HTTP(S) and
//! every address its host resolves to is publicly routable. Resolution
//! failure counts as a rejection.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;
use url::{Host, Url};

/// Why a URL was refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Scheme other than http/https
    UnsupportedScheme(String),
    /// URL has no host component
    MissingHost,
    /// Host could not be resolved
    DnsFailure(String),
    /// Host resolved to an empty address list
    NoAddresses,
    /// At least one resolved address is private or reserved
    BlockedAddress(IpAddr),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedScheme(scheme) => write!(f, "unsupported scheme '{}'", scheme),
            Self::MissingHost => write!(f, "missing host"),
            Self::DnsFailure(e) => write!(f, "DNS resolution failed: {}", e),
            Self::NoAddresses => write!(f, "host resolved to no addresses"),
            Self::BlockedAddress(ip) => write!(f, "resolves to non-public address {}", ip),
        }
    }
}

/// Outcome of validating a URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Crawlable; carries the addresses that were checked
    Safe(Vec<IpAddr>),
    /// Not crawlable
    Rejected(RejectReason),
}

impl Verdict {
    /// Returns true for [`Verdict::Safe`]
    pub fn is_safe(&self) -> bool {
        matches!(self, Self::Safe(_))
    }
}

/// Hostname resolution used by the validator
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Resolves a host name to all of its addresses
    async fn resolve(&self, host: &str, port: u16) -> std::io::Result<Vec<IpAddr>>;
}

/// Resolver backed by the operating system (`getaddrinfo` via tokio)
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

#[async_trait]
impl Resolver for SystemResolver {
    async fn resolve(&self, host: &str, port: u16) -> std::io::Result<Vec<IpAddr>> {
        let addrs = tokio::net::lookup_host((host, port)).await?;
        Ok(addrs.map(|addr| addr.ip()).collect())
    }
}

/// Resolver with a fixed host table
///
/// Unknown hosts fail to resolve. Used for offline runs and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    entries: HashMap<String, Vec<IpAddr>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) the addresses for a host
    pub fn with_host(mut self, host: &str, addrs: &[IpAddr]) -> Self {
        self.entries
            .insert(host.to_ascii_lowercase(), addrs.to_vec());
        self
    }
}

#[async_trait]
impl Resolver for StaticResolver {
    async fn resolve(&self, host: &str, _port: u16) -> std::io::Result<Vec<IpAddr>> {
        self.entries
            .get(&host.to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("no static entry for {}", host),
                )
            })
    }
}

/// Gate that classifies URLs as safe to fetch or rejected
#[derive(Clone)]
pub struct SafetyValidator {
    resolver: Arc<dyn Resolver>,
}

impl fmt::Debug for SafetyValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SafetyValidator").finish_non_exhaustive()
    }
}

impl Default for SafetyValidator {
    fn default() -> Self {
        Self::new(Arc::new(SystemResolver))
    }
}

impl SafetyValidator {
    /// Creates a validator over the given resolver
    pub fn new(resolver: Arc<dyn Resolver>) -> Self {
        Self { resolver }
    }

    /// Validates a URL
    ///
    /// # Rules
    ///
    /// | Condition | Verdict |
    /// |-----------|---------|
    /// | scheme not http/https | Rejected(UnsupportedScheme) |
    /// | no host | Rejected(MissingHost) |
    /// | IP literal that is non-public | Rejected(BlockedAddress) |
    /// | DNS error | Rejected(DnsFailure) |
    /// | zero addresses | Rejected(NoAddresses) |
    /// | any resolved address non-public | Rejected(BlockedAddress) |
    /// | otherwise | Safe |
    pub async fn validate(&self, url: &Url) -> Verdict {
        let scheme = url.scheme();
        if scheme != "http" && scheme != "https" {
            return Verdict::Rejected(RejectReason::UnsupportedScheme(scheme.to_string()));
        }

        let port = url.port_or_known_default().unwrap_or(80);

        let addrs = match url.host() {
            None => return Verdict::Rejected(RejectReason::MissingHost),
            Some(Host::Ipv4(ip)) => vec![IpAddr::V4(ip)],
            Some(Host::Ipv6(ip)) => vec![IpAddr::V6(ip)],
            Some(Host::Domain(domain)) => {
                if domain.is_empty() {
                    return Verdict::Rejected(RejectReason::MissingHost);
                }
                match self.resolver.resolve(domain, port).await {
                    Ok(addrs) => addrs,
                    Err(e) => return Verdict::Rejected(RejectReason::DnsFailure(e.to_string())),
                }
            }
        };

        if addrs.is_empty() {
            return Verdict::Rejected(RejectReason::NoAddresses);
        }

        if let Some(blocked) = addrs.iter().copied().find(|ip| is_blocked_ip(*ip)) {
            return Verdict::Rejected(RejectReason::BlockedAddress(blocked));
        }

        Verdict::Safe(addrs)
    }
}

/// Returns true if the address is not publicly routable
pub fn is_blocked_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_blocked_ipv4(v4),
        IpAddr::V6(v6) => is_blocked_ipv6(v6),
    }
}

fn is_blocked_ipv4(ip: Ipv4Addr) -> bool {
    let [a, b, c, _] = ip.octets();

    ip.is_private()
        || ip.is_loopback()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        || ip.is_multicast()
        || ip.is_documentation()
        // 0.0.0.0/8 "this network"
        || a == 0
        // 100.64.0.0/10 shared address space (CGNAT)
        || (a == 100 && (b & 0xc0) == 64)
        // 192.0.0.0/24 IETF protocol assignments
        || (a == 192 && b == 0 && c == 0)
        // 198.18.0.0/15 benchmarking
        || (a == 198 && (b & 0xfe) == 18)
        // 240.0.0.0/4 reserved
        || a >= 240
}

fn is_blocked_ipv6(ip: Ipv6Addr) -> bool {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_blocked_ipv4(v4);
    }

    let segments = ip.segments();

    // 64:ff9b::/96 NAT64 embeds an IPv4 address in the low 32 bits
    if segments[..6] == [0x64, 0xff9b, 0, 0, 0, 0] {
        let embedded = Ipv4Addr::new(
            (segments[6] >> 8) as u8,
            segments[6] as u8,
            (segments[7] >> 8) as u8,
            segments[7] as u8,
        );
        return is_blocked_ipv4(embedded);
    }

    ip.is_loopback()
        || ip.is_unspecified()
        || ip.is_multicast()
        // fc00::/7 unique local
        || (segments[0] & 0xfe00) == 0xfc00
        // fe80::/10 link local
        || (segments[0] & 0xffc0) == 0xfe80
        // fec0::/10 deprecated site local
        || (segments[0] & 0xffc0) == 0xfec0
        // 2001:db8::/32 documentation
        || (segments[0] == 0x2001 && segments[1] == 0x0db8)
        // ::/96 deprecated IPv4-compatible
        || segments[..6] == [0, 0, 0, 0, 0, 0]
}
