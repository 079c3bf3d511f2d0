//! URL handling module for site-harvest
//!
//! This module provides URL normalization (the page identity used for dedup),
//! host extraction, the same-origin scope filter, and the SSRF safety validator
//! that gates every fetch.

mod domain;
mod matcher;
mod normalize;
mod safety;

use crate::config::OriginScope;
use crate::UrlError;
use url::Url;

// Re-export main functions
pub use domain::{extract_domain, netloc};
pub use matcher::matches_wildcard;
pub use normalize::{normalize, normalize_url};
pub use safety::{
    is_blocked_ip, RejectReason, Resolver, SafetyValidator, StaticResolver, SystemResolver,
    Verdict,
};

/// The set of hosts a crawl may follow links into
///
/// Built once from the seed. With [`OriginScope::Host`] a link must carry the
/// seed's exact host and explicit port (the scheme may differ, so an `http`
/// link on an `https` site stays in scope). With [`OriginScope::Subdomains`] the
/// seed host, stripped of a leading `www.`, acts as a `*.` wildcard pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteScope {
    pattern: String,
    port: Option<u16>,
}

impl SiteScope {
    /// Creates the scope for a seed URL
    pub fn for_seed(seed: &Url, scope: OriginScope) -> Result<Self, UrlError> {
        let host = extract_domain(seed).ok_or(UrlError::MissingDomain)?;

        let pattern = match scope {
            OriginScope::Host => host,
            OriginScope::Subdomains => {
                let base = host.strip_prefix("www.").unwrap_or(&host);
                format!("*.{}", base)
            }
        };

        Ok(Self {
            pattern,
            port: seed.port(),
        })
    }

    /// Returns true if the URL is inside this scope
    pub fn contains(&self, url: &Url) -> bool {
        if url.port() != self.port {
            return false;
        }

        match extract_domain(url) {
            Some(host) => matches_wildcard(&self.pattern, &host),
            None => false,
        }
    }
}
