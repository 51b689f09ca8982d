//! Host validation against the blocked-network rules.
//!
//! # Responsibilities
//! - Resolve a hostname to its full address set
//! - Reject the host if resolution fails, yields nothing, or any address is blocked
//! - Hand the outbound client exactly the addresses that were checked
//!
//! # Design Decisions
//! - Fail closed: a single blocked address disqualifies the whole host
//! - No caching: every call resolves again, redirect hops included
//! - `GuardedResolver` is the outbound client's only DNS path, so the
//!   addresses it connects to are the ones that were vetted
//! - A name is resolved once per connection, inside the resolver; address
//!   literals never reach a resolver and are checked by `check_url_host`

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use thiserror::Error;
use url::{Host, Url};

use crate::security::blocklist::{BlockList, BlockedNetworkRule};

/// Reason a host was refused.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("failed to resolve {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{host} resolved to no addresses")]
    NoAddresses { host: String },

    #[error("{host} resolves to {addr}, blocked by rule {rule}")]
    Blocked {
        host: String,
        addr: IpAddr,
        rule: BlockedNetworkRule,
    },

    #[error("{0} has no host")]
    MissingHost(String),
}

/// Checks hosts against the shared block-list.
#[derive(Debug, Clone)]
pub struct HostValidator {
    blocklist: Arc<BlockList>,
}

impl HostValidator {
    pub fn new(blocklist: Arc<BlockList>) -> Self {
        Self { blocklist }
    }

    /// Check an already-known address set for `host`.
    pub fn check_addrs(&self, host: &str, addrs: &[IpAddr]) -> Result<(), HostError> {
        if addrs.is_empty() {
            return Err(HostError::NoAddresses {
                host: host.to_string(),
            });
        }
        for addr in addrs {
            if let Some(rule) = self.blocklist.blocking_rule(*addr) {
                return Err(HostError::Blocked {
                    host: host.to_string(),
                    addr: *addr,
                    rule: rule.clone(),
                });
            }
        }
        Ok(())
    }

    /// Resolve a domain name and check every address it resolves to.
    pub async fn resolve_domain(&self, domain: &str) -> Result<Vec<IpAddr>, HostError> {
        let addrs: Vec<IpAddr> = tokio::net::lookup_host((domain, 0))
            .await
            .map_err(|source| HostError::Resolve {
                host: domain.to_string(),
                source,
            })?
            .map(|addr| addr.ip())
            .collect();

        self.check_addrs(domain, &addrs)?;
        Ok(addrs)
    }

    /// Check the host of a target or redirect URL without resolving it.
    ///
    /// Address literals are checked here because they never reach a
    /// resolver; domain names are checked by [`GuardedResolver`] when the
    /// request connects.
    pub fn check_url_host(&self, url: &Url) -> Result<(), HostError> {
        match url.host() {
            None => Err(HostError::MissingHost(url.to_string())),
            Some(Host::Domain(_)) => Ok(()),
            Some(Host::Ipv4(v4)) => self.check_literal(IpAddr::V4(v4)),
            Some(Host::Ipv6(v6)) => self.check_literal(IpAddr::V6(v6)),
        }
    }

    fn check_literal(&self, addr: IpAddr) -> Result<(), HostError> {
        self.check_addrs(&addr.to_string(), &[addr])
    }
}

/// DNS resolver for the outbound client that only yields vetted addresses.
#[derive(Debug, Clone)]
pub struct GuardedResolver {
    validator: HostValidator,
}

impl GuardedResolver {
    pub fn new(validator: HostValidator) -> Self {
        Self { validator }
    }
}

impl Resolve for GuardedResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let validator = self.validator.clone();
        Box::pin(async move {
            let host = name.as_str().to_string();
            match validator.resolve_domain(&host).await {
                Ok(addrs) => {
                    // The connector substitutes the URL's port.
                    let addrs: Addrs = Box::new(addrs.into_iter().map(|ip| SocketAddr::new(ip, 0)));
                    Ok(addrs)
                }
                Err(e) => {
                    tracing::warn!(host = %host, error = %e, "Outbound connection refused");
                    Err(Box::new(e) as Box<dyn std::error::Error + Send + Sync>)
                }
            }
        })
    }
}

/// Find a [`HostError`] anywhere in an error's source chain.
pub fn find_host_error<'a>(err: &'a (dyn std::error::Error + 'static)) -> Option<&'a HostError> {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(host_err) = e.downcast_ref::<HostError>() {
            return Some(host_err);
        }
        current = e.source();
    }
    None
}
