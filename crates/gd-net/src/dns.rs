//! Host name resolution for request targets.

use gd_core::DpiError;
use gd_core::DpiResult;
use gd_core::ErrorKind;
use std::net::SocketAddr;
use std::net::ToSocketAddrs;

/// Turns a request host into candidate socket addresses, in connect order.
pub trait DnsResolver {
    fn resolve(&self, host: &str, port: u16) -> DpiResult<Vec<SocketAddr>>;
}

/// Resolver backed by the platform's `getaddrinfo`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemDnsResolver;

impl DnsResolver for SystemDnsResolver {
    fn resolve(&self, host: &str, port: u16) -> DpiResult<Vec<SocketAddr>> {
        let unreachable = |reason: String| {
            DpiError::new(
                ErrorKind::Connection,
                format!("cannot reach `{host}` on port {port}: {reason}"),
            )
        };

        let candidates = (host, port)
            .to_socket_addrs()
            .map_err(|error| unreachable(error.to_string()))?
            .collect::<Vec<_>>();

        tracing::debug!(host, port, candidates = candidates.len(), "resolved request host");
        if candidates.is_empty() {
            return Err(unreachable("no addresses found".to_owned()));
        }

        Ok(candidates)
    }
}
