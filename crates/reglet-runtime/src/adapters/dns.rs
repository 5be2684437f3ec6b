//! DNS resolution adapter.

use reglet_types::wire::{DnsRequest, DnsResponse};
use reglet_types::ErrorDetail;
use std::net::IpAddr;
use std::time::Duration;
use tokio::time::timeout;

pub async fn resolve(request: &DnsRequest, timeout_ms: Option<u64>) -> DnsResponse {
    let budget = Duration::from_millis(timeout_ms.unwrap_or(10_000));
    let lookup_target = format!("{}:0", request.host);

    match timeout(budget, tokio::net::lookup_host(&lookup_target)).await {
        Ok(Ok(addrs)) => {
            let wants_v6 = request.record_type.eq_ignore_ascii_case("AAAA");
            let addresses = addrs
                .map(|addr| addr.ip())
                .filter(|ip| matches!(ip, IpAddr::V6(_)) == wants_v6)
                .map(|ip| ip.to_string())
                .collect();
            DnsResponse {
                addresses,
                error: None,
            }
        }
        Ok(Err(e)) => DnsResponse {
            addresses: Vec::new(),
            error: Some(ErrorDetail::new(
                reglet_types::ErrorKind::Network,
                "dns_lookup_failed",
                e.to_string(),
            )),
        },
        Err(_) => DnsResponse {
            addresses: Vec::new(),
            error: Some(ErrorDetail::timeout(
                "dns_timeout",
                format!("resolution of {} exceeded its budget", request.host),
            )),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_localhost() {
        let response = resolve(
            &DnsRequest {
                host: "localhost".to_string(),
                record_type: "A".to_string(),
            },
            Some(2_000),
        )
        .await;
        assert!(response.error.is_none());
        assert!(!response.addresses.is_empty());
    }

    #[tokio::test]
    async fn unresolvable_host_reports_a_network_error() {
        let response = resolve(
            &DnsRequest {
                host: "this-host-does-not-exist.invalid".to_string(),
                record_type: "A".to_string(),
            },
            Some(2_000),
        )
        .await;
        assert!(response.error.is_some());
    }
}
