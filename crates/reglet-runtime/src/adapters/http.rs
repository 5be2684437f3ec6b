//! HTTP adapter backed by `reqwest`.

use reglet_types::wire::{HttpRequest, HttpResponse};
use reglet_types::ErrorDetail;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

pub async fn request(request: &HttpRequest, timeout_ms: Option<u64>) -> HttpResponse {
    let client = match reqwest::Client::builder()
        .timeout(Duration::from_millis(timeout_ms.unwrap_or(30_000)))
        .build()
    {
        Ok(client) => client,
        Err(e) => return network_error(e.to_string()),
    };

    let method = match reqwest::Method::from_str(&request.method.to_uppercase()) {
        Ok(method) => method,
        Err(_) => {
            return HttpResponse {
                status: 0,
                headers: BTreeMap::new(),
                body: String::new(),
                error: Some(ErrorDetail::validation(format!(
                    "unsupported HTTP method: {}",
                    request.method
                ))),
            }
        }
    };

    let mut builder = client.request(method, &request.url);
    for (name, value) in &request.headers {
        builder = builder.header(name, value);
    }
    if let Some(body) = &request.body {
        builder = builder.body(body.clone());
    }

    match builder.send().await {
        Ok(response) => {
            let status = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .map(|(name, value)| {
                    (
                        name.to_string(),
                        value.to_str().unwrap_or_default().to_string(),
                    )
                })
                .collect();
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => return network_error(e.to_string()),
            };
            HttpResponse {
                status,
                headers,
                body,
                error: None,
            }
        }
        Err(e) if e.is_timeout() => HttpResponse {
            status: 0,
            headers: BTreeMap::new(),
            body: String::new(),
            error: Some(ErrorDetail::timeout(
                "http_timeout",
                format!("request to {} exceeded its budget", request.url),
            )),
        },
        Err(e) => network_error(e.to_string()),
    }
}

fn network_error(message: String) -> HttpResponse {
    HttpResponse {
        status: 0,
        headers: BTreeMap::new(),
        body: String::new(),
        error: Some(ErrorDetail::new(
            reglet_types::ErrorKind::Network,
            "http_request_failed",
            message,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unsupported_method_is_reported_as_a_validation_error() {
        let response = request(
            &HttpRequest {
                method: "FROBNICATE".to_string(),
                url: "http://127.0.0.1:1/".to_string(),
                headers: BTreeMap::new(),
                body: None,
            },
            Some(500),
        )
        .await;
        assert!(response.error.is_some());
        assert_eq!(response.status, 0);
    }

    #[tokio::test]
    async fn connection_refused_reports_a_network_error() {
        let response = request(
            &HttpRequest {
                method: "GET".to_string(),
                url: "http://127.0.0.1:1/".to_string(),
                headers: BTreeMap::new(),
                body: None,
            },
            Some(500),
        )
        .await;
        assert!(response.error.is_some());
    }
}
