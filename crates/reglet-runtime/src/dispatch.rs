//! Maps the five guest-facing host-function call names to a policy check
//! plus an adapter call, and serializes the typed response back to JSON.

use crate::adapters;
use crate::error::RuntimeError;
use chrono::Utc;
use reglet_policy::PolicyEngine;
use reglet_types::wire::{
    DnsRequest, DnsResponse, ExecRequest as WireExecRequest, ExecResponse as WireExecResponse,
    HttpRequest, HttpResponse, SmtpRequest, SmtpResponse, TcpRequest, TcpResponse,
};
use reglet_types::{
    ContextEnvelope, ErrorDetail, ExecRequest as PolicyExecRequest, GrantSet, NetworkRequest,
    PolicyRequest,
};
use std::sync::Arc;

/// Everything a single host-call dispatch needs: the policy engine and
/// the grants/context of the calling plugin instance. Bundled so the
/// per-call-name handlers in [`dispatch`] don't each take five arguments.
pub struct HandlerContext<'a> {
    pub engine: &'a PolicyEngine,
    pub grants: &'a GrantSet,
    pub context: &'a ContextEnvelope,
    /// Handle to the Tokio runtime the adapters' async I/O runs on. Host
    /// functions registered with `wasmtime`'s `func_wrap` are synchronous
    /// closures, so every adapter call blocks on this handle rather than
    /// relying on an ambient `Handle::current()` (blocking-pool threads
    /// don't reliably have one).
    pub handle: &'a tokio::runtime::Handle,
}

/// Dispatch a single host call by name. `payload` is the guest-supplied
/// JSON request body; the returned `Ok` is the JSON-encoded wire response
/// (never an error value — denials and adapter failures are folded into
/// the response's own `error` field so the guest always gets a typed
/// result).
pub fn dispatch(name: &str, payload: &[u8], ctx: &HandlerContext<'_>) -> Result<Vec<u8>, RuntimeError> {
    match name {
        "dns_resolve" => dispatch_dns(payload, ctx),
        "http_request" => dispatch_http(payload, ctx),
        "tcp_connect" => dispatch_tcp(payload, ctx),
        "smtp_send" => dispatch_smtp(payload, ctx),
        "exec_run" => dispatch_exec(payload, ctx),
        other => Err(RuntimeError::Abi(format!("unknown host call: {other}"))),
    }
}

/// Checks the envelope's cancellation state before any policy check or
/// adapter call: an already-canceled or already-expired call never reaches
/// the network/process, per the cancellation contract in `context.rs`.
fn cancellation_error(ctx: &HandlerContext<'_>, now: chrono::DateTime<Utc>) -> Option<ErrorDetail> {
    if ctx.context.canceled {
        Some(ErrorDetail::timeout(
            "call_canceled",
            "call canceled before dispatch",
        ))
    } else if ctx.context.is_expired(now) {
        Some(ErrorDetail::timeout(
            "deadline_expired",
            "deadline expired before dispatch",
        ))
    } else {
        None
    }
}

fn dispatch_dns(payload: &[u8], ctx: &HandlerContext<'_>) -> Result<Vec<u8>, RuntimeError> {
    let req: DnsRequest =
        serde_json::from_slice(payload).map_err(|e| RuntimeError::Abi(e.to_string()))?;
    let now = Utc::now();
    let response = if let Some(err) = cancellation_error(ctx, now) {
        DnsResponse {
            addresses: Vec::new(),
            error: Some(err),
        }
    } else {
        let policy_request = PolicyRequest::Network(NetworkRequest {
            host: req.host.clone(),
            port: 53,
        });
        if ctx.engine.check(&policy_request, ctx.grants).is_allowed() {
            let timeout_ms = ctx.context.effective_timeout_ms(now, None);
            ctx.handle.block_on(adapters::dns::resolve(&req, timeout_ms))
        } else {
            DnsResponse {
                addresses: Vec::new(),
                error: Some(ErrorDetail::capability(format!(
                    "dns resolution of {} denied",
                    req.host
                ))),
            }
        }
    };
    serde_json::to_vec(&response).map_err(|e| RuntimeError::Abi(e.to_string()))
}

fn dispatch_http(payload: &[u8], ctx: &HandlerContext<'_>) -> Result<Vec<u8>, RuntimeError> {
    let req: HttpRequest =
        serde_json::from_slice(payload).map_err(|e| RuntimeError::Abi(e.to_string()))?;
    let now = Utc::now();
    let response = if let Some(err) = cancellation_error(ctx, now) {
        HttpResponse {
            status: 0,
            headers: Default::default(),
            body: String::new(),
            error: Some(err),
        }
    } else {
        let (host, port) = host_port_from_url(&req.url)?;
        let policy_request = PolicyRequest::Network(NetworkRequest { host, port });
        if ctx.engine.check(&policy_request, ctx.grants).is_allowed() {
            let timeout_ms = ctx.context.effective_timeout_ms(now, None);
            ctx.handle.block_on(adapters::http::request(&req, timeout_ms))
        } else {
            HttpResponse {
                status: 0,
                headers: Default::default(),
                body: String::new(),
                error: Some(ErrorDetail::capability(format!(
                    "http request to {} denied",
                    req.url
                ))),
            }
        }
    };
    serde_json::to_vec(&response).map_err(|e| RuntimeError::Abi(e.to_string()))
}

fn dispatch_tcp(payload: &[u8], ctx: &HandlerContext<'_>) -> Result<Vec<u8>, RuntimeError> {
    let req: TcpRequest =
        serde_json::from_slice(payload).map_err(|e| RuntimeError::Abi(e.to_string()))?;
    let now = Utc::now();
    let response = if let Some(err) = cancellation_error(ctx, now) {
        TcpResponse {
            payload: String::new(),
            error: Some(err),
        }
    } else {
        let policy_request = PolicyRequest::Network(NetworkRequest {
            host: req.host.clone(),
            port: req.port,
        });
        if ctx.engine.check(&policy_request, ctx.grants).is_allowed() {
            let timeout_ms = ctx.context.effective_timeout_ms(now, None);
            ctx.handle.block_on(adapters::tcp::connect(&req, timeout_ms))
        } else {
            TcpResponse {
                payload: String::new(),
                error: Some(ErrorDetail::capability(format!(
                    "tcp connect to {}:{} denied",
                    req.host, req.port
                ))),
            }
        }
    };
    serde_json::to_vec(&response).map_err(|e| RuntimeError::Abi(e.to_string()))
}

fn dispatch_smtp(payload: &[u8], ctx: &HandlerContext<'_>) -> Result<Vec<u8>, RuntimeError> {
    let req: SmtpRequest =
        serde_json::from_slice(payload).map_err(|e| RuntimeError::Abi(e.to_string()))?;
    let now = Utc::now();
    let response = if let Some(err) = cancellation_error(ctx, now) {
        SmtpResponse {
            accepted: false,
            error: Some(err),
        }
    } else {
        let policy_request = PolicyRequest::Network(NetworkRequest {
            host: req.host.clone(),
            port: req.port,
        });
        if ctx.engine.check(&policy_request, ctx.grants).is_allowed() {
            let timeout_ms = ctx.context.effective_timeout_ms(now, None);
            ctx.handle.block_on(adapters::smtp::send(&req, timeout_ms))
        } else {
            SmtpResponse {
                accepted: false,
                error: Some(ErrorDetail::capability(format!(
                    "smtp send via {}:{} denied",
                    req.host, req.port
                ))),
            }
        }
    };
    serde_json::to_vec(&response).map_err(|e| RuntimeError::Abi(e.to_string()))
}

fn dispatch_exec(payload: &[u8], ctx: &HandlerContext<'_>) -> Result<Vec<u8>, RuntimeError> {
    let req: WireExecRequest =
        serde_json::from_slice(payload).map_err(|e| RuntimeError::Abi(e.to_string()))?;
    let now = Utc::now();
    let response = if let Some(err) = cancellation_error(ctx, now) {
        WireExecResponse {
            exit_code: -1,
            stdout: String::new(),
            stderr: String::new(),
            error: Some(err),
        }
    } else {
        let policy_request = PolicyRequest::Exec(PolicyExecRequest {
            command: req.command.clone(),
        });
        if ctx.engine.check(&policy_request, ctx.grants).is_allowed() {
            let timeout_ms = ctx.context.effective_timeout_ms(now, None);
            ctx.handle.block_on(adapters::exec::run(&req, timeout_ms))
        } else {
            WireExecResponse {
                exit_code: -1,
                stdout: String::new(),
                stderr: String::new(),
                error: Some(ErrorDetail::capability(format!(
                    "exec of {} denied",
                    req.command
                ))),
            }
        }
    };
    serde_json::to_vec(&response).map_err(|e| RuntimeError::Abi(e.to_string()))
}

fn host_port_from_url(raw: &str) -> Result<(String, u16), RuntimeError> {
    let parsed = url::Url::parse(raw).map_err(|e| RuntimeError::Abi(e.to_string()))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| RuntimeError::Abi("URL has no host".to_string()))?
        .to_string();
    let port = parsed.port_or_known_default().unwrap_or(80);
    Ok((host, port))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reglet_policy::{NullDenialHandler, PolicyEngineConfig};

    fn test_engine() -> PolicyEngine {
        PolicyEngine::new(PolicyEngineConfig {
            cwd: None,
            resolve_symlinks: false,
            denial_handler: Arc::new(NullDenialHandler),
        })
    }

    #[tokio::test]
    async fn unknown_call_name_is_an_abi_error() {
        let engine = test_engine();
        let grants = GrantSet::default();
        let context = ContextEnvelope::default();
        let handle = tokio::runtime::Handle::current();
        let ctx = HandlerContext {
            engine: &engine,
            grants: &grants,
            context: &context,
            handle: &handle,
        };
        let result = dispatch("not_a_real_call", b"{}", &ctx);
        assert!(matches!(result, Err(RuntimeError::Abi(_))));
    }

    #[tokio::test]
    async fn http_request_is_denied_without_a_matching_grant() {
        let engine = test_engine();
        let grants = GrantSet::default();
        let context = ContextEnvelope::default();
        let handle = tokio::runtime::Handle::current();
        let ctx = HandlerContext {
            engine: &engine,
            grants: &grants,
            context: &context,
            handle: &handle,
        };
        let payload = serde_json::to_vec(&HttpRequest {
            method: "GET".to_string(),
            url: "http://example.com/".to_string(),
            headers: Default::default(),
            body: None,
        })
        .unwrap();
        let raw = dispatch_http(&payload, &ctx).unwrap();
        let response: HttpResponse = serde_json::from_slice(&raw).unwrap();
        assert!(response.error.is_some());
        assert_eq!(response.status, 0);
    }

    #[test]
    fn host_port_from_url_defaults_https_to_443() {
        let (host, port) = host_port_from_url("https://example.com/path").unwrap();
        assert_eq!(host, "example.com");
        assert_eq!(port, 443);
    }

    #[tokio::test]
    async fn canceled_call_returns_a_timeout_error_without_dispatching() {
        let engine = test_engine();
        // Granting network access here proves the short-circuit happens
        // before the policy check, not because of a denial.
        let grants = GrantSet {
            network: vec![reglet_types::NetworkRule {
                hosts: vec!["*".to_string()],
                ports: vec!["1-65535".to_string()],
            }],
            ..Default::default()
        };
        let context = ContextEnvelope {
            canceled: true,
            ..Default::default()
        };
        let handle = tokio::runtime::Handle::current();
        let ctx = HandlerContext {
            engine: &engine,
            grants: &grants,
            context: &context,
            handle: &handle,
        };
        let payload = serde_json::to_vec(&TcpRequest {
            host: "127.0.0.1".to_string(),
            port: 1,
            payload: String::new(),
        })
        .unwrap();
        let raw = dispatch_tcp(&payload, &ctx).unwrap();
        let response: TcpResponse = serde_json::from_slice(&raw).unwrap();
        let error = response.error.unwrap();
        assert!(error.is_timeout);
        assert_eq!(error.code, "call_canceled");
    }

    #[tokio::test]
    async fn already_expired_deadline_returns_a_timeout_error_without_dispatching() {
        let engine = test_engine();
        let grants = GrantSet {
            network: vec![reglet_types::NetworkRule {
                hosts: vec!["*".to_string()],
                ports: vec!["1-65535".to_string()],
            }],
            ..Default::default()
        };
        let context = ContextEnvelope::with_deadline(Utc::now() - chrono::Duration::seconds(1));
        let handle = tokio::runtime::Handle::current();
        let ctx = HandlerContext {
            engine: &engine,
            grants: &grants,
            context: &context,
            handle: &handle,
        };
        let payload = serde_json::to_vec(&TcpRequest {
            host: "127.0.0.1".to_string(),
            port: 1,
            payload: String::new(),
        })
        .unwrap();
        let raw = dispatch_tcp(&payload, &ctx).unwrap();
        let response: TcpResponse = serde_json::from_slice(&raw).unwrap();
        let error = response.error.unwrap();
        assert!(error.is_timeout);
        assert_eq!(error.code, "deadline_expired");
    }
}
