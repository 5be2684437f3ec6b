//! The policy engine: evaluates typed requests against a `GrantSet`.

use crate::compiled::{compile, content_hash, CompiledGrantSet, DOUBLESTAR_OPTIONS};
use crate::path_clean::clean;
use dashmap::DashMap;
use reglet_types::{
    EnvironmentRequest, ExecRequest, FileOperation, FileSystemRequest, KeyValueOperation,
    KeyValueRequest, KvOp, NetworkRequest, PolicyRequest,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

/// Receives a callback for every policy denial. The default implementation
/// logs at `warn`; [`NullDenialHandler`] is provided for tests and
/// benchmarks that don't want the log noise.
pub trait DenialHandler: Send + Sync {
    fn on_denied(&self, request: &PolicyRequest, reason: &str);
}

/// Logs every denial via `tracing::warn!` — the default handler.
#[derive(Debug, Default)]
pub struct TracingDenialHandler;

impl DenialHandler for TracingDenialHandler {
    fn on_denied(&self, request: &PolicyRequest, reason: &str) {
        warn!(kind = request.kind(), request = %request.describe(), reason, "policy denied");
    }
}

/// Discards every denial. For tests and benchmarks that exercise the
/// policy engine at volume and don't want per-decision log noise.
#[derive(Debug, Default)]
pub struct NullDenialHandler;

impl DenialHandler for NullDenialHandler {
    fn on_denied(&self, _request: &PolicyRequest, _reason: &str) {}
}

/// Explicit configuration for a [`PolicyEngine`] — no functional-options
/// builder.
pub struct PolicyEngineConfig {
    /// Working directory relative filesystem requests are joined against.
    /// `None` means relative requests are denied outright.
    pub cwd: Option<PathBuf>,
    /// Attempt `std::fs::canonicalize` on normalized filesystem paths
    /// before matching. Defaults to `true`; on resolution failure the
    /// engine proceeds with the lexically-cleaned path rather than
    /// denying.
    pub resolve_symlinks: bool,
    pub denial_handler: Arc<dyn DenialHandler>,
}

impl Default for PolicyEngineConfig {
    fn default() -> Self {
        Self {
            cwd: None,
            resolve_symlinks: true,
            denial_handler: Arc::new(TracingDenialHandler),
        }
    }
}

/// Decision returned by [`PolicyEngine::check`], including a reason on
/// denial so callers can build a `capability`-type `ErrorDetail` without
/// re-deriving why the request failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(String),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Evaluates network/fs/env/exec/kv requests against compiled grant sets.
///
/// Safe for concurrent use across module instances: the compiled-grants
/// cache is a `DashMap`, and compilation is a pure function with no shared
/// mutable state of its own.
pub struct PolicyEngine {
    config: PolicyEngineConfig,
    cache: DashMap<String, Arc<CompiledGrantSet>>,
}

impl PolicyEngine {
    pub fn new(config: PolicyEngineConfig) -> Self {
        Self {
            config,
            cache: DashMap::new(),
        }
    }

    /// Compile (or retrieve from cache) the grant set, then evaluate
    /// `request` against it. Every denial invokes the configured
    /// [`DenialHandler`] exactly once.
    pub fn check(&self, request: &PolicyRequest, grants: &reglet_types::GrantSet) -> Decision {
        let compiled = self.compiled(grants);
        let decision = self.evaluate(request, &compiled);
        if let Decision::Deny(reason) = &decision {
            self.config.denial_handler.on_denied(request, reason);
        }
        decision
    }

    /// Compile-or-fetch-cached the grant set, keyed by a content hash of
    /// its serialized form (never by address/pointer identity).
    fn compiled(&self, grants: &reglet_types::GrantSet) -> Arc<CompiledGrantSet> {
        let key = content_hash(grants);
        if let Some(existing) = self.cache.get(&key) {
            return existing.clone();
        }
        let compiled = Arc::new(compile(grants));
        self.cache.insert(key, compiled.clone());
        compiled
    }

    fn evaluate(&self, request: &PolicyRequest, compiled: &CompiledGrantSet) -> Decision {
        match request {
            PolicyRequest::Network(req) => self.check_network(req, compiled),
            PolicyRequest::FileSystem(req) => self.check_filesystem(req, compiled),
            PolicyRequest::Environment(req) => self.check_environment(req, compiled),
            PolicyRequest::Exec(req) => self.check_exec(req, compiled),
            PolicyRequest::KeyValue(req) => self.check_key_value(req, compiled),
        }
    }

    fn check_network(&self, req: &NetworkRequest, compiled: &CompiledGrantSet) -> Decision {
        let allowed = compiled.network.iter().any(|rule| {
            rule.hosts
                .iter()
                .any(|p| p.matches_with(&req.host, DOUBLESTAR_OPTIONS))
                && rule.ports.iter().any(|range| range.contains(req.port))
        });
        if allowed {
            Decision::Allow
        } else {
            Decision::Deny(format!(
                "no network rule allows {}:{}",
                req.host, req.port
            ))
        }
    }

    fn check_filesystem(&self, req: &FileSystemRequest, compiled: &CompiledGrantSet) -> Decision {
        let cleaned = clean(&req.path);
        let resolved = if cleaned.starts_with('/') {
            cleaned
        } else {
            match &self.config.cwd {
                Some(cwd) => clean(&format!("{}/{}", cwd.display(), cleaned)),
                None => {
                    return Decision::Deny("relative path without working directory".to_string())
                }
            }
        };

        let candidate = if self.config.resolve_symlinks {
            match std::fs::canonicalize(&resolved) {
                Ok(canonical) => canonical.to_string_lossy().into_owned(),
                Err(_) => resolved,
            }
        } else {
            resolved
        };

        let allowed = compiled.filesystem.iter().any(|rule| {
            let patterns = match req.operation {
                FileOperation::Read => &rule.read,
                FileOperation::Write => &rule.write,
            };
            patterns
                .iter()
                .any(|p| p.matches_with(&candidate, DOUBLESTAR_OPTIONS))
        });

        if allowed {
            Decision::Allow
        } else {
            Decision::Deny(format!(
                "no fs rule allows {:?} on {candidate}",
                req.operation
            ))
        }
    }

    fn check_environment(&self, req: &EnvironmentRequest, compiled: &CompiledGrantSet) -> Decision {
        let allowed = compiled
            .environment
            .iter()
            .any(|p| p.matches_with(&req.variable, DOUBLESTAR_OPTIONS));
        if allowed {
            Decision::Allow
        } else {
            Decision::Deny(format!("no env rule allows {}", req.variable))
        }
    }

    fn check_exec(&self, req: &ExecRequest, compiled: &CompiledGrantSet) -> Decision {
        let cleaned = clean(&req.command);
        let allowed = compiled
            .exec
            .iter()
            .any(|p| p.matches_with(&cleaned, DOUBLESTAR_OPTIONS));
        if allowed {
            Decision::Allow
        } else {
            Decision::Deny(format!("no exec rule allows {cleaned}"))
        }
    }

    fn check_key_value(&self, req: &KeyValueRequest, compiled: &CompiledGrantSet) -> Decision {
        let requested = match req.operation {
            KeyValueOperation::Read => KvOp::Read,
            KeyValueOperation::Write => KvOp::Write,
        };
        let allowed = compiled.key_value.iter().any(|rule| {
            rule.op.authorizes(requested)
                && rule
                    .keys
                    .iter()
                    .any(|p| p.matches_with(&req.key, DOUBLESTAR_OPTIONS))
        });
        if allowed {
            Decision::Allow
        } else {
            Decision::Deny(format!("no kv rule allows {:?} on {}", req.operation, req.key))
        }
    }
}

/// A path helper so callers building `FileSystemRequest`s don't need to
/// import `std::path` themselves.
pub fn is_absolute(path: &str) -> bool {
    Path::new(path).is_absolute()
}
