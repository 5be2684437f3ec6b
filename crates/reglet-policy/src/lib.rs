//! Grant compilation and the runtime policy engine.
//!
//! A `GrantSet` declares what a plugin may do; [`PolicyEngine`] decides
//! whether one concrete [`reglet_types::PolicyRequest`] is authorized by
//! it. Grant sets are compiled once (glob patterns parsed, port rules
//! parsed) and the compiled form is cached by content hash so repeated
//! checks against the same grants don't re-parse patterns.

mod compiled;
mod engine;
mod error;
mod path_clean;
mod port_range;

pub use compiled::{compile, content_hash, CompiledGrantSet};
pub use engine::{
    is_absolute, Decision, DenialHandler, NullDenialHandler, PolicyEngine, PolicyEngineConfig,
    TracingDenialHandler,
};
pub use error::PolicyError;
pub use path_clean::clean;
pub use port_range::{parse_port_rule, PortRange};
