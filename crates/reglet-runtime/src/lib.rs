//! The host executor: compiles and runs reglet plugin modules, registers
//! the guest-facing host-function bundle, and dispatches each call through
//! the policy engine before touching the network or filesystem.

pub mod adapters;
mod config;
mod dispatch;
mod error;
mod executor;
mod instance;

pub use config::{RuntimeConfig, DEFAULT_HOST_MODULE_NAME};
pub use error::RuntimeError;
pub use executor::Executor;
pub use instance::{PluginInstance, PluginModule};
