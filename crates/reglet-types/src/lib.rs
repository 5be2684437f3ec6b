//! Wire types and error taxonomy for the reglet plugin host.
//!
//! These are the bit-stable JSON shapes every host call, manifest, and
//! grant file is built from. Nothing here touches WASM memory or I/O —
//! see `reglet-abi` and `reglet-runtime` for those.

mod context;
mod error_detail;
mod grant;
mod manifest;
mod outcome;
mod request;
pub mod wire;

pub use context::ContextEnvelope;
pub use error_detail::{ErrorDetail, ErrorKind};
pub use grant::{FileSystemRule, GrantSet, KeyValueRule, KvOp, NetworkRule};
pub use manifest::{duplicate_capability_indices, Capability, CapabilityCategory, Manifest};
pub use outcome::{Outcome, Status};
pub use request::{
    EnvironmentRequest, ExecRequest, FileOperation, FileSystemRequest, KeyValueOperation,
    KeyValueRequest, NetworkRequest, PolicyRequest,
};
