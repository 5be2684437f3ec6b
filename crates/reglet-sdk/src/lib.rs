//! Guest-side plugin lifecycle: a tracked allocator, the `manifest`/
//! `observe` export wrappers, a scoped context store, and error
//! normalization to the wire `ErrorDetail` shape.
//!
//! A plugin binary depends on this crate, implements [`Plugin`], installs
//! [`alloc::TrackedAllocator`] as its `#[global_allocator]`, and exports
//! thin `extern "C"` functions that delegate to [`run_manifest`] and
//! [`run_observe`].

pub mod alloc;
pub mod context;
pub mod errors;
mod lifecycle;

pub use errors::CheckError;
pub use lifecycle::{run_manifest, run_observe, CheckResult, Plugin};
