//! Network/process adapters. Each module implements one of the five
//! wire-type bundles defined in `reglet_types::wire`: the actual
//! socket/process work those types' doc comment defers to "platform code".

pub mod dns;
pub mod exec;
pub mod http;
pub mod smtp;
pub mod tcp;
