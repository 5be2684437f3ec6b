//! Grant persistence and the interactive capability prompter.

mod prompter;
mod store;

pub use prompter::{Choice, Prompter, PrompterError, Risk};
pub use store::{GrantStore, GrantStoreError};

/// The default per-plugin grant store path: `<data dir>/reglet/<plugin
/// name>/grants.yaml`, following the platform data-directory convention
/// `dirs` resolves.
pub fn default_grant_path(plugin_name: &str) -> Option<std::path::PathBuf> {
    dirs::data_dir().map(|dir| dir.join("reglet").join(plugin_name).join("grants.yaml"))
}
