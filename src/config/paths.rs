//! Cross-platform application paths using the `dirs` crate.
//!
//! Config dir:
//!   Windows: %APPDATA%\cow-cockpit\
//!   macOS:   ~/Library/Application Support/cow-cockpit/
//!   Linux:   ~/.config/cow-cockpit/

use std::path::{Path, PathBuf};

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for `settings.toml`.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "cow-cockpit";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path.
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let settings_file = config_dir.join("settings.toml");

        Self {
            config_dir,
            settings_file,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve a helper program name.
///
/// Anything containing a path separator is used as given.  A bare name is
/// preferred from the directory of the running executable (where
/// `cargo build` puts sibling binaries) and otherwise left for `PATH` lookup.
pub fn resolve_helper(name: &str) -> PathBuf {
    let given = Path::new(name);
    if given.components().count() != 1 {
        return given.to_path_buf();
    }

    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(name)))
        .filter(|candidate| candidate.is_file())
        .unwrap_or_else(|| given.to_path_buf())
}
