//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (settings):
//!   Windows: %APPDATA%\live-denoise\
//!   macOS:   ~/Library/Application Support/live-denoise/
//!   Linux:   ~/.config/live-denoise/
//!
//! Data dir (engine models):
//!   Windows: %LOCALAPPDATA%\live-denoise\
//!   macOS:   ~/Library/Application Support/live-denoise/
//!   Linux:   ~/.local/share/live-denoise/

use std::path::PathBuf;

/// Resolved application directories and files.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory holding `settings.toml`.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Directory searched for engine model files given by bare name.
    pub models_dir: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "live-denoise";

    /// Falls back to the current directory if the platform cannot provide a
    /// standard path.
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        Self {
            settings_file: config_dir.join("settings.toml"),
            config_dir,
            models_dir: data_dir.join("models"),
        }
    }

    /// Resolve a configured model path: absolute paths are kept, anything
    /// else is looked up under [`models_dir`](Self::models_dir).
    pub fn resolve_model(&self, model: &std::path::Path) -> PathBuf {
        if model.is_absolute() {
            model.to_path_buf()
        } else {
            self.models_dir.join(model)
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
