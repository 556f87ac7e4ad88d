use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Replay input settings from the `[input]` section.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InputConfig {
    /// JSON-lines file of rule updates and envelopes; `"-"` reads stdin.
    pub path: String,
}

/// Where the replay input comes from once relative paths are resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Stdin,
    File(PathBuf),
}

impl InputConfig {
    /// Resolve the configured path against `base_dir` (the config file's
    /// parent directory).
    pub fn resolve(&self, base_dir: &Path) -> InputSource {
        if self.path == "-" {
            return InputSource::Stdin;
        }
        let path = PathBuf::from(&self.path);
        if path.is_relative() {
            InputSource::File(base_dir.join(path))
        } else {
            InputSource::File(path)
        }
    }
}
