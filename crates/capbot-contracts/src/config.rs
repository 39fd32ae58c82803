use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const DEFAULT_FONT_PATH: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf";

/// Module configuration with documented defaults. Host frameworks edit this
/// through their own config surface; at render time it is read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleConfig {
    /// TrueType font used for captions. A missing or unreadable font is not
    /// an error; rendering falls back to known system fonts and finally to
    /// a built-in bitmap face.
    pub font_path: PathBuf,
    /// Newline-delimited file holding the template image URLs.
    pub store_path: PathBuf,
    /// Timeout for a single image download, in milliseconds.
    pub fetch_timeout_ms: u64,
    /// JPEG quality of rendered output, 1-100.
    pub jpeg_quality: u8,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            font_path: PathBuf::from(DEFAULT_FONT_PATH),
            store_path: PathBuf::from("capbot-images.txt"),
            fetch_timeout_ms: 10_000,
            jpeg_quality: 90,
        }
    }
}

impl ModuleConfig {
    /// Reads configuration from a JSON file. A missing or unparseable file
    /// yields the defaults.
    pub fn load(path: &Path) -> Self {
        fs::read_to_string(path)
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default()
    }
}
