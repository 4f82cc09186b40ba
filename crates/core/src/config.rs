use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_scanner() -> String {
    "walkdir".to_string()
}

fn default_hasher() -> String {
    "fast64".to_string()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("fo.db")
}

/// Engine construction parameters, following the teacher's
/// `shared::settings::AppSettings` shape: a plain serde struct so a
/// caller can persist a session's provider selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_scanner")]
    pub scanner_name: String,
    #[serde(default = "default_hasher")]
    pub hasher_name: String,
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    #[serde(default)]
    pub use_ads_cache: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scanner_name: default_scanner(),
            hasher_name: default_hasher(),
            db_path: default_db_path(),
            use_ads_cache: false,
        }
    }
}
