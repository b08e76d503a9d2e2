use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Root for device-local data (list images live under `<data_dir>/images`).
    pub data_dir: PathBuf,
    /// When set, signed-in sessions go through the remote backend instead of
    /// the in-process store.
    pub remote_backend: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let data_dir = std::env::var("LISTMIND_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));
        let remote_backend = std::env::var("LISTMIND_REMOTE")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        Ok(Self {
            data_dir,
            remote_backend,
        })
    }
}
