use std::{
    fs, io,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Record of one captured pass, written as YAML next to the recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassLog {
    pub satellite: String,
    pub norad_id: u64,
    pub capture_file: PathBuf,
    pub min_elevation_deg: f64,
    pub started_at: DateTime<Utc>,
    pub predicted_los: Option<DateTime<Utc>>,
    pub stopped_at: Option<DateTime<Utc>>,
    pub capture_error: Option<String>,
}

impl PassLog {
    pub fn new(
        satellite: String,
        norad_id: u64,
        capture_file: PathBuf,
        min_elevation_deg: f64,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            satellite,
            norad_id,
            capture_file,
            min_elevation_deg,
            started_at,
            predicted_los: None,
            stopped_at: None,
            capture_error: None,
        }
    }

    /// `<capture stem>.yaml` in the capture's directory.
    pub fn path_for(capture_file: &Path) -> PathBuf {
        capture_file.with_extension("yaml")
    }

    pub fn path(&self) -> PathBuf {
        Self::path_for(&self.capture_file)
    }

    pub fn save(&self) -> io::Result<()> {
        let path = self.path();
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }
        fs::write(
            &path,
            serde_yaml::to_string(self)
                .map_err(|e| io::Error::other(format!("Failed to serialize pass log: {}", e)))?,
        )
    }

    pub fn load(path: &Path) -> io::Result<Self> {
        let content = fs::read_to_string(path)?;
        serde_yaml::from_str(&content)
            .map_err(|e| io::Error::other(format!("Failed to parse pass log: {}", e)))
    }
}
