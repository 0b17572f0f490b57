//! Persistent server settings (JSON file in the platform data directory).

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct ServerSettings {
    /// Socket address the HTTP/WebSocket server binds to.
    pub bind_addr: String,
    /// Directory for persisted transcript files.
    pub transcript_dir: PathBuf,
    /// Directory for per-window temp artifacts (WAV + manifest).
    pub temp_dir: PathBuf,
    /// External inference engine command. When unset the stub engine is used.
    pub engine_command: Option<PathBuf>,
    /// Extra arguments passed to the engine command before the manifest.
    pub engine_args: Vec<String>,
    /// Also render session output to the server's stdout.
    pub echo_to_console: bool,
    /// Window overlap fraction retained between consecutive windows.
    pub overlap: f32,
}

impl Default for ServerSettings {
    fn default() -> Self {
        let data_dir = default_data_dir();
        Self {
            bind_addr: "0.0.0.0:5001".into(),
            transcript_dir: data_dir.join("transcripts"),
            temp_dir: data_dir.join("temp_audio"),
            engine_command: None,
            engine_args: Vec::new(),
            echo_to_console: true,
            overlap: 0.15,
        }
    }
}

impl ServerSettings {
    pub fn normalize(&mut self) {
        self.overlap = self.overlap.clamp(0.0, 0.9);
        if self.bind_addr.trim().is_empty() {
            self.bind_addr = Self::default().bind_addr;
        }
    }
}

fn default_data_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Lattice Labs")
            .join("Chirp")
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                std::env::var_os("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
                    .join(".local")
                    .join("share")
            })
            .join("chirp")
    }
}

/// `CHIRP_SETTINGS` overrides the default settings file location.
pub fn default_settings_path() -> PathBuf {
    std::env::var_os("CHIRP_SETTINGS")
        .map(PathBuf::from)
        .unwrap_or_else(|| default_data_dir().join("settings.json"))
}

pub fn load_settings(path: &Path) -> ServerSettings {
    let mut settings = fs::read_to_string(path)
        .ok()
        .and_then(|raw| serde_json::from_str::<ServerSettings>(&raw).ok())
        .unwrap_or_default();
    settings.normalize();
    settings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let settings = load_settings(Path::new("/nonexistent/chirp-settings.json"));
        assert_eq!(settings.bind_addr, "0.0.0.0:5001");
        assert!(settings.engine_command.is_none());
    }

    #[test]
    fn normalize_clamps_overlap() {
        let mut settings = ServerSettings {
            overlap: 3.0,
            ..ServerSettings::default()
        };
        settings.normalize();
        assert_eq!(settings.overlap, 0.9);
    }

    #[test]
    fn partial_settings_files_keep_defaults_for_the_rest() {
        let path = std::env::temp_dir().join(format!(
            "chirp-settings-test-{}.json",
            std::process::id()
        ));
        fs::write(&path, r#"{"bindAddr": "127.0.0.1:9000", "overlap": 0.25}"#).unwrap();

        let settings = load_settings(&path);
        assert_eq!(settings.bind_addr, "127.0.0.1:9000");
        assert_eq!(settings.overlap, 0.25);
        assert!(settings.echo_to_console);

        let _ = fs::remove_file(&path);
    }
}
