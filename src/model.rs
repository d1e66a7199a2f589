use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Empty,
    Paused,
    Playing,
}

impl PlaybackState {
    pub fn label(self) -> &'static str {
        match self {
            Self::Empty => "No tracks",
            Self::Paused => "Paused",
            Self::Playing => "Playing",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgressSnapshot {
    pub position_ms: u64,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Settings {
    #[serde(default = "default_music_dir")]
    pub music_dir: PathBuf,
    #[serde(default = "default_progress_tick_ms")]
    pub progress_tick_ms: u64,
}

fn default_music_dir() -> PathBuf {
    PathBuf::from("Music")
}

fn default_progress_tick_ms() -> u64 {
    250
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            music_dir: default_music_dir(),
            progress_tick_ms: default_progress_tick_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let settings: Settings = serde_json::from_str("{}").expect("parse");
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.music_dir, PathBuf::from("Music"));
        assert_eq!(settings.progress_tick_ms, 250);
    }
}
