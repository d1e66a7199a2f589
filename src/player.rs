use crate::audio::MediaEngine;
use crate::model::{PlaybackState, ProgressSnapshot};
use crate::progress::ProgressReporter;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    TogglePlayPause,
    Next,
    Previous,
    Select(usize),
    TrackEnded,
}

/// State changes reported back to the shell after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
    TrackChanged { index: usize, playing: bool },
    PlaybackToggled { playing: bool },
}

/// Playback state machine over the track catalog.
///
/// The catalog only grows, and `current_index` is `Some` exactly when the
/// catalog is non-empty. Every track change loads the new track and starts
/// playback; a track that fails to load leaves the player paused on it.
#[derive(Debug)]
pub struct Player {
    music_dir: PathBuf,
    catalog: Vec<String>,
    current_index: Option<usize>,
    is_playing: bool,
    loading: bool,
    load_failed: bool,
    pub progress: ProgressReporter,
    pub status: String,
    pub dirty: bool,
}

impl Player {
    pub fn new(music_dir: &Path) -> Self {
        Self {
            music_dir: music_dir.to_path_buf(),
            catalog: Vec::new(),
            current_index: None,
            is_playing: false,
            loading: true,
            load_failed: false,
            progress: ProgressReporter::new(),
            status: String::from("Loading tracks..."),
            dirty: true,
        }
    }

    pub fn music_dir(&self) -> &Path {
        &self.music_dir
    }

    pub fn catalog(&self) -> &[String] {
        &self.catalog
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    pub fn current_track(&self) -> Option<&str> {
        self.current_index
            .and_then(|idx| self.catalog.get(idx))
            .map(String::as_str)
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn state(&self) -> PlaybackState {
        if self.catalog.is_empty() {
            PlaybackState::Empty
        } else if self.is_playing {
            PlaybackState::Playing
        } else {
            PlaybackState::Paused
        }
    }

    pub fn progress_snapshot(&self) -> ProgressSnapshot {
        self.progress.snapshot()
    }

    pub fn track_path(&self, index: usize) -> Option<PathBuf> {
        self.catalog.get(index).map(|name| self.music_dir.join(name))
    }

    /// Appends a discovered track. The first one is selected and loaded
    /// without starting playback.
    pub fn push_track(
        &mut self,
        name: String,
        engine: &mut dyn MediaEngine,
    ) -> Option<PlayerEvent> {
        self.catalog.push(name);
        self.dirty = true;
        if self.catalog.len() != 1 {
            return None;
        }

        self.current_index = Some(0);
        self.load_track(0, engine);
        Some(PlayerEvent::TrackChanged {
            index: 0,
            playing: false,
        })
    }

    pub fn finish_loading(&mut self, count: usize) {
        self.loading = false;
        if self.catalog.is_empty() {
            self.set_status("No tracks available");
        } else if self.current_index == Some(0) && !self.is_playing && !self.load_failed {
            let noun = if count == 1 { "track" } else { "tracks" };
            self.set_status(&format!("Loaded {count} {noun}"));
        }
        log::info!("catalog ready with {} tracks", self.catalog.len());
    }

    pub fn dispatch(
        &mut self,
        command: Command,
        engine: &mut dyn MediaEngine,
    ) -> Option<PlayerEvent> {
        let len = self.catalog.len();
        let current = self.current_index?;
        if len == 0 {
            return None;
        }

        match command {
            Command::TogglePlayPause => self.toggle_play_pause(engine),
            Command::Next => Some(self.change_track((current + 1) % len, engine)),
            Command::Previous => Some(self.change_track((current + len - 1) % len, engine)),
            Command::Select(index) => (index < len).then(|| self.change_track(index, engine)),
            Command::TrackEnded => {
                if !self.is_playing {
                    return None;
                }
                log::debug!("track ended: {}", self.catalog[current]);
                Some(self.change_track((current + 1) % len, engine))
            }
        }
    }

    /// Samples the engine for the progress display and turns end of media
    /// into a `TrackEnded` command.
    pub fn tick(&mut self, engine: &mut dyn MediaEngine) -> Option<PlayerEvent> {
        if !self.is_playing {
            return None;
        }
        if self
            .progress
            .sample(true, engine.position(), engine.duration())
        {
            self.dirty = true;
        }
        if engine.is_finished() {
            return self.dispatch(Command::TrackEnded, engine);
        }
        None
    }

    fn toggle_play_pause(&mut self, engine: &mut dyn MediaEngine) -> Option<PlayerEvent> {
        if self.is_playing {
            engine.pause();
            self.is_playing = false;
            self.set_status("Paused");
        } else {
            if engine.current_track().is_none() {
                let index = self.current_index?;
                if !self.load_track(index, engine) {
                    return None;
                }
            }
            engine.play();
            self.is_playing = true;
            self.set_status("Playing");
        }
        Some(PlayerEvent::PlaybackToggled {
            playing: self.is_playing,
        })
    }

    fn change_track(&mut self, index: usize, engine: &mut dyn MediaEngine) -> PlayerEvent {
        self.current_index = Some(index);
        if self.load_track(index, engine) {
            engine.play();
            self.is_playing = true;
            self.set_status(&format!("Playing {}", self.catalog[index]));
        }
        PlayerEvent::TrackChanged {
            index,
            playing: self.is_playing,
        }
    }

    fn load_track(&mut self, index: usize, engine: &mut dyn MediaEngine) -> bool {
        self.is_playing = false;
        self.dirty = true;
        let Some(path) = self.track_path(index) else {
            return false;
        };

        match engine.load(&path) {
            Ok(()) => {
                self.load_failed = false;
                self.progress.reset(engine.duration());
                self.set_status(&format!("Loaded {}", self.catalog[index]));
                true
            }
            Err(err) => {
                log::warn!("failed to load {}: {err:#}", path.display());
                self.load_failed = true;
                self.progress.reset(None);
                self.set_status(&format!("playback error: {err:#}"));
                false
            }
        }
    }

    fn set_status(&mut self, message: &str) {
        self.status = message.to_string();
        self.dirty = true;
    }
}
