use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;
use walkdir::WalkDir;

pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoaderEvent {
    Track(String),
    Finished { count: usize },
}

/// Background scan of a single music directory. Entries arrive one at a
/// time through [`CatalogLoader::drain`], which never blocks.
pub struct CatalogLoader {
    dir: PathBuf,
    event_rx: Receiver<LoaderEvent>,
    cancel: Arc<AtomicBool>,
    finished: bool,
}

impl CatalogLoader {
    pub fn spawn(dir: &Path) -> Result<Self> {
        let (event_tx, event_rx) = mpsc::channel();
        let cancel = Arc::new(AtomicBool::new(false));

        let worker_dir = dir.to_path_buf();
        let worker_cancel = Arc::clone(&cancel);
        thread::Builder::new()
            .name(String::from("catalog-loader"))
            .spawn(move || scan_loop(&worker_dir, &worker_cancel, &event_tx))
            .context("failed to spawn catalog loader thread")?;

        log::info!("catalog loader started for {}", dir.display());
        Ok(Self {
            dir: dir.to_path_buf(),
            event_rx,
            cancel,
            finished: false,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn drain(&mut self) -> Vec<LoaderEvent> {
        let mut events = Vec::new();
        loop {
            match self.event_rx.try_recv() {
                Ok(event) => {
                    if matches!(event, LoaderEvent::Finished { .. }) {
                        self.finished = true;
                    }
                    events.push(event);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.finished = true;
                    break;
                }
            }
        }
        events
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }
}

impl Drop for CatalogLoader {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn scan_loop(dir: &Path, cancel: &AtomicBool, event_tx: &Sender<LoaderEvent>) {
    let mut count = 0_usize;
    for name in track_names(dir) {
        if cancel.load(Ordering::Relaxed) {
            log::debug!("catalog loader cancelled after {count} tracks");
            return;
        }
        log::debug!("discovered track {name}");
        if event_tx.send(LoaderEvent::Track(name)).is_err() {
            return;
        }
        count += 1;
    }

    log::info!("catalog loader finished with {count} tracks");
    let _ = event_tx.send(LoaderEvent::Finished { count });
}

/// Lists matching file names in directory enumeration order. A missing or
/// unreadable directory yields nothing.
pub fn list_tracks(dir: &Path) -> Vec<String> {
    track_names(dir).collect()
}

fn track_names(dir: &Path) -> impl Iterator<Item = String> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                if err.depth() == 0 {
                    log::warn!("cannot read music directory: {err}");
                } else {
                    log::debug!("skipping unreadable entry: {err}");
                }
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .filter(|name| is_track_name(name))
}

/// A bare `.mp3` counts too; only the suffix matters.
pub fn is_track_name(name: &str) -> bool {
    let Some((_, ext)) = name.rsplit_once('.') else {
        return false;
    };
    AUDIO_EXTENSIONS
        .iter()
        .any(|supported| ext.eq_ignore_ascii_case(supported))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::{Duration, Instant};
    use tempfile::tempdir;

    fn drain_until_finished(loader: &mut CatalogLoader) -> Vec<LoaderEvent> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut events = Vec::new();
        while !loader.is_finished() && Instant::now() < deadline {
            events.extend(loader.drain());
            thread::sleep(Duration::from_millis(5));
        }
        events
    }

    fn read_dir_order(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .expect("read_dir")
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().map(|kind| kind.is_file()).unwrap_or(false))
            .map(|entry| entry.file_name().to_string_lossy().to_string())
            .filter(|name| is_track_name(name))
            .collect()
    }

    #[test]
    fn recognizes_supported_extensions_only() {
        assert!(is_track_name("song.mp3"));
        assert!(is_track_name("take.two.wav"));
        assert!(is_track_name("LOUD.OGG"));
        assert!(!is_track_name("cover.jpg"));
        assert!(!is_track_name("song.flac"));
        assert!(!is_track_name("mp3"));
        assert!(is_track_name(".mp3"));
        assert!(is_track_name(".OGG"));
        assert!(!is_track_name("song.mp3.txt"));
    }

    #[test]
    fn listing_keeps_files_named_only_by_extension() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join(".ogg"), b"x").expect("write ogg");
        fs::write(dir.path().join(".wav"), b"x").expect("write wav");

        let tracks = list_tracks(dir.path());
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks, read_dir_order(dir.path()));
    }

    #[test]
    fn listing_filters_non_audio_files_and_directories() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("a.mp3"), b"x").expect("write mp3");
        fs::write(dir.path().join("b.wav"), b"x").expect("write wav");
        fs::write(dir.path().join("c.ogg"), b"x").expect("write ogg");
        fs::write(dir.path().join("notes.txt"), b"x").expect("write txt");
        fs::write(dir.path().join("cover.png"), b"x").expect("write png");
        fs::create_dir(dir.path().join("folder.mp3")).expect("create dir");
        fs::create_dir(dir.path().join("nested")).expect("create nested");
        fs::write(dir.path().join("nested").join("deep.mp3"), b"x").expect("write deep");

        let tracks = list_tracks(dir.path());
        assert_eq!(tracks.len(), 3);
        assert_eq!(tracks, read_dir_order(dir.path()));
        assert!(!tracks.iter().any(|name| name == "notes.txt"));
        assert!(!tracks.iter().any(|name| name == "deep.mp3"));
    }

    #[test]
    fn missing_directory_lists_nothing() {
        let dir = tempdir().expect("tempdir");
        assert!(list_tracks(&dir.path().join("Music")).is_empty());
    }

    #[test]
    fn loader_delivers_every_track_then_finishes() {
        let dir = tempdir().expect("tempdir");
        for name in ["one.mp3", "two.ogg", "skip.md", "three.wav"] {
            fs::write(dir.path().join(name), b"x").expect("write");
        }

        let mut loader = CatalogLoader::spawn(dir.path()).expect("spawn");
        let events = drain_until_finished(&mut loader);

        let names: Vec<String> = events
            .iter()
            .filter_map(|event| match event {
                LoaderEvent::Track(name) => Some(name.clone()),
                LoaderEvent::Finished { .. } => None,
            })
            .collect();
        assert_eq!(names, read_dir_order(dir.path()));
        assert_eq!(events.last(), Some(&LoaderEvent::Finished { count: 3 }));
        assert!(loader.drain().is_empty());
    }

    #[test]
    fn loader_for_missing_directory_finishes_empty() {
        let dir = tempdir().expect("tempdir");
        let mut loader = CatalogLoader::spawn(&dir.path().join("nope")).expect("spawn");
        let events = drain_until_finished(&mut loader);
        assert_eq!(events, vec![LoaderEvent::Finished { count: 0 }]);
    }

    #[test]
    fn cancelled_loader_still_reaches_finished_state() {
        let dir = tempdir().expect("tempdir");
        for idx in 0..32 {
            fs::write(dir.path().join(format!("track_{idx}.mp3")), b"x").expect("write");
        }

        let mut loader = CatalogLoader::spawn(dir.path()).expect("spawn");
        loader.cancel();
        let events = drain_until_finished(&mut loader);

        assert!(loader.is_finished());
        let delivered = events
            .iter()
            .filter(|event| matches!(event, LoaderEvent::Track(_)))
            .count();
        assert!(delivered <= 32);
    }
}
