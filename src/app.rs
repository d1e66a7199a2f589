use crate::audio::{MediaEngine, NullAudioEngine, RodioAudioEngine};
use crate::catalog::{CatalogLoader, LoaderEvent};
use crate::model::Settings;
use crate::player::{Command, Player};
use crate::shell::{Intent, Shell};
use anyhow::Result;
use crossterm::event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io::{Stdout, stdout};
use std::time::{Duration, Instant};
use time::UtcOffset;

const INPUT_POLL: Duration = Duration::from_millis(33);
const MIN_PROGRESS_TICK: Duration = Duration::from_millis(10);

#[derive(Debug, Clone)]
pub struct AppOptions {
    pub settings: Settings,
    pub no_audio: bool,
    pub clock_offset: UtcOffset,
}

pub fn run(options: AppOptions) -> Result<()> {
    let mut engine: Box<dyn MediaEngine> = if options.no_audio {
        log::info!("audio disabled, using null engine");
        Box::new(NullAudioEngine::new())
    } else {
        match RodioAudioEngine::new() {
            Ok(engine) => Box::new(engine),
            Err(err) => {
                log::warn!("no audio output, falling back to null engine: {err:#}");
                Box::new(NullAudioEngine::new())
            }
        }
    };

    let music_dir = options.settings.music_dir.clone();
    let mut player = Player::new(&music_dir);
    let mut shell = Shell::new(options.clock_offset);
    let mut loader = CatalogLoader::spawn(&music_dir)?;
    let tick = Duration::from_millis(options.settings.progress_tick_ms).max(MIN_PROGRESS_TICK);

    enable_raw_mode()?;
    let mut out = stdout();
    execute!(out, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(out);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = event_loop(
        &mut terminal,
        &mut loader,
        &mut player,
        &mut shell,
        &mut *engine,
        tick,
    );

    loader.cancel();
    engine.stop();
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    log::info!("shutting down");
    result
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    loader: &mut CatalogLoader,
    player: &mut Player,
    shell: &mut Shell,
    engine: &mut dyn MediaEngine,
    tick: Duration,
) -> Result<()> {
    let mut last_tick = Instant::now();

    loop {
        pump_loader(loader, player, shell, engine);
        advance_timers(player, shell, engine, tick, &mut last_tick, Instant::now());

        if player.dirty {
            terminal.draw(|frame| crate::ui::draw(frame, player, shell, &*engine))?;
            player.dirty = false;
        }

        if shell.should_close {
            return Ok(());
        }

        if !event::poll(INPUT_POLL)? {
            continue;
        }

        let intent = match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => crate::shell::intent_for_key(key),
            Event::Mouse(mouse) => shell.intent_for_mouse(mouse, player.catalog().len()),
            Event::Resize(_, _) => {
                player.dirty = true;
                None
            }
            _ => None,
        };

        if let Some(intent) = intent {
            handle_intent(intent, player, shell, engine);
        }
    }
}

/// Moves every track the loader has found so far into the player. Runs on
/// the UI thread only.
fn pump_loader(
    loader: &mut CatalogLoader,
    player: &mut Player,
    shell: &mut Shell,
    engine: &mut dyn MediaEngine,
) {
    if loader.is_finished() {
        return;
    }

    for event in loader.drain() {
        match event {
            LoaderEvent::Track(name) => {
                if let Some(event) = player.push_track(name, engine) {
                    shell.follow(event);
                }
            }
            LoaderEvent::Finished { count } => {
                if count == 0 {
                    log::warn!("no tracks found in {}", loader.dir().display());
                }
                player.finish_loading(count);
            }
        }
    }

    if loader.is_finished() && player.is_loading() {
        player.finish_loading(player.catalog().len());
    }
}

/// Samples progress once per `tick` and keeps the top-panel clock current
/// regardless of the progress period.
fn advance_timers(
    player: &mut Player,
    shell: &mut Shell,
    engine: &mut dyn MediaEngine,
    tick: Duration,
    last_tick: &mut Instant,
    now: Instant,
) {
    if now.saturating_duration_since(*last_tick) >= tick {
        if let Some(event) = player.tick(engine) {
            shell.follow(event);
        }
        *last_tick = now;
    }
    if shell.refresh_clock(now) {
        player.dirty = true;
    }
}

fn handle_intent(
    intent: Intent,
    player: &mut Player,
    shell: &mut Shell,
    engine: &mut dyn MediaEngine,
) {
    match intent {
        Intent::Player(command) => {
            if let Some(event) = player.dispatch(command, engine) {
                shell.follow(event);
            }
        }
        Intent::CursorUp => {
            shell.cursor_up(player.catalog().len());
            player.dirty = true;
        }
        Intent::CursorDown => {
            shell.cursor_down(player.catalog().len());
            player.dirty = true;
        }
        Intent::ActivateCursor => {
            if let Some(index) = shell.cursor()
                && let Some(event) = player.dispatch(Command::Select(index), engine)
            {
                shell.follow(event);
            }
        }
        Intent::ToggleFullscreen => {
            shell.toggle_fullscreen();
            player.dirty = true;
        }
        Intent::Minimize => {
            player.status = if crate::shell::minimize_window() {
                String::from("Minimized")
            } else {
                String::from("Minimize is not available in this terminal")
            };
            player.dirty = true;
        }
        Intent::Close => shell.should_close = true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PlaybackState;
    use std::fs;
    use std::path::Path;
    use std::thread;
    use tempfile::tempdir;

    fn loaded(names: &[&str], engine: &mut NullAudioEngine) -> (Player, Shell) {
        let mut player = Player::new(Path::new("Music"));
        let mut shell = Shell::new(UtcOffset::UTC);
        for name in names {
            if let Some(event) = player.push_track((*name).to_string(), engine) {
                shell.follow(event);
            }
        }
        player.finish_loading(names.len());
        (player, shell)
    }

    #[test]
    fn pump_loader_fills_catalog_and_selects_first_track() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("a.mp3"), b"x").expect("write");
        fs::write(dir.path().join("b.ogg"), b"x").expect("write");
        fs::write(dir.path().join("readme.txt"), b"x").expect("write");

        let mut engine = NullAudioEngine::new();
        let mut player = Player::new(dir.path());
        let mut shell = Shell::new(UtcOffset::UTC);
        let mut loader = CatalogLoader::spawn(dir.path()).expect("spawn");

        let deadline = Instant::now() + Duration::from_secs(5);
        while player.is_loading() && Instant::now() < deadline {
            pump_loader(&mut loader, &mut player, &mut shell, &mut engine);
            thread::sleep(Duration::from_millis(5));
        }

        assert_eq!(player.catalog().len(), 2);
        assert_eq!(player.state(), PlaybackState::Paused);
        assert_eq!(player.current_index(), Some(0));
        assert_eq!(shell.cursor(), Some(0));
        assert!(engine.current_track().is_some());
    }

    #[test]
    fn pump_loader_reports_empty_directory() {
        let dir = tempdir().expect("tempdir");
        let mut engine = NullAudioEngine::new();
        let mut player = Player::new(dir.path());
        let mut shell = Shell::new(UtcOffset::UTC);
        let mut loader = CatalogLoader::spawn(dir.path()).expect("spawn");

        let deadline = Instant::now() + Duration::from_secs(5);
        while player.is_loading() && Instant::now() < deadline {
            pump_loader(&mut loader, &mut player, &mut shell, &mut engine);
            thread::sleep(Duration::from_millis(5));
        }

        assert_eq!(player.state(), PlaybackState::Empty);
        assert_eq!(player.status, "No tracks available");
    }

    #[test]
    fn activating_cursor_plays_that_track() {
        let mut engine = NullAudioEngine::new();
        let (mut player, mut shell) = loaded(&["a.mp3", "b.mp3", "c.mp3"], &mut engine);

        handle_intent(Intent::CursorDown, &mut player, &mut shell, &mut engine);
        handle_intent(Intent::CursorDown, &mut player, &mut shell, &mut engine);
        handle_intent(Intent::ActivateCursor, &mut player, &mut shell, &mut engine);

        assert_eq!(player.current_index(), Some(2));
        assert_eq!(player.state(), PlaybackState::Playing);
        assert!(!engine.is_paused());
    }

    #[test]
    fn next_moves_the_cursor_along() {
        let mut engine = NullAudioEngine::new();
        let (mut player, mut shell) = loaded(&["a.mp3", "b.mp3"], &mut engine);

        handle_intent(
            Intent::Player(Command::Next),
            &mut player,
            &mut shell,
            &mut engine,
        );
        assert_eq!(shell.cursor(), Some(1));
        handle_intent(
            Intent::Player(Command::Next),
            &mut player,
            &mut shell,
            &mut engine,
        );
        assert_eq!(shell.cursor(), Some(0));
    }

    #[test]
    fn clock_refreshes_between_slow_progress_ticks() {
        let mut engine = NullAudioEngine::new();
        let (mut player, mut shell) = loaded(&["a.mp3"], &mut engine);
        let start = Instant::now();
        let mut last_tick = start;
        let later = start + Duration::from_secs(2);
        assert!(shell.clock_due(later));

        advance_timers(
            &mut player,
            &mut shell,
            &mut engine,
            Duration::from_secs(60),
            &mut last_tick,
            later,
        );

        assert!(!shell.clock_due(later));
        assert_eq!(last_tick, start);
    }

    #[test]
    fn progress_tick_fires_once_its_period_elapses() {
        let mut engine = NullAudioEngine::new();
        let (mut player, mut shell) = loaded(&["a.mp3"], &mut engine);
        let start = Instant::now();
        let mut last_tick = start;
        let later = start + Duration::from_millis(300);

        advance_timers(
            &mut player,
            &mut shell,
            &mut engine,
            Duration::from_millis(250),
            &mut last_tick,
            later,
        );

        assert_eq!(last_tick, later);
    }

    #[test]
    fn close_and_fullscreen_only_touch_the_shell() {
        let mut engine = NullAudioEngine::new();
        let (mut player, mut shell) = loaded(&["a.mp3"], &mut engine);

        handle_intent(Intent::ToggleFullscreen, &mut player, &mut shell, &mut engine);
        assert!(shell.fullscreen);
        handle_intent(Intent::Close, &mut player, &mut shell, &mut engine);
        assert!(shell.should_close);
        assert_eq!(player.state(), PlaybackState::Paused);
    }

    #[cfg(not(windows))]
    #[test]
    fn minimize_without_console_window_reports_status() {
        let mut engine = NullAudioEngine::new();
        let (mut player, mut shell) = loaded(&[], &mut engine);
        handle_intent(Intent::Minimize, &mut player, &mut shell, &mut engine);
        assert!(player.status.contains("not available"));
    }
}
