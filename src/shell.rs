use crate::player::{Command, PlayerEvent};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::prelude::Rect;
use ratatui::widgets::ListState;
use std::time::{Duration, Instant};
use time::{OffsetDateTime, UtcOffset};

const CLOCK_REFRESH: Duration = Duration::from_secs(1);

/// User intent translated from terminal input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Player(Command),
    CursorUp,
    CursorDown,
    ActivateCursor,
    ToggleFullscreen,
    Minimize,
    Close,
}

pub fn intent_for_key(key: KeyEvent) -> Option<Intent> {
    let intent = match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Intent::Close,
        KeyCode::Char('q') | KeyCode::Esc => Intent::Close,
        KeyCode::Char(' ') => Intent::Player(Command::TogglePlayPause),
        KeyCode::Char('n') | KeyCode::Right => Intent::Player(Command::Next),
        KeyCode::Char('p') | KeyCode::Left => Intent::Player(Command::Previous),
        KeyCode::Up => Intent::CursorUp,
        KeyCode::Down => Intent::CursorDown,
        KeyCode::Enter => Intent::ActivateCursor,
        KeyCode::Char('f') | KeyCode::F(11) => Intent::ToggleFullscreen,
        KeyCode::Char('m') => Intent::Minimize,
        _ => return None,
    };
    Some(intent)
}

#[derive(Debug)]
pub struct Shell {
    pub fullscreen: bool,
    pub should_close: bool,
    pub list_state: ListState,
    pub list_rect: Rect,
    clock: String,
    clock_offset: UtcOffset,
    clock_checked_at: Option<Instant>,
}

impl Shell {
    /// `clock_offset` must be resolved before any thread is spawned; the
    /// local offset is not readable afterwards on most unix systems.
    pub fn new(clock_offset: UtcOffset) -> Self {
        let mut shell = Self {
            fullscreen: false,
            should_close: false,
            list_state: ListState::default(),
            list_rect: Rect::default(),
            clock: String::new(),
            clock_offset,
            clock_checked_at: None,
        };
        shell.refresh_clock(Instant::now());
        shell
    }

    pub fn clock(&self) -> &str {
        &self.clock
    }

    pub fn cursor(&self) -> Option<usize> {
        self.list_state.selected()
    }

    pub fn clock_due(&self, now: Instant) -> bool {
        self.clock_checked_at
            .is_none_or(|checked| now.saturating_duration_since(checked) >= CLOCK_REFRESH)
    }

    /// Re-reads the wall clock at most once per second. Returns true when
    /// the displayed `HH:MM` changed.
    pub fn refresh_clock(&mut self, now: Instant) -> bool {
        if !self.clock_due(now) {
            return false;
        }
        self.clock_checked_at = Some(now);

        let now = OffsetDateTime::now_utc().to_offset(self.clock_offset);
        let label = format!("{:02}:{:02}", now.hour(), now.minute());
        if label == self.clock {
            return false;
        }
        self.clock = label;
        true
    }

    pub fn cursor_up(&mut self, len: usize) {
        if len == 0 {
            return;
        }
        let next = self.cursor().map_or(0, |idx| idx.saturating_sub(1));
        self.list_state.select(Some(next.min(len - 1)));
    }

    pub fn cursor_down(&mut self, len: usize) {
        if len == 0 {
            return;
        }
        let next = self.cursor().map_or(0, |idx| idx + 1);
        self.list_state.select(Some(next.min(len - 1)));
    }

    /// Keeps the list cursor on the track the player switched to.
    pub fn follow(&mut self, event: PlayerEvent) {
        if let PlayerEvent::TrackChanged { index, .. } = event {
            self.list_state.select(Some(index));
        }
    }

    pub fn toggle_fullscreen(&mut self) {
        self.fullscreen = !self.fullscreen;
    }

    /// Maps a mouse event to an intent, using the last rendered list area.
    pub fn intent_for_mouse(&mut self, mouse: MouseEvent, len: usize) -> Option<Intent> {
        if !point_in_rect(mouse.column, mouse.row, self.list_rect) {
            return None;
        }
        match mouse.kind {
            MouseEventKind::ScrollDown => Some(Intent::CursorDown),
            MouseEventKind::ScrollUp => Some(Intent::CursorUp),
            MouseEventKind::Down(MouseButton::Left) => {
                let index = self.row_at(mouse.row)?;
                if index >= len {
                    return None;
                }
                self.list_state.select(Some(index));
                Some(Intent::ActivateCursor)
            }
            _ => None,
        }
    }

    fn row_at(&self, y: u16) -> Option<usize> {
        let first_row = self.list_rect.y.saturating_add(1);
        let last_row = self
            .list_rect
            .y
            .saturating_add(self.list_rect.height.saturating_sub(1));
        if y < first_row || y >= last_row {
            return None;
        }
        Some(self.list_state.offset() + usize::from(y - first_row))
    }
}

fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    if rect.width == 0 || rect.height == 0 {
        return false;
    }
    x >= rect.x
        && x < rect.x.saturating_add(rect.width)
        && y >= rect.y
        && y < rect.y.saturating_add(rect.height)
}

#[cfg(windows)]
pub fn minimize_window() -> bool {
    use windows_sys::Win32::System::Console::GetConsoleWindow;
    use windows_sys::Win32::UI::WindowsAndMessaging::{SW_MINIMIZE, ShowWindow};

    unsafe {
        let hwnd = GetConsoleWindow();
        if hwnd.is_null() {
            return false;
        }
        ShowWindow(hwnd, SW_MINIMIZE);
    }
    true
}

#[cfg(not(windows))]
pub fn minimize_window() -> bool {
    false
}
