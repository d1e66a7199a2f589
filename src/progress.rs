use crate::model::ProgressSnapshot;
use std::time::Duration;

const ZERO_LABEL: &str = "00:00";

/// `MM:SS` from whole seconds. Minutes are not capped at 59.
pub fn format_time(milliseconds: u64) -> String {
    let total_seconds = milliseconds / 1_000;
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;
    format!("{minutes:02}:{seconds:02}")
}

/// Bounded progress value and the two timestamp labels shown next to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressReporter {
    value_ms: u64,
    maximum_ms: u64,
    duration_ms: u64,
    current_label: String,
    total_label: String,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            value_ms: 0,
            maximum_ms: 1,
            duration_ms: 0,
            current_label: String::from(ZERO_LABEL),
            total_label: String::from(ZERO_LABEL),
        }
    }

    /// Called whenever a track is loaded. An unknown or zero duration keeps
    /// the range at `[0, 1]`.
    pub fn reset(&mut self, duration: Option<Duration>) {
        let duration_ms = duration.map(duration_millis).unwrap_or(0);
        self.value_ms = 0;
        self.maximum_ms = duration_ms.max(1);
        self.duration_ms = duration_ms;
        self.current_label = String::from(ZERO_LABEL);
        self.total_label = if duration_ms > 0 {
            format_time(duration_ms)
        } else {
            String::from(ZERO_LABEL)
        };
    }

    /// Returns true when the displayed values changed.
    pub fn sample(
        &mut self,
        playing: bool,
        position: Option<Duration>,
        duration: Option<Duration>,
    ) -> bool {
        if !playing {
            return false;
        }
        let duration_ms = duration.map(duration_millis).unwrap_or(0);
        if duration_ms == 0 {
            return false;
        }

        let position_ms = position.map(duration_millis).unwrap_or(0).min(duration_ms);
        let changed = position_ms != self.value_ms || duration_ms != self.maximum_ms;
        self.maximum_ms = duration_ms;
        self.duration_ms = duration_ms;
        self.value_ms = position_ms;
        self.current_label = format_time(position_ms);
        self.total_label = format_time(duration_ms);
        changed
    }

    pub fn value_ms(&self) -> u64 {
        self.value_ms
    }

    pub fn maximum_ms(&self) -> u64 {
        self.maximum_ms
    }

    pub fn current_label(&self) -> &str {
        &self.current_label
    }

    pub fn total_label(&self) -> &str {
        &self.total_label
    }

    /// Engine-side values; an unknown duration reads as 0 here even though
    /// the display range keeps its floor of 1.
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            position_ms: self.value_ms,
            duration_ms: self.duration_ms,
        }
    }

    pub fn ratio(&self) -> f64 {
        (self.value_ms as f64 / self.maximum_ms.max(1) as f64).clamp(0.0, 1.0)
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
