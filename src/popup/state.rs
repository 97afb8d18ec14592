use std::time::{Duration, Instant};

/// What the popup is currently doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupMode {
    /// Navigation and single-key commands
    Normal,
    /// A move gesture is in progress on the selected row
    Moving,
    /// Typing a speed limit
    SpeedInput,
    /// Typing a custom pause duration
    DurationInput,
    /// Typing a URL to add to the queue
    AddUrl,
    ConfirmDelete,
    Help,
}

impl PopupMode {
    pub fn is_text_input(&self) -> bool {
        matches!(
            self,
            PopupMode::SpeedInput
                | PopupMode::DurationInput
                | PopupMode::AddUrl
        )
    }

    /// Dialog title and prompt for text input modes
    pub fn input_labels(&self) -> Option<(&'static str, &'static str)> {
        match self {
            PopupMode::SpeedInput => Some(("Speed limit", "Limit (e.g. 50, 2M, 400K; empty clears):")),
            PopupMode::DurationInput => Some(("Pause queue", "Pause for how many minutes?")),
            PopupMode::AddUrl => Some(("Add URL", "URL:")),
            _ => None,
        }
    }
}

/// Maximum input buffer length
pub const MAX_INPUT_LENGTH: usize = 2048;

/// Transient one-line message on the status bar
#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub text: String,
    pub is_error: bool,
    shown_at: Instant,
}

/// Popup UI state that does not come from the store
#[derive(Debug)]
pub struct PopupState {
    pub mode: PopupMode,
    /// Selected row index
    pub selected: usize,
    /// Row being moved while in [`PopupMode::Moving`]
    pub moving_id: Option<String>,
    pub input_buffer: String,
    /// Validation problem shown under the input field
    pub input_error: Option<String>,
    pub status_message: Option<StatusMessage>,
    pub profile_name: Option<String>,
    pub active_category: Option<String>,
    message_timeout: Duration,
    dirty: bool,
}

impl PopupState {
    pub fn new(message_timeout: Duration) -> Self {
        Self {
            mode: PopupMode::Normal,
            selected: 0,
            moving_id: None,
            input_buffer: String::new(),
            input_error: None,
            status_message: None,
            profile_name: None,
            active_category: None,
            message_timeout,
            dirty: true,
        }
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn needs_redraw(&self) -> bool {
        self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// Keep the selection inside a list of `len` rows
    pub fn clamp_selection(&mut self, len: usize) {
        self.selected = self.selected.min(len.saturating_sub(1));
    }

    pub fn select_next(&mut self, len: usize) {
        if len > 0 {
            self.selected = (self.selected + 1).min(len - 1);
        }
    }

    pub fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn enter_input(&mut self, mode: PopupMode) {
        self.mode = mode;
        self.input_buffer.clear();
        self.input_error = None;
    }

    pub fn push_char(&mut self, c: char) {
        if self.input_buffer.len() < MAX_INPUT_LENGTH {
            self.input_buffer.push(c);
        }
    }

    /// Take the typed text and return to normal mode
    pub fn take_input(&mut self) -> String {
        self.mode = PopupMode::Normal;
        self.input_error = None;
        std::mem::take(&mut self.input_buffer)
    }

    pub fn notify(&mut self, text: impl Into<String>) {
        self.set_message(text.into(), false);
    }

    pub fn notify_error(&mut self, text: impl Into<String>) {
        self.set_message(text.into(), true);
    }

    fn set_message(&mut self, text: String, is_error: bool) {
        self.status_message = Some(StatusMessage {
            text,
            is_error,
            shown_at: Instant::now(),
        });
        self.dirty = true;
    }

    /// Drop the status message once it has been shown long enough
    pub fn expire_message(&mut self) {
        let expired = self
            .status_message
            .as_ref()
            .is_some_and(|m| m.shown_at.elapsed() >= self.message_timeout);
        if expired {
            self.status_message = None;
            self.dirty = true;
        }
    }
}
