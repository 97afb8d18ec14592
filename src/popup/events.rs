use crossterm::event::Event as CrosstermEvent;

/// Events driving the popup loop
#[derive(Debug, Clone)]
pub enum PopupEvent {
    /// Terminal input (keyboard, resize)
    Input(CrosstermEvent),
    /// Periodic tick; picks up store changes published by the coordinator
    Tick,
}
