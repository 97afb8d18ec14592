//! Queue pause/resume state and the toggle control derived from it.

use crate::util::format::format_minutes;
use thiserror::Error;

/// How long a pause lasts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseDuration {
    Indefinite,
    Minutes(u32),
}

impl PauseDuration {
    /// Duration as sent in `pause_queue`; `None` for indefinite
    pub fn minutes(self) -> Option<u32> {
        match self {
            Self::Indefinite => None,
            Self::Minutes(m) => Some(m),
        }
    }

    /// Read the service's `pause_int` (minutes left; `"0"` or empty when indefinite)
    pub fn from_pause_int(pause_int: &str) -> Self {
        match pause_int.trim().parse::<f64>() {
            Ok(m) if m >= 1.0 => Self::Minutes(m.round() as u32),
            _ => Self::Indefinite,
        }
    }
}

/// Logical queue state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    Running,
    Paused(PauseDuration),
}

impl QueueState {
    pub fn from_snapshot(paused: bool, pause_int: &str) -> Self {
        if paused {
            Self::Paused(PauseDuration::from_pause_int(pause_int))
        } else {
            Self::Running
        }
    }

    pub fn is_paused(self) -> bool {
        matches!(self, Self::Paused(_))
    }

    /// `Running --pause(d)--> Paused(d)`; pausing while paused keeps the state
    pub fn pause(self, duration: PauseDuration) -> Self {
        match self {
            Self::Running => Self::Paused(duration),
            paused => paused,
        }
    }

    /// `Paused(*) --resume()--> Running`; any remaining duration is dropped
    pub fn resume(self) -> Self {
        Self::Running
    }
}

/// One entry of the duration selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationChoice {
    Indefinite,
    Minutes(u32),
    /// Ask the user for a number of minutes
    Custom,
}

impl DurationChoice {
    pub fn label(self) -> String {
        match self {
            Self::Indefinite => "Indefinitely".to_string(),
            Self::Minutes(m) => format_minutes(m),
            Self::Custom => "Custom...".to_string(),
        }
    }
}

pub const DURATION_CHOICES: [DurationChoice; 8] = [
    DurationChoice::Indefinite,
    DurationChoice::Minutes(5),
    DurationChoice::Minutes(15),
    DurationChoice::Minutes(30),
    DurationChoice::Minutes(60),
    DurationChoice::Minutes(180),
    DurationChoice::Minutes(360),
    DurationChoice::Custom,
];

/// The toggle control. Built whole from a [`QueueState`]; never patched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PauseControl {
    pub state: QueueState,
    /// Selected index into [`DURATION_CHOICES`]; present only while running
    pub selector: Option<usize>,
}

impl PauseControl {
    pub fn for_state(state: QueueState) -> Self {
        Self {
            state,
            selector: (!state.is_paused()).then_some(0),
        }
    }

    pub fn label(&self) -> &'static str {
        if self.state.is_paused() {
            "Resume"
        } else {
            "Pause"
        }
    }

    pub fn selected_choice(&self) -> Option<DurationChoice> {
        self.selector.map(|i| DURATION_CHOICES[i % DURATION_CHOICES.len()])
    }

    pub fn select_next(&mut self) {
        if let Some(i) = self.selector.as_mut() {
            *i = (*i + 1) % DURATION_CHOICES.len();
        }
    }

    pub fn select_previous(&mut self) {
        if let Some(i) = self.selector.as_mut() {
            *i = (*i + DURATION_CHOICES.len() - 1) % DURATION_CHOICES.len();
        }
    }

    /// What activating the control asks for
    pub fn activate(&self) -> ToggleIntent {
        match self.state {
            QueueState::Paused(_) => ToggleIntent::Resume,
            QueueState::Running => match self.selected_choice() {
                Some(DurationChoice::Minutes(m)) => {
                    ToggleIntent::Pause(PauseDuration::Minutes(m))
                }
                Some(DurationChoice::Custom) => ToggleIntent::PromptForDuration,
                Some(DurationChoice::Indefinite) | None => {
                    ToggleIntent::Pause(PauseDuration::Indefinite)
                }
            },
        }
    }
}

/// Result of activating the toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleIntent {
    Pause(PauseDuration),
    Resume,
    /// Custom duration selected; collect input then call [`parse_prompted_duration`]
    PromptForDuration,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PauseInputError {
    /// The first input was not a number and needs a second prompt
    #[error("'{0}' is not a number of minutes")]
    NotNumeric(String),

    /// The re-entered value was not a positive number
    #[error("Pause cancelled: '{0}' is not a positive number of minutes")]
    Aborted(String),
}

/// Parse a first-round duration: blank or `0` is indefinite, a positive number
/// is minutes, anything else asks for a re-prompt
pub fn parse_duration(raw: &str) -> Result<PauseDuration, PauseInputError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(PauseDuration::Indefinite);
    }
    match trimmed.parse::<u32>() {
        Ok(0) => Ok(PauseDuration::Indefinite),
        Ok(m) => Ok(PauseDuration::Minutes(m)),
        Err(_) => Err(PauseInputError::NotNumeric(trimmed.to_string())),
    }
}

/// Parse a duration typed into a prompt. Only a positive number of minutes
/// is accepted; anything else aborts the pause.
pub fn parse_prompted_duration(raw: &str) -> Result<PauseDuration, PauseInputError> {
    match raw.trim().parse::<u32>() {
        Ok(m) if m > 0 => Ok(PauseDuration::Minutes(m)),
        _ => Err(PauseInputError::Aborted(raw.trim().to_string())),
    }
}

/// Parse a duration, asking `reprompt` once when the input is not numeric.
/// A cancelled or non-positive re-entry aborts.
pub fn parse_pause_input<F>(raw: &str, reprompt: F) -> Result<PauseDuration, PauseInputError>
where
    F: FnOnce() -> Option<String>,
{
    match parse_duration(raw) {
        Err(PauseInputError::NotNumeric(_)) => match reprompt() {
            Some(again) => parse_prompted_duration(&again),
            None => Err(PauseInputError::Aborted(String::new())),
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_running_control_has_selector() {
        let control = PauseControl::for_state(QueueState::Running);
        assert_eq!(control.label(), "Pause");
        assert_eq!(control.selected_choice(), Some(DurationChoice::Indefinite));
        assert_eq!(control.activate(), ToggleIntent::Pause(PauseDuration::Indefinite));
    }

    #[test]
    fn test_paused_control_has_no_selector() {
        let mut control =
            PauseControl::for_state(QueueState::Paused(PauseDuration::Minutes(10)));
        assert_eq!(control.label(), "Resume");
        assert_eq!(control.selector, None);
        control.select_next();
        assert_eq!(control.selector, None);
        assert_eq!(control.activate(), ToggleIntent::Resume);
    }

    #[test]
    fn test_selector_cycles_through_choices() {
        let mut control = PauseControl::for_state(QueueState::Running);
        control.select_next();
        control.select_next();
        assert_eq!(control.activate(), ToggleIntent::Pause(PauseDuration::Minutes(15)));

        control.select_previous();
        control.select_previous();
        control.select_previous();
        assert_eq!(control.selected_choice(), Some(DurationChoice::Custom));
        assert_eq!(control.activate(), ToggleIntent::PromptForDuration);
    }

    #[test]
    fn test_transitions() {
        let paused = QueueState::Running.pause(PauseDuration::Minutes(15));
        assert_eq!(paused, QueueState::Paused(PauseDuration::Minutes(15)));
        assert_eq!(paused.pause(PauseDuration::Indefinite), paused);
        assert_eq!(paused.resume(), QueueState::Running);
    }

    #[test]
    fn test_state_from_snapshot() {
        assert_eq!(QueueState::from_snapshot(false, "12"), QueueState::Running);
        assert_eq!(
            QueueState::from_snapshot(true, "0"),
            QueueState::Paused(PauseDuration::Indefinite)
        );
        assert_eq!(
            QueueState::from_snapshot(true, "14.6"),
            QueueState::Paused(PauseDuration::Minutes(15))
        );
    }

    #[test]
    fn test_parse_pause_input() {
        let never = || -> Option<String> { panic!("should not prompt") };
        assert_eq!(parse_pause_input("15", never), Ok(PauseDuration::Minutes(15)));
        assert_eq!(parse_pause_input("", never), Ok(PauseDuration::Indefinite));
        assert_eq!(parse_pause_input("0", never), Ok(PauseDuration::Indefinite));

        assert_eq!(
            parse_pause_input("soon", || Some("20".into())),
            Ok(PauseDuration::Minutes(20))
        );
        assert!(matches!(
            parse_pause_input("soon", || Some("0".into())),
            Err(PauseInputError::Aborted(_))
        ));
        assert!(matches!(
            parse_pause_input("soon", || Some("later".into())),
            Err(PauseInputError::Aborted(_))
        ));
        assert!(matches!(
            parse_pause_input("soon", || None),
            Err(PauseInputError::Aborted(_))
        ));
    }

    #[test]
    fn test_prompted_duration_requires_positive_minutes() {
        assert_eq!(parse_prompted_duration(" 45 "), Ok(PauseDuration::Minutes(45)));
        for raw in ["", "0", "-5", "later"] {
            assert!(
                matches!(parse_prompted_duration(raw), Err(PauseInputError::Aborted(_))),
                "{raw:?} should abort"
            );
        }
    }

    #[test]
    fn test_choice_labels() {
        let labels: Vec<String> = DURATION_CHOICES.iter().map(|c| c.label()).collect();
        assert_eq!(
            labels,
            vec!["Indefinitely", "5m", "15m", "30m", "1h", "3h", "6h", "Custom..."]
        );
    }
}
