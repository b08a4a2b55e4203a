//! Guard state machine - Debounced FREE/BUSY transitions
//!
//! The machine is pure: it turns a detector verdict into an optional
//! [`Command`] and never sees whether the command was delivered.

use std::fmt;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize, Serializer};

/// Guard belief about the daemon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GuardState {
    /// No heavy workload, daemon allowed to run
    #[default]
    Free,
    /// Heavy workload present, daemon asked to pause
    Busy,
}

impl GuardState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Free => "Free",
            Self::Busy => "Busy",
        }
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, Self::Busy)
    }
}

impl fmt::Display for GuardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Why the daemon is being paused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PauseReason {
    Automatic,
    Manual,
    Other(String),
}

impl PauseReason {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Automatic => "AUTOMATIC",
            Self::Manual => "MANUAL",
            Self::Other(reason) => reason,
        }
    }

    /// Human-readable form for the status window
    pub fn describe(&self) -> &str {
        match self {
            Self::Automatic => "Paused for a heavy application",
            Self::Manual => "Paused manually",
            Self::Other(reason) => reason,
        }
    }
}

/// Reason as reported back by the daemon's `/status`
impl From<&str> for PauseReason {
    fn from(reason: &str) -> Self {
        match reason.trim().to_ascii_uppercase().as_str() {
            "AUTOMATIC" => Self::Automatic,
            "MANUAL" => Self::Manual,
            _ => Self::Other(reason.trim().to_string()),
        }
    }
}

impl fmt::Display for PauseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for PauseReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Outbound instruction for the daemon
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Pause { reason: PauseReason },
    Resume,
}

impl Command {
    pub fn pause(reason: PauseReason) -> Self {
        Self::Pause { reason }
    }
}

/// Flap suppression knobs. The default reproduces immediate transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebouncePolicy {
    /// Consecutive opposite verdicts needed before a transition (min 1)
    pub confirm_samples: u32,
    /// Minimum dwell time in BUSY before an automatic resume
    pub resume_cooldown: Duration,
}

impl Default for DebouncePolicy {
    fn default() -> Self {
        Self {
            confirm_samples: 1,
            resume_cooldown: Duration::ZERO,
        }
    }
}

/// A completed automatic transition
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionRecord {
    pub at: DateTime<Local>,
    pub from: GuardState,
    pub to: GuardState,
    /// Process that caused a pause
    pub trigger: Option<String>,
}

/// Owned guard state and its transition function
#[derive(Debug)]
pub struct Guard {
    state: GuardState,
    policy: DebouncePolicy,
    /// Opposite verdicts seen in a row
    pending: u32,
    entered_busy: Option<Instant>,
}

impl Guard {
    pub fn new(policy: DebouncePolicy) -> Self {
        Self {
            state: GuardState::Free,
            policy: DebouncePolicy {
                confirm_samples: policy.confirm_samples.max(1),
                ..policy
            },
            pending: 0,
            entered_busy: None,
        }
    }

    pub fn current_state(&self) -> GuardState {
        self.state
    }

    /// Fold one verdict into the state machine
    pub fn apply_verdict(&mut self, heavy: bool) -> (GuardState, Option<Command>) {
        self.apply_verdict_at(heavy, Instant::now())
    }

    /// Same as [`Guard::apply_verdict`] with an explicit clock
    pub fn apply_verdict_at(&mut self, heavy: bool, now: Instant) -> (GuardState, Option<Command>) {
        let wants = if heavy {
            GuardState::Busy
        } else {
            GuardState::Free
        };

        if wants == self.state {
            self.pending = 0;
            return (self.state, None);
        }

        self.pending += 1;
        if self.pending < self.policy.confirm_samples {
            return (self.state, None);
        }

        if wants == GuardState::Free {
            let dwelt = self
                .entered_busy
                .map(|since| now.saturating_duration_since(since))
                .unwrap_or(Duration::MAX);
            if dwelt < self.policy.resume_cooldown {
                return (self.state, None);
            }
        }

        self.pending = 0;
        self.state = wants;
        let command = match wants {
            GuardState::Busy => {
                self.entered_busy = Some(now);
                Command::pause(PauseReason::Automatic)
            }
            GuardState::Free => {
                self.entered_busy = None;
                Command::Resume
            }
        };
        (self.state, Some(command))
    }
}

impl Default for Guard {
    fn default() -> Self {
        Self::new(DebouncePolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reference fold of the transition table
    fn fold(verdicts: &[bool]) -> Vec<GuardState> {
        let mut state = GuardState::Free;
        verdicts
            .iter()
            .map(|&heavy| {
                state = if heavy {
                    GuardState::Busy
                } else {
                    GuardState::Free
                };
                state
            })
            .collect()
    }

    fn run(guard: &mut Guard, verdicts: &[bool]) -> (Vec<GuardState>, Vec<Command>) {
        let mut states = Vec::new();
        let mut commands = Vec::new();
        for &heavy in verdicts {
            let (state, command) = guard.apply_verdict(heavy);
            states.push(state);
            commands.extend(command);
        }
        (states, commands)
    }

    #[test]
    fn starts_free() {
        assert_eq!(Guard::default().current_state(), GuardState::Free);
    }

    #[test]
    fn pause_hold_resume_scenario() {
        let mut guard = Guard::default();

        assert_eq!(
            guard.apply_verdict(true),
            (
                GuardState::Busy,
                Some(Command::pause(PauseReason::Automatic))
            )
        );
        assert_eq!(guard.apply_verdict(true), (GuardState::Busy, None));
        assert_eq!(
            guard.apply_verdict(false),
            (GuardState::Free, Some(Command::Resume))
        );
    }

    #[test]
    fn repeated_free_verdicts_issue_nothing() {
        let mut guard = Guard::default();
        let (_, commands) = run(&mut guard, &[false, false, false]);
        assert!(commands.is_empty());
    }

    #[test]
    fn state_trace_equals_table_fold() {
        let sequences: &[&[bool]] = &[
            &[],
            &[true],
            &[false, true, true, false, false, true],
            &[true, false, true, false, true, false],
            &[true, true, true, true],
        ];
        for verdicts in sequences {
            let mut guard = Guard::default();
            let (states, commands) = run(&mut guard, verdicts);
            assert_eq!(states, fold(verdicts), "verdicts {:?}", verdicts);

            // One command per state change, alternating pause/resume
            let mut previous = GuardState::Free;
            let changes = states
                .iter()
                .filter(|&&s| {
                    let changed = s != previous;
                    previous = s;
                    changed
                })
                .count();
            assert_eq!(commands.len(), changes);
        }
    }

    #[test]
    fn flicker_pauses_and_resumes_every_time() {
        let mut guard = Guard::default();
        let (_, commands) = run(&mut guard, &[true, false, true, false]);
        assert_eq!(
            commands,
            vec![
                Command::pause(PauseReason::Automatic),
                Command::Resume,
                Command::pause(PauseReason::Automatic),
                Command::Resume,
            ]
        );
    }

    #[test]
    fn confirm_samples_require_consecutive_verdicts() {
        let mut guard = Guard::new(DebouncePolicy {
            confirm_samples: 2,
            ..Default::default()
        });

        assert_eq!(guard.apply_verdict(true), (GuardState::Free, None));
        // Streak broken
        assert_eq!(guard.apply_verdict(false), (GuardState::Free, None));
        assert_eq!(guard.apply_verdict(true), (GuardState::Free, None));
        assert_eq!(
            guard.apply_verdict(true),
            (
                GuardState::Busy,
                Some(Command::pause(PauseReason::Automatic))
            )
        );
    }

    #[test]
    fn zero_confirm_samples_behaves_like_one() {
        let mut guard = Guard::new(DebouncePolicy {
            confirm_samples: 0,
            ..Default::default()
        });
        assert_eq!(guard.apply_verdict(true).0, GuardState::Busy);
    }

    #[test]
    fn resume_cooldown_holds_busy() {
        let mut guard = Guard::new(DebouncePolicy {
            confirm_samples: 1,
            resume_cooldown: Duration::from_secs(30),
        });
        let start = Instant::now();

        guard.apply_verdict_at(true, start);
        assert_eq!(
            guard.apply_verdict_at(false, start + Duration::from_secs(10)),
            (GuardState::Busy, None)
        );
        assert_eq!(
            guard.apply_verdict_at(false, start + Duration::from_secs(31)),
            (GuardState::Free, Some(Command::Resume))
        );
    }

    #[test]
    fn pause_reason_wire_strings() {
        assert_eq!(PauseReason::Automatic.as_str(), "AUTOMATIC");
        assert_eq!(PauseReason::Manual.as_str(), "MANUAL");
        assert_eq!(PauseReason::Other("AGENT".into()).as_str(), "AGENT");
        assert_eq!(
            serde_json::to_string(&PauseReason::Manual).unwrap(),
            "\"MANUAL\""
        );
    }

    #[test]
    fn daemon_reported_reasons_parse() {
        assert_eq!(PauseReason::from("AUTOMATIC"), PauseReason::Automatic);
        assert_eq!(PauseReason::from(" manual "), PauseReason::Manual);
        let thermal = PauseReason::from("THERMAL");
        assert_eq!(thermal, PauseReason::Other("THERMAL".into()));
        assert_eq!(thermal.describe(), "THERMAL");
        assert_eq!(PauseReason::Manual.describe(), "Paused manually");
    }
}
