//! Voice command state machine
//!
//! ```text
//!   Standby ──wake phrase──▶ Active ──exit phrase──▶ Terminated
//!      ▲  │                   │  ▲
//!      └──┘ other text        └──┘ task / unrecognized / recognition failure
//! ```
//!
//! The interpreter performs no I/O. It maps each recognized utterance to an
//! `Action` the command loop carries out.

use super::{Command, PhraseTable, Task, WakePhrases};
use crate::config::VoiceConfig;

/// Interpreter state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpreterState {
    /// Waiting for the wake phrase
    Standby,
    /// Accepting task commands
    Active,
    /// Session over; terminal
    Terminated,
}

/// What the command loop should do in response to an input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Say nothing
    Ignore,
    /// Confirm activation
    Acknowledge,
    /// Run a task handler
    Dispatch(Task),
    /// Ask the user to rephrase a command
    Clarify,
    /// Ask the user to repeat after a recognition failure
    RequestRepeat,
    /// Say goodbye; the session has ended
    Farewell,
}

/// The command state machine
#[derive(Debug, Clone)]
pub struct Interpreter {
    state: InterpreterState,
    wake: WakePhrases,
    phrases: PhraseTable,
}

impl Interpreter {
    #[must_use]
    pub const fn new(wake: WakePhrases, phrases: PhraseTable) -> Self {
        Self {
            state: InterpreterState::Standby,
            wake,
            phrases,
        }
    }

    #[must_use]
    pub fn from_config(config: &VoiceConfig) -> Self {
        Self::new(
            WakePhrases::new(config.wake_phrases.clone()),
            PhraseTable::from_config(config),
        )
    }

    #[must_use]
    pub const fn state(&self) -> InterpreterState {
        self.state
    }

    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.state == InterpreterState::Terminated
    }

    #[must_use]
    pub const fn wake_phrases(&self) -> &WakePhrases {
        &self.wake
    }

    /// Handle one recognized utterance
    pub fn on_utterance(&mut self, text: &str) -> Action {
        if text.trim().is_empty() {
            return self.on_recognition_failure();
        }

        let action = match self.state {
            InterpreterState::Standby => self.standby(text),
            InterpreterState::Active => self.active(text),
            InterpreterState::Terminated => Action::Ignore,
        };

        tracing::debug!(state = ?self.state, ?action, text, "utterance handled");
        action
    }

    /// Handle a recognition failure; never changes state
    pub fn on_recognition_failure(&mut self) -> Action {
        match self.state {
            InterpreterState::Standby | InterpreterState::Active => Action::RequestRepeat,
            InterpreterState::Terminated => Action::Ignore,
        }
    }

    fn standby(&mut self, text: &str) -> Action {
        if !self.wake.matches(text) {
            tracing::trace!(text, "ignored in standby");
            return Action::Ignore;
        }

        // The rest of the wake utterance is not a command
        tracing::info!(text, "wake phrase detected");
        self.state = InterpreterState::Active;
        Action::Acknowledge
    }

    fn active(&mut self, text: &str) -> Action {
        match self.phrases.classify(text) {
            Command::Exit => self.terminate(),
            Command::Unrecognized => Action::Clarify,
            command => command.task().map_or(Action::Clarify, Action::Dispatch),
        }
    }

    fn terminate(&mut self) -> Action {
        tracing::info!("exit phrase detected");
        self.state = InterpreterState::Terminated;
        Action::Farewell
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::from_config(&VoiceConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active() -> Interpreter {
        let mut interpreter = Interpreter::default();
        assert_eq!(interpreter.on_utterance("hey assistant"), Action::Acknowledge);
        interpreter
    }

    #[test]
    fn test_starts_in_standby() {
        assert_eq!(Interpreter::default().state(), InterpreterState::Standby);
    }

    #[test]
    fn test_standby_ignores_other_text() {
        let mut interpreter = Interpreter::default();
        assert_eq!(interpreter.on_utterance("what's in my hand"), Action::Ignore);
        assert_eq!(interpreter.on_utterance("stop"), Action::Ignore);
        assert_eq!(interpreter.state(), InterpreterState::Standby);
    }

    #[test]
    fn test_wake_is_case_insensitive_substring() {
        for text in ["Hey Assistant, hello", "hey assistant", "well HEY ASSISTANT"] {
            let mut interpreter = Interpreter::default();
            assert_eq!(interpreter.on_utterance(text), Action::Acknowledge);
            assert_eq!(interpreter.state(), InterpreterState::Active);
        }
    }

    #[test]
    fn test_wake_with_trailing_command_only_acknowledges() {
        let mut interpreter = Interpreter::default();
        assert_eq!(
            interpreter.on_utterance("Hey assistant, what is in my hand"),
            Action::Acknowledge
        );
        assert_eq!(interpreter.state(), InterpreterState::Active);
    }

    #[test]
    fn test_exit_phrase_in_wake_utterance_does_not_terminate() {
        for text in ["hey assistant stop", "hey assistant, don't stop"] {
            let mut interpreter = Interpreter::default();
            assert_eq!(interpreter.on_utterance(text), Action::Acknowledge);
            assert_eq!(interpreter.state(), InterpreterState::Active);
        }
    }

    #[test]
    fn test_active_dispatches_and_stays_active() {
        let mut interpreter = active();
        assert_eq!(
            interpreter.on_utterance("describe my surroundings"),
            Action::Dispatch(Task::DescribeSurroundings)
        );
        assert_eq!(
            interpreter.on_utterance("show camera"),
            Action::Dispatch(Task::ShowLiveView)
        );
        assert_eq!(interpreter.state(), InterpreterState::Active);
    }

    #[test]
    fn test_unrecognized_is_idempotent() {
        let mut interpreter = active();
        for _ in 0..5 {
            assert_eq!(interpreter.on_utterance("make me a sandwich"), Action::Clarify);
            assert_eq!(interpreter.state(), InterpreterState::Active);
        }
    }

    #[test]
    fn test_exit_terminates() {
        let mut interpreter = active();
        assert_eq!(interpreter.on_utterance("please STOP"), Action::Farewell);
        assert!(interpreter.is_terminated());

        // Terminal: nothing moves it
        assert_eq!(interpreter.on_utterance("hey assistant"), Action::Ignore);
        assert_eq!(interpreter.on_recognition_failure(), Action::Ignore);
        assert!(interpreter.is_terminated());
    }

    #[test]
    fn test_recognition_failure_keeps_state() {
        let mut interpreter = Interpreter::default();
        assert_eq!(interpreter.on_recognition_failure(), Action::RequestRepeat);
        assert_eq!(interpreter.state(), InterpreterState::Standby);

        let mut interpreter = active();
        assert_eq!(interpreter.on_recognition_failure(), Action::RequestRepeat);
        assert_eq!(interpreter.on_utterance("   "), Action::RequestRepeat);
        assert_eq!(interpreter.state(), InterpreterState::Active);
    }
}
