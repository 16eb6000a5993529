//! Settling Gate
//!
//! Per-session state machine deciding whether a sample may enter aggregation
//! and online detection. The sensor needs a fixed settling time after `start`
//! before beat flags and amplitudes are meaningful.
//!
//! ```text
//! Idle --Start--> Settling --Settled--> Ready
//!   ^________________|___________________|   (Stop)
//! ```

use crate::model::session::{SessionPhase, SessionState};
use log::{debug, info};
use rust_fsm::{StateMachine, StateMachineImpl};

/// Inputs driving the gate.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GateInput {
    Start,
    Settled,
    Stop,
}

/// One-shot notifications produced by a transition.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GateOutput {
    BecameReady,
}

/// Transition table of the gate.
#[derive(Debug)]
pub struct SettlingMachine;

impl StateMachineImpl for SettlingMachine {
    type Input = GateInput;
    type State = SessionPhase;
    type Output = GateOutput;
    const INITIAL_STATE: Self::State = SessionPhase::Idle;

    fn transition(state: &Self::State, input: &Self::Input) -> Option<Self::State> {
        match (state, input) {
            (SessionPhase::Idle, GateInput::Start) => Some(SessionPhase::Settling),
            (SessionPhase::Settling, GateInput::Settled) => Some(SessionPhase::Ready),
            (_, GateInput::Stop) => Some(SessionPhase::Idle),
            _ => None,
        }
    }

    fn output(state: &Self::State, input: &Self::Input) -> Option<Self::Output> {
        match (state, input) {
            (SessionPhase::Settling, GateInput::Settled) => Some(GateOutput::BecameReady),
            _ => None,
        }
    }
}

/// The settling gate: phase machine plus the settling timer.
pub struct SettlingGate {
    machine: StateMachine<SettlingMachine>,
    settling_duration: f64,
    session_start_time: Option<f64>,
    settling_start_time: Option<f64>,
}

impl SettlingGate {
    pub fn new(settling_duration: f64) -> Self {
        Self {
            machine: StateMachine::new(),
            settling_duration,
            session_start_time: None,
            settling_start_time: None,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        *self.machine.state()
    }

    /// Starts settling at session time `now`. Ignored unless the gate is idle.
    pub fn start(&mut self, now: f64) -> bool {
        if self.machine.consume(&GateInput::Start).is_err() {
            debug!("gate start ignored in phase {:?}", self.phase());
            return false;
        }
        self.session_start_time = Some(now);
        self.settling_start_time = Some(now);
        info!(
            "Settling period started ({:.1}s)",
            self.settling_duration
        );
        true
    }

    /// Advances the settling timer. Returns `true` exactly once per session,
    /// on the call that moves the gate to `Ready`.
    pub fn on_sample(&mut self, now: f64) -> bool {
        let Some(settling_start) = self.settling_start_time else {
            return false;
        };
        if self.phase() != SessionPhase::Settling || now - settling_start < self.settling_duration
        {
            return false;
        }
        match self.machine.consume(&GateInput::Settled) {
            Ok(Some(GateOutput::BecameReady)) => {
                info!("Settling done at {:.2}s, beat detection active", now);
                true
            }
            _ => false,
        }
    }

    /// Returns `true` while samples may be aggregated and used for detection.
    pub fn is_eligible(&self) -> bool {
        self.phase() == SessionPhase::Ready
    }

    /// Returns the gate to `Idle`, keeping the session timestamps.
    pub fn stop(&mut self) {
        let _ = self.machine.consume(&GateInput::Stop);
    }

    /// Returns the gate to `Idle` and clears both timestamps.
    pub fn reset(&mut self) {
        self.stop();
        self.session_start_time = None;
        self.settling_start_time = None;
    }

    pub fn state(&self) -> SessionState {
        SessionState {
            phase: self.phase(),
            session_start_time: self.session_start_time,
            settling_start_time: self.settling_start_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_idle_and_not_eligible() {
        let gate = SettlingGate::new(4.0);
        assert_eq!(gate.phase(), SessionPhase::Idle);
        assert!(!gate.is_eligible());
    }

    #[test]
    fn test_settles_exactly_once() {
        let mut gate = SettlingGate::new(4.0);
        assert!(gate.start(10.0));
        assert_eq!(gate.phase(), SessionPhase::Settling);
        assert!(!gate.on_sample(13.99));
        assert!(!gate.is_eligible());
        assert!(gate.on_sample(14.0));
        assert!(gate.is_eligible());
        for t in [14.02, 20.0, 100.0] {
            assert!(!gate.on_sample(t));
            assert_eq!(gate.phase(), SessionPhase::Ready);
        }
    }

    #[test]
    fn test_samples_before_start_do_nothing() {
        let mut gate = SettlingGate::new(4.0);
        assert!(!gate.on_sample(100.0));
        assert_eq!(gate.phase(), SessionPhase::Idle);
    }

    #[test]
    fn test_start_ignored_when_not_idle() {
        let mut gate = SettlingGate::new(4.0);
        assert!(gate.start(0.0));
        assert!(!gate.start(2.0));
        assert_eq!(gate.state().settling_start_time, Some(0.0));
    }

    #[test]
    fn test_stop_and_reset_return_to_idle() {
        let mut gate = SettlingGate::new(1.0);
        gate.start(0.0);
        gate.on_sample(1.0);
        gate.stop();
        assert_eq!(gate.phase(), SessionPhase::Idle);
        assert_eq!(gate.state().session_start_time, Some(0.0));

        gate.start(5.0);
        gate.reset();
        assert_eq!(gate.state(), SessionState::default());
        // a fresh session settles again
        assert!(gate.start(7.0));
        assert!(gate.on_sample(8.0));
    }
}
