//! Transition state models

use serde::{Deserialize, Serialize};

use super::Mode;

/// Per-slot state machine phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Replay,
    TransitioningToLive,
    Live,
    TransitioningToReplay,
}

impl Phase {
    /// Settled phase for a committed mode
    pub fn settled(mode: Mode) -> Self {
        match mode {
            Mode::Replay => Phase::Replay,
            Mode::Live => Phase::Live,
        }
    }

    /// In-flight phase heading to `target`
    pub fn towards(target: Mode) -> Self {
        match target {
            Mode::Replay => Phase::TransitioningToReplay,
            Mode::Live => Phase::TransitioningToLive,
        }
    }

    pub fn is_transitioning(&self) -> bool {
        matches!(
            self,
            Phase::TransitioningToLive | Phase::TransitioningToReplay
        )
    }

    /// Mode a viewer should currently be rendering
    pub fn visible_mode(&self) -> Mode {
        match self {
            Phase::Replay | Phase::TransitioningToLive => Mode::Replay,
            Phase::Live | Phase::TransitioningToReplay => Mode::Live,
        }
    }
}

/// Why a transition was started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransitionReason {
    /// The scheduled switch time was reached
    Scheduled,
    /// The admin enabled Go Live for the active slot
    AdminOverride,
    /// The admin disabled Go Live for the active slot
    AdminDisabledOverride,
}

impl TransitionReason {
    /// Log detail recorded when the transition starts
    pub fn describe(&self) -> &'static str {
        match self {
            TransitionReason::Scheduled => "Scheduled transition to live session",
            TransitionReason::AdminOverride => "Admin triggered Go Live",
            TransitionReason::AdminDisabledOverride => "Admin disabled Go Live",
        }
    }

    pub fn target(&self) -> Mode {
        match self {
            TransitionReason::Scheduled | TransitionReason::AdminOverride => Mode::Live,
            TransitionReason::AdminDisabledOverride => Mode::Replay,
        }
    }

    pub fn is_admin(&self) -> bool {
        !matches!(self, TransitionReason::Scheduled)
    }
}

/// Ephemeral viewer-facing transition notice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionState {
    pub is_transitioning: bool,
    pub transition_message: String,
    pub target_mode: Mode,
}

impl TransitionState {
    pub fn idle() -> Self {
        Self {
            is_transitioning: false,
            transition_message: String::new(),
            target_mode: Mode::Replay,
        }
    }

    pub fn switching_to(target: Mode) -> Self {
        Self {
            is_transitioning: true,
            transition_message: format!("Switching to {} mode...", target),
            target_mode: target,
        }
    }
}

impl Default for TransitionState {
    fn default() -> Self {
        Self::idle()
    }
}
