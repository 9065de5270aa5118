// Copyright (c) 2026 Aura PoCA Contributors
// SPDX-License-Identifier: Apache-2.0

//! Kill-switch gate: one process-wide OPEN/HALTED state with activation
//! metadata. The state itself is plain data; the atomic
//! transition-plus-chain-append commit lives in the evaluator, which owns
//! the chain writer lock. A transition record is appended before the
//! in-memory flip, so the halt/resume history is as non-repudiable as the
//! evaluations it gates.

use crate::error::{AuraError, AuraResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SwitchState {
    Open,
    Halted,
}

impl SwitchState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SwitchState::Open => "OPEN",
            SwitchState::Halted => "HALTED",
        }
    }

    /// Only OPEN -> HALTED and HALTED -> OPEN are legal; anything else is
    /// an error and must not produce a chain entry.
    pub fn transition(self, to: SwitchState) -> AuraResult<SwitchState> {
        let valid = matches!(
            (self, to),
            (SwitchState::Open, SwitchState::Halted) | (SwitchState::Halted, SwitchState::Open)
        );
        if valid {
            Ok(to)
        } else {
            Err(AuraError::InvalidTransition {
                from: self.as_str(),
                to: to.as_str(),
            })
        }
    }
}

/// Audit record for one committed transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KillSwitchTransition {
    pub from: SwitchState,
    pub to: SwitchState,
    pub actor: String,
    pub reason: String,
    pub at: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KillSwitchState {
    state: SwitchState,
    activated_at: Option<u64>,
    activated_by: Option<String>,
    reason: Option<String>,
}

impl Default for KillSwitchState {
    fn default() -> Self {
        Self::new()
    }
}

impl KillSwitchState {
    pub fn new() -> Self {
        Self {
            state: SwitchState::Open,
            activated_at: None,
            activated_by: None,
            reason: None,
        }
    }

    pub fn state(&self) -> SwitchState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SwitchState::Halted
    }

    pub fn activated_at(&self) -> Option<u64> {
        self.activated_at
    }

    pub fn activated_by(&self) -> Option<&str> {
        self.activated_by.as_deref()
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// Applies an already-appended transition. Callers must have validated
    /// the transition and committed its chain record first.
    pub fn commit(&mut self, transition: &KillSwitchTransition) {
        self.state = transition.to;
        match transition.to {
            SwitchState::Halted => {
                self.activated_at = Some(transition.at);
                self.activated_by = Some(transition.actor.clone());
                self.reason = Some(transition.reason.clone());
            }
            SwitchState::Open => {
                self.activated_at = None;
                self.activated_by = None;
                self.reason = None;
            }
        }
    }
}
