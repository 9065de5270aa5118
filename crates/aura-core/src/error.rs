// Copyright (c) 2026 Aura PoCA Contributors
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

pub type AuraResult<T> = Result<T, AuraError>;

#[derive(Debug, Error)]
pub enum AuraError {
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("degenerate embedding: zero norm or non-finite component")]
    DegenerateVector,

    #[error("agent {agent_id} has kind {kind}; only machine accounts are scored")]
    PolicyHardReject { agent_id: String, kind: String },

    #[error("no constitution registered for agent {agent_id}")]
    ConstitutionNotFound { agent_id: String },

    #[error("audit chain writer contended; retry the append")]
    ConcurrencyConflict,

    #[error("kill-switch transition did not commit; state unchanged")]
    KillSwitchTransitionFailed,

    #[error("invalid kill-switch transition: {from} -> {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },

    #[error("leaf index {index} out of range for tree of size {tree_size}")]
    IndexOutOfRange { index: u64, tree_size: u64 },

    #[error("signature verification failed")]
    SignatureVerification,

    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("audit log I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
