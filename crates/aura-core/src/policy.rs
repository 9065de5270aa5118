// Copyright (c) 2026 Aura PoCA Contributors
// SPDX-License-Identifier: Apache-2.0

//! Policy engine: the machine-account scope guard plus a configured rule
//! set. Rules are data, not code: each is a declarative predicate paired
//! with a stable rule id, so a deployment's policy is reproducible from its
//! configuration alone. Every violated rule contributes exactly one penalty
//! unit; the recorded sequence preserves rule-declaration order.

use crate::canonical::{canonical_json, sha256};
use crate::constitution::{AgentKind, AgentRecord, Event};
use crate::error::AuraResult;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RulePredicate {
    /// Content payload must not exceed `limit` bytes.
    MaxContentBytes { limit: usize },
    /// Every embedding component must be finite with |c| <= limit.
    EmbeddingWithinBounds { limit: f64 },
    /// Events timestamped before the deployment epoch are suspect.
    TimestampNotBefore { min_unix: u64 },
    /// Content must not contain the given substring.
    ContentForbidsSubstring { needle: String },
}

impl RulePredicate {
    /// Returns the violation type when the event violates this predicate.
    /// An absent field never violates a predicate over that field;
    /// absence is structural integrity's concern, not policy's.
    fn violation(&self, event: &Event) -> Option<&'static str> {
        match self {
            RulePredicate::MaxContentBytes { limit } => match &event.content {
                Some(content) if content.len() > *limit => Some("content_too_large"),
                _ => None,
            },
            RulePredicate::EmbeddingWithinBounds { limit } => match &event.embedding {
                Some(embedding)
                    if embedding.iter().any(|c| !c.is_finite() || c.abs() > *limit) =>
                {
                    Some("embedding_out_of_bounds")
                }
                _ => None,
            },
            RulePredicate::TimestampNotBefore { min_unix } => match event.timestamp {
                Some(ts) if ts < *min_unix => Some("timestamp_before_epoch"),
                _ => None,
            },
            RulePredicate::ContentForbidsSubstring { needle } => match &event.content {
                Some(content) if content.contains(needle.as_str()) => {
                    Some("forbidden_content")
                }
                _ => None,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRule {
    pub rule_id: String,
    pub predicate: RulePredicate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyViolation {
    pub agent_id: String,
    pub event_hash: String,
    pub policy_rule: String,
    pub violation_type: String,
    pub detected_at: u64,
}

/// Outcome of the policy gate. A rejection is a distinct path: the event is
/// never scored and never admitted as an evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum PolicyDecision {
    Admitted { violations: Vec<PolicyViolation> },
    Rejected { agent_kind: AgentKind },
}

#[derive(Debug, Clone, Default)]
pub struct PolicyEngine {
    rules: Vec<PolicyRule>,
}

impl PolicyEngine {
    pub fn new(rules: Vec<PolicyRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[PolicyRule] {
        &self.rules
    }

    /// Applies the scope guard, then every configured rule in declaration
    /// order. `detected_at` mirrors the event's own recorded timestamp so
    /// violation records are reproducible.
    pub fn check(&self, event: &Event, agent: &AgentRecord) -> AuraResult<PolicyDecision> {
        if agent.kind != AgentKind::MachineAccount {
            tracing::warn!(
                target: "aura.policy",
                agent_id = %agent.agent_id,
                kind = agent.kind.as_str(),
                "scope guard rejected non-machine-account agent"
            );
            return Ok(PolicyDecision::Rejected {
                agent_kind: agent.kind,
            });
        }

        let event_hash = hex::encode(sha256(&canonical_json(event)?));
        let detected_at = event.timestamp.unwrap_or(0);
        let mut violations = Vec::new();
        for rule in &self.rules {
            if let Some(violation_type) = rule.predicate.violation(event) {
                violations.push(PolicyViolation {
                    agent_id: event.agent_id.clone(),
                    event_hash: event_hash.clone(),
                    policy_rule: rule.rule_id.clone(),
                    violation_type: violation_type.to_string(),
                    detected_at,
                });
            }
        }
        Ok(PolicyDecision::Admitted { violations })
    }
}
