// Copyright (c) 2026 Aura PoCA Contributors
// SPDX-License-Identifier: Apache-2.0

//! Agent Reliability Index scoring.
//!
//! `evaluate` is pure and total: no clock, RNG, or environment input
//! reaches any component of the score, and identical byte-level inputs
//! reproduce bit-identical results.

use crate::config::EvaluatorConfig;
use crate::constitution::{AgentConstitution, Event};
use crate::error::{AuraError, AuraResult};
use serde::{Deserialize, Serialize};

pub const STRUCTURAL_WEIGHT: f64 = 0.3;
pub const SEMANTIC_WEIGHT: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Compliant,
    Drift,
    Fail,
    Halted,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Compliant => "COMPLIANT",
            Status::Drift => "DRIFT",
            Status::Fail => "FAIL",
            Status::Halted => "HALTED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub structural_integrity: f64,
    pub semantic_alignment: f64,
    pub penalties: u32,
    pub ari: f64,
    pub drift: f64,
    pub status: Status,
}

/// Cosine similarity with a fixed evaluation order: dot product and both
/// squared norms accumulate sequentially in index order, one pass, no
/// pairwise reduction. This is what makes repeated evaluations bit-identical
/// across platforms with standard IEEE-754 semantics.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> AuraResult<f64> {
    if a.len() != b.len() {
        return Err(AuraError::DimensionMismatch {
            expected: b.len(),
            actual: a.len(),
        });
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for i in 0..a.len() {
        let (x, y) = (a[i], b[i]);
        if !x.is_finite() || !y.is_finite() {
            return Err(AuraError::DegenerateVector);
        }
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return Err(AuraError::DegenerateVector);
    }
    Ok(dot / (norm_a.sqrt() * norm_b.sqrt()))
}

/// Scores one event against its constitution.
///
/// Structural failure (missing field or wrong embedding width) is a scored
/// outcome: SI = 0.0, SA = 0.0, status FAIL. A present embedding whose
/// width disagrees with the constitution's, or a zero-norm vector, is a
/// hard error instead: no meaningful score exists and nothing may reach
/// the audit chain.
///
/// `halted` is the kill-switch state at evaluation time. A halted
/// evaluation still scores (the audit trail records what would have
/// happened) but is forced to ari 0.0 with status HALTED. FAIL takes
/// precedence over HALTED.
pub fn evaluate(
    event: &Event,
    constitution: &AgentConstitution,
    penalties: u32,
    halted: bool,
    config: &EvaluatorConfig,
) -> AuraResult<EvaluationResult> {
    let structural_ok = event.has_required_fields(config.embedding_dim);
    let structural_integrity = if structural_ok { 1.0 } else { 0.0 };

    let semantic_alignment = match (&event.embedding, structural_ok) {
        (Some(embedding), true) => {
            (cosine_similarity(embedding, &constitution.embedding)? + 1.0) / 2.0
        }
        _ => 0.0,
    };

    let drift = 1.0 - semantic_alignment;
    let mut ari = (STRUCTURAL_WEIGHT * structural_integrity
        + SEMANTIC_WEIGHT * semantic_alignment
        - f64::from(penalties))
    .clamp(0.0, 1.0);

    let status = if structural_integrity == 0.0 {
        Status::Fail
    } else if halted {
        ari = 0.0;
        Status::Halted
    } else if ari < config.alignment_threshold {
        Status::Drift
    } else {
        Status::Compliant
    };

    Ok(EvaluationResult {
        structural_integrity,
        semantic_alignment,
        penalties,
        ari,
        drift,
        status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn config(dim: usize) -> EvaluatorConfig {
        EvaluatorConfig {
            embedding_dim: dim,
            ..EvaluatorConfig::default()
        }
    }

    fn constitution(embedding: Vec<f64>) -> AgentConstitution {
        AgentConstitution {
            agent_id: "agent-a".into(),
            version: 1,
            embedding,
            constitution_hash: "00".into(),
            created_at: 0,
            updated_at: 0,
        }
    }

    fn event(embedding: Option<Vec<f64>>) -> Event {
        Event {
            agent_id: "agent-a".into(),
            timestamp: Some(1_700_000_000),
            embedding,
            content: Some("observed action".into()),
        }
    }

    #[test]
    fn formula_exactness_si_one_sa_point_eight() {
        // cosine([1,0], [3,4]) = 3/5 = 0.6 exactly, so SA = 0.8
        let result = evaluate(
            &event(Some(vec![1.0, 0.0])),
            &constitution(vec![3.0, 4.0]),
            0,
            false,
            &config(2),
        )
        .expect("score");
        assert_eq!(result.structural_integrity, 1.0);
        assert!((result.semantic_alignment - 0.8).abs() < 1e-12);
        assert!((result.ari - 0.86).abs() < 1e-12);
        // the reported ari is exactly the weighted sum, no reordering
        assert_eq!(
            result.ari,
            STRUCTURAL_WEIGHT * result.structural_integrity
                + SEMANTIC_WEIGHT * result.semantic_alignment
        );
    }

    #[test]
    fn repeated_evaluation_is_bit_identical() {
        let e = event(Some(vec![0.12, -0.7, 0.33]));
        let c = constitution(vec![0.5, 0.1, -0.2]);
        let cfg = config(3);
        let r1 = evaluate(&e, &c, 1, false, &cfg).expect("first");
        let r2 = evaluate(&e, &c, 1, false, &cfg).expect("second");
        assert_eq!(r1, r2);
        assert_eq!(r1.ari.to_bits(), r2.ari.to_bits());
        assert_eq!(r1.semantic_alignment.to_bits(), r2.semantic_alignment.to_bits());
        assert_eq!(r1.drift.to_bits(), r2.drift.to_bits());
    }

    #[test]
    fn perfect_alignment_scores_one_and_zero_drift() {
        let result = evaluate(
            &event(Some(vec![0.5, 0.3, 0.8, 0.1])),
            &constitution(vec![0.5, 0.3, 0.8, 0.1]),
            0,
            false,
            &config(4),
        )
        .expect("score");
        assert!((result.ari - 1.0).abs() < 1e-9);
        assert!(result.drift.abs() < 1e-9);
        assert_eq!(result.status, Status::Compliant);
    }

    #[test]
    fn scenario_cosine_point_nine_is_compliant() {
        // cosine([1,0], [9, sqrt(19)]) = 9/10 = 0.9, SA = 0.95, ari = 0.965
        let result = evaluate(
            &event(Some(vec![1.0, 0.0])),
            &constitution(vec![9.0, 19.0f64.sqrt()]),
            0,
            false,
            &config(2),
        )
        .expect("score");
        assert!((result.semantic_alignment - 0.95).abs() < 1e-9);
        assert!((result.ari - 0.965).abs() < 1e-9);
        assert_eq!(result.status, Status::Compliant);
    }

    #[test]
    fn missing_embedding_fails_structurally_with_full_result() {
        let result = evaluate(
            &event(None),
            &constitution(vec![1.0, 0.0]),
            0,
            false,
            &config(2),
        )
        .expect("score");
        assert_eq!(result.structural_integrity, 0.0);
        assert_eq!(result.semantic_alignment, 0.0);
        assert_eq!(result.status, Status::Fail);
        assert_eq!(result.drift, 1.0);
        assert_eq!(result.ari, 0.0);
    }

    #[test]
    fn structural_failure_dominates_perfect_alignment() {
        let e = Event {
            content: None,
            ..event(Some(vec![1.0, 0.0]))
        };
        let result = evaluate(&e, &constitution(vec![1.0, 0.0]), 0, false, &config(2))
            .expect("score");
        assert_eq!(result.status, Status::Fail);
        // FAIL also beats HALTED
        let halted = evaluate(&e, &constitution(vec![1.0, 0.0]), 0, true, &config(2))
            .expect("score halted");
        assert_eq!(halted.status, Status::Fail);
    }

    #[test]
    fn wrong_event_width_is_scored_not_raised() {
        // three components against a two-wide deployment: SI = 0, no error
        let result = evaluate(
            &event(Some(vec![1.0, 0.0, 0.0])),
            &constitution(vec![1.0, 0.0]),
            0,
            false,
            &config(2),
        )
        .expect("score");
        assert_eq!(result.status, Status::Fail);
    }

    #[test]
    fn mismatched_constitution_width_is_a_hard_error() {
        assert!(matches!(
            evaluate(
                &event(Some(vec![1.0, 0.0])),
                &constitution(vec![1.0, 0.0, 0.0]),
                0,
                false,
                &config(2),
            ),
            Err(AuraError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[test]
    fn zero_norm_event_is_a_hard_error() {
        assert!(matches!(
            evaluate(
                &event(Some(vec![0.0, 0.0])),
                &constitution(vec![1.0, 0.0]),
                0,
                false,
                &config(2),
            ),
            Err(AuraError::DegenerateVector)
        ));
    }

    #[test]
    fn drift_reported_even_when_penalties_clamp_ari_to_zero() {
        let result = evaluate(
            &event(Some(vec![1.0, 0.0])),
            &constitution(vec![1.0, 0.0]),
            3,
            false,
            &config(2),
        )
        .expect("score");
        assert_eq!(result.ari, 0.0);
        assert!(result.drift.abs() < 1e-9);
        assert_eq!(result.penalties, 3);
    }

    #[test]
    fn halted_forces_zero_ari_and_halted_status() {
        let result = evaluate(
            &event(Some(vec![1.0, 0.0])),
            &constitution(vec![1.0, 0.0]),
            0,
            true,
            &config(2),
        )
        .expect("score");
        assert_eq!(result.status, Status::Halted);
        assert_eq!(result.ari, 0.0);
        // the semantic signal is still recorded for the audit trail
        assert!((result.semantic_alignment - 1.0).abs() < 1e-9);
    }

    #[test]
    fn low_alignment_below_threshold_is_drift() {
        // orthogonal vectors: cosine 0, SA 0.5, ari 0.65 < 0.8
        let result = evaluate(
            &event(Some(vec![1.0, 0.0])),
            &constitution(vec![0.0, 1.0]),
            0,
            false,
            &config(2),
        )
        .expect("score");
        assert_eq!(result.status, Status::Drift);
        assert!((result.ari - 0.65).abs() < 1e-9);
    }

    #[test]
    fn cosine_known_directions() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]).expect("same") - 1.0).abs() < 1e-12);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).expect("orthogonal").abs() < 1e-12);
        assert!(
            (cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]).expect("opposed") + 1.0).abs() < 1e-12
        );
    }

    proptest! {
        #[test]
        fn ari_always_clamped_and_drift_symmetric(
            event_vec in prop::collection::vec(-100.0f64..100.0, 4),
            constitution_vec in prop::collection::vec(-100.0f64..100.0, 4),
            penalties in 0u32..5,
            halted in proptest::bool::ANY,
        ) {
            let e = event(Some(event_vec.clone()));
            let c = constitution(constitution_vec.clone());
            let Ok(result) = evaluate(&e, &c, penalties, halted, &config(4)) else {
                // degenerate draws (zero-norm vectors) are hard errors
                return Ok(());
            };
            prop_assert!((0.0..=1.0).contains(&result.ari));
            prop_assert!((0.0..=1.0).contains(&result.semantic_alignment));
            prop_assert!((result.drift - (1.0 - result.semantic_alignment)).abs() < 1e-15);
        }

        #[test]
        fn scoring_is_deterministic_for_random_inputs(
            event_vec in prop::collection::vec(-10.0f64..10.0, 8),
            constitution_vec in prop::collection::vec(-10.0f64..10.0, 8),
            penalties in 0u32..3,
        ) {
            let e = event(Some(event_vec));
            let c = constitution(constitution_vec);
            let cfg = config(8);
            let a = evaluate(&e, &c, penalties, false, &cfg);
            let b = evaluate(&e, &c, penalties, false, &cfg);
            match (a, b) {
                (Ok(ra), Ok(rb)) => prop_assert_eq!(ra, rb),
                (Err(_), Err(_)) => {}
                _ => prop_assert!(false, "one evaluation errored, the other did not"),
            }
        }
    }
}
