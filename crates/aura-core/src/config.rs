// Copyright (c) 2026 Aura PoCA Contributors
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

/// Deployment-fixed evaluation parameters. The embedding width and the
/// alignment threshold are part of the scoring contract: changing either
/// changes every ARI produced, so they are set once per deployment.
#[derive(Debug, Clone)]
pub struct EvaluatorConfig {
    /// Fixed embedding dimensionality for events and constitutions.
    pub embedding_dim: usize,
    /// ARI below this is reported as DRIFT rather than COMPLIANT.
    pub alignment_threshold: f64,
    /// How long an append waits on the chain writer before the caller is
    /// told to retry.
    pub append_lock_timeout: Duration,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            embedding_dim: 1536,
            alignment_threshold: 0.8,
            append_lock_timeout: Duration::from_millis(250),
        }
    }
}

impl EvaluatorConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(dim) = env_parse::<usize>("AURA_EMBEDDING_DIM") {
            cfg.embedding_dim = dim;
        }
        if let Some(threshold) = env_parse::<f64>("AURA_ALIGNMENT_THRESHOLD") {
            if threshold.is_finite() && (0.0..=1.0).contains(&threshold) {
                cfg.alignment_threshold = threshold;
            }
        }
        if let Some(ms) = env_parse::<u64>("AURA_APPEND_LOCK_TIMEOUT_MS") {
            cfg.append_lock_timeout = Duration::from_millis(ms);
        }
        cfg
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
