// Copyright (c) 2026 Aura PoCA Contributors
// SPDX-License-Identifier: Apache-2.0

//! Agent identity, constitutions, and the observed-event model.
//!
//! A constitution is the declared intent of a machine account: an embedding
//! of its canonicalized constitution text plus that text's hash. Committed
//! evaluations reference a constitution by value; re-registering an agent
//! creates a new logical version and never rewrites an earlier one.

use crate::canonical::{canonical_json, sha256, sha256_hex};
use crate::error::{AuraError, AuraResult};
use crate::scorer::cosine_similarity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentKind {
    MachineAccount,
    Human,
    Organization,
}

impl AgentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKind::MachineAccount => "MACHINE_ACCOUNT",
            AgentKind::Human => "HUMAN",
            AgentKind::Organization => "ORGANIZATION",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub agent_id: String,
    pub kind: AgentKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConstitution {
    pub agent_id: String,
    pub version: u32,
    pub embedding: Vec<f64>,
    pub constitution_hash: String,
    pub created_at: u64,
    pub updated_at: u64,
}

/// An observed agent action submitted for evaluation. Required fields are
/// optional at the type level so that their absence is a scored structural
/// failure rather than a deserialization error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub agent_id: String,
    pub timestamp: Option<u64>,
    pub embedding: Option<Vec<f64>>,
    pub content: Option<String>,
}

impl Event {
    /// All required fields present with the deployment's embedding width.
    pub fn has_required_fields(&self, embedding_dim: usize) -> bool {
        self.timestamp.is_some()
            && self.content.is_some()
            && self
                .embedding
                .as_ref()
                .is_some_and(|e| e.len() == embedding_dim)
    }

    /// Digest of the canonical event bytes; ties violations, chain leaves,
    /// and certificates to this exact observation.
    pub fn event_hash(&self) -> AuraResult<[u8; 32]> {
        Ok(sha256(&canonical_json(self)?))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborMatch {
    pub agent_id: String,
    pub similarity: f64,
}

/// Read-side boundary to the constitution store. The core resolves a named
/// constitution at evaluation time; similarity search is a discovery aid
/// and never feeds the ARI.
pub trait ConstitutionStore {
    fn get(&self, agent_id: &str) -> Option<AgentConstitution>;

    fn nearest(&self, embedding: &[f64], k: usize) -> AuraResult<Vec<NeighborMatch>>;
}

#[derive(Debug, Default)]
pub struct InMemoryConstitutionStore {
    versions: BTreeMap<String, Vec<AgentConstitution>>,
}

impl InMemoryConstitutionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new constitution version. The embedding must be finite
    /// with a non-zero norm; a degenerate constitution would poison every
    /// later evaluation, so it is rejected here.
    pub fn register(
        &mut self,
        agent_id: &str,
        constitution_text: &str,
        embedding: Vec<f64>,
        now: u64,
    ) -> AuraResult<AgentConstitution> {
        if embedding.is_empty() {
            return Err(AuraError::InvalidArgument("constitution embedding is empty"));
        }
        let mut norm = 0.0f64;
        for &c in &embedding {
            if !c.is_finite() {
                return Err(AuraError::DegenerateVector);
            }
            norm += c * c;
        }
        if norm == 0.0 {
            return Err(AuraError::DegenerateVector);
        }

        let history = self.versions.entry(agent_id.to_string()).or_default();
        let constitution = AgentConstitution {
            agent_id: agent_id.to_string(),
            version: history.len() as u32 + 1,
            embedding,
            constitution_hash: sha256_hex(constitution_text.as_bytes()),
            created_at: history.first().map_or(now, |c| c.created_at),
            updated_at: now,
        };
        history.push(constitution.clone());
        Ok(constitution)
    }

    pub fn version_count(&self, agent_id: &str) -> usize {
        self.versions.get(agent_id).map_or(0, Vec::len)
    }

    pub fn get_version(&self, agent_id: &str, version: u32) -> Option<AgentConstitution> {
        self.versions
            .get(agent_id)?
            .iter()
            .find(|c| c.version == version)
            .cloned()
    }
}

impl ConstitutionStore for InMemoryConstitutionStore {
    fn get(&self, agent_id: &str) -> Option<AgentConstitution> {
        self.versions.get(agent_id)?.last().cloned()
    }

    /// Linear cosine scan over the latest version of every registered
    /// constitution, best match first. Iteration is in agent-id order so
    /// equal similarities rank deterministically.
    fn nearest(&self, embedding: &[f64], k: usize) -> AuraResult<Vec<NeighborMatch>> {
        let mut matches = Vec::new();
        for (agent_id, history) in &self.versions {
            let Some(current) = history.last() else {
                continue;
            };
            if current.embedding.len() != embedding.len() {
                continue;
            }
            let similarity = cosine_similarity(embedding, &current.embedding)?;
            matches.push(NeighborMatch {
                agent_id: agent_id.clone(),
                similarity,
            });
        }
        matches.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.agent_id.cmp(&b.agent_id))
        });
        matches.truncate(k);
        Ok(matches)
    }
}
