// Copyright (c) 2026 Aura PoCA Contributors
// SPDX-License-Identifier: Apache-2.0

//! The evaluation pipeline: kill-switch gate, policy check, scoring, and
//! the atomic append-prove-certify step.
//!
//! Scoring and policy checks are pure and run without coordination on any
//! number of threads. The audit chain and the kill-switch share one
//! exclusive writer lock: appends serialize, kill-switch transitions commit
//! append-then-flip under that same lock, and the switch state observed at
//! commit time is the one an evaluation is recorded under. An evaluation
//! either fully commits (scored, appended, proven, certified) or fails with
//! no partial artifact.

use crate::audit::{empty_result_hash, AuditChain, Hash32, MerkleProof};
use crate::canonical::{canonical_json, sha256};
use crate::certificate::EventTrustCertificate;
use crate::config::EvaluatorConfig;
use crate::constitution::{AgentRecord, ConstitutionStore, Event};
use crate::error::{AuraError, AuraResult};
use crate::killswitch::{KillSwitchState, KillSwitchTransition, SwitchState};
use crate::policy::{PolicyDecision, PolicyEngine, PolicyViolation};
use crate::scorer::{self, EvaluationResult};
use crate::sth::{SignedTreeHead, TreeHeadSigner};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// A fully committed evaluation: the score, its chain coordinates, and the
/// certificate binding the two.
#[derive(Debug, Clone)]
pub struct EvaluatedEvent {
    pub leaf_index: u64,
    pub leaf_hash: Hash32,
    pub merkle_root: Hash32,
    pub result: EvaluationResult,
    pub violations: Vec<PolicyViolation>,
    pub proof: MerkleProof,
    pub certificate: EventTrustCertificate,
}

#[derive(Debug)]
struct ChainCell {
    chain: AuditChain,
    switch: KillSwitchState,
}

pub struct Evaluator<S: ConstitutionStore> {
    config: EvaluatorConfig,
    policy: PolicyEngine,
    store: S,
    cell: Arc<Mutex<ChainCell>>,
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl<S: ConstitutionStore> Evaluator<S> {
    pub fn new(config: EvaluatorConfig, policy: PolicyEngine, store: S, chain: AuditChain) -> Self {
        Self {
            config,
            policy,
            store,
            cell: Arc::new(Mutex::new(ChainCell {
                chain,
                switch: KillSwitchState::new(),
            })),
        }
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Evaluates one observed event and commits it to the audit chain.
    ///
    /// Hard rejections and scorer hard errors surface before any scored
    /// entry exists; a rejection leaves only an administrative record. Lock
    /// contention beyond the configured timeout returns
    /// `ConcurrencyConflict` and the caller retries.
    pub fn evaluate(&self, event: &Event, agent: &AgentRecord) -> AuraResult<EvaluatedEvent> {
        let event_hash = event.event_hash()?;

        match self.policy.check(event, agent)? {
            PolicyDecision::Rejected { agent_kind } => {
                self.append_rejection(agent, agent_kind.as_str(), &event_hash)?;
                return Err(AuraError::PolicyHardReject {
                    agent_id: agent.agent_id.clone(),
                    kind: agent_kind.as_str().to_string(),
                });
            }
            PolicyDecision::Admitted { violations } => {
                self.commit_evaluation(event, event_hash, violations)
            }
        }
    }

    fn commit_evaluation(
        &self,
        event: &Event,
        event_hash: Hash32,
        violations: Vec<PolicyViolation>,
    ) -> AuraResult<EvaluatedEvent> {
        let constitution =
            self.store
                .get(&event.agent_id)
                .ok_or_else(|| AuraError::ConstitutionNotFound {
                    agent_id: event.agent_id.clone(),
                })?;
        let penalties = u32::try_from(violations.len())
            .map_err(|_| AuraError::InvalidArgument("violation count exceeds u32"))?;

        // Score outside the lock; this is the parallel-safe part.
        let halted_snapshot = self.cell.lock().switch.is_active();
        let mut result = scorer::evaluate(
            event,
            &constitution,
            penalties,
            halted_snapshot,
            &self.config,
        )?;

        let mut cell = self
            .cell
            .try_lock_for(self.config.append_lock_timeout)
            .ok_or(AuraError::ConcurrencyConflict)?;

        // The switch state at commit time is authoritative: re-score if it
        // changed between the snapshot and taking the writer lock.
        let halted_now = cell.switch.is_active();
        if halted_now != halted_snapshot {
            result = scorer::evaluate(event, &constitution, penalties, halted_now, &self.config)?;
        }

        let result_hash = sha256(&canonical_json(&result)?);
        let entry = json!({
            "kind": "evaluation",
            "event": event,
            "result": &result,
            "violations": &violations,
        });
        let receipt = cell.chain.append(&event_hash, &result_hash, entry)?;
        let proof = cell.chain.inclusion_proof(receipt.leaf_index)?;
        drop(cell);

        let certificate = EventTrustCertificate::issue(
            &event.agent_id,
            event.timestamp,
            &event_hash,
            &proof,
            &receipt.root,
            result.clone(),
            unix_now(),
        )?;

        tracing::info!(
            target: "aura.audit",
            agent_id = %event.agent_id,
            leaf_index = receipt.leaf_index,
            status = result.status.as_str(),
            ari = result.ari,
            penalties = result.penalties,
            "evaluation committed"
        );

        Ok(EvaluatedEvent {
            leaf_index: receipt.leaf_index,
            leaf_hash: receipt.leaf_hash,
            merkle_root: receipt.root,
            result,
            violations,
            proof,
            certificate,
        })
    }

    fn append_rejection(
        &self,
        agent: &AgentRecord,
        kind: &str,
        event_hash: &Hash32,
    ) -> AuraResult<()> {
        let mut cell = self
            .cell
            .try_lock_for(self.config.append_lock_timeout)
            .ok_or(AuraError::ConcurrencyConflict)?;
        let entry = json!({
            "kind": "rejected",
            "agent_id": agent.agent_id,
            "agent_kind": kind,
            "event_hash": hex::encode(event_hash),
        });
        cell.chain
            .append(event_hash, &empty_result_hash(), entry)?;
        Ok(())
    }

    /// OPEN -> HALTED. The transition record is appended before the state
    /// flips; if the append fails the switch is unchanged.
    pub fn activate_kill_switch(
        &self,
        actor: &str,
        reason: &str,
    ) -> AuraResult<KillSwitchTransition> {
        self.commit_transition(SwitchState::Halted, actor, reason)
    }

    /// HALTED -> OPEN, with the same all-or-nothing commit.
    pub fn deactivate_kill_switch(
        &self,
        actor: &str,
        reason: &str,
    ) -> AuraResult<KillSwitchTransition> {
        self.commit_transition(SwitchState::Open, actor, reason)
    }

    fn commit_transition(
        &self,
        to: SwitchState,
        actor: &str,
        reason: &str,
    ) -> AuraResult<KillSwitchTransition> {
        if actor.is_empty() {
            return Err(AuraError::InvalidArgument(
                "kill-switch transitions require an actor",
            ));
        }
        let mut cell = self
            .cell
            .try_lock_for(self.config.append_lock_timeout)
            .ok_or(AuraError::ConcurrencyConflict)?;
        let from = cell.switch.state();
        let to = from.transition(to)?;
        let transition = KillSwitchTransition {
            from,
            to,
            actor: actor.to_string(),
            reason: reason.to_string(),
            at: unix_now(),
        };
        let subject = sha256(&canonical_json(&transition)?);
        let entry = json!({
            "kind": "kill_switch_transition",
            "transition": &transition,
        });
        if let Err(e) = cell.chain.append(&subject, &empty_result_hash(), entry) {
            tracing::warn!(
                target: "aura.killswitch",
                actor,
                error = %e,
                "transition append failed; switch state unchanged"
            );
            return Err(AuraError::KillSwitchTransitionFailed);
        }
        cell.switch.commit(&transition);
        tracing::warn!(
            target: "aura.killswitch",
            actor,
            reason,
            state = transition.to.as_str(),
            "kill-switch transition committed"
        );
        Ok(transition)
    }

    pub fn kill_switch(&self) -> KillSwitchState {
        self.cell.lock().switch.clone()
    }

    pub fn tree_size(&self) -> u64 {
        self.cell.lock().chain.tree_size()
    }

    pub fn root_hash(&self) -> Hash32 {
        self.cell.lock().chain.root_hash()
    }

    pub fn root_at_size(&self, tree_size: u64) -> AuraResult<Hash32> {
        self.cell.lock().chain.root_at_size(tree_size)
    }

    pub fn inclusion_proof_at_size(
        &self,
        leaf_index: u64,
        tree_size: u64,
    ) -> AuraResult<MerkleProof> {
        self.cell
            .lock()
            .chain
            .inclusion_proof_at_size(leaf_index, tree_size)
    }

    pub fn leaf_hash_at(&self, leaf_index: u64) -> AuraResult<Hash32> {
        self.cell.lock().chain.leaf_hash_at(leaf_index)
    }

    pub fn read_record(&self, leaf_index: u64) -> AuraResult<crate::audit::ChainRecord> {
        self.cell.lock().chain.read_record(leaf_index)
    }

    /// Signs the current head under the writer lock so size and root are a
    /// consistent pair.
    pub fn sign_tree_head(&self, signer: &TreeHeadSigner) -> SignedTreeHead {
        let cell = self.cell.lock();
        signer.sign_head(cell.chain.tree_size(), &cell.chain.root_hash())
    }
}
