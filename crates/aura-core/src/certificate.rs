// Copyright (c) 2026 Aura PoCA Contributors
// SPDX-License-Identifier: Apache-2.0

//! Event Trust Certificates.
//!
//! The certificate binds a score to its audit-chain proof. Its fingerprint
//! is the SHA-256 of the canonical JSON of the certificate *body*: schema,
//! agent id, event timestamp, event hash, Merkle root, proof path, and
//! evaluation result. `issued_at` and the fingerprint itself stay outside
//! the hashed region, so the only timestamp under the hash is the event's
//! own recorded one and any independent implementation reproduces the
//! fingerprint byte for byte.

use crate::audit::{MerkleProof, Side};
use crate::canonical::{canonical_json, sha256_hex};
use crate::error::AuraResult;
use crate::scorer::EvaluationResult;
use serde::{Deserialize, Serialize};

pub const CERTIFICATE_SCHEMA: &str = "aura.v1.event_trust_certificate";

/// One proof step in wire form: hex sibling digest plus the side it sits on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofStepDoc {
    pub sibling: String,
    pub side: Side,
}

impl ProofStepDoc {
    fn from_proof(proof: &MerkleProof) -> Vec<Self> {
        proof
            .path
            .iter()
            .map(|step| Self {
                sibling: hex::encode(step.sibling),
                side: step.side,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventTrustCertificate {
    pub schema: String,
    pub agent_id: String,
    pub event_timestamp: Option<u64>,
    pub event_hash: String,
    pub merkle_root: String,
    pub merkle_proof: Vec<ProofStepDoc>,
    pub evaluation_result: EvaluationResult,
    pub issued_at: u64,
    pub certificate_fingerprint: String,
}

#[derive(Serialize)]
struct CertificateBody<'a> {
    schema: &'a str,
    agent_id: &'a str,
    event_timestamp: Option<u64>,
    event_hash: &'a str,
    merkle_root: &'a str,
    merkle_proof: &'a [ProofStepDoc],
    evaluation_result: &'a EvaluationResult,
}

fn fingerprint(body: &CertificateBody<'_>) -> AuraResult<String> {
    Ok(sha256_hex(&canonical_json(body)?))
}

impl EventTrustCertificate {
    pub fn issue(
        agent_id: &str,
        event_timestamp: Option<u64>,
        event_hash: &[u8; 32],
        proof: &MerkleProof,
        root: &[u8; 32],
        evaluation_result: EvaluationResult,
        issued_at: u64,
    ) -> AuraResult<Self> {
        let event_hash = hex::encode(event_hash);
        let merkle_root = hex::encode(root);
        let merkle_proof = ProofStepDoc::from_proof(proof);
        let certificate_fingerprint = fingerprint(&CertificateBody {
            schema: CERTIFICATE_SCHEMA,
            agent_id,
            event_timestamp,
            event_hash: &event_hash,
            merkle_root: &merkle_root,
            merkle_proof: &merkle_proof,
            evaluation_result: &evaluation_result,
        })?;
        Ok(Self {
            schema: CERTIFICATE_SCHEMA.to_string(),
            agent_id: agent_id.to_string(),
            event_timestamp,
            event_hash,
            merkle_root,
            merkle_proof,
            evaluation_result,
            issued_at,
            certificate_fingerprint,
        })
    }

    /// Recomputes the fingerprint from the body fields alone. A holder of
    /// the certificate needs nothing else to check it.
    pub fn recompute_fingerprint(&self) -> AuraResult<String> {
        fingerprint(&CertificateBody {
            schema: &self.schema,
            agent_id: &self.agent_id,
            event_timestamp: self.event_timestamp,
            event_hash: &self.event_hash,
            merkle_root: &self.merkle_root,
            merkle_proof: &self.merkle_proof,
            evaluation_result: &self.evaluation_result,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{record_leaf_hash, verify_inclusion_proof, ProofStep};
    use crate::canonical::sha256;
    use crate::scorer::Status;

    fn sample_result() -> EvaluationResult {
        EvaluationResult {
            structural_integrity: 1.0,
            semantic_alignment: 0.95,
            penalties: 0,
            ari: 0.965,
            drift: 0.050000000000000044,
            status: Status::Compliant,
        }
    }

    fn sample_proof() -> MerkleProof {
        MerkleProof {
            leaf_index: 1,
            tree_size: 3,
            path: vec![
                ProofStep {
                    sibling: sha256(b"left-sibling"),
                    side: Side::Left,
                },
                ProofStep {
                    sibling: sha256(b"right-subtree"),
                    side: Side::Right,
                },
            ],
        }
    }

    fn issue_sample(issued_at: u64) -> EventTrustCertificate {
        EventTrustCertificate::issue(
            "agent-a",
            Some(1_700_000_000),
            &sha256(b"event"),
            &sample_proof(),
            &sha256(b"root"),
            sample_result(),
            issued_at,
        )
        .expect("issue")
    }

    #[test]
    fn fingerprint_is_recomputable_from_the_certificate_alone() {
        let cert = issue_sample(1_700_000_500);
        assert_eq!(
            cert.recompute_fingerprint().expect("recompute"),
            cert.certificate_fingerprint
        );
    }

    #[test]
    fn issued_at_stays_outside_the_hashed_region() {
        let early = issue_sample(1_700_000_500);
        let late = issue_sample(1_700_099_999);
        assert_eq!(
            early.certificate_fingerprint,
            late.certificate_fingerprint
        );
    }

    #[test]
    fn fingerprint_pins_the_evaluation_result() {
        let cert = issue_sample(1_700_000_500);
        let mut tampered = cert.clone();
        tampered.evaluation_result.ari = 0.99;
        assert_ne!(
            tampered.recompute_fingerprint().expect("recompute"),
            cert.certificate_fingerprint
        );

        let mut relabeled = cert.clone();
        relabeled.evaluation_result.status = Status::Drift;
        assert_ne!(
            relabeled.recompute_fingerprint().expect("recompute"),
            cert.certificate_fingerprint
        );
    }

    #[test]
    fn fingerprint_pins_the_proof_path() {
        let cert = issue_sample(1_700_000_500);
        let mut tampered = cert.clone();
        tampered.merkle_proof[0].side = Side::Right;
        assert_ne!(
            tampered.recompute_fingerprint().expect("recompute"),
            cert.certificate_fingerprint
        );
    }

    #[test]
    fn proof_steps_serialize_with_lowercase_sides() {
        let cert = issue_sample(1_700_000_500);
        let json = serde_json::to_value(&cert).expect("json");
        assert_eq!(json["merkle_proof"][0]["side"], "left");
        assert_eq!(json["merkle_proof"][1]["side"], "right");
        assert_eq!(json["schema"], CERTIFICATE_SCHEMA);
    }

    #[test]
    fn certificate_leaf_matches_chain_leaf_derivation() {
        // the chain leaf is derivable from the certificate's two digests
        let event_hash = sha256(b"event");
        let result = sample_result();
        let result_hash = sha256(&canonical_json(&result).expect("canonical result"));
        let leaf = record_leaf_hash(&event_hash, &result_hash);

        // a proof over that leaf verifies against the root it was built for
        let other = sha256(b"other-leaf");
        let leaves = vec![leaf, other];
        let root = crate::audit::merkle_root(&leaves);
        let proof = crate::audit::inclusion_proof_at(&leaves, 0, 2).expect("proof");
        assert!(verify_inclusion_proof(&leaf, &proof, &root));
    }
}
