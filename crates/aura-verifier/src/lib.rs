// Copyright (c) 2026 Aura PoCA Contributors
// SPDX-License-Identifier: Apache-2.0

//! aura-verifier
//!
//! Independent verification of Aura audit artifacts. This crate holds none
//! of the chain's internals and deliberately does not depend on the engine:
//! leaf/node hashing, proof folding, canonical serialization, and the
//! signed-tree-head digest are re-implemented here from their wire
//! definitions, so a third party can audit a certificate with nothing but
//! this crate and the published root.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};

pub type Hash32 = [u8; 32];

pub const DOMAIN_STH_V1: &[u8] = b"aura:sth:v1";
pub const CERTIFICATE_SCHEMA: &str = "aura.v1.event_trust_certificate";

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("{0} is not a valid 32-byte hex digest")]
    MalformedDigest(&'static str),
    #[error("signature must be 64 bytes of hex")]
    MalformedSignature,
    #[error("verifying key must be 32 bytes")]
    MalformedKey,
    #[error("signature verification failed")]
    SignatureVerification,
    #[error("certificate serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn sha256(bytes: &[u8]) -> Hash32 {
    let mut h = Sha256::new();
    h.update(bytes);
    h.finalize().into()
}

pub fn leaf_hash(data: &[u8]) -> Hash32 {
    let mut buf = Vec::with_capacity(1 + data.len());
    buf.push(0u8);
    buf.extend_from_slice(data);
    sha256(&buf)
}

pub fn node_hash(left: &Hash32, right: &Hash32) -> Hash32 {
    let mut buf = [0u8; 65];
    buf[0] = 1;
    buf[1..33].copy_from_slice(left);
    buf[33..65].copy_from_slice(right);
    sha256(&buf)
}

fn sort_json(v: Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (k, val) in entries {
                sorted.insert(k, sort_json(val));
            }
            Value::Object(sorted)
        }
        Value::Array(arr) => Value::Array(arr.into_iter().map(sort_json).collect()),
        other => other,
    }
}

pub fn canonical_json(v: &impl Serialize) -> serde_json::Result<Vec<u8>> {
    let value = serde_json::to_value(v)?;
    Ok(serde_json::to_vec(&sort_json(value))?)
}

fn decode_hash(hex_digest: &str, field: &'static str) -> Result<Hash32, VerifyError> {
    hex::decode(hex_digest)
        .ok()
        .and_then(|b| b.as_slice().try_into().ok())
        .ok_or(VerifyError::MalformedDigest(field))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProofSide {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofStep {
    pub sibling: String,
    pub side: ProofSide,
}

/// Folds a tagged sibling path from the leaf to the root. Malformed hex in
/// the path is a verification failure, not an error: tampered input is an
/// expected outcome.
pub fn verify_inclusion(leaf: &Hash32, path: &[ProofStep], root: &Hash32) -> bool {
    let mut acc = *leaf;
    for step in path {
        let Ok(sibling) = decode_hash(&step.sibling, "proof sibling") else {
            return false;
        };
        acc = match step.side {
            ProofSide::Left => node_hash(&sibling, &acc),
            ProofSide::Right => node_hash(&acc, &sibling),
        };
    }
    &acc == root
}

/// Wire form of an Event Trust Certificate. `evaluation_result` is kept as
/// raw JSON: the verifier re-canonicalizes whatever the issuer put there
/// rather than assuming its field set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Certificate {
    pub schema: String,
    pub agent_id: String,
    pub event_timestamp: Option<u64>,
    pub event_hash: String,
    pub merkle_root: String,
    pub merkle_proof: Vec<ProofStep>,
    pub evaluation_result: Value,
    pub issued_at: u64,
    pub certificate_fingerprint: String,
}

/// Recomputes the fingerprint over the certificate body, which excludes
/// `issued_at` and the fingerprint itself.
pub fn recompute_fingerprint(cert: &Certificate) -> Result<String, VerifyError> {
    let body = json!({
        "schema": cert.schema,
        "agent_id": cert.agent_id,
        "event_timestamp": cert.event_timestamp,
        "event_hash": cert.event_hash,
        "merkle_root": cert.merkle_root,
        "merkle_proof": cert.merkle_proof,
        "evaluation_result": cert.evaluation_result,
    });
    Ok(hex::encode(sha256(&canonical_json(&body)?)))
}

/// The chain leaf covered by this certificate:
/// `leaf_hash(event_hash || sha256(canonical(evaluation_result)))`.
pub fn certificate_leaf_hash(cert: &Certificate) -> Result<Hash32, VerifyError> {
    let event_hash = decode_hash(&cert.event_hash, "event_hash")?;
    let result_hash = sha256(&canonical_json(&cert.evaluation_result)?);
    let mut material = [0u8; 64];
    material[..32].copy_from_slice(&event_hash);
    material[32..].copy_from_slice(&result_hash);
    Ok(leaf_hash(&material))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CertificateVerdict {
    pub fingerprint_ok: bool,
    pub proof_ok: bool,
}

impl CertificateVerdict {
    pub fn ok(&self) -> bool {
        self.fingerprint_ok && self.proof_ok
    }
}

/// Checks a certificate end to end: the fingerprint over the body and the
/// inclusion proof against the root the certificate claims.
pub fn verify_certificate(cert: &Certificate) -> Result<CertificateVerdict, VerifyError> {
    let fingerprint_ok = recompute_fingerprint(cert)? == cert.certificate_fingerprint;
    let root = decode_hash(&cert.merkle_root, "merkle_root")?;
    let leaf = certificate_leaf_hash(cert)?;
    let proof_ok = verify_inclusion(&leaf, &cert.merkle_proof, &root);
    Ok(CertificateVerdict {
        fingerprint_ok,
        proof_ok,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTreeHead {
    pub tree_size: u64,
    pub root_hash: String,
    pub signature: String,
}

pub fn sth_signature_digest(tree_size: u64, root_hash: &Hash32) -> Hash32 {
    let mut hasher = Sha256::new();
    hasher.update(DOMAIN_STH_V1);
    hasher.update(tree_size.to_be_bytes());
    hasher.update(root_hash);
    hasher.finalize().into()
}

pub fn verify_signed_tree_head(sth: &SignedTreeHead, key_bytes: &[u8]) -> Result<(), VerifyError> {
    let root = decode_hash(&sth.root_hash, "root_hash")?;
    let sig_bytes = hex::decode(&sth.signature).map_err(|_| VerifyError::MalformedSignature)?;
    let signature =
        Signature::from_slice(&sig_bytes).map_err(|_| VerifyError::MalformedSignature)?;
    let key_arr: [u8; 32] = key_bytes.try_into().map_err(|_| VerifyError::MalformedKey)?;
    let key = VerifyingKey::from_bytes(&key_arr).map_err(|_| VerifyError::MalformedKey)?;
    let digest = sth_signature_digest(sth.tree_size, &root);
    key.verify(&digest, &signature)
        .map_err(|_| VerifyError::SignatureVerification)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_leaf_fixture() -> (Hash32, Hash32, Hash32) {
        let leaf_a = leaf_hash(b"a");
        let leaf_b = leaf_hash(b"b");
        let root = node_hash(&leaf_a, &leaf_b);
        (leaf_a, leaf_b, root)
    }

    #[test]
    fn inclusion_folds_tagged_path() {
        let (leaf_a, leaf_b, root) = two_leaf_fixture();
        let path_a = vec![ProofStep {
            sibling: hex::encode(leaf_b),
            side: ProofSide::Right,
        }];
        assert!(verify_inclusion(&leaf_a, &path_a, &root));

        let path_b = vec![ProofStep {
            sibling: hex::encode(leaf_a),
            side: ProofSide::Left,
        }];
        assert!(verify_inclusion(&leaf_b, &path_b, &root));

        // swapped side is a verification failure
        let wrong = vec![ProofStep {
            sibling: hex::encode(leaf_a),
            side: ProofSide::Right,
        }];
        assert!(!verify_inclusion(&leaf_b, &wrong, &root));
    }

    #[test]
    fn malformed_proof_hex_is_false_not_an_error() {
        let (leaf_a, _, root) = two_leaf_fixture();
        let path = vec![ProofStep {
            sibling: "zz".into(),
            side: ProofSide::Right,
        }];
        assert!(!verify_inclusion(&leaf_a, &path, &root));
    }

    fn sample_certificate() -> Certificate {
        let result = json!({
            "structural_integrity": 1.0,
            "semantic_alignment": 0.95,
            "penalties": 0,
            "ari": 0.965,
            "drift": 0.05,
            "status": "COMPLIANT",
        });
        let event_hash = sha256(b"event");
        let result_hash = sha256(&canonical_json(&result).expect("canonical"));
        let mut material = [0u8; 64];
        material[..32].copy_from_slice(&event_hash);
        material[32..].copy_from_slice(&result_hash);
        let leaf = leaf_hash(&material);
        let sibling = leaf_hash(b"sibling");
        let root = node_hash(&leaf, &sibling);

        let mut cert = Certificate {
            schema: CERTIFICATE_SCHEMA.into(),
            agent_id: "agent-a".into(),
            event_timestamp: Some(1_700_000_000),
            event_hash: hex::encode(event_hash),
            merkle_root: hex::encode(root),
            merkle_proof: vec![ProofStep {
                sibling: hex::encode(sibling),
                side: ProofSide::Right,
            }],
            evaluation_result: result,
            issued_at: 1_700_000_500,
            certificate_fingerprint: String::new(),
        };
        cert.certificate_fingerprint = recompute_fingerprint(&cert).expect("fingerprint");
        cert
    }

    #[test]
    fn well_formed_certificate_verifies() {
        let cert = sample_certificate();
        let verdict = verify_certificate(&cert).expect("verdict");
        assert!(verdict.fingerprint_ok);
        assert!(verdict.proof_ok);
        assert!(verdict.ok());
    }

    #[test]
    fn issued_at_does_not_affect_the_fingerprint() {
        let mut cert = sample_certificate();
        cert.issued_at += 86_400;
        assert!(verify_certificate(&cert).expect("verdict").fingerprint_ok);
    }

    #[test]
    fn tampered_result_breaks_both_checks() {
        let mut cert = sample_certificate();
        cert.evaluation_result["ari"] = json!(0.999);
        let verdict = verify_certificate(&cert).expect("verdict");
        assert!(!verdict.fingerprint_ok);
        assert!(!verdict.proof_ok);
    }

    #[test]
    fn tampered_root_breaks_the_proof_only() {
        let mut cert = sample_certificate();
        let other_root = sha256(b"other-root");
        cert.merkle_root = hex::encode(other_root);
        let verdict = verify_certificate(&cert).expect("verdict");
        // fingerprint covers the root field, so it breaks too
        assert!(!verdict.fingerprint_ok);
        assert!(!verdict.proof_ok);
    }

    #[test]
    fn certificate_round_trips_through_json() {
        let cert = sample_certificate();
        let encoded = serde_json::to_string(&cert).expect("encode");
        let decoded: Certificate = serde_json::from_str(&encoded).expect("decode");
        assert_eq!(decoded, cert);
        assert!(verify_certificate(&decoded).expect("verdict").ok());
    }

    #[test]
    fn sth_verification_rejects_forged_heads() {
        use ed25519_dalek::{Signer, SigningKey};
        let key = SigningKey::from_bytes(&[5u8; 32]);
        let root = sha256(b"root");
        let digest = sth_signature_digest(9, &root);
        let sth = SignedTreeHead {
            tree_size: 9,
            root_hash: hex::encode(root),
            signature: hex::encode(key.sign(&digest).to_bytes()),
        };
        verify_signed_tree_head(&sth, &key.verifying_key().to_bytes()).expect("verify");

        let mut forged = sth.clone();
        forged.tree_size = 10;
        assert!(matches!(
            verify_signed_tree_head(&forged, &key.verifying_key().to_bytes()),
            Err(VerifyError::SignatureVerification)
        ));
    }
}
