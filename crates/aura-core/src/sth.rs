// Copyright (c) 2026 Aura PoCA Contributors
// SPDX-License-Identifier: Apache-2.0

//! Signed tree heads: an operator signature over `(tree_size, root_hash)`
//! with domain separation, so published chain roots can be gossiped and
//! anchored without trusting the transport.

use crate::audit::Hash32;
use crate::error::{AuraError, AuraResult};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const DOMAIN_STH_V1: &[u8] = b"aura:sth:v1";

pub fn sth_signature_digest(tree_size: u64, root_hash: &Hash32) -> Hash32 {
    let mut hasher = Sha256::new();
    hasher.update(DOMAIN_STH_V1);
    hasher.update(tree_size.to_be_bytes());
    hasher.update(root_hash);
    hasher.finalize().into()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTreeHead {
    pub tree_size: u64,
    pub root_hash: String,
    pub signature: String,
}

#[derive(Debug)]
pub struct TreeHeadSigner {
    key: SigningKey,
}

impl TreeHeadSigner {
    pub fn new(key: SigningKey) -> Self {
        Self { key }
    }

    pub fn from_bytes(secret: &[u8; 32]) -> Self {
        Self {
            key: SigningKey::from_bytes(secret),
        }
    }

    pub fn verifying_key_bytes(&self) -> [u8; 32] {
        self.key.verifying_key().to_bytes()
    }

    pub fn sign_head(&self, tree_size: u64, root_hash: &Hash32) -> SignedTreeHead {
        let digest = sth_signature_digest(tree_size, root_hash);
        let signature = self.key.sign(&digest);
        SignedTreeHead {
            tree_size,
            root_hash: hex::encode(root_hash),
            signature: hex::encode(signature.to_bytes()),
        }
    }
}

pub fn verify_signed_tree_head(sth: &SignedTreeHead, key_bytes: &[u8; 32]) -> AuraResult<()> {
    let root: Hash32 = hex::decode(&sth.root_hash)
        .map_err(|_| AuraError::InvalidArgument("tree head root is not valid hex"))?
        .as_slice()
        .try_into()
        .map_err(|_| AuraError::InvalidArgument("tree head root must be 32 bytes"))?;
    let sig_bytes = hex::decode(&sth.signature)
        .map_err(|_| AuraError::InvalidArgument("tree head signature is not valid hex"))?;
    let signature = Signature::from_slice(&sig_bytes)
        .map_err(|_| AuraError::InvalidArgument("tree head signature must be 64 bytes"))?;
    let key = VerifyingKey::from_bytes(key_bytes)
        .map_err(|_| AuraError::InvalidArgument("invalid verifying key"))?;
    let digest = sth_signature_digest(sth.tree_size, &root);
    key.verify(&digest, &signature)
        .map_err(|_| AuraError::SignatureVerification)
}
