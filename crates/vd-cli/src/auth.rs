//! Local password check standing in for the hosted account service.

use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Salted SHA-256 of an account password. The password itself is never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    salt: String,
    hash: String,
}

impl Credential {
    pub fn new<R: Rng + ?Sized>(password: &str, rng: &mut R) -> Self {
        let salt = hex::encode(rng.gen::<[u8; 16]>());
        let hash = digest(&salt, password);
        Self { salt, hash }
    }

    pub fn verify(&self, password: &str) -> bool {
        digest(&self.salt, password) == self.hash
    }
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}
