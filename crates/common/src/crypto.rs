// Copyright 2024, 2025 RISC Zero, Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use secp256k1::schnorr::Signature;
use secp256k1::{Keypair, Message, Secp256k1, XOnlyPublicKey};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

/// Hex length of an x-only secp256k1 public key.
pub const PUBKEY_HEX_LEN: usize = 64;
/// Hex length of a BIP-340 Schnorr signature.
pub const SIGNATURE_HEX_LEN: usize = 128;

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("InvalidHex error: {field} expects {expected} lowercase hex chars")]
    InvalidHex {
        field: &'static str,
        expected: usize,
    },

    #[error("InvalidKey error: {0:?}")]
    InvalidKey(secp256k1::Error),

    #[error("InvalidSignature error: {0:?}")]
    InvalidSignature(secp256k1::Error),
}

/// Computes the SHA-256 digest of a byte slice.
pub fn sha256(bytes: &[u8]) -> [u8; 32] {
    Sha256::digest(bytes).into()
}

/// Computes the SHA-256 digest of a byte slice as lowercase hex.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(sha256(bytes))
}

/// Computes the tagged content hash carried in a resource attestation,
/// `"sha256:" + lowercase hex digest`.
pub fn content_hash(bytes: &[u8]) -> String {
    format!("sha256:{}", sha256_hex(bytes))
}

/// Checks that a string is exactly `expected` lowercase hex characters.
///
/// Uppercase input is rejected rather than folded; attestations are required
/// to carry lowercase hex on the wire.
pub fn is_lower_hex(s: &str, expected: usize) -> bool {
    s.len() == expected && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// A secp256k1 keypair used to sign namespace attestations.
///
/// The secret half never leaves this type except through
/// [SigningKey::secret_bytes], which hands out a self-zeroizing buffer. The
/// underlying keypair is erased on drop.
pub struct SigningKey {
    keypair: Keypair,
}

impl SigningKey {
    /// Generates a fresh random keypair.
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let keypair = Keypair::new(&secp, &mut rand::thread_rng());
        Self { keypair }
    }

    /// Reconstructs a keypair from 64 lowercase hex chars of secret key.
    pub fn from_secret_hex(secret_hex: &str) -> Result<Self, CryptoError> {
        if !is_lower_hex(secret_hex, PUBKEY_HEX_LEN) {
            return Err(CryptoError::InvalidHex {
                field: "secret_key",
                expected: PUBKEY_HEX_LEN,
            });
        }
        let mut bytes = Zeroizing::new([0u8; 32]);
        hex::decode_to_slice(secret_hex, bytes.as_mut()).map_err(|_| CryptoError::InvalidHex {
            field: "secret_key",
            expected: PUBKEY_HEX_LEN,
        })?;
        let secp = Secp256k1::new();
        let keypair =
            Keypair::from_seckey_slice(&secp, bytes.as_ref()).map_err(CryptoError::InvalidKey)?;
        Ok(Self { keypair })
    }

    /// Returns the secret key bytes in a buffer that zeroizes itself on drop.
    pub fn secret_bytes(&self) -> Zeroizing<[u8; 32]> {
        Zeroizing::new(self.keypair.secret_bytes())
    }

    /// Returns the x-only public key as 64 lowercase hex chars.
    pub fn public_key_hex(&self) -> String {
        let (xonly, _parity) = self.keypair.x_only_public_key();
        hex::encode(xonly.serialize())
    }

    /// Signs a 32-byte digest per BIP-340.
    ///
    /// Nonce generation uses randomized auxiliary data, so two signatures
    /// over the same digest differ.
    pub fn sign_digest(&self, digest: &[u8; 32]) -> [u8; 64] {
        let secp = Secp256k1::new();
        let message = Message::from_digest(*digest);
        let signature = secp.sign_schnorr(&message, &self.keypair);
        let mut bytes = [0u8; 64];
        bytes.copy_from_slice(signature.as_ref());
        bytes
    }

    /// Signs a 32-byte digest and returns the signature as 128 lowercase hex.
    pub fn sign_digest_hex(&self, digest: &[u8; 32]) -> String {
        hex::encode(self.sign_digest(digest))
    }
}

impl Drop for SigningKey {
    fn drop(&mut self) {
        self.keypair.non_secure_erase();
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Secret material stays out of logs
        f.debug_struct("SigningKey")
            .field("public_key", &self.public_key_hex())
            .finish()
    }
}

/// Verifies a BIP-340 Schnorr signature over a 32-byte digest.
///
/// Both the public key and the signature arrive as lowercase hex strings;
/// malformed encodings surface as errors, which the verification pipeline
/// maps to a signature-invalid failure.
pub fn verify_schnorr(
    public_key_hex: &str,
    signature_hex: &str,
    digest: &[u8; 32],
) -> Result<bool, CryptoError> {
    if !is_lower_hex(public_key_hex, PUBKEY_HEX_LEN) {
        return Err(CryptoError::InvalidHex {
            field: "public_key",
            expected: PUBKEY_HEX_LEN,
        });
    }
    if !is_lower_hex(signature_hex, SIGNATURE_HEX_LEN) {
        return Err(CryptoError::InvalidHex {
            field: "signature",
            expected: SIGNATURE_HEX_LEN,
        });
    }
    let key_bytes = hex::decode(public_key_hex).map_err(|_| CryptoError::InvalidHex {
        field: "public_key",
        expected: PUBKEY_HEX_LEN,
    })?;
    let sig_bytes = hex::decode(signature_hex).map_err(|_| CryptoError::InvalidHex {
        field: "signature",
        expected: SIGNATURE_HEX_LEN,
    })?;
    let public_key = XOnlyPublicKey::from_slice(&key_bytes).map_err(CryptoError::InvalidKey)?;
    let signature = Signature::from_slice(&sig_bytes).map_err(CryptoError::InvalidSignature)?;
    let secp = Secp256k1::verification_only();
    let message = Message::from_digest(*digest);
    Ok(secp.verify_schnorr(&signature, &message, &public_key).is_ok())
}
