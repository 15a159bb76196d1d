//! Symmetric encryption for user content, password hashing, and random
//! key / identifier generation.
//!
//! Memo content is encrypted with ChaCha20-Poly1305 under a per-install
//! key and stored as `hex(nonce || ciphertext || tag)`.

use argon2::{Algorithm, Argon2, Params, Version};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use rand::RngCore;
use thiserror::Error;

/// Nonce size for ChaCha20-Poly1305 (96 bits = 12 bytes).
pub const NONCE_SIZE: usize = 12;

/// Key size for ChaCha20-Poly1305 (256 bits = 32 bytes).
pub const KEY_SIZE: usize = 32;

/// Salt size for Argon2id password hashing.
pub const SALT_SIZE: usize = 16;

/// Minimum accepted password length, rejected before any derivation.
pub const MIN_PASSWORD_LEN: usize = 8;

const ARGON2_M_COST: u32 = 19456; // 19 MiB
const ARGON2_T_COST: u32 = 2;
const ARGON2_P_COST: u32 = 1;
const ARGON2_OUTPUT_LEN: usize = 32;

pub type Result<T> = std::result::Result<T, CryptoError>;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Invalid hex encoding in stored blob")]
    InvalidHex,

    #[error("Stored blob is too short to contain a nonce")]
    BlobTooShort,

    #[error("AEAD decryption failed (wrong key or corrupt data)")]
    AeadFailure,

    #[error("Decrypted bytes are not valid UTF-8")]
    InvalidUtf8,

    #[error("Password must be at least {MIN_PASSWORD_LEN} bytes")]
    PasswordTooShort,

    #[error("Argon2 error: {0}")]
    Argon2(String),

    #[error("Malformed password hash record")]
    MalformedHashRecord,
}

/// Generate a random 256-bit encryption key.
pub fn generate_key() -> [u8; KEY_SIZE] {
    let mut key = [0u8; KEY_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut key);
    key
}

/// Generate a random v4 UUID string.
pub fn new_uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Encrypt a string under `key`. A fresh random nonce is generated per
/// call and prepended to the ciphertext; the result is hex-encoded so
/// it can be stored in a TEXT column.
pub fn encrypt_string(key: &[u8; KEY_SIZE], plaintext: &str) -> String {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    // Infallible for a valid key and nonce with in-memory input; an
    // empty fallback blob would silently persist an undecryptable row.
    let ciphertext = cipher
        .encrypt(nonce, plaintext.as_bytes())
        .expect("ChaCha20-Poly1305 encryption failed");

    let mut blob = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    blob.extend_from_slice(&nonce_bytes);
    blob.extend_from_slice(&ciphertext);
    hex::encode(blob)
}

/// Decrypt a blob produced by [`encrypt_string`].
pub fn decrypt_string(key: &[u8; KEY_SIZE], blob: &str) -> Result<String> {
    let bytes = hex::decode(blob).map_err(|_| CryptoError::InvalidHex)?;
    if bytes.len() < NONCE_SIZE {
        return Err(CryptoError::BlobTooShort);
    }

    let (nonce_bytes, ciphertext) = bytes.split_at(NONCE_SIZE);
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    let nonce = Nonce::from_slice(nonce_bytes);

    let plaintext = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| CryptoError::AeadFailure)?;

    String::from_utf8(plaintext).map_err(|_| CryptoError::InvalidUtf8)
}

fn derive_hash(password: &[u8], salt: &[u8]) -> Result<[u8; ARGON2_OUTPUT_LEN]> {
    let params = Params::new(ARGON2_M_COST, ARGON2_T_COST, ARGON2_P_COST, Some(ARGON2_OUTPUT_LEN))
        .map_err(|e| CryptoError::Argon2(e.to_string()))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut output = [0u8; ARGON2_OUTPUT_LEN];
    argon2
        .hash_password_into(password, salt, &mut output)
        .map_err(|e| CryptoError::Argon2(e.to_string()))?;

    Ok(output)
}

/// Hash a password with Argon2id and a random salt. The record format
/// is `hex(salt)$hex(hash)`.
pub fn hash_password(password: &str) -> Result<String> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(CryptoError::PasswordTooShort);
    }

    let mut salt = [0u8; SALT_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut salt);

    let hash = derive_hash(password.as_bytes(), &salt)?;
    Ok(format!("{}${}", hex::encode(salt), hex::encode(hash)))
}

/// Verify a password against a record produced by [`hash_password`].
pub fn verify_password(password: &str, record: &str) -> Result<bool> {
    let (salt_hex, hash_hex) = record
        .split_once('$')
        .ok_or(CryptoError::MalformedHashRecord)?;

    let salt = hex::decode(salt_hex).map_err(|_| CryptoError::MalformedHashRecord)?;
    let expected = hex::decode(hash_hex).map_err(|_| CryptoError::MalformedHashRecord)?;

    let hash = derive_hash(password.as_bytes(), &salt)?;
    Ok(hash.as_slice() == expected.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = generate_key();
        let plaintext = "For God so loved the world...";

        let blob = encrypt_string(&key, plaintext);
        // hex(nonce || ciphertext || tag): never a bare nonce.
        assert!(blob.len() > NONCE_SIZE * 2);

        let decrypted = decrypt_string(&key, &blob).expect("decrypt");
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_nonce_is_random_per_call() {
        let key = generate_key();
        let a = encrypt_string(&key, "same text");
        let b = encrypt_string(&key, "same text");
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_key_fails() {
        let key1 = generate_key();
        let key2 = generate_key();

        let blob = encrypt_string(&key1, "secret");
        assert_eq!(decrypt_string(&key2, &blob), Err(CryptoError::AeadFailure));
    }

    #[test]
    fn test_tampered_blob_fails() {
        let key = generate_key();
        let mut blob = encrypt_string(&key, "secret");
        // Flip a nibble in the ciphertext portion.
        let tail = blob.pop().expect("non-empty");
        blob.push(if tail == '0' { '1' } else { '0' });
        assert!(decrypt_string(&key, &blob).is_err());
    }

    #[test]
    fn test_not_hex_fails() {
        let key = generate_key();
        assert_eq!(decrypt_string(&key, "this is plaintext, not hex"), Err(CryptoError::InvalidHex));
    }

    #[test]
    fn test_short_blob_fails() {
        let key = generate_key();
        assert_eq!(decrypt_string(&key, "abcd"), Err(CryptoError::BlobTooShort));
    }

    #[test]
    fn test_empty_plaintext_roundtrip() {
        let key = generate_key();
        let blob = encrypt_string(&key, "");
        assert_eq!(decrypt_string(&key, &blob).expect("decrypt"), "");
    }

    #[test]
    fn test_unicode_roundtrip() {
        let key = generate_key();
        let plaintext = "하나님이 세상을 이처럼 사랑하사";
        let blob = encrypt_string(&key, plaintext);
        assert_eq!(decrypt_string(&key, &blob).expect("decrypt"), plaintext);
    }

    #[test]
    fn test_password_hash_verify() {
        let record = hash_password("correct horse battery").expect("hash");
        assert!(verify_password("correct horse battery", &record).expect("verify"));
        assert!(!verify_password("incorrect horse", &record).expect("verify"));
    }

    #[test]
    fn test_password_too_short_rejected() {
        assert_eq!(hash_password("short"), Err(CryptoError::PasswordTooShort));
    }

    #[test]
    fn test_uuid_unique() {
        assert_ne!(new_uuid(), new_uuid());
    }
}
