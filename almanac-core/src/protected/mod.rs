//! Password-protected posts.
//!
//! Bodies are encrypted at publish time with a key stretched from the post's
//! password (PBKDF2-HMAC-SHA256) under AES-256-GCM, and published as a versioned
//! [`EncryptedPostPayload`]. Decryption fails closed: a wrong password and a
//! tampered payload are indistinguishable and both surface as
//! [`CodecError::Authentication`].

mod render;

pub use render::{
    escape_fallback, fit_within, rewrite_attachment_images,
    unlock_and_render, DimensionProbe, ImageOptimizer, OptimizeError, OptimizedImage,
    ProtectedRenderer, DEFAULT_THUMBNAIL_SIZE,
};

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use almanac_types::{EncryptedPostPayload, PAYLOAD_ALG, PAYLOAD_DIGEST, PAYLOAD_VERSION};
use base64::{engine::general_purpose::STANDARD, Engine};
use rand::RngCore;
use sha2::Sha256;
use thiserror::Error;

/// Key stretching rounds for newly encrypted payloads
pub const PBKDF2_ITERATIONS: u32 = 180_000;

/// Upper bound accepted from a payload, so a hostile file cannot stall a reader
pub const MAX_ITERATIONS: u32 = 10_000_000;

const KEY_LEN: usize = 32;
const SALT_LEN: usize = 16;
const IV_LEN: usize = 12;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Wrong password or tampered payload")]
    Authentication,

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Unsupported payload: {0}")]
    UnsupportedPayload(String),

    #[error("Encryption failed")]
    Encryption,
}

fn derive_key(password: &str, salt: &[u8], iterations: u32) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut key);
    key
}

/// Encrypt `plaintext` with the standard parameters
///
/// # Example
///
/// ```
/// use almanac_core::protected::{decrypt, encrypt_with_iterations};
///
/// let payload = encrypt_with_iterations("秘密", "pw", 1_000).unwrap();
/// assert_eq!(payload.v, 1);
/// assert_eq!(decrypt(&payload, "pw").unwrap(), "秘密");
/// ```
pub fn encrypt(plaintext: &str, password: &str) -> Result<EncryptedPostPayload, CodecError> {
    encrypt_with_iterations(plaintext, password, PBKDF2_ITERATIONS)
}

/// Encrypt with an explicit iteration count. Salt and nonce are fresh per call.
pub fn encrypt_with_iterations(
    plaintext: &str,
    password: &str,
    iterations: u32,
) -> Result<EncryptedPostPayload, CodecError> {
    if iterations == 0 || iterations > MAX_ITERATIONS {
        return Err(CodecError::UnsupportedPayload(format!(
            "iteration count {iterations}"
        )));
    }

    let mut salt = [0u8; SALT_LEN];
    let mut iv = [0u8; IV_LEN];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    rand::rngs::OsRng.fill_bytes(&mut iv);

    let key = derive_key(password, &salt, iterations);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
    let data = cipher
        .encrypt(Nonce::from_slice(&iv), plaintext.as_bytes())
        .map_err(|_| CodecError::Encryption)?;

    Ok(EncryptedPostPayload {
        v: PAYLOAD_VERSION,
        alg: PAYLOAD_ALG.to_string(),
        digest: PAYLOAD_DIGEST.to_string(),
        iterations,
        salt: STANDARD.encode(salt),
        iv: STANDARD.encode(iv),
        data: STANDARD.encode(data),
    })
}

/// Recover the plaintext of `payload`, honouring the payload's own iteration count.
pub fn decrypt(payload: &EncryptedPostPayload, password: &str) -> Result<String, CodecError> {
    check_parameters(payload)?;

    let salt = decode_field("salt", &payload.salt)?;
    let iv = decode_field("iv", &payload.iv)?;
    let data = decode_field("data", &payload.data)?;
    if iv.len() != IV_LEN {
        return Err(CodecError::MalformedPayload(format!(
            "iv must be {IV_LEN} bytes, got {}",
            iv.len()
        )));
    }
    if salt.is_empty() {
        return Err(CodecError::MalformedPayload("empty salt".to_string()));
    }

    let key = derive_key(password, &salt, payload.iterations);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
    let plaintext = cipher
        .decrypt(Nonce::from_slice(&iv), data.as_slice())
        .map_err(|_| CodecError::Authentication)?;

    String::from_utf8(plaintext)
        .map_err(|_| CodecError::MalformedPayload("plaintext is not UTF-8".to_string()))
}

fn check_parameters(payload: &EncryptedPostPayload) -> Result<(), CodecError> {
    if payload.v != PAYLOAD_VERSION {
        return Err(CodecError::UnsupportedPayload(format!(
            "version {}",
            payload.v
        )));
    }
    if payload.alg != PAYLOAD_ALG {
        return Err(CodecError::UnsupportedPayload(format!(
            "algorithm {}",
            payload.alg
        )));
    }
    if payload.digest != PAYLOAD_DIGEST {
        return Err(CodecError::UnsupportedPayload(format!(
            "digest {}",
            payload.digest
        )));
    }
    if payload.iterations == 0 || payload.iterations > MAX_ITERATIONS {
        return Err(CodecError::UnsupportedPayload(format!(
            "iteration count {}",
            payload.iterations
        )));
    }
    Ok(())
}

fn decode_field(name: &str, value: &str) -> Result<Vec<u8>, CodecError> {
    STANDARD
        .decode(value)
        .map_err(|e| CodecError::MalformedPayload(format!("{name}: {e}")))
}
