use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::RngCore;

use crate::errors::{DocRepoError, DocRepoResult, ErrorKind};

const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

/// Turns configured ciphertext into the plaintext connection settings.
///
/// Called once per value when a connection is built.
pub trait SecretProvider: Send + Sync {
    fn decrypt(&self, ciphertext: &str) -> DocRepoResult<String>;
}

/// Treats configured values as plaintext.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextSecretProvider;

impl SecretProvider for PlainTextSecretProvider {
    fn decrypt(&self, ciphertext: &str) -> DocRepoResult<String> {
        Ok(ciphertext.to_string())
    }
}

/// AES-256-GCM secrets encoded as base64 of `nonce || ciphertext`.
pub struct Aes256GcmSecretProvider {
    cipher: Aes256Gcm,
}

impl Aes256GcmSecretProvider {
    pub fn new(key: &[u8]) -> DocRepoResult<Self> {
        if key.len() != KEY_LEN {
            log::error!("AES-256-GCM key must be {} bytes, got {}", KEY_LEN, key.len());
            return Err(DocRepoError::new(
                &format!("AES-256-GCM key must be {} bytes", KEY_LEN),
                ErrorKind::SecurityError,
            ));
        }
        let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| {
            log::error!("Failed to initialize AES-256-GCM cipher");
            DocRepoError::new("Invalid AES-256-GCM key", ErrorKind::SecurityError)
        })?;
        Ok(Aes256GcmSecretProvider { cipher })
    }

    /// Reads a base64 encoded key.
    pub fn from_base64_key(key: &str) -> DocRepoResult<Self> {
        let key = BASE64.decode(key.trim()).map_err(|e| {
            log::error!("Secret key is not valid base64: {}", e);
            DocRepoError::new("Secret key is not valid base64", ErrorKind::SecurityError)
        })?;
        Aes256GcmSecretProvider::new(&key)
    }

    /// Encrypts `plaintext` under a fresh random nonce.
    pub fn encrypt(&self, plaintext: &str) -> DocRepoResult<String> {
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);

        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
            .map_err(|_| {
                log::error!("Failed to encrypt secret");
                DocRepoError::new("Failed to encrypt secret", ErrorKind::SecurityError)
            })?;

        let mut payload = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        payload.extend_from_slice(&nonce);
        payload.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(payload))
    }
}

impl SecretProvider for Aes256GcmSecretProvider {
    fn decrypt(&self, ciphertext: &str) -> DocRepoResult<String> {
        let payload = BASE64.decode(ciphertext.trim()).map_err(|e| {
            log::error!("Secret is not valid base64: {}", e);
            DocRepoError::new("Secret is not valid base64", ErrorKind::SecurityError)
        })?;

        if payload.len() <= NONCE_LEN {
            log::error!("Secret is too short to hold a nonce and ciphertext");
            return Err(DocRepoError::new(
                "Secret is too short",
                ErrorKind::SecurityError,
            ));
        }

        let (nonce, data) = payload.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), data)
            .map_err(|_| {
                log::error!("Failed to decrypt secret");
                DocRepoError::new("Failed to decrypt secret", ErrorKind::SecurityError)
            })?;

        String::from_utf8(plaintext).map_err(|_| {
            log::error!("Decrypted secret is not valid UTF-8");
            DocRepoError::new("Decrypted secret is not valid UTF-8", ErrorKind::SecurityError)
        })
    }
}
