//! At-rest encryption for cached DHIS2 payloads.
//!
//! The key is derived from the user's password with Argon2 and a random
//! per-cache salt. Each entry is sealed with ChaCha20-Poly1305 under a fresh
//! nonce and stored as `nonce || ciphertext`.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use argon2::Argon2;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::RngCore;

/// Salt file name in cache directory
const SALT_FILE: &str = ".salt";

const SALT_LEN: usize = 16;
const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

#[derive(Clone)]
pub struct CacheCipher {
    cipher: ChaCha20Poly1305,
}

impl CacheCipher {
    pub fn from_password(password: &str, salt: &[u8]) -> Result<Self> {
        let mut key = [0u8; KEY_LEN];
        Argon2::default()
            .hash_password_into(password.as_bytes(), salt, &mut key)
            .map_err(|e| anyhow!("Failed to derive cache key: {}", e))?;
        Ok(Self {
            cipher: ChaCha20Poly1305::new(Key::from_slice(&key)),
        })
    }

    /// Read the cache salt, creating it on first use.
    pub fn load_or_create_salt(cache_dir: &Path) -> Result<Vec<u8>> {
        let path = cache_dir.join(SALT_FILE);
        if path.exists() {
            let salt = std::fs::read(&path).context("Failed to read cache salt")?;
            if salt.len() == SALT_LEN {
                return Ok(salt);
            }
        }
        let mut salt = vec![0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);
        std::fs::create_dir_all(cache_dir)?;
        std::fs::write(&path, &salt).context("Failed to write cache salt")?;
        Ok(salt)
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);
        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|_| anyhow!("Failed to encrypt cache entry"))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    pub fn decrypt(&self, sealed: &[u8]) -> Result<Vec<u8>> {
        if sealed.len() < NONCE_LEN {
            return Err(anyhow!("Cache entry too short"));
        }
        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
        self.cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| anyhow!("Failed to decrypt cache entry"))
    }
}
