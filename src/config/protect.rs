//! Secret protection at rest
//!
//! Secrets are stored as `ENCRYPTED:` followed by base64 of
//! `nonce || ciphertext`. The key lives in a file readable only by the
//! scope that owns it (current user or machine).

use crate::platform;
use crate::{OpenSpeechError, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Nonce};
use log::{debug, info};
use once_cell::sync::OnceCell;
use rand::RngCore;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Literal prefix marking an encrypted value
pub const ENCRYPTED_MARKER: &str = "ENCRYPTED:";

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Platform secret-protection primitive
pub trait SecretProtector: Send + Sync {
    fn protect(&self, plaintext: &[u8]) -> Result<Vec<u8>>;

    fn unprotect(&self, ciphertext: &[u8]) -> Result<Vec<u8>>;
}

/// Who can read protected values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectionScope {
    CurrentUser,
    LocalMachine,
}

impl ProtectionScope {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" | "currentuser" => Some(ProtectionScope::CurrentUser),
            "machine" | "localmachine" => Some(ProtectionScope::LocalMachine),
            _ => None,
        }
    }
}

/// True if `value` already carries the encryption marker
pub fn is_sealed(value: &str) -> bool {
    value.starts_with(ENCRYPTED_MARKER)
}

/// Encrypt `value` unless it is already sealed
pub fn seal(protector: &dyn SecretProtector, value: &str) -> Result<String> {
    if is_sealed(value) {
        return Ok(value.to_string());
    }
    let ciphertext = protector.protect(value.as_bytes())?;
    Ok(format!("{}{}", ENCRYPTED_MARKER, STANDARD.encode(ciphertext)))
}

/// Decrypt a sealed value; plaintext passes through unchanged
pub fn unseal(protector: &dyn SecretProtector, value: &str) -> Result<String> {
    let Some(encoded) = value.strip_prefix(ENCRYPTED_MARKER) else {
        return Ok(value.to_string());
    };
    let ciphertext = STANDARD
        .decode(encoded.trim())
        .map_err(|e| OpenSpeechError::Protection(format!("invalid ciphertext encoding: {}", e)))?;
    let plaintext = protector.unprotect(&ciphertext)?;
    String::from_utf8(plaintext)
        .map_err(|_| OpenSpeechError::Protection("decrypted value is not UTF-8".to_string()))
}

/// ChaCha20-Poly1305 protector keyed from a scope-owned key file
///
/// The key is generated on first use.
pub struct KeyFileProtector {
    key_path: PathBuf,
    cipher: OnceCell<ChaCha20Poly1305>,
}

impl KeyFileProtector {
    pub fn new(key_path: impl Into<PathBuf>) -> Self {
        Self {
            key_path: key_path.into(),
            cipher: OnceCell::new(),
        }
    }

    /// Protector using the default key location for `scope`
    pub fn for_scope(scope: ProtectionScope) -> Result<Self> {
        let dir = match scope {
            ProtectionScope::CurrentUser => platform::user_data_dir()?,
            ProtectionScope::LocalMachine => platform::machine_data_dir(),
        };
        Ok(Self::new(dir.join("secret.key")))
    }

    pub fn key_path(&self) -> &Path {
        &self.key_path
    }

    fn cipher(&self) -> Result<&ChaCha20Poly1305> {
        self.cipher.get_or_try_init(|| {
            let key = Self::load_or_create_key(&self.key_path)?;
            ChaCha20Poly1305::new_from_slice(&key)
                .map_err(|_| OpenSpeechError::Protection("invalid key length".to_string()))
        })
    }

    fn load_or_create_key(path: &Path) -> Result<Vec<u8>> {
        if path.exists() {
            debug!("Loading protection key from {:?}", path);
            let key = fs::read(path)?;
            if key.len() != KEY_LEN {
                return Err(OpenSpeechError::Protection(format!(
                    "key file {} has {} bytes, expected {}",
                    path.display(),
                    key.len(),
                    KEY_LEN
                )));
            }
            return Ok(key);
        }

        info!("Protection key not found, creating {:?}", path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut key = vec![0u8; KEY_LEN];
        rand::rngs::OsRng.fill_bytes(&mut key);

        let mut options = fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(path)?;
        file.write_all(&key)?;
        file.sync_all()?;

        Ok(key)
    }
}

impl SecretProtector for KeyFileProtector {
    fn protect(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let cipher = self.cipher()?;

        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);

        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|_| OpenSpeechError::Protection("encryption failed".to_string()))?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    fn unprotect(&self, data: &[u8]) -> Result<Vec<u8>> {
        if data.len() < NONCE_LEN + TAG_LEN {
            return Err(OpenSpeechError::Protection("ciphertext too short".to_string()));
        }
        let cipher = self.cipher()?;
        let (nonce, ciphertext) = data.split_at(NONCE_LEN);
        cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| {
                OpenSpeechError::Protection(
                    "decryption failed (wrong key or tampered value)".to_string(),
                )
            })
    }
}
