//! In-memory store of RSA signing keys.
//!
//! Keys are loaded from PEM files at start-up and addressed by key id (kid).
//! One key is marked active and used to sign new tokens; every loaded key
//! remains valid for verification, which allows rotating the active key
//! without invalidating tokens already issued.
//!
//! # Example
//!
//! ```ignore
//! use roster_auth::KeyStore;
//!
//! let store = KeyStore::new();
//! let loaded = store.load("/etc/rsa-keys")?;
//! store.set_active("54bb2165-71e1-41a6-af3e-7da4a0e1e2c1")?;
//! ```

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use jsonwebtoken::{DecodingKey, EncodingKey};
use parking_lot::RwLock;
use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey, EncodeRsaPublicKey, LineEnding};
use rsa::pkcs8::{DecodePrivateKey, EncodePublicKey};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info};

/// Largest key file read from disk.
pub const MAX_KEY_FILE_SIZE: u64 = 1024 * 1024;

#[derive(Debug, Error)]
pub enum KeyStoreError {
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("parsing private key {path}: {reason}")]
    Parse { path: PathBuf, reason: String },
    #[error("encoding key {kid}: {reason}")]
    Encoding { kid: String, reason: String },
    #[error("kid[{0}] not found")]
    NotFound(String),
}

/// A loaded key pair with its jsonwebtoken handles.
pub struct Key {
    kid: String,
    public: RsaPublicKey,
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl std::fmt::Debug for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Key").field("kid", &self.kid).finish_non_exhaustive()
    }
}

impl Key {
    pub fn new(kid: impl Into<String>, private: &RsaPrivateKey) -> Result<Self, KeyStoreError> {
        let kid = kid.into();
        let encoding_err = |reason: String| KeyStoreError::Encoding {
            kid: kid.clone(),
            reason,
        };

        let public = RsaPublicKey::from(private);

        let private_pem = private
            .to_pkcs1_pem(LineEnding::LF)
            .map_err(|e| encoding_err(e.to_string()))?;
        let encoding = EncodingKey::from_rsa_pem(private_pem.as_bytes())
            .map_err(|e| encoding_err(e.to_string()))?;

        let public_pem = public
            .to_pkcs1_pem(LineEnding::LF)
            .map_err(|e| encoding_err(e.to_string()))?;
        let decoding = DecodingKey::from_rsa_pem(public_pem.as_bytes())
            .map_err(|e| encoding_err(e.to_string()))?;

        Ok(Self {
            kid,
            public,
            encoding,
            decoding,
        })
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public
    }
}

#[derive(Default)]
struct Inner {
    keys: HashMap<String, Arc<Key>>,
    active: Option<String>,
}

/// Thread-safe key registry.
///
/// Reads take a shared lock; loading and activation take the exclusive lock
/// only for the final map update.
#[derive(Default)]
pub struct KeyStore {
    inner: RwLock<Inner>,
}

impl KeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every `*.pem` file under `dir`, recursively.
    ///
    /// The kid of each key is its file name without the extension.
    /// Directories whose name starts with `..` are skipped together with
    /// their contents; Kubernetes mounts secrets through such directories
    /// and the visible files are symlinks into them.
    ///
    /// # Returns
    ///
    /// The number of keys loaded.
    ///
    /// # Errors
    ///
    /// Fails on the first unreadable file or on a file that does not hold an
    /// RSA private key in PKCS#1 or PKCS#8 form. Nothing is inserted when
    /// loading fails.
    pub fn load(&self, dir: impl AsRef<Path>) -> Result<usize, KeyStoreError> {
        let mut parsed = Vec::new();
        collect_keys(dir.as_ref(), &mut parsed)?;

        let count = parsed.len();
        let mut inner = self.inner.write();
        for key in parsed {
            inner.keys.insert(key.kid.clone(), Arc::new(key));
        }
        drop(inner);

        info!(count, dir = %dir.as_ref().display(), "keys loaded");
        Ok(count)
    }

    /// Adds a key under an externally assigned kid, replacing any key with the same kid.
    pub fn insert(&self, kid: impl Into<String>, private: &RsaPrivateKey) -> Result<(), KeyStoreError> {
        let key = Key::new(kid, private)?;
        self.inner.write().keys.insert(key.kid.clone(), Arc::new(key));
        Ok(())
    }

    /// Adds a key whose kid is the SHA-256 fingerprint of its public key.
    pub fn insert_generated(&self, private: &RsaPrivateKey) -> Result<String, KeyStoreError> {
        let kid = fingerprint(&RsaPublicKey::from(private))?;
        self.insert(kid.clone(), private)?;
        Ok(kid)
    }

    pub fn private_key(&self, kid: &str) -> Result<EncodingKey, KeyStoreError> {
        self.key(kid).map(|key| key.encoding.clone())
    }

    pub fn public_key(&self, kid: &str) -> Result<DecodingKey, KeyStoreError> {
        self.key(kid).map(|key| key.decoding.clone())
    }

    pub fn key(&self, kid: &str) -> Result<Arc<Key>, KeyStoreError> {
        self.inner
            .read()
            .keys
            .get(kid)
            .cloned()
            .ok_or_else(|| KeyStoreError::NotFound(kid.to_string()))
    }

    /// Marks `kid` as the signing key. The previous active key is kept on failure.
    pub fn set_active(&self, kid: &str) -> Result<(), KeyStoreError> {
        let mut inner = self.inner.write();
        if !inner.keys.contains_key(kid) {
            return Err(KeyStoreError::NotFound(kid.to_string()));
        }
        inner.active = Some(kid.to_string());
        Ok(())
    }

    pub fn active_kid(&self) -> Option<String> {
        self.inner.read().active.clone()
    }

    /// Loaded kids in lexicographic order.
    pub fn kids(&self) -> Vec<String> {
        let mut kids: Vec<String> = self.inner.read().keys.keys().cloned().collect();
        kids.sort();
        kids
    }

    pub fn len(&self) -> usize {
        self.inner.read().keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn collect_keys(dir: &Path, out: &mut Vec<Key>) -> Result<(), KeyStoreError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: io::Error| KeyStoreError::Io { path, source }
    };

    for entry in fs::read_dir(dir).map_err(io_err(dir))? {
        let entry = entry.map_err(io_err(dir))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(io_err(&path))?;

        if file_type.is_dir() {
            if entry.file_name().to_string_lossy().starts_with("..") {
                debug!(path = %path.display(), "skipping indirection directory");
                continue;
            }
            collect_keys(&path, out)?;
            continue;
        }

        if path.extension().and_then(|ext| ext.to_str()) != Some("pem") {
            continue;
        }

        // Symlinks are followed, but only to regular files.
        if !fs::metadata(&path).map_err(io_err(&path))?.is_file() {
            continue;
        }

        let Some(kid) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
            continue;
        };

        let pem = read_capped(&path)?;
        let private = parse_private_key(&pem).map_err(|reason| KeyStoreError::Parse {
            path: path.clone(),
            reason,
        })?;

        debug!(kid = %kid, path = %path.display(), "key parsed");
        out.push(Key::new(kid, &private)?);
    }

    Ok(())
}

fn read_capped(path: &Path) -> Result<String, KeyStoreError> {
    let io_err = |source: io::Error| KeyStoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut pem = String::new();
    File::open(path)
        .map_err(io_err)?
        .take(MAX_KEY_FILE_SIZE)
        .read_to_string(&mut pem)
        .map_err(io_err)?;
    Ok(pem)
}

/// Accepts PKCS#1 (`RSA PRIVATE KEY`) first, then PKCS#8 (`PRIVATE KEY`).
pub fn parse_private_key(pem: &str) -> Result<RsaPrivateKey, String> {
    if let Ok(key) = RsaPrivateKey::from_pkcs1_pem(pem) {
        return Ok(key);
    }

    RsaPrivateKey::from_pkcs8_pem(pem)
        .map_err(|e| format!("not an RSA private key in PKCS#1 or PKCS#8 form: {e}"))
}

fn fingerprint(public: &RsaPublicKey) -> Result<String, KeyStoreError> {
    let der = public
        .to_public_key_der()
        .map_err(|e| KeyStoreError::Encoding {
            kid: "<generated>".to_string(),
            reason: e.to_string(),
        })?;
    Ok(hex::encode(Sha256::digest(der.as_bytes())))
}
