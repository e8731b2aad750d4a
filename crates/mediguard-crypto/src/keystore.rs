//! PEM persistence for the signing keypair.
//!
//! Layout on disk: a PKCS#8 private key and a SubjectPublicKeyInfo public
//! key, each written to a temporary file in the target directory and renamed
//! into place. The private key is persisted with no-clobber semantics: if
//! another process created it first, that key is loaded instead.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use ed25519_dalek::pkcs8::spki::der::pem::LineEnding;
use ed25519_dalek::pkcs8::{DecodePrivateKey, EncodePrivateKey};
use tracing::{debug, info, warn};

use crate::signer::{SigningAuthority, VerifyingKey};

/// Default private key file name.
pub const PRIVATE_KEY_FILE: &str = "private_key.pem";
/// Default public key file name.
pub const PUBLIC_KEY_FILE: &str = "public_key.pem";

/// Locations of the two key files.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyPaths {
    pub private_key: PathBuf,
    pub public_key: PathBuf,
}

/// Errors from loading or persisting keys.
#[derive(Debug, thiserror::Error)]
pub enum KeyStoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("PEM error in {path}: {reason}")]
    Pem { path: PathBuf, reason: String },

    #[error("public key {0} does not match the private key")]
    KeyMismatch(PathBuf),
}

impl KeyPaths {
    pub fn new(private_key: impl Into<PathBuf>, public_key: impl Into<PathBuf>) -> Self {
        Self {
            private_key: private_key.into(),
            public_key: public_key.into(),
        }
    }

    /// Default file names inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(PRIVATE_KEY_FILE), dir.join(PUBLIC_KEY_FILE))
    }
}

impl SigningAuthority {
    /// Load the keypair from `paths`, or generate and persist a new one if
    /// the private key file does not exist yet.
    pub fn load_or_generate(paths: &KeyPaths) -> Result<Self, KeyStoreError> {
        if paths.private_key.exists() {
            return Self::load(paths);
        }

        let authority = Self::generate();
        let private_pem = authority
            .signing
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| pem_error(&paths.private_key, e))?;

        match write_atomic(&paths.private_key, private_pem.as_bytes(), false) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                warn!(path = %paths.private_key.display(), "keypair created concurrently; loading it");
                return Self::load(paths);
            }
            Err(e) => return Err(e.into()),
        }
        write_public_key(&authority, &paths.public_key)?;

        info!(
            private_key = %paths.private_key.display(),
            fingerprint = %authority.verifying_key().fingerprint(),
            "generated new signing keypair"
        );
        Ok(authority)
    }

    /// Load an existing keypair. A missing public key file is rewritten from
    /// the private key; a public key that does not match is an error.
    pub fn load(paths: &KeyPaths) -> Result<Self, KeyStoreError> {
        let private_pem = fs::read_to_string(&paths.private_key)?;
        let signing = ed25519_dalek::SigningKey::from_pkcs8_pem(&private_pem)
            .map_err(|e| pem_error(&paths.private_key, e))?;
        let authority = Self::from_signing_key(signing);

        match fs::read_to_string(&paths.public_key) {
            Ok(public_pem) => {
                let stored = VerifyingKey::from_pem(&public_pem)
                    .map_err(|e| pem_error(&paths.public_key, e))?;
                if &stored != authority.verifying_key() {
                    return Err(KeyStoreError::KeyMismatch(paths.public_key.clone()));
                }
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %paths.public_key.display(), "public key missing; rewriting");
                write_public_key(&authority, &paths.public_key)?;
            }
            Err(e) => return Err(e.into()),
        }

        debug!(
            fingerprint = %authority.verifying_key().fingerprint(),
            "loaded signing keypair"
        );
        Ok(authority)
    }
}

fn write_public_key(authority: &SigningAuthority, path: &Path) -> Result<(), KeyStoreError> {
    let pem = authority
        .public_key_pem()
        .map_err(|e| pem_error(path, e))?;
    write_atomic(path, pem.as_bytes(), true)?;
    Ok(())
}

fn write_atomic(path: &Path, contents: &[u8], overwrite: bool) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;

    let persisted = if overwrite {
        tmp.persist(path)
    } else {
        tmp.persist_noclobber(path)
    };
    persisted.map(|_| ()).map_err(|e| e.error)
}

fn pem_error(path: &Path, e: impl std::fmt::Display) -> KeyStoreError {
    KeyStoreError::Pem {
        path: path.to_path_buf(),
        reason: e.to_string(),
    }
}
