//! Signing key material and the identifiers derived from it.
//!
//! The service signs registry tokens with one RSA key pair read from disk.
//! Two stable identifiers are derived from it and cached for the life of the
//! process:
//!
//! - the **key id** (`kid` header), a fingerprint of the certificate's public key in the
//!   format registries compute from the same certificate;
//! - the **admin token**, a UUID-shaped secret derived from the private key that
//!   authenticates internal automation.
//!
//! # Key id format
//!
//! SHA-256 of the DER `SubjectPublicKeyInfo`, truncated to 30 bytes,
//! encoded 5 bits at a time (most significant first) with the alphabet
//! `A-Z2-7`, then grouped in blocks of four separated by `:`:
//!
//! ```text
//! 7334:4BQC:JI4L:JOWY:ZNNL:A22C:HOUF:3SMF:JIDM:OLZF:6Z4Q:5OSD
//! ```

use std::{
    path::{Path, PathBuf},
    sync::OnceLock,
};

use jsonwebtoken::{DecodingKey, EncodingKey};
use sha2::{Digest, Sha256};
use x509_parser::{pem::parse_x509_pem, public_key::PublicKey};
use zeroize::Zeroizing;

use crate::{
    config::RegistryAuthConfig,
    error::{AuthError, Result},
};

/// Symbols used by the key id encoding.
pub const KEY_ID_ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// Number of digest bytes fed to the key id encoding.
pub const KEY_ID_DIGEST_BYTES: usize = 30;

/// Characters per `:`-separated key id group.
pub const KEY_ID_GROUP_LEN: usize = 4;

/// Loads the service key pair and caches the identifiers derived from it.
///
/// Shared as `Arc<KeyMaterial>` for the process lifetime. The key files are
/// read on every call that needs them; only the admin token and key id are
/// cached. Both caches are set-if-empty: concurrent first calls may compute
/// the value twice, and both computations agree.
#[derive(Debug)]
pub struct KeyMaterial {
    private_key_path: PathBuf,
    certificate_path: PathBuf,
    admin_token: OnceLock<String>,
    key_id: OnceLock<String>,
}

impl KeyMaterial {
    /// Creates a provider for the given PEM files. Nothing is read yet.
    #[must_use]
    pub fn new(private_key_path: impl Into<PathBuf>, certificate_path: impl Into<PathBuf>) -> Self {
        Self {
            private_key_path: private_key_path.into(),
            certificate_path: certificate_path.into(),
            admin_token: OnceLock::new(),
            key_id: OnceLock::new(),
        }
    }

    /// Creates a provider from the service configuration.
    #[must_use]
    pub fn from_config(config: &RegistryAuthConfig) -> Self {
        Self::new(config.private_key_path.clone(), config.certificate_path.clone())
    }

    /// Path of the private key file.
    #[must_use]
    pub fn private_key_path(&self) -> &Path {
        &self.private_key_path
    }

    /// Path of the certificate file.
    #[must_use]
    pub fn certificate_path(&self) -> &Path {
        &self.certificate_path
    }

    /// Reads the private key PEM. The buffer is wiped on drop.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::KeyLoad`] if the file is unreadable or not UTF-8.
    pub async fn private_key(&self) -> Result<Zeroizing<String>> {
        read_pem(&self.private_key_path).await.map(Zeroizing::new)
    }

    /// Reads the certificate PEM.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::KeyLoad`] if the file is unreadable or not UTF-8.
    pub async fn public_key(&self) -> Result<String> {
        read_pem(&self.certificate_path).await
    }

    /// Builds the RS256 signing key.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::KeyLoad`] if the file cannot be read or is not an
    /// RSA private key.
    pub async fn encoding_key(&self) -> Result<EncodingKey> {
        let pem = self.private_key().await?;
        EncodingKey::from_rsa_pem(pem.as_bytes())
            .map_err(|e| AuthError::key_load(&self.private_key_path, e.to_string()))
    }

    /// Builds the RS256 verification key from the certificate.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::KeyLoad`] if the certificate cannot be parsed or
    /// does not carry an RSA public key.
    pub async fn decoding_key(&self) -> Result<DecodingKey> {
        let pem = self.public_key().await?;
        let path = &self.certificate_path;
        with_subject_public_key(path, &pem, |spki| match spki.parsed() {
            Ok(PublicKey::RSA(_)) => {
                Ok(DecodingKey::from_rsa_der(spki.subject_public_key.data.as_ref()))
            },
            Ok(_) => Err(AuthError::key_load(path, "certificate does not hold an RSA key")),
            Err(e) => Err(AuthError::key_load(path, e.to_string())),
        })
    }

    /// Returns the admin token, computing it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::KeyLoad`] if the private key cannot be read.
    pub async fn admin_token(&self) -> Result<String> {
        if let Some(token) = self.admin_token.get() {
            return Ok(token.clone());
        }

        let pem = self.private_key().await?;
        let token = derive_admin_token(pem.as_bytes());
        tracing::debug!("Derived admin token from private key");
        Ok(self.admin_token.get_or_init(|| token).clone())
    }

    /// Returns the key id, computing it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::KeyLoad`] if the certificate cannot be read or
    /// parsed.
    pub async fn key_id(&self) -> Result<String> {
        if let Some(kid) = self.key_id.get() {
            return Ok(kid.clone());
        }

        let pem = self.public_key().await?;
        let kid = with_subject_public_key(&self.certificate_path, &pem, |spki| {
            let digest = Sha256::digest(spki.raw);
            format_key_id(&digest[..KEY_ID_DIGEST_BYTES])
        })?;
        tracing::debug!(kid = %kid, "Derived key id from certificate");
        Ok(self.key_id.get_or_init(|| kid).clone())
    }

    /// Reads both keys and primes both caches so misconfiguration is
    /// reported at startup rather than on the first token request.
    ///
    /// # Errors
    ///
    /// Returns the first key error encountered.
    pub async fn preload(&self) -> Result<()> {
        self.encoding_key().await?;
        self.decoding_key().await?;
        self.admin_token().await?;
        let kid = self.key_id().await?;
        tracing::info!(
            kid = %kid,
            private_key = %self.private_key_path.display(),
            certificate = %self.certificate_path.display(),
            "Loaded registry signing key"
        );
        Ok(())
    }
}

async fn read_pem(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path).await.map_err(|e| AuthError::key_load(path, e.to_string()))
}

fn with_subject_public_key<T>(
    path: &Path,
    pem: &str,
    f: impl FnOnce(&x509_parser::x509::SubjectPublicKeyInfo<'_>) -> Result<T>,
) -> Result<T> {
    let (_, pem) = parse_x509_pem(pem.as_bytes())
        .map_err(|e| AuthError::key_load(path, format!("invalid PEM: {e}")))?;
    let cert =
        pem.parse_x509().map_err(|e| AuthError::key_load(path, format!("invalid certificate: {e}")))?;
    f(cert.public_key())
}

/// Derives the admin token from private key bytes.
///
/// The first 16 bytes of the key's SHA-256 digest, with the UUID version 4
/// and RFC 4122 variant bits forced, formatted as a hyphenated UUID.
#[must_use]
pub fn derive_admin_token(private_key: &[u8]) -> String {
    let digest = Sha256::digest(private_key);
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    uuid::Builder::from_random_bytes(bytes).into_uuid().hyphenated().to_string()
}

/// Encodes digest bytes as a key id.
///
/// # Errors
///
/// Returns [`AuthError::InvalidKeyLength`] unless the input is a whole
/// number of 40-bit blocks.
///
/// # Examples
///
/// ```
/// use registry_auth_authn::keys::format_key_id;
///
/// assert_eq!(format_key_id(&[0u8; 5]).unwrap(), "AAAA:AAAA");
/// assert_eq!(format_key_id(&[0xFF; 5]).unwrap(), "7777:7777");
/// assert!(format_key_id(&[0u8; 4]).is_err());
/// ```
pub fn format_key_id(bytes: &[u8]) -> Result<String> {
    let bits = bytes.len() * 8;
    if bits % 40 != 0 {
        return Err(AuthError::InvalidKeyLength { bits });
    }

    let symbols = bits / 5;
    let mut out = String::with_capacity(symbols + symbols / KEY_ID_GROUP_LEN);
    let mut buffer: u16 = 0;
    let mut pending = 0u32;
    let mut written = 0usize;

    for &byte in bytes {
        buffer = (buffer << 8) | u16::from(byte);
        pending += 8;
        while pending >= 5 {
            pending -= 5;
            if written > 0 && written % KEY_ID_GROUP_LEN == 0 {
                out.push(':');
            }
            let index = usize::from((buffer >> pending) & 0x1F);
            out.push(char::from(KEY_ID_ALPHABET[index]));
            written += 1;
        }
        buffer &= (1 << pending) - 1;
    }

    Ok(out)
}
