//! Pinned-certificate trust store backed by a line-oriented file.
//!
//! Each record is `host:port<TAB>sha256-hex`. The file is re-read on every
//! lookup; the store never keeps decisions in memory.

use gd_core::DpiError;
use gd_core::DpiResult;
use gd_core::ErrorKind;
use sha2::Digest;
use sha2::Sha256;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

/// Result of comparing a presented certificate with the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PinVerdict {
    Matches,
    NotPinned,
    /// A different certificate was pinned for this host.
    Changed { pinned: String },
}

/// File-backed map of `host:port` to pinned certificate fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustStore {
    path: PathBuf,
}

impl TrustStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lookup(&self, host_port: &str) -> DpiResult<Option<String>> {
        let key = record_key(host_port)?;
        let map = read_pin_map(&self.path)?;
        Ok(map.get(&key).cloned())
    }

    pub fn verdict(&self, host_port: &str, fingerprint: &str) -> DpiResult<PinVerdict> {
        let verdict = match self.lookup(host_port)? {
            None => PinVerdict::NotPinned,
            Some(pinned) if pinned.eq_ignore_ascii_case(fingerprint) => PinVerdict::Matches,
            Some(pinned) => PinVerdict::Changed { pinned },
        };
        Ok(verdict)
    }

    /// Stores `fingerprint` for `host_port`, replacing any previous pin.
    pub fn pin(&self, host_port: &str, fingerprint: &str) -> DpiResult<()> {
        let key = record_key(host_port)?;
        if fingerprint.is_empty() || !fingerprint.chars().all(|ch| ch.is_ascii_hexdigit()) {
            return Err(DpiError::new(
                ErrorKind::Storage,
                format!("refusing to pin malformed fingerprint `{fingerprint}`"),
            ));
        }

        let mut map = read_pin_map(&self.path)?;
        map.insert(key, fingerprint.to_ascii_lowercase());
        write_pin_map(&self.path, &map)?;
        tracing::info!(host = host_port, path = %self.path.display(), "certificate pinned");
        Ok(())
    }
}

/// SHA-256 fingerprint of a DER certificate as lower-case hex.
pub fn fingerprint(cert_der: &[u8]) -> String {
    format!("{:x}", Sha256::digest(cert_der))
}

fn record_key(host_port: &str) -> DpiResult<String> {
    let key = host_port.trim().to_ascii_lowercase();
    if key.is_empty() || key.chars().any(char::is_whitespace) {
        return Err(DpiError::new(
            ErrorKind::Storage,
            format!("invalid trust store key `{host_port}`"),
        ));
    }
    Ok(key)
}

fn read_pin_map(path: &Path) -> DpiResult<BTreeMap<String, String>> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }

    let content = fs::read_to_string(path).map_err(|error| {
        DpiError::new(
            ErrorKind::Storage,
            format!("failed to read trust store `{}`: {error}", path.display()),
        )
    })?;

    let mut map = BTreeMap::new();
    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let (key, fingerprint) = line.split_once('\t').ok_or_else(|| {
            DpiError::new(
                ErrorKind::Storage,
                format!(
                    "invalid record format at `{}` line {}",
                    path.display(),
                    index + 1
                ),
            )
        })?;

        map.insert(key.to_owned(), fingerprint.trim().to_owned());
    }

    Ok(map)
}

fn write_pin_map(path: &Path, map: &BTreeMap<String, String>) -> DpiResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|error| {
            DpiError::new(
                ErrorKind::Storage,
                format!(
                    "failed to create trust store directory `{}`: {error}",
                    parent.display()
                ),
            )
        })?;
    }

    let mut encoded = String::new();
    for (key, fingerprint) in map {
        encoded.push_str(key);
        encoded.push('\t');
        encoded.push_str(fingerprint);
        encoded.push('\n');
    }

    fs::write(path, encoded).map_err(|error| {
        DpiError::new(
            ErrorKind::Storage,
            format!("failed to write trust store `{}`: {error}", path.display()),
        )
    })
}
