//! Durable configuration: named JSON regions in flash.
//!
//! All regions live in one JSON object stored as a single NVS blob, so a
//! write is atomic across regions:
//!
//! ```json
//! {"os":{"ssid":"…","pass":"…","url":"http://…","id":"…"},"delay":{"d":60}}
//! ```
//!
//! A missing or unparseable blob (including a region that is not an object)
//! loads as an empty document.

use std::collections::BTreeMap;

use log::{info, warn};
use serde_json::{Map, Value};

use crate::app::ports::{Credentials, StorageError, StoragePort};
use crate::error::ConnectivityError;

const NAMESPACE: &str = "brick";
const KEY: &str = "fsmem";
/// Largest blob accepted from or written to flash.
pub const MAX_BLOB_LEN: usize = 4000;

/// Region owned by the OS.
pub const OS_REGION: &str = "os";
pub const KEY_SSID: &str = "ssid";
pub const KEY_PASS: &str = "pass";
pub const KEY_URL: &str = "url";
pub const KEY_ID: &str = "id";

pub struct DurableRegions<S: StoragePort> {
    storage: S,
    doc: BTreeMap<String, Map<String, Value>>,
}

impl<S: StoragePort> DurableRegions<S> {
    /// Read the document from storage.
    pub fn load(storage: S) -> Self {
        let mut buf = vec![0u8; MAX_BLOB_LEN];
        let doc = match storage.read(NAMESPACE, KEY, &mut buf) {
            Ok(n) => match serde_json::from_slice(&buf[..n]) {
                Ok(doc) => doc,
                Err(_) => {
                    warn!("durable: stored document corrupted, starting empty");
                    BTreeMap::new()
                }
            },
            Err(StorageError::NotFound) => {
                info!("durable: no stored document, starting empty");
                BTreeMap::new()
            }
            Err(e) => {
                warn!("durable: read failed ({}), starting empty", e);
                BTreeMap::new()
            }
        };
        Self { storage, doc }
    }

    /// Mutable view of a region, created empty if missing.
    pub fn region(&mut self, name: &str) -> &mut Map<String, Value> {
        self.doc.entry(name.to_owned()).or_default()
    }

    pub fn region_ref(&self, name: &str) -> Option<&Map<String, Value>> {
        self.doc.get(name)
    }

    pub fn get(&self, region: &str, key: &str) -> Option<&Value> {
        self.doc.get(region)?.get(key)
    }

    /// String value, or `""` when absent or not a string.
    pub fn get_str(&self, region: &str, key: &str) -> &str {
        self.get(region, key).and_then(Value::as_str).unwrap_or("")
    }

    pub fn set(&mut self, region: &str, key: &str, value: impl Into<Value>) {
        self.region(region).insert(key.into(), value.into());
    }

    pub fn contains_key(&self, region: &str, key: &str) -> bool {
        self.get(region, key).is_some()
    }

    /// Insert `default` only if `key` is missing.  Returns `true` if inserted.
    pub fn ensure(&mut self, region: &str, key: &str, default: impl Into<Value>) -> bool {
        if self.contains_key(region, key) {
            return false;
        }
        self.set(region, key, default);
        true
    }

    /// Persist the whole document.
    pub fn write(&mut self) -> Result<(), StorageError> {
        let blob = serde_json::to_vec(&self.doc).map_err(|_| StorageError::IoError)?;
        if blob.len() > MAX_BLOB_LEN {
            return Err(StorageError::Full);
        }
        self.storage.write(NAMESPACE, KEY, &blob)
    }

    /// Clear every region in memory.  Call [`write`](Self::write) to persist.
    pub fn destroy(&mut self) {
        self.doc.clear();
    }

    /// Serialized document, for the diagnostic dump.
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.doc).unwrap_or_default()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    // ── OS region accessors ───────────────────────────────────

    /// Ensure every OS key exists.  Returns `true` if any was added.
    pub fn ensure_os_defaults(&mut self) -> bool {
        let mut added = false;
        for key in [KEY_SSID, KEY_PASS, KEY_URL, KEY_ID] {
            added |= self.ensure(OS_REGION, key, "");
        }
        added
    }

    pub fn ssid(&self) -> &str {
        self.get_str(OS_REGION, KEY_SSID)
    }

    pub fn server_url(&self) -> &str {
        self.get_str(OS_REGION, KEY_URL)
    }

    pub fn brick_id(&self) -> &str {
        self.get_str(OS_REGION, KEY_ID)
    }

    /// Station credentials from the OS region.
    pub fn credentials(&self) -> Result<Credentials, ConnectivityError> {
        let ssid = self.ssid();
        if ssid.is_empty() {
            return Err(ConnectivityError::NoCredentials);
        }
        let mut creds = Credentials::default();
        creds
            .ssid
            .push_str(ssid)
            .map_err(|_| ConnectivityError::InvalidSsid)?;
        creds
            .secret
            .push_str(self.get_str(OS_REGION, KEY_PASS))
            .map_err(|_| ConnectivityError::InvalidPassword)?;
        Ok(creds)
    }
}
