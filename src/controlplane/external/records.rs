//! Wire records of the external cluster secret and their checksum

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use std::collections::BTreeMap;

/// One `{kind, name, data}` entry of the payload array
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalRecord {
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

/// Record kinds understood by the synthesizer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// Connection info of the external engine (monitoring endpoint)
    EngineCluster,
    ConfigMap,
    Secret,
    /// Parameters merged into one of the storage classes
    StorageClass,
    Unknown,
}

impl ExternalRecord {
    pub fn record_kind(&self) -> RecordKind {
        match self.kind.as_str() {
            "EngineCluster" => RecordKind::EngineCluster,
            "ConfigMap" => RecordKind::ConfigMap,
            "Secret" => RecordKind::Secret,
            "StorageClass" => RecordKind::StorageClass,
            _ => RecordKind::Unknown,
        }
    }

    /// Value of a key the record must carry
    pub fn required(&self, key: &str) -> Result<&str> {
        self.data
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| Error::MissingExternalKey {
                record: self.kind.clone(),
                key: key.to_string(),
            })
    }
}

/// Decode the payload bytes into records
pub fn decode_records(payload: &[u8]) -> Result<Vec<ExternalRecord>> {
    serde_json::from_slice(payload).map_err(|e| Error::ExternalSecretMalformed(e.to_string()))
}

/// Hex SHA-512 of the raw payload bytes
pub fn payload_checksum(payload: &[u8]) -> String {
    format!("{:x}", Sha512::digest(payload))
}
