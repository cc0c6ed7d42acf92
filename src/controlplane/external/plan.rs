//! Pure interpretation of the external payload
//!
//! Building a plan performs no I/O: it validates required keys, parses
//! endpoints and groups records by what they produce. Any failure here
//! aborts the pass before a single object is written.

use super::records::{ExternalRecord, RecordKind};
use crate::error::{Error, Result};
use std::collections::BTreeMap;
use tracing::warn;

pub const MONITORING_ENDPOINT_KEY: &str = "MonitoringEndpoint";
pub const MONITORING_PORT_KEY: &str = "MonitoringPort";
/// Reserved key of the object class record carrying the gateway address
pub const GATEWAY_ENDPOINT_KEY: &str = "endpoint";

/// Storage class a `StorageClass` record contributes parameters to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ClassSlot {
    Filesystem,
    Block,
    Object,
}

impl ClassSlot {
    /// Map a record name to its slot
    pub fn from_record_name(name: &str) -> Result<Self> {
        match name {
            "filesystem" => Ok(ClassSlot::Filesystem),
            "block" => Ok(ClassSlot::Block),
            "object" => Ok(ClassSlot::Object),
            other => Err(Error::UnknownStorageClassRecord {
                name: other.to_string(),
            }),
        }
    }
}

/// A `host:port` pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl Endpoint {
    /// Parse `host:port` or `[v6]:port`
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let invalid = |reason: &str| Error::InvalidEndpoint {
            endpoint: raw.to_string(),
            reason: reason.to_string(),
        };
        let (host, port) = raw.rsplit_once(':').ok_or_else(|| invalid("missing port"))?;
        let host = match host.strip_prefix('[') {
            Some(bracketed) => bracketed
                .strip_suffix(']')
                .ok_or_else(|| invalid("missing ']' in address"))?,
            None if host.contains(':') => return Err(invalid("too many colons in address")),
            None => host,
        };
        if host.is_empty() {
            return Err(invalid("empty host"));
        }
        let port = port
            .parse::<u16>()
            .map_err(|_| invalid("port is not a number between 0 and 65535"))?;
        Ok(Self {
            host: host.to_string(),
            port,
        })
    }

    fn from_parts(host: &str, port: &str) -> Result<Self> {
        let host = host.trim();
        let port = port.trim();
        let endpoint = format!("{}:{}", host, port);
        if host.is_empty() {
            return Err(Error::InvalidEndpoint {
                endpoint,
                reason: "empty host".to_string(),
            });
        }
        let port = port.parse::<u16>().map_err(|_| Error::InvalidEndpoint {
            endpoint,
            reason: "port is not a number between 0 and 65535".to_string(),
        })?;
        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

/// Everything the payload asks for, ready to be dispatched and converged
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExternalPlan {
    /// Digest of the payload this plan was built from
    pub checksum: String,
    /// Manager metrics endpoint of the external cluster
    pub monitoring: Option<Endpoint>,
    /// Object gateway of the external cluster
    pub gateway: Option<Endpoint>,
    pub config_maps: Vec<ExternalRecord>,
    pub secrets: Vec<ExternalRecord>,
    /// Parameters each storage class receives on top of its defaults
    pub class_parameters: BTreeMap<ClassSlot, BTreeMap<String, String>>,
}

impl ExternalPlan {
    /// Interpret decoded records
    pub fn build(records: Vec<ExternalRecord>, checksum: String) -> Result<Self> {
        let mut plan = ExternalPlan {
            checksum,
            ..Default::default()
        };

        for mut record in records {
            match record.record_kind() {
                RecordKind::EngineCluster => {
                    let host = record.required(MONITORING_ENDPOINT_KEY)?;
                    let port = record.required(MONITORING_PORT_KEY)?;
                    plan.monitoring = if host.trim().is_empty() {
                        warn!("Empty monitoring endpoint, monitoring stays disabled");
                        None
                    } else {
                        Some(Endpoint::from_parts(host, port)?)
                    };
                }
                RecordKind::ConfigMap => plan.config_maps.push(record),
                RecordKind::Secret => plan.secrets.push(record),
                RecordKind::StorageClass => {
                    let slot = ClassSlot::from_record_name(&record.name)?;
                    if slot == ClassSlot::Object {
                        let raw = record.data.remove(GATEWAY_ENDPOINT_KEY).unwrap_or_default();
                        plan.gateway = if raw.trim().is_empty() {
                            warn!("Empty object gateway endpoint, no object store is synthesized");
                            None
                        } else {
                            Some(Endpoint::parse(&raw)?)
                        };
                    }
                    plan.class_parameters
                        .entry(slot)
                        .or_default()
                        .extend(record.data);
                }
                RecordKind::Unknown => {
                    warn!(kind = %record.kind, name = %record.name, "Skipping unknown external record kind");
                }
            }
        }

        Ok(plan)
    }
}
