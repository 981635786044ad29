use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::SpoolError;
use crate::validation::validate_service_name;

/// Current state of a single service.
///
/// A service with no persisted marker is implicitly up; `Down` carries the
/// reason text, which may be empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceState {
    Up,
    Down { reason: String },
}

impl ServiceState {
    pub fn is_up(&self) -> bool {
        matches!(self, ServiceState::Up)
    }

    pub fn reason(&self) -> &str {
        match self {
            ServiceState::Up => "",
            ServiceState::Down { reason } => reason,
        }
    }
}

/// One down-marker as reported by `status_all_down`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownRecord {
    pub service: String,
    pub reason: String,
    pub since: DateTime<Utc>,
}

/// On-disk marker record. The service name is the file name, not a field.
#[derive(Debug, Serialize, Deserialize)]
struct Marker {
    #[serde(default)]
    reason: String,
    since: DateTime<Utc>,
}

/// Capability interface for a per-service health store.
///
/// `Spool` is the directory-backed implementation; `MemoryStore` is a
/// map-backed one suitable as a test double.
pub trait StatusStore {
    /// Remove any down-marker for `service`. Succeeds when none exists.
    fn up(&mut self, service: &str) -> Result<(), SpoolError>;

    /// Create or overwrite the down-marker for `service`. Repeated calls
    /// replace the stored reason (last write wins).
    fn down(&mut self, service: &str, reason: &str) -> Result<(), SpoolError>;

    /// Report the current state of `service` without mutating anything.
    fn status(&self, service: &str) -> Result<ServiceState, SpoolError>;

    /// One record per service currently marked down, sorted by service name.
    fn status_all_down(&self) -> Result<Vec<DownRecord>, SpoolError>;
}

/// Directory-backed store: one marker file per down service, JSON-encoded.
#[derive(Debug)]
pub struct Spool {
    root: PathBuf,
}

impl Spool {
    /// Bind the store to an existing directory.
    ///
    /// Fails when the directory does not exist or, with `needs_write`, when
    /// it is not writable. Safe to call repeatedly for the same path.
    pub fn configure(root: impl Into<PathBuf>, needs_write: bool) -> Result<Self, SpoolError> {
        let root = root.into();

        let meta = fs::metadata(&root).map_err(|e| SpoolError::Configuration {
            path: root.clone(),
            detail: e.to_string(),
        })?;
        if !meta.is_dir() {
            return Err(SpoolError::Configuration {
                path: root,
                detail: "not a directory".to_string(),
            });
        }
        if needs_write {
            probe_writable(&root)?;
        }

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn marker_path(&self, service: &str) -> PathBuf {
        self.root.join(service)
    }

    /// Distinguish "no marker" from "spool directory gone" after a NotFound.
    /// The directory disappearing between configure and use is a store
    /// failure, not an implicitly-up service.
    fn check_root(&self) -> Result<(), SpoolError> {
        if self.root.is_dir() {
            Ok(())
        } else {
            Err(SpoolError::Store {
                path: self.root.clone(),
                source: std::io::Error::new(ErrorKind::NotFound, "spool directory is gone"),
            })
        }
    }
}

/// Verify write access by touching and removing a dot-prefixed probe file.
/// Dot-prefixed names are invisible to `status_all_down`.
fn probe_writable(root: &Path) -> Result<(), SpoolError> {
    let probe = root.join(format!(".write-probe.{}", std::process::id()));
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&probe)
        .map_err(|e| SpoolError::Configuration {
            path: root.to_path_buf(),
            detail: format!("not writable: {}", e),
        })?;
    let _ = fs::remove_file(&probe);
    Ok(())
}

impl StatusStore for Spool {
    fn up(&mut self, service: &str) -> Result<(), SpoolError> {
        validate_service_name(service)?;
        let path = self.marker_path(service);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            // No marker means the service is already up
            Err(e) if e.kind() == ErrorKind::NotFound => self.check_root(),
            Err(source) => Err(SpoolError::Store { path, source }),
        }
    }

    fn down(&mut self, service: &str, reason: &str) -> Result<(), SpoolError> {
        validate_service_name(service)?;
        let marker = Marker {
            reason: reason.to_string(),
            since: Utc::now(),
        };
        let json = serde_json::to_string(&marker).map_err(|e| SpoolError::Store {
            path: self.marker_path(service),
            source: e.into(),
        })?;

        // Write to a dot-prefixed temp file then rename, so a concurrent
        // reader never sees a partial record.
        let path = self.marker_path(service);
        let tmp = self
            .root
            .join(format!(".{}.tmp.{}", service, std::process::id()));
        fs::write(&tmp, json).map_err(|source| SpoolError::Store {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| SpoolError::Store { path, source })
    }

    fn status(&self, service: &str) -> Result<ServiceState, SpoolError> {
        validate_service_name(service)?;
        let path = self.marker_path(service);
        match fs::read_to_string(&path) {
            Ok(contents) => {
                let marker: Marker = serde_json::from_str(&contents)
                    .map_err(|source| SpoolError::Corrupt { path, source })?;
                Ok(ServiceState::Down {
                    reason: marker.reason,
                })
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.check_root()?;
                Ok(ServiceState::Up)
            }
            Err(source) => Err(SpoolError::Store { path, source }),
        }
    }

    fn status_all_down(&self) -> Result<Vec<DownRecord>, SpoolError> {
        let read_err = |source| SpoolError::Store {
            path: self.root.clone(),
            source,
        };

        let mut down = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(read_err)? {
            let entry = entry.map_err(read_err)?;
            let path = entry.path();
            let name = match path.file_name().and_then(|n| n.to_str()) {
                Some(n) => n.to_string(),
                None => continue,
            };
            // Skip temp files, probes, and anything that is not a marker
            if name.starts_with('.') {
                continue;
            }
            if !path.is_file() {
                continue;
            }
            let contents = match fs::read_to_string(&path) {
                Ok(c) => c,
                // Marker removed by a concurrent `up` mid-scan
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(source) => return Err(SpoolError::Store { path, source }),
            };
            let marker: Marker = serde_json::from_str(&contents)
                .map_err(|source| SpoolError::Corrupt { path, source })?;
            down.push(DownRecord {
                service: name,
                reason: marker.reason,
                since: marker.since,
            });
        }

        down.sort_by(|a, b| a.service.cmp(&b.service));
        Ok(down)
    }
}

/// In-memory store conforming to `StatusStore`, used as a test double for
/// code that only needs the capability interface.
#[derive(Debug, Default)]
pub struct MemoryStore {
    markers: BTreeMap<String, (String, DateTime<Utc>)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StatusStore for MemoryStore {
    fn up(&mut self, service: &str) -> Result<(), SpoolError> {
        validate_service_name(service)?;
        self.markers.remove(service);
        Ok(())
    }

    fn down(&mut self, service: &str, reason: &str) -> Result<(), SpoolError> {
        validate_service_name(service)?;
        self.markers
            .insert(service.to_string(), (reason.to_string(), Utc::now()));
        Ok(())
    }

    fn status(&self, service: &str) -> Result<ServiceState, SpoolError> {
        validate_service_name(service)?;
        match self.markers.get(service) {
            Some((reason, _)) => Ok(ServiceState::Down {
                reason: reason.clone(),
            }),
            None => Ok(ServiceState::Up),
        }
    }

    fn status_all_down(&self) -> Result<Vec<DownRecord>, SpoolError> {
        Ok(self
            .markers
            .iter()
            .map(|(service, (reason, since))| DownRecord {
                service: service.clone(),
                reason: reason.clone(),
                since: *since,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_round_trip() {
        let mut store = MemoryStore::new();
        assert_eq!(store.status("web").unwrap(), ServiceState::Up);

        store.down("web", "maint").unwrap();
        assert_eq!(
            store.status("web").unwrap(),
            ServiceState::Down {
                reason: "maint".to_string()
            }
        );

        store.up("web").unwrap();
        assert_eq!(store.status("web").unwrap(), ServiceState::Up);
    }

    #[test]
    fn test_memory_store_last_write_wins() {
        let mut store = MemoryStore::new();
        store.down("web", "first").unwrap();
        store.down("web", "second").unwrap();
        assert_eq!(store.status("web").unwrap().reason(), "second");
    }

    #[test]
    fn test_memory_store_rejects_invalid_names() {
        let mut store = MemoryStore::new();
        assert!(store.down("", "x").is_err());
        assert!(store.status("../escape").is_err());
    }

    #[test]
    fn test_service_state_accessors() {
        assert!(ServiceState::Up.is_up());
        assert_eq!(ServiceState::Up.reason(), "");

        let down = ServiceState::Down {
            reason: "drained".to_string(),
        };
        assert!(!down.is_up());
        assert_eq!(down.reason(), "drained");
    }
}
