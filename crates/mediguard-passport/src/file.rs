//! JSON-file stores.
//!
//! Each store keeps the whole map in memory and rewrites the file on every
//! change through the ledger's atomic temp-file-and-rename writer. A change
//! becomes visible in memory only after it has been persisted.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use mediguard_ledger::write_json_atomic;
use mediguard_types::PassportId;

use crate::error::{StoreError, StoreResult};
use crate::passport::{AuditEntry, Passport};
use crate::report::ReportRecord;
use crate::store::{PassportStore, ReportStore};

#[derive(Debug)]
struct JsonMap<K, V> {
    path: PathBuf,
    entries: RwLock<BTreeMap<K, V>>,
}

impl<K, V> JsonMap<K, V>
where
    K: Ord + Clone + Serialize + DeserializeOwned,
    V: Clone + Serialize + DeserializeOwned,
{
    fn open(path: &Path) -> StoreResult<Self> {
        let entries = match fs::read(path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupt {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Ok(Self {
            path: path.to_path_buf(),
            entries: RwLock::new(entries),
        })
    }

    fn get(&self, key: &K) -> StoreResult<Option<V>> {
        let entries = self.entries.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn len(&self) -> StoreResult<usize> {
        let entries = self.entries.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(entries.len())
    }

    /// Apply `change` to a copy of the map, persist the copy, then swap it
    /// in.
    fn modify<F>(&self, change: F) -> StoreResult<()>
    where
        F: FnOnce(&mut BTreeMap<K, V>) -> StoreResult<()>,
    {
        let mut entries = self.entries.write().map_err(|_| StoreError::LockPoisoned)?;
        let mut next = entries.clone();
        change(&mut next)?;
        write_json_atomic(&self.path, &next)?;
        debug!(path = %self.path.display(), entries = next.len(), "store persisted");
        *entries = next;
        Ok(())
    }
}

/// Report store persisted as a JSON object keyed by report id.
#[derive(Debug)]
pub struct JsonReportStore {
    map: JsonMap<u64, ReportRecord>,
}

impl JsonReportStore {
    /// Open the store, loading `path` if it exists.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Ok(Self {
            map: JsonMap::open(path.as_ref())?,
        })
    }

    pub fn path(&self) -> &Path {
        &self.map.path
    }

    pub fn len(&self) -> StoreResult<usize> {
        self.map.len()
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }
}

impl ReportStore for JsonReportStore {
    fn get(&self, id: u64) -> StoreResult<Option<ReportRecord>> {
        self.map.get(&id)
    }

    fn update(&self, report: &ReportRecord) -> StoreResult<()> {
        self.map.modify(|reports| {
            reports.insert(report.id, report.clone());
            Ok(())
        })
    }
}

/// Passport store persisted as a JSON object keyed by passport id.
#[derive(Debug)]
pub struct JsonPassportStore {
    map: JsonMap<PassportId, Passport>,
}

impl JsonPassportStore {
    /// Open the store, loading `path` if it exists.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Ok(Self {
            map: JsonMap::open(path.as_ref())?,
        })
    }

    pub fn path(&self) -> &Path {
        &self.map.path
    }

    pub fn len(&self) -> StoreResult<usize> {
        self.map.len()
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }
}

impl PassportStore for JsonPassportStore {
    fn get(&self, id: &PassportId) -> StoreResult<Option<Passport>> {
        self.map.get(id)
    }

    fn insert(&self, passport: &Passport) -> StoreResult<()> {
        self.map.modify(|passports| {
            if passports.contains_key(&passport.passport_id) {
                return Err(StoreError::DuplicatePassport(passport.passport_id.clone()));
            }
            passports.insert(passport.passport_id.clone(), passport.clone());
            Ok(())
        })
    }

    fn append_audit(&self, id: &PassportId, entry: AuditEntry) -> StoreResult<()> {
        self.map.modify(|passports| {
            let passport = passports
                .get_mut(id)
                .ok_or_else(|| StoreError::PassportNotFound(id.clone()))?;
            passport.audit_trail.push(entry);
            Ok(())
        })
    }
}
