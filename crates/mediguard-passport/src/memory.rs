//! In-memory stores for testing and ephemeral use.
//!
//! Both stores keep their records in a `HashMap` behind a `RwLock`. Data is
//! lost when the store is dropped.

use std::collections::HashMap;
use std::sync::RwLock;

use mediguard_types::PassportId;

use crate::error::{StoreError, StoreResult};
use crate::passport::{AuditEntry, Passport};
use crate::report::ReportRecord;
use crate::store::{PassportStore, ReportStore};

#[derive(Debug, Default)]
pub struct InMemoryReportStore {
    reports: RwLock<HashMap<u64, ReportRecord>>,
}

impl InMemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `reports`.
    pub fn with_reports(reports: impl IntoIterator<Item = ReportRecord>) -> Self {
        Self {
            reports: RwLock::new(reports.into_iter().map(|r| (r.id, r)).collect()),
        }
    }

    pub fn len(&self) -> StoreResult<usize> {
        let reports = self.reports.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(reports.len())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }
}

impl ReportStore for InMemoryReportStore {
    fn get(&self, id: u64) -> StoreResult<Option<ReportRecord>> {
        let reports = self.reports.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(reports.get(&id).cloned())
    }

    fn update(&self, report: &ReportRecord) -> StoreResult<()> {
        let mut reports = self.reports.write().map_err(|_| StoreError::LockPoisoned)?;
        reports.insert(report.id, report.clone());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryPassportStore {
    passports: RwLock<HashMap<PassportId, Passport>>,
}

impl InMemoryPassportStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> StoreResult<usize> {
        let passports = self.passports.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(passports.len())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Overwrite a stored passport, bypassing the write-once rule.
    ///
    /// Exists so tests can simulate tampering with persisted state.
    pub fn replace(&self, passport: Passport) -> StoreResult<()> {
        let mut passports = self.passports.write().map_err(|_| StoreError::LockPoisoned)?;
        passports.insert(passport.passport_id.clone(), passport);
        Ok(())
    }
}

impl PassportStore for InMemoryPassportStore {
    fn get(&self, id: &PassportId) -> StoreResult<Option<Passport>> {
        let passports = self.passports.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(passports.get(id).cloned())
    }

    fn insert(&self, passport: &Passport) -> StoreResult<()> {
        let mut passports = self.passports.write().map_err(|_| StoreError::LockPoisoned)?;
        if passports.contains_key(&passport.passport_id) {
            return Err(StoreError::DuplicatePassport(passport.passport_id.clone()));
        }
        passports.insert(passport.passport_id.clone(), passport.clone());
        Ok(())
    }

    fn append_audit(&self, id: &PassportId, entry: AuditEntry) -> StoreResult<()> {
        let mut passports = self.passports.write().map_err(|_| StoreError::LockPoisoned)?;
        let passport = passports
            .get_mut(id)
            .ok_or_else(|| StoreError::PassportNotFound(id.clone()))?;
        passport.audit_trail.push(entry);
        Ok(())
    }
}
