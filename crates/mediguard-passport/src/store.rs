use mediguard_types::PassportId;

use crate::error::StoreResult;
use crate::passport::{AuditEntry, Passport};
use crate::report::ReportRecord;

/// Access to scored reports.
///
/// The passport layer only reads reports and writes back commitment
/// results; creating and scoring reports is the caller's business.
pub trait ReportStore: Send + Sync {
    /// Look up a report by id.
    fn get(&self, id: u64) -> StoreResult<Option<ReportRecord>>;

    /// Insert or replace a report.
    fn update(&self, report: &ReportRecord) -> StoreResult<()>;
}

/// Persistence for issued passports.
///
/// Passports are write-once; only the audit trail grows after insertion.
pub trait PassportStore: Send + Sync {
    fn get(&self, id: &PassportId) -> StoreResult<Option<Passport>>;

    /// Store a new passport. Fails if the id is already taken.
    fn insert(&self, passport: &Passport) -> StoreResult<()>;

    /// Append to a stored passport's audit trail.
    fn append_audit(&self, id: &PassportId, entry: AuditEntry) -> StoreResult<()>;
}
