use std::sync::Arc;

use tracing::{debug, info, warn};

use mediguard_crypto::{constant_time_eq, ContentHasher, HmacKey, SigningAuthority};
use mediguard_ledger::LedgerReader;
use mediguard_types::{PassportId, Timestamp};

use crate::error::{PassportError, PassportResult};
use crate::passport::{AuditAction, AuditEntry, Passport, PassportPayload, VerificationResult};
use crate::store::{PassportStore, ReportStore};

pub const DEFAULT_VERIFICATION_BASE_URL: &str = "https://mediguard.io/verify";

/// Issues and verifies health passports.
///
/// A passport is authenticated three ways: an HMAC token under a shared
/// secret, a signature from the ledger's authority over the passport hash,
/// and, when a ledger handle is attached, the Merkle inclusion of the
/// underlying report in an intact block.
pub struct PassportManager {
    authority: Arc<SigningAuthority>,
    hmac: HmacKey,
    reports: Arc<dyn ReportStore>,
    passports: Arc<dyn PassportStore>,
    ledger: Option<Arc<dyn LedgerReader>>,
    verification_base_url: String,
}

impl PassportManager {
    pub fn new(
        authority: Arc<SigningAuthority>,
        hmac: HmacKey,
        reports: Arc<dyn ReportStore>,
        passports: Arc<dyn PassportStore>,
    ) -> Self {
        Self {
            authority,
            hmac,
            reports,
            passports,
            ledger: None,
            verification_base_url: DEFAULT_VERIFICATION_BASE_URL.to_string(),
        }
    }

    /// Enable the ledger inclusion check during verification.
    pub fn with_ledger(mut self, ledger: Arc<dyn LedgerReader>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn with_verification_base_url(mut self, url: impl Into<String>) -> Self {
        self.verification_base_url = url.into();
        self
    }

    /// Issue a new passport for a committed report.
    ///
    /// Every call creates an independent passport with a fresh id.
    pub fn issue(&self, report_id: u64) -> PassportResult<Passport> {
        let report = self
            .reports
            .get(report_id)?
            .ok_or(PassportError::ReportNotFound(report_id))?;
        let block_index = report
            .blockchain_block_index
            .ok_or(PassportError::ReportNotCommitted(report_id))?;

        let issued_timestamp = Timestamp::now();
        let merkle_proof = report.merkle_proof.clone().unwrap_or_default();

        let canonical = PassportPayload {
            patient_report_id: report.id,
            health_score: report.health_score,
            triage_category: &report.triage_category,
            predicted_class: &report.predicted_class,
            issued_timestamp: &issued_timestamp,
            blockchain_block_index: block_index,
            merkle_proof: &merkle_proof,
        }
        .canonical()?;

        let passport_hash = ContentHasher::hash(canonical.as_bytes());
        let hmac_token = self.hmac.token(canonical.as_bytes());
        let signature = self.authority.sign(passport_hash.as_bytes());
        let passport_id = PassportId::new();
        let verification_url = self.verification_url(&passport_id, &hmac_token);

        let passport = Passport {
            passport_id,
            patient_report_id: report.id,
            health_score: report.health_score,
            triage_category: report.triage_category,
            predicted_class: report.predicted_class,
            issued_timestamp,
            blockchain_block_index: block_index,
            merkle_proof,
            passport_hash,
            hmac_token,
            signature,
            verification_url,
            audit_trail: vec![AuditEntry::now(AuditAction::Issued)],
        };
        self.passports.insert(&passport)?;

        info!(
            passport_id = %passport.passport_id,
            report_id,
            block_index,
            "passport issued"
        );
        Ok(passport)
    }

    /// Verify a passport against the token its holder presents.
    ///
    /// Store failures are errors; every verification outcome, including
    /// tampering, is a [`VerificationResult`]. Known passports get an audit
    /// entry recording the outcome.
    pub fn verify(&self, passport_id: &PassportId, token: &str) -> PassportResult<VerificationResult> {
        let Some(passport) = self.passports.get(passport_id)? else {
            debug!(%passport_id, "verification of unknown passport");
            return Ok(VerificationResult::invalid("passport not found"));
        };

        let result = if passport.passport_id == *passport_id {
            self.check(&passport, token)?
        } else {
            VerificationResult::tampered("passport id mismatch")
        };

        let action = if result.is_valid() {
            AuditAction::Verified
        } else {
            warn!(
                %passport_id,
                reason = result.reason.as_deref().unwrap_or_default(),
                "passport verification failed"
            );
            AuditAction::VerificationFailed
        };
        if let Err(e) = self.passports.append_audit(passport_id, AuditEntry::now(action)) {
            warn!(%passport_id, error = %e, "failed to record audit entry");
        }

        Ok(result)
    }

    fn verification_url(&self, passport_id: &PassportId, token: &str) -> String {
        format!(
            "{}?passport_id={}&token={}",
            self.verification_base_url, passport_id, token
        )
    }

    /// Every stored field except the audit trail is checked: payload fields
    /// through the token and signature, derived fields against their
    /// recomputed values.
    fn check(&self, passport: &Passport, token: &str) -> PassportResult<VerificationResult> {
        let canonical = passport.payload().canonical()?;

        let recomputed = self.hmac.token(canonical.as_bytes());
        if !constant_time_eq(&recomputed, token) && !constant_time_eq(&passport.hmac_token, token)
        {
            return Ok(VerificationResult::tampered("invalid HMAC token"));
        }

        let passport_hash = ContentHasher::hash(canonical.as_bytes());
        if !self
            .authority
            .verify(passport_hash.as_bytes(), &passport.signature)
        {
            return Ok(VerificationResult::tampered("invalid signature"));
        }
        if !constant_time_eq(&passport_hash, &passport.passport_hash) {
            return Ok(VerificationResult::tampered("passport hash mismatch"));
        }
        if !constant_time_eq(&recomputed, &passport.hmac_token) {
            return Ok(VerificationResult::tampered("stored HMAC token mismatch"));
        }
        // Rebuilt with this manager's base URL, so passports issued under a
        // different base URL fail here.
        if passport.verification_url != self.verification_url(&passport.passport_id, &recomputed) {
            return Ok(VerificationResult::tampered("verification URL mismatch"));
        }

        if let Some(problem) = self.inclusion_problem(passport)? {
            return Ok(VerificationResult::tampered(format!(
                "ledger inclusion check failed: {problem}"
            )));
        }

        Ok(VerificationResult::valid())
    }

    /// Check that the passport's report is still anchored in its block.
    /// Skipped without a ledger handle or when the report has no leaf.
    fn inclusion_problem(&self, passport: &Passport) -> PassportResult<Option<String>> {
        let Some(ledger) = &self.ledger else {
            return Ok(None);
        };
        let Some(report) = self.reports.get(passport.patient_report_id)? else {
            warn!(
                passport_id = %passport.passport_id,
                report_id = passport.patient_report_id,
                "report missing; ledger inclusion check skipped"
            );
            return Ok(None);
        };
        let Some(leaf) = report.merkle_leaf else {
            debug!(
                report_id = report.id,
                "report has no merkle leaf; ledger inclusion check skipped"
            );
            return Ok(None);
        };

        let index = passport.blockchain_block_index;
        let Some(block) = ledger.get(index)? else {
            return Ok(Some(format!("block {index} not found")));
        };
        if !ledger.is_authentic(&block) {
            return Ok(Some(format!("block {index} failed its integrity check")));
        }
        let Some(root) = block.merkle_root.as_deref() else {
            return Ok(Some(format!("block {index} has no merkle root")));
        };
        if !passport.merkle_proof.verify(&leaf, root) {
            return Ok(Some(format!(
                "report {} is not committed under block {index}",
                passport.patient_report_id
            )));
        }
        Ok(None)
    }
}
