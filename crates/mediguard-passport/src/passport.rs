use std::fmt;

use serde::{Deserialize, Serialize};

use mediguard_crypto::{canonical_json, CanonicalError, ContentHasher, MerkleProof};
use mediguard_types::{PassportId, Timestamp};

/// An issued health passport. Immutable apart from its audit trail.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Passport {
    pub passport_id: PassportId,
    pub patient_report_id: u64,
    pub health_score: f64,
    pub triage_category: String,
    pub predicted_class: String,
    pub issued_timestamp: Timestamp,
    pub blockchain_block_index: u64,
    pub merkle_proof: MerkleProof,
    /// SHA-256 hex of the canonical [`PassportPayload`].
    pub passport_hash: String,
    /// HMAC-SHA256 hex of the canonical [`PassportPayload`].
    pub hmac_token: String,
    /// Base64 signature over the UTF-8 bytes of `passport_hash`.
    pub signature: String,
    /// Link a QR code would encode. Not covered by hash or token.
    pub verification_url: String,
    pub audit_trail: Vec<AuditEntry>,
}

/// The authenticated portion of a passport.
///
/// The passport id, derived values, and audit trail are deliberately not
/// part of it.
#[derive(Clone, Debug, Serialize)]
pub struct PassportPayload<'a> {
    pub patient_report_id: u64,
    pub health_score: f64,
    pub triage_category: &'a str,
    pub predicted_class: &'a str,
    pub issued_timestamp: &'a Timestamp,
    pub blockchain_block_index: u64,
    pub merkle_proof: &'a MerkleProof,
}

impl PassportPayload<'_> {
    pub fn canonical(&self) -> Result<String, CanonicalError> {
        canonical_json(self)
    }

    pub fn hash(&self) -> Result<String, CanonicalError> {
        Ok(ContentHasher::hash(self.canonical()?.as_bytes()))
    }
}

impl Passport {
    /// Rebuild the authenticated payload from the stored fields.
    pub fn payload(&self) -> PassportPayload<'_> {
        PassportPayload {
            patient_report_id: self.patient_report_id,
            health_score: self.health_score,
            triage_category: &self.triage_category,
            predicted_class: &self.predicted_class,
            issued_timestamp: &self.issued_timestamp,
            blockchain_block_index: self.blockchain_block_index,
            merkle_proof: &self.merkle_proof,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Issued,
    Verified,
    VerificationFailed,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Issued => "issued",
            Self::Verified => "verified",
            Self::VerificationFailed => "verification_failed",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub action: AuditAction,
    pub timestamp: Timestamp,
}

impl AuditEntry {
    /// Entry stamped with the current time.
    pub fn now(action: AuditAction) -> Self {
        Self {
            action,
            timestamp: Timestamp::now(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerificationStatus {
    Valid,
    Tampered,
    Invalid,
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Valid => "Valid",
            Self::Tampered => "Tampered",
            Self::Invalid => "Invalid",
        };
        f.write_str(s)
    }
}

/// Outcome of [`PassportManager::verify`](crate::PassportManager::verify).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub status: VerificationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl VerificationResult {
    pub fn valid() -> Self {
        Self {
            status: VerificationStatus::Valid,
            reason: None,
        }
    }

    pub fn tampered(reason: impl Into<String>) -> Self {
        Self {
            status: VerificationStatus::Tampered,
            reason: Some(reason.into()),
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            status: VerificationStatus::Invalid,
            reason: Some(reason.into()),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.status == VerificationStatus::Valid
    }
}
