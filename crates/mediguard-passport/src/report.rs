use serde::{Deserialize, Serialize};

use mediguard_crypto::{CanonicalError, ContentHasher, MerkleProof};
use mediguard_types::Payload;

/// A scored health report, as held by a [`ReportStore`](crate::ReportStore).
///
/// The commitment fields are empty until the report is committed by
/// [`ReportCommitter`](crate::ReportCommitter).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReportRecord {
    pub id: u64,
    pub health_score: f64,
    pub triage_category: String,
    pub predicted_class: String,
    /// Free-form report content (features, explanations).
    #[serde(default)]
    pub details: Payload,
    #[serde(default)]
    pub blockchain_block_index: Option<u64>,
    #[serde(default)]
    pub merkle_leaf: Option<String>,
    #[serde(default)]
    pub merkle_proof: Option<MerkleProof>,
}

#[derive(Serialize)]
struct ReportContent<'a> {
    id: u64,
    health_score: f64,
    triage_category: &'a str,
    predicted_class: &'a str,
    details: &'a Payload,
}

impl ReportRecord {
    pub fn new(
        id: u64,
        health_score: f64,
        triage_category: impl Into<String>,
        predicted_class: impl Into<String>,
    ) -> Self {
        Self {
            id,
            health_score,
            triage_category: triage_category.into(),
            predicted_class: predicted_class.into(),
            details: Payload::null(),
            blockchain_block_index: None,
            merkle_leaf: None,
            merkle_proof: None,
        }
    }

    pub fn with_details(mut self, details: Payload) -> Self {
        self.details = details;
        self
    }

    pub fn is_committed(&self) -> bool {
        self.blockchain_block_index.is_some()
    }
}

/// Default Merkle leaf for a report: SHA-256 hex of its canonical content
/// fields. Commitment fields are excluded so the leaf is stable across
/// commits.
pub fn report_leaf(report: &ReportRecord) -> Result<String, CanonicalError> {
    ContentHasher::hash_json(&ReportContent {
        id: report.id,
        health_score: report.health_score,
        triage_category: &report.triage_category,
        predicted_class: &report.predicted_class,
        details: &report.details,
    })
}
