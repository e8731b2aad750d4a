use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, info};

use mediguard_crypto::{CanonicalError, MerkleProof, MerkleTree};
use mediguard_ledger::LedgerWriter;
use mediguard_types::Payload;

use crate::error::{PassportError, PassportResult};
use crate::report::ReportRecord;
use crate::store::ReportStore;

/// Where one report ended up after a commit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitReceipt {
    pub report_id: u64,
    pub block_index: u64,
    pub leaf: String,
    pub proof: MerkleProof,
}

/// Anchors batches of reports in the ledger under a single Merkle root.
pub struct ReportCommitter {
    ledger: Arc<dyn LedgerWriter>,
    reports: Arc<dyn ReportStore>,
}

impl ReportCommitter {
    pub fn new(ledger: Arc<dyn LedgerWriter>, reports: Arc<dyn ReportStore>) -> Self {
        Self { ledger, reports }
    }

    /// Commit the reports named by `report_ids` in one block.
    ///
    /// `leaf_fn` decides what each report contributes to the tree;
    /// [`report_leaf`](crate::report_leaf) is the usual choice. Leaves are
    /// ordered as the ids are given. The appended block's data lists the ids
    /// and its `merkle_root` is the tree root. Each report is then written
    /// back with its block index, leaf, and proof.
    pub fn commit<F>(&self, report_ids: &[u64], leaf_fn: F) -> PassportResult<Vec<CommitReceipt>>
    where
        F: Fn(&ReportRecord) -> Result<String, CanonicalError>,
    {
        if report_ids.is_empty() {
            return Err(PassportError::EmptyBatch);
        }

        let mut reports = Vec::with_capacity(report_ids.len());
        for &id in report_ids {
            let report = self
                .reports
                .get(id)?
                .ok_or(PassportError::ReportNotFound(id))?;
            if let Some(previous) = report.blockchain_block_index {
                debug!(report_id = id, previous, "re-committing report");
            }
            reports.push(report);
        }

        let leaves = reports
            .iter()
            .map(&leaf_fn)
            .collect::<Result<Vec<_>, _>>()?;
        let tree = MerkleTree::build(leaves)?;
        let proofs = (0..tree.leaf_count())
            .map(|i| tree.proof(i))
            .collect::<Result<Vec<_>, _>>()?;

        let data = Payload::from_value(json!({
            "type": "report_batch",
            "report_ids": report_ids,
        }));
        let block = self
            .ledger
            .append(data, Some(tree.root().to_string()))?;

        let mut receipts: Vec<CommitReceipt> = Vec::with_capacity(reports.len());
        for ((mut report, leaf), proof) in reports.into_iter().zip(tree.leaves()).zip(proofs) {
            report.blockchain_block_index = Some(block.index);
            report.merkle_leaf = Some(leaf.clone());
            report.merkle_proof = Some(proof.clone());
            if let Err(source) = self.reports.update(&report) {
                let written: Vec<u64> = receipts.iter().map(|r| r.report_id).collect();
                error!(
                    block_index = block.index,
                    failed = report.id,
                    ?written,
                    error = %source,
                    "report write-back failed after block append"
                );
                return Err(PassportError::PartialCommit {
                    block_index: block.index,
                    written,
                    failed: report.id,
                    source,
                });
            }

            receipts.push(CommitReceipt {
                report_id: report.id,
                block_index: block.index,
                leaf: leaf.clone(),
                proof,
            });
        }

        info!(
            block_index = block.index,
            reports = receipts.len(),
            root = %tree.root(),
            "reports committed"
        );
        Ok(receipts)
    }
}
