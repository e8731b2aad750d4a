use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context};
use colored::Colorize;
use serde::Serialize;
use serde_json::{json, Value};

use mediguard_crypto::{HmacKey, MerkleProof, MerkleTree, SecretString, SigningAuthority};
use mediguard_ledger::{Block, IntegrityReport, Ledger};
use mediguard_passport::{
    report_leaf, JsonPassportStore, JsonReportStore, Passport, PassportManager, PassportStore,
    ReportCommitter, ReportRecord, ReportStore, VerificationResult, VerificationStatus,
};
use mediguard_types::{PassportId, Payload};

use crate::cli::*;
use crate::config::MediguardConfig;

/// Whether a command's check passed. Failed checks exit non-zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

impl From<Outcome> for ExitCode {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Success => ExitCode::SUCCESS,
            Outcome::Failure => ExitCode::FAILURE,
        }
    }
}

impl From<bool> for Outcome {
    fn from(ok: bool) -> Self {
        if ok {
            Self::Success
        } else {
            Self::Failure
        }
    }
}

/// Resolved settings shared by every command.
pub struct Session {
    config: MediguardConfig,
    format: OutputFormat,
    secret_env: String,
}

impl Session {
    pub fn new(config: MediguardConfig, format: OutputFormat, secret_env: String) -> Self {
        Self {
            config,
            format,
            secret_env,
        }
    }

    fn json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    fn authority(&self) -> anyhow::Result<Arc<SigningAuthority>> {
        let paths = self.config.key_paths();
        let authority = SigningAuthority::load_or_generate(&paths)
            .with_context(|| format!("loading keys from {}", paths.private_key.display()))?;
        Ok(Arc::new(authority))
    }

    fn ledger(&self, authority: Arc<SigningAuthority>) -> anyhow::Result<Arc<Ledger>> {
        let path = self.config.chain_path();
        let ledger = Ledger::open(&path, authority)
            .with_context(|| format!("opening ledger {}", path.display()))?;
        Ok(Arc::new(ledger))
    }

    fn reports(&self) -> anyhow::Result<Arc<JsonReportStore>> {
        let path = self.config.report_path();
        let store = JsonReportStore::open(&path)
            .with_context(|| format!("opening report store {}", path.display()))?;
        Ok(Arc::new(store))
    }

    fn passports(&self) -> anyhow::Result<Arc<JsonPassportStore>> {
        let path = self.config.passport_path();
        let store = JsonPassportStore::open(&path)
            .with_context(|| format!("opening passport store {}", path.display()))?;
        Ok(Arc::new(store))
    }

    fn hmac(&self) -> anyhow::Result<HmacKey> {
        let secret = std::env::var(&self.secret_env)
            .ok()
            .filter(|s| !s.is_empty())
            .with_context(|| {
                format!(
                    "passport secret missing: set the {} environment variable",
                    self.secret_env
                )
            })?;
        Ok(HmacKey::new(SecretString::from(secret)))
    }

    fn manager(&self) -> anyhow::Result<PassportManager> {
        let authority = self.authority()?;
        let ledger = self.ledger(authority.clone())?;
        Ok(PassportManager::new(authority, self.hmac()?, self.reports()?, self.passports()?)
            .with_ledger(ledger)
            .with_verification_base_url(self.config.verification_base_url.clone()))
    }
}

pub fn run_command(cli: Cli) -> anyhow::Result<Outcome> {
    let config = MediguardConfig::discover(cli.config.as_deref())?;
    let session = Session::new(config, cli.format, cli.secret_env);
    dispatch(&session, cli.command)
}

pub fn dispatch(session: &Session, command: Command) -> anyhow::Result<Outcome> {
    match command {
        Command::Keygen => cmd_keygen(session),
        Command::Append(args) => cmd_append(session, args),
        Command::Validate => cmd_validate(session),
        Command::Log(args) => cmd_log(session, args),
        Command::Show(args) => cmd_show(session, args),
        Command::Merkle(args) => cmd_merkle(session, args.action),
        Command::Report(args) => cmd_report(session, args.action),
        Command::Commit(args) => cmd_commit(session, args),
        Command::Passport(args) => cmd_passport(session, args.action),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_keygen(session: &Session) -> anyhow::Result<Outcome> {
    let authority = session.authority()?;
    let paths = session.config.key_paths();
    let pem = authority.public_key_pem()?;
    let fingerprint = authority.verifying_key().fingerprint();

    if session.json() {
        print_json(&json!({
            "fingerprint": fingerprint,
            "private_key_file": paths.private_key,
            "public_key_file": paths.public_key,
            "public_key_pem": pem,
        }))?;
    } else {
        println!("{} Signing key {}", "✓".green().bold(), fingerprint.cyan());
        println!("  Private key: {}", paths.private_key.display());
        println!("  Public key:  {}", paths.public_key.display());
        print!("{pem}");
    }
    Ok(Outcome::Success)
}

fn cmd_append(session: &Session, args: AppendArgs) -> anyhow::Result<Outcome> {
    let data: Value = serde_json::from_str(&args.data).context("block data is not valid JSON")?;
    let ledger = session.ledger(session.authority()?)?;
    let block = ledger.append(Payload::from_value(data), args.merkle_root)?;

    if session.json() {
        print_json(&block)?;
    } else {
        println!(
            "{} Appended block {} {}",
            "✓".green().bold(),
            format!("#{}", block.index).yellow().bold(),
            block.short_hash().dimmed()
        );
    }
    Ok(Outcome::Success)
}

fn cmd_validate(session: &Session) -> anyhow::Result<Outcome> {
    let ledger = session.ledger(session.authority()?)?;
    let report = ledger.validate()?;

    if session.json() {
        print_json(&report)?;
    } else {
        print_integrity(&report);
    }
    Ok(report.is_valid.into())
}

fn print_integrity(report: &IntegrityReport) {
    if report.is_valid {
        println!(
            "{} Chain valid ({} blocks)",
            "✓".green().bold(),
            report.length.to_string().bold()
        );
        return;
    }
    println!(
        "{} Chain invalid: {} problem(s) in {} blocks",
        "✗".red().bold(),
        report.errors.len().to_string().bold(),
        report.length
    );
    for error in &report.errors {
        println!("  {}", error.description.red());
    }
}

fn cmd_log(session: &Session, args: LogArgs) -> anyhow::Result<Outcome> {
    let ledger = session.ledger(session.authority()?)?;
    let blocks = ledger.snapshot()?;
    let recent: Vec<&Block> = blocks.iter().rev().take(args.limit).collect();

    if session.json() {
        print_json(&recent)?;
        return Ok(Outcome::Success);
    }
    if recent.is_empty() {
        println!("Ledger is empty.");
    }
    for block in recent {
        let root = match &block.merkle_root {
            Some(root) => format!("  root {}", root.get(..12).unwrap_or(root))
                .cyan()
                .to_string(),
            None => String::new(),
        };
        println!(
            "{} {} {}{}",
            format!("#{}", block.index).yellow().bold(),
            block.short_hash().dimmed(),
            block.timestamp,
            root
        );
    }
    Ok(Outcome::Success)
}

fn cmd_show(session: &Session, args: ShowArgs) -> anyhow::Result<Outcome> {
    let ledger = session.ledger(session.authority()?)?;
    let Some(block) = ledger.get(args.index)? else {
        bail!("block {} not found", args.index);
    };

    if session.json() {
        print_json(&block)?;
        return Ok(Outcome::Success);
    }
    println!("Block {}", format!("#{}", block.index).yellow().bold());
    println!("  Timestamp:   {}", block.timestamp);
    println!("  Hash:        {}", block.hash);
    println!("  Prev hash:   {}", block.prev_hash.dimmed());
    println!(
        "  Merkle root: {}",
        block.merkle_root.as_deref().unwrap_or("none").cyan()
    );
    println!("  Signature:   {}", block.signature.dimmed());
    println!("  Data:        {}", serde_json::to_string(&block.data)?);
    Ok(Outcome::Success)
}

fn cmd_merkle(session: &Session, action: MerkleAction) -> anyhow::Result<Outcome> {
    match action {
        MerkleAction::Root { leaves } => {
            let tree = MerkleTree::build(leaves)?;
            if session.json() {
                print_json(&json!({ "root": tree.root(), "leaves": tree.leaf_count() }))?;
            } else {
                println!("{}", tree.root());
            }
            Ok(Outcome::Success)
        }
        MerkleAction::Proof { index, leaves } => {
            let tree = MerkleTree::build(leaves)?;
            let proof = tree.proof(index)?;
            if session.json() {
                print_json(&json!({ "root": tree.root(), "proof": proof }))?;
            } else {
                println!("{}", serde_json::to_string(&proof)?);
            }
            Ok(Outcome::Success)
        }
        MerkleAction::Verify { leaf, proof, root } => {
            let proof: MerkleProof =
                serde_json::from_str(&proof).context("proof is not a valid JSON proof")?;
            let ok = proof.verify(&leaf, &root);
            if session.json() {
                print_json(&json!({ "valid": ok }))?;
            } else if ok {
                println!("{} Leaf is included under root", "✓".green().bold());
            } else {
                println!("{} Proof does not match root", "✗".red().bold());
            }
            Ok(ok.into())
        }
    }
}

fn cmd_report(session: &Session, action: ReportAction) -> anyhow::Result<Outcome> {
    let reports = session.reports()?;
    match action {
        ReportAction::Add { record } => {
            let report: ReportRecord =
                serde_json::from_str(&record).context("report record is not valid JSON")?;
            reports.update(&report)?;
            if session.json() {
                print_json(&report)?;
            } else {
                println!(
                    "{} Stored report {}",
                    "✓".green().bold(),
                    report.id.to_string().yellow()
                );
            }
        }
        ReportAction::Show { id } => {
            let Some(report) = reports.get(id)? else {
                bail!("report {id} not found");
            };
            if session.json() {
                print_json(&report)?;
            } else {
                print_report(&report);
            }
        }
    }
    Ok(Outcome::Success)
}

fn print_report(report: &ReportRecord) {
    println!("Report {}", report.id.to_string().yellow().bold());
    println!("  Health score: {}", report.health_score);
    println!("  Triage:       {}", report.triage_category);
    println!("  Class:        {}", report.predicted_class);
    match report.blockchain_block_index {
        Some(index) => println!("  Committed:    block #{}", index.to_string().green()),
        None => println!("  Committed:    {}", "no".dimmed()),
    }
}

fn cmd_commit(session: &Session, args: CommitArgs) -> anyhow::Result<Outcome> {
    let ledger = session.ledger(session.authority()?)?;
    let committer = ReportCommitter::new(ledger, session.reports()?);
    let receipts = committer.commit(&args.report_ids, report_leaf)?;

    if session.json() {
        print_json(&receipts)?;
        return Ok(Outcome::Success);
    }
    if let Some(first) = receipts.first() {
        println!(
            "{} Committed {} report(s) in block {}",
            "✓".green().bold(),
            receipts.len(),
            format!("#{}", first.block_index).yellow().bold()
        );
    }
    for receipt in &receipts {
        println!(
            "  report {} leaf {}",
            receipt.report_id.to_string().yellow(),
            receipt.leaf.dimmed()
        );
    }
    Ok(Outcome::Success)
}

fn cmd_passport(session: &Session, action: PassportAction) -> anyhow::Result<Outcome> {
    match action {
        PassportAction::Issue { report_id } => {
            let passport = session.manager()?.issue(report_id)?;
            if session.json() {
                print_json(&passport)?;
            } else {
                print_passport(&passport);
            }
            Ok(Outcome::Success)
        }
        PassportAction::Verify { passport_id, token } => {
            let result = match passport_id.parse::<PassportId>() {
                Ok(id) => session.manager()?.verify(&id, &token)?,
                Err(_) => VerificationResult::invalid("passport not found"),
            };
            if session.json() {
                print_json(&result)?;
            } else {
                print_verification(&result);
            }
            Ok(result.is_valid().into())
        }
        PassportAction::Show { passport_id } => {
            let id: PassportId = passport_id.parse()?;
            let Some(passport) = session.passports()?.get(&id)? else {
                bail!("passport {id} not found");
            };
            if session.json() {
                print_json(&passport)?;
            } else {
                print_passport(&passport);
                for entry in &passport.audit_trail {
                    println!("  {} {}", entry.timestamp.to_string().dimmed(), entry.action);
                }
            }
            Ok(Outcome::Success)
        }
    }
}

fn print_passport(passport: &Passport) {
    println!(
        "Passport {}",
        passport.passport_id.to_string().yellow().bold()
    );
    println!("  Report:       {}", passport.patient_report_id);
    println!("  Health score: {}", passport.health_score);
    println!("  Triage:       {}", passport.triage_category);
    println!("  Class:        {}", passport.predicted_class);
    println!("  Issued:       {}", passport.issued_timestamp);
    println!("  Block:        #{}", passport.blockchain_block_index);
    println!("  Token:        {}", passport.hmac_token.cyan());
    println!("  URL:          {}", passport.verification_url.blue());
}

fn print_verification(result: &VerificationResult) {
    let status = match result.status {
        VerificationStatus::Valid => format!("✓ {}", result.status).green().bold(),
        VerificationStatus::Tampered => format!("✗ {}", result.status).red().bold(),
        VerificationStatus::Invalid => format!("? {}", result.status).yellow().bold(),
    };
    match &result.reason {
        Some(reason) => println!("{status}: {reason}"),
        None => println!("{status}"),
    }
}
