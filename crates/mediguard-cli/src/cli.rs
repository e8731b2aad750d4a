use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::DEFAULT_SECRET_ENV;

#[derive(Parser)]
#[command(
    name = "mediguard",
    about = "MediGuard Ledger: tamper-evident health report ledger and passports",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to a TOML config file (default: ./mediguard.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Environment variable holding the passport HMAC secret
    #[arg(long, global = true, default_value = DEFAULT_SECRET_ENV)]
    pub secret_env: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Load or create the signing keypair and print the public key
    Keygen,
    /// Append a block to the ledger
    Append(AppendArgs),
    /// Check the whole chain and report every problem
    Validate,
    /// Show the most recent blocks
    Log(LogArgs),
    /// Show one block
    Show(ShowArgs),
    /// Merkle tree utilities
    Merkle(MerkleArgs),
    /// Manage report records
    Report(ReportArgs),
    /// Commit reports to the ledger under one Merkle root
    Commit(CommitArgs),
    /// Issue and verify health passports
    Passport(PassportArgs),
}

#[derive(Args)]
pub struct AppendArgs {
    /// Block data as JSON
    pub data: String,
    #[arg(long)]
    pub merkle_root: Option<String>,
}

#[derive(Args)]
pub struct LogArgs {
    #[arg(short = 'n', long, default_value = "20")]
    pub limit: usize,
}

#[derive(Args)]
pub struct ShowArgs {
    pub index: u64,
}

#[derive(Args)]
pub struct MerkleArgs {
    #[command(subcommand)]
    pub action: MerkleAction,
}

#[derive(Subcommand)]
pub enum MerkleAction {
    /// Print the root over the given leaves
    Root {
        #[arg(required = true)]
        leaves: Vec<String>,
    },
    /// Print the inclusion proof for the leaf at `index`
    Proof {
        index: usize,
        #[arg(required = true)]
        leaves: Vec<String>,
    },
    /// Check a JSON proof for `leaf` against `root`
    Verify {
        leaf: String,
        proof: String,
        root: String,
    },
}

#[derive(Args)]
pub struct ReportArgs {
    #[command(subcommand)]
    pub action: ReportAction,
}

#[derive(Subcommand)]
pub enum ReportAction {
    /// Insert or replace a report from its JSON record
    Add { record: String },
    /// Show a stored report
    Show { id: u64 },
}

#[derive(Args)]
pub struct CommitArgs {
    #[arg(required = true)]
    pub report_ids: Vec<u64>,
}

#[derive(Args)]
pub struct PassportArgs {
    #[command(subcommand)]
    pub action: PassportAction,
}

#[derive(Subcommand)]
pub enum PassportAction {
    /// Issue a passport for a committed report
    Issue { report_id: u64 },
    /// Verify a passport against a holder's token
    Verify { passport_id: String, token: String },
    /// Show a stored passport
    Show { passport_id: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_keygen() {
        let cli = Cli::try_parse_from(["mediguard", "keygen"]).unwrap();
        assert!(matches!(cli.command, Command::Keygen));
        assert_eq!(cli.secret_env, "MEDIGUARD_PASSPORT_SECRET");
        assert!(cli.config.is_none());
    }

    #[test]
    fn parse_append_with_root() {
        let cli = Cli::try_parse_from([
            "mediguard",
            "append",
            r#"{"x":1}"#,
            "--merkle-root",
            "abc",
        ])
        .unwrap();
        if let Command::Append(args) = cli.command {
            assert_eq!(args.data, r#"{"x":1}"#);
            assert_eq!(args.merkle_root, Some("abc".into()));
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_log_limit() {
        let cli = Cli::try_parse_from(["mediguard", "log", "-n", "5"]).unwrap();
        if let Command::Log(args) = cli.command {
            assert_eq!(args.limit, 5);
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_merkle_proof() {
        let cli = Cli::try_parse_from(["mediguard", "merkle", "proof", "1", "a", "b"]).unwrap();
        if let Command::Merkle(MerkleArgs {
            action: MerkleAction::Proof { index, leaves },
        }) = cli.command
        {
            assert_eq!(index, 1);
            assert_eq!(leaves, vec!["a", "b"]);
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn merkle_root_needs_leaves() {
        assert!(Cli::try_parse_from(["mediguard", "merkle", "root"]).is_err());
    }

    #[test]
    fn parse_commit_ids() {
        let cli = Cli::try_parse_from(["mediguard", "commit", "1", "2", "3"]).unwrap();
        if let Command::Commit(args) = cli.command {
            assert_eq!(args.report_ids, vec![1, 2, 3]);
        } else {
            panic!("wrong command");
        }
        assert!(Cli::try_parse_from(["mediguard", "commit"]).is_err());
    }

    #[test]
    fn parse_passport_verify() {
        let cli = Cli::try_parse_from(["mediguard", "passport", "verify", "id", "tok"]).unwrap();
        if let Command::Passport(PassportArgs {
            action: PassportAction::Verify { passport_id, token },
        }) = cli.command
        {
            assert_eq!(passport_id, "id");
            assert_eq!(token, "tok");
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_globals() {
        let cli = Cli::try_parse_from([
            "mediguard",
            "validate",
            "--verbose",
            "--format",
            "json",
            "--config",
            "/etc/mediguard.toml",
            "--secret-env",
            "OTHER_SECRET",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/mediguard.toml")));
        assert_eq!(cli.secret_env, "OTHER_SECRET");
    }
}
