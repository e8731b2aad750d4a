use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use mediguard_crypto::KeyPaths;
use mediguard_passport::DEFAULT_VERIFICATION_BASE_URL;

/// Config file picked up from the working directory when `--config` is not
/// given.
pub const DEFAULT_CONFIG_FILE: &str = "mediguard.toml";

/// Environment variable holding the passport HMAC secret.
pub const DEFAULT_SECRET_ENV: &str = "MEDIGUARD_PASSPORT_SECRET";

/// File locations and passport settings. The HMAC secret is never read
/// from here.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MediguardConfig {
    pub data_dir: PathBuf,
    pub chain_file: PathBuf,
    pub private_key_file: PathBuf,
    pub public_key_file: PathBuf,
    pub passport_file: PathBuf,
    pub report_file: PathBuf,
    pub verification_base_url: String,
}

impl Default for MediguardConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("mediguard-data"),
            chain_file: PathBuf::from("blockchain.json"),
            private_key_file: PathBuf::from("private_key.pem"),
            public_key_file: PathBuf::from("public_key.pem"),
            passport_file: PathBuf::from("passports.json"),
            report_file: PathBuf::from("reports.json"),
            verification_base_url: DEFAULT_VERIFICATION_BASE_URL.to_string(),
        }
    }
}

impl MediguardConfig {
    pub fn parse(toml_str: &str) -> anyhow::Result<Self> {
        toml::from_str(toml_str).context("invalid configuration")
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("in {}", path.display()))
    }

    /// Load `explicit` if given, else `mediguard.toml` from the working
    /// directory if present, else defaults.
    pub fn discover(explicit: Option<&Path>) -> anyhow::Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::load(Path::new(DEFAULT_CONFIG_FILE))
            }
            None => Ok(Self::default()),
        }
    }

    /// Relative paths are taken from `data_dir`.
    pub fn resolve(&self, file: &Path) -> PathBuf {
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.data_dir.join(file)
        }
    }

    pub fn chain_path(&self) -> PathBuf {
        self.resolve(&self.chain_file)
    }

    pub fn key_paths(&self) -> KeyPaths {
        KeyPaths::new(
            self.resolve(&self.private_key_file),
            self.resolve(&self.public_key_file),
        )
    }

    pub fn passport_path(&self) -> PathBuf {
        self.resolve(&self.passport_file)
    }

    pub fn report_path(&self) -> PathBuf {
        self.resolve(&self.report_file)
    }
}
