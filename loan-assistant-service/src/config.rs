use anyhow::{Context as _, bail};
use loan_flow::MissingProfilePolicy;
use std::path::PathBuf;

/// Service settings, read once from the environment at startup.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind_addr: String,
    pub customer_file: PathBuf,
    pub sanction_dir: PathBuf,
    pub missing_profile: MissingProfilePolicy,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            customer_file: PathBuf::from("customers.csv"),
            sanction_dir: PathBuf::from("sanctions"),
            missing_profile: MissingProfilePolicy::RandomScore,
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();

        let missing_profile = match lookup("MISSING_PROFILE_POLICY") {
            Some(value) => parse_policy(&value)
                .with_context(|| format!("invalid MISSING_PROFILE_POLICY: {value}"))?,
            None => defaults.missing_profile,
        };

        Ok(Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or(defaults.bind_addr),
            customer_file: lookup("CUSTOMER_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.customer_file),
            sanction_dir: lookup("SANCTION_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.sanction_dir),
            missing_profile,
        })
    }
}

fn parse_policy(value: &str) -> anyhow::Result<MissingProfilePolicy> {
    match value.trim().to_lowercase().as_str() {
        "reject" => Ok(MissingProfilePolicy::Reject),
        "random_score" => Ok(MissingProfilePolicy::RandomScore),
        other => bail!("expected 'reject' or 'random_score', got '{other}'"),
    }
}
