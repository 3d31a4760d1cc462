use std::fs;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::KiraError;

pub const DEFAULT_CONFIG_FILE: &str = "kira-msa.json";
pub const DEFAULT_BASE_URL: &str = "https://rest.uniprot.org/uniparc";
/// Length of `>UPI` plus the 10-character UniParc suffix, where the gene is spliced in.
pub const DEFAULT_HEADER_SPLICE_OFFSET: usize = 14;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const INPUT_EXTENSIONS: &[&str] = &["csv", "tsv"];
const OUTPUT_EXTENSIONS: &[&str] = &["fasta"];

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub service: Option<ServiceEntry>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ServiceEntry {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub header_splice_offset: Option<usize>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub base_url: String,
    pub header_splice_offset: usize,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            header_splice_offset: DEFAULT_HEADER_SPLICE_OFFSET,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub service: ServiceConfig,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads `path`, or `kira-msa.json` when present. No file at the default location
    /// means built-in defaults; an explicit path must be readable.
    pub fn resolve(path: Option<&Utf8Path>) -> Result<ResolvedConfig, KiraError> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => Utf8PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.as_std_path().exists() {
            return Self::resolve_config(Config::default());
        }

        let content = fs::read_to_string(config_path.as_std_path())
            .map_err(|_| KiraError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| KiraError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, KiraError> {
        let schema_version = config.schema_version.unwrap_or(1);
        let entry = config.service.unwrap_or_default();
        let defaults = ServiceConfig::default();

        let base_url = match entry.base_url {
            Some(url) => {
                let url = url.trim().trim_end_matches('/').to_string();
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(KiraError::ConfigValue(format!(
                        "service.base_url must be an http(s) URL, got '{url}'"
                    )));
                }
                url
            }
            None => defaults.base_url,
        };

        let header_splice_offset = entry
            .header_splice_offset
            .unwrap_or(defaults.header_splice_offset);
        if header_splice_offset == 0 {
            return Err(KiraError::ConfigValue(
                "service.header_splice_offset must keep the leading '>'".to_string(),
            ));
        }

        let timeout = entry
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout);

        Ok(ResolvedConfig {
            schema_version,
            service: ServiceConfig {
                base_url,
                header_splice_offset,
                timeout,
                user_agent: entry.user_agent.unwrap_or(defaults.user_agent),
            },
        })
    }
}

pub fn default_user_agent() -> String {
    format!("kira-msa/{}", env!("CARGO_PKG_VERSION"))
}

/// Every file a run reads or writes.
#[derive(Debug, Clone)]
pub struct RunPaths {
    pub input: Utf8PathBuf,
    pub output: Utf8PathBuf,
    pub progress: Utf8PathBuf,
    pub lock: Utf8PathBuf,
}

impl RunPaths {
    pub fn new(
        input: impl Into<Utf8PathBuf>,
        output: impl Into<Utf8PathBuf>,
        progress: Option<Utf8PathBuf>,
    ) -> Result<Self, KiraError> {
        let input = input.into();
        let output = output.into();
        check_extension(&input, INPUT_EXTENSIONS)?;
        check_extension(&output, OUTPUT_EXTENSIONS)?;

        let progress = progress.unwrap_or_else(|| sidecar(&output, "progress"));
        let lock = sidecar(&output, "lock");
        Ok(Self {
            input,
            output,
            progress,
            lock,
        })
    }
}

fn sidecar(output: &Utf8Path, suffix: &str) -> Utf8PathBuf {
    let name = output.file_name().unwrap_or("output.fasta");
    output.with_file_name(format!("{name}.{suffix}"))
}

fn check_extension(path: &Utf8Path, expected: &[&str]) -> Result<(), KiraError> {
    let matches = path
        .extension()
        .map(|ext| expected.iter().any(|want| ext.eq_ignore_ascii_case(want)))
        .unwrap_or(false);
    if !matches {
        return Err(KiraError::InputFormat {
            path: path.to_path_buf(),
            expected: expected.join(", "),
        });
    }
    Ok(())
}
