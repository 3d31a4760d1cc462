use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum KiraError {
    #[error("invalid input path {path}: expected one of [{expected}]")]
    #[diagnostic(help("the gene table must be a tab-separated .csv/.tsv file and the output a .fasta file"))]
    InputFormat { path: Utf8PathBuf, expected: String },

    #[error("gene table is missing required column '{0}'")]
    #[diagnostic(help("rename the column holding this data to '{0}'"))]
    MissingColumn(String),

    #[error("failed to read gene table {path}: {message}")]
    TableRead { path: Utf8PathBuf, message: String },

    #[error("gene table row {row}: {message}")]
    TableRow { row: usize, message: String },

    #[error("invalid UniParc identifier: {0}")]
    InvalidIdentifier(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(Utf8PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid config value: {0}")]
    ConfigValue(String),

    #[error("UniParc request for {identifier} (gene {gene}) failed: {message}")]
    FetchHttp {
        identifier: String,
        gene: String,
        message: String,
    },

    #[error("UniParc returned status {status} for {identifier} (gene {gene})")]
    FetchStatus {
        identifier: String,
        gene: String,
        status: u16,
    },

    #[error("UniParc response for {identifier} is not a single FASTA record: {reason}")]
    MalformedRecord { identifier: String, reason: String },

    #[error("output {path} is inconsistent with its progress marker: {reason}")]
    #[diagnostic(help(
        "the gene table may have changed since the last run; move the output aside to start over"
    ))]
    InconsistentState { path: Utf8PathBuf, reason: String },

    #[error("output {0} is locked by another run")]
    OutputLocked(Utf8PathBuf),

    #[error("failed to parse FASTA output: {0}")]
    FastaParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
