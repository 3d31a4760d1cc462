use std::fmt;
use std::fs::{self, File, OpenOptions, TryLockError};
use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::NamedTempFile;

use crate::config::RunPaths;
use crate::domain::WorkItem;
use crate::error::KiraError;

/// Last `(gene, identifier)` pair durably present in the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressMarker {
    pub gene: String,
    pub identifier: String,
}

impl ProgressMarker {
    pub fn new(gene: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            gene: gene.into(),
            identifier: identifier.into(),
        }
    }

    /// `None` for items without an identifier; those never reach the output.
    pub fn for_item(item: &WorkItem) -> Option<Self> {
        item.identifier
            .as_ref()
            .map(|id| Self::new(item.gene.clone(), id.as_str()))
    }

    fn parse(content: &str) -> Option<Self> {
        let line = content.lines().next()?.trim_end_matches('\r');
        let (gene, identifier) = line.split_once('\t')?;
        if gene.is_empty() || identifier.is_empty() {
            return None;
        }
        Some(Self::new(gene, identifier))
    }

    fn render(&self) -> String {
        format!("{}\t{}", self.gene, self.identifier)
    }
}

impl fmt::Display for ProgressMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.gene, self.identifier)
    }
}

/// Held for the whole run; the OS releases the lock when the file closes.
#[derive(Debug)]
pub struct OutputLock {
    _file: File,
}

/// Output FASTA file, its progress marker and lock file.
#[derive(Debug, Clone)]
pub struct OutputStore {
    output: Utf8PathBuf,
    progress: Utf8PathBuf,
    lock: Utf8PathBuf,
}

impl OutputStore {
    pub fn new(paths: &RunPaths) -> Self {
        Self {
            output: paths.output.clone(),
            progress: paths.progress.clone(),
            lock: paths.lock.clone(),
        }
    }

    pub fn output_path(&self) -> &Utf8Path {
        &self.output
    }

    pub fn progress_path(&self) -> &Utf8Path {
        &self.progress
    }

    pub fn lock(&self) -> Result<OutputLock, KiraError> {
        ensure_parent(&self.lock)?;
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.lock.as_std_path())
            .map_err(|err| fs_error("open lock", &self.lock, err))?;
        match file.try_lock() {
            Ok(()) => Ok(OutputLock { _file: file }),
            Err(TryLockError::WouldBlock) => Err(KiraError::OutputLocked(self.output.clone())),
            Err(TryLockError::Error(err)) => Err(fs_error("lock", &self.lock, err)),
        }
    }

    pub fn output_exists(&self) -> bool {
        self.output.as_std_path().exists()
    }

    pub fn read_output(&self) -> Result<Vec<u8>, KiraError> {
        fs::read(self.output.as_std_path()).map_err(|err| fs_error("read", &self.output, err))
    }

    /// Creates or truncates the output, dropping any marker left from an earlier output
    /// first so an empty output never sits next to a stale marker.
    pub fn start_fresh(&self) -> Result<(), KiraError> {
        self.remove_marker()?;
        ensure_parent(&self.output)?;
        let file = File::create(self.output.as_std_path())
            .map_err(|err| fs_error("create", &self.output, err))?;
        file.sync_all()
            .map_err(|err| fs_error("sync", &self.output, err))
    }

    pub fn truncate_output(&self, len: u64) -> Result<(), KiraError> {
        let file = OpenOptions::new()
            .write(true)
            .open(self.output.as_std_path())
            .map_err(|err| fs_error("open", &self.output, err))?;
        file.set_len(len)
            .map_err(|err| fs_error("truncate", &self.output, err))?;
        file.sync_all()
            .map_err(|err| fs_error("sync", &self.output, err))
    }

    /// Appends one record and waits for the data to reach the disk.
    pub fn append_record(&self, record: &str) -> Result<(), KiraError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.output.as_std_path())
            .map_err(|err| fs_error("open", &self.output, err))?;
        file.write_all(record.as_bytes())
            .map_err(|err| fs_error("append", &self.output, err))?;
        file.sync_data()
            .map_err(|err| fs_error("sync", &self.output, err))
    }

    pub fn read_marker(&self) -> Result<Option<ProgressMarker>, KiraError> {
        let content = match fs::read_to_string(self.progress.as_std_path()) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(fs_error("read", &self.progress, err)),
        };
        if content.trim().is_empty() {
            return Ok(None);
        }
        ProgressMarker::parse(&content)
            .map(Some)
            .ok_or_else(|| KiraError::InconsistentState {
                path: self.output.clone(),
                reason: format!(
                    "progress marker {} is not a 'gene<TAB>identifier' line",
                    self.progress
                ),
            })
    }

    /// Replaces the marker atomically: readers see the old pair or the new one, never a mix.
    pub fn write_marker(&self, marker: &ProgressMarker) -> Result<(), KiraError> {
        let parent = ensure_parent(&self.progress)?;
        let mut temp = tempfile::Builder::new()
            .prefix(".kira-msa-progress")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| fs_error("create temp marker in", &parent, err))?;
        write_synced(&mut temp, marker.render().as_bytes())
            .map_err(|err| fs_error("write", &self.progress, err))?;
        temp.persist(self.progress.as_std_path())
            .map_err(|err| fs_error("persist", &self.progress, err.error))?;
        Ok(())
    }

    pub fn remove_marker(&self) -> Result<(), KiraError> {
        match fs::remove_file(self.progress.as_std_path()) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(fs_error("remove", &self.progress, err)),
        }
    }
}

fn write_synced(temp: &mut NamedTempFile, bytes: &[u8]) -> io::Result<()> {
    temp.write_all(bytes)?;
    temp.as_file().sync_all()
}

fn ensure_parent(path: &Utf8Path) -> Result<Utf8PathBuf, KiraError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent.to_path_buf(),
        _ => Utf8PathBuf::from("."),
    };
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| fs_error("create directory", &parent, err))?;
    Ok(parent)
}

fn fs_error(action: &str, path: &Utf8Path, err: io::Error) -> KiraError {
    KiraError::Filesystem(format!("{action} {path}: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_parse_accepts_crlf_and_rejects_garbage() {
        assert_eq!(
            ProgressMarker::parse("TP53\tUPI0000000001\r\n"),
            Some(ProgressMarker::new("TP53", "UPI0000000001"))
        );
        assert_eq!(ProgressMarker::parse("TP53 UPI0000000001"), None);
        assert_eq!(ProgressMarker::parse("\tUPI0000000001"), None);
    }
}
