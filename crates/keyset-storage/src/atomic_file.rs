use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use keyset_codec::Format;
use keyset_core::{EncryptedKeyset, EncryptedKeysetWriter, Keyset, KeysetWriter, WriteError};
use tempfile::NamedTempFile;
use tracing::{info, instrument};

/// Byte sink that replaces `target` only on [`AtomicFileSink::commit`].
///
/// Bytes go to a temp file next to the target; dropping the sink without
/// committing removes the temp file and leaves any existing target intact.
pub struct AtomicFileSink {
    target: PathBuf,
    tmp: NamedTempFile,
}

impl AtomicFileSink {
    pub fn create(target: impl Into<PathBuf>) -> io::Result<Self> {
        let target = target.into();
        let parent = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)?;
        let tmp = NamedTempFile::new_in(&parent)?;
        Ok(Self { target, tmp })
    }

    pub fn temp_path(&self) -> &Path {
        self.tmp.path()
    }

    /// Flush, sync and rename over the target.
    pub fn commit(mut self) -> io::Result<()> {
        self.tmp.flush()?;
        self.tmp.as_file().sync_all()?;
        self.tmp.persist(&self.target).map_err(|e| e.error)?;
        Ok(())
    }
}

impl Write for AtomicFileSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.tmp.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.tmp.flush()
    }
}

/// Writes keysets to a file path, replacing it atomically.
///
/// The value is encoded before the filesystem is touched, so an unencodable
/// keyset never creates or truncates the destination.
#[derive(Debug, Clone)]
pub struct FileKeysetWriter {
    path: PathBuf,
    format: Format,
}

impl FileKeysetWriter {
    pub fn new(path: impl Into<PathBuf>, format: Format) -> Self {
        Self {
            path: path.into(),
            format,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, bytes: &[u8]) -> Result<(), WriteError> {
        let mut sink = AtomicFileSink::create(&self.path)?;
        sink.write_all(bytes)?;
        sink.commit()?;
        info!(bytes = bytes.len(), "keyset file written");
        Ok(())
    }
}

impl KeysetWriter for FileKeysetWriter {
    #[instrument(skip_all, fields(path = %self.path.display(), format = %self.format))]
    fn write(&mut self, keyset: &Keyset) -> Result<(), WriteError> {
        let bytes = self.format.encode_keyset(keyset)?;
        self.persist(&bytes)
    }
}

impl EncryptedKeysetWriter for FileKeysetWriter {
    #[instrument(skip_all, fields(path = %self.path.display(), format = %self.format))]
    fn write_encrypted(&mut self, keyset: &EncryptedKeyset) -> Result<(), WriteError> {
        let bytes = self.format.encode_encrypted(keyset)?;
        self.persist(&bytes)
    }
}
