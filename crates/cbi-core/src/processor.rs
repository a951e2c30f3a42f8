//! Send a file to a processing service and replace it with the processed result.
//!
//! The source file is only replaced from inside the success handler, after the
//! whole body has been copied to a sibling temp file and synced; the rename is
//! atomic. On any failure the source is left untouched.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::NamedTempFile;

use crate::error::TransportError;
use crate::handler::ErrorReportingHandler;
use crate::request::{Config, RequestDescriptor};
use crate::result::TransportResult;
use crate::transport::Transport;

/// Part name used when none is configured.
pub const DEFAULT_PART_NAME: &str = "file";

pub struct FileProcessor<T> {
    transport: T,
    server_uri: String,
    part_name: String,
    params: Vec<(String, String)>,
    error_log_dir: PathBuf,
}

impl<T: Transport> FileProcessor<T> {
    /// `part_name` must not be empty. Error bodies are saved under the system temp dir
    /// unless [`FileProcessor::error_log_dir`] says otherwise.
    pub fn new(transport: T, server_uri: &str, part_name: &str) -> Result<Self, TransportError> {
        if part_name.is_empty() {
            return Err(TransportError::invalid("'partName' must not be empty"));
        }
        Ok(Self {
            transport,
            server_uri: server_uri.to_string(),
            part_name: part_name.to_string(),
            params: Vec::new(),
            error_log_dir: std::env::temp_dir(),
        })
    }

    /// Extra text parameter sent with every file.
    pub fn with_param(mut self, name: &str, value: impl Into<String>) -> Self {
        self.params.push((name.to_string(), value.into()));
        self
    }

    pub fn error_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.error_log_dir = dir.into();
        self
    }

    pub fn process(&self, path: &Path) -> Result<bool, TransportError> {
        self.process_with(path, &Config::default())
    }

    /// Send `path` and replace it with the response body on success.
    pub fn process_with(&self, path: &Path, config: &Config) -> Result<bool, TransportError> {
        if !path.is_file() {
            return Err(TransportError::invalid(format!(
                "'{}' must be an existing regular file",
                path.display()
            )));
        }
        let mut builder =
            RequestDescriptor::on(&self.server_uri).with_path_param(&self.part_name, path);
        for (name, value) in &self.params {
            builder = builder.with_param(name, value.as_str());
        }
        let request = builder.build()?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.part_name.clone());
        let target = path.to_path_buf();
        let handler = ErrorReportingHandler::new(
            &self.error_log_dir,
            &file_name,
            &self.part_name,
            move |result| replace_with_body(&target, result),
        )?;

        tracing::debug!("Sending '{}' for processing to '{}'", path.display(), self.server_uri);
        let processed = self.transport.send_with(&request, config, Arc::new(handler))?;
        if processed {
            tracing::debug!("'{}' has been replaced by the processed result", path.display());
        } else {
            tracing::warn!("Unable to process '{}' on '{}'", path.display(), self.server_uri);
        }
        Ok(processed)
    }
}

fn replace_with_body(target: &Path, result: TransportResult<'_>) -> io::Result<bool> {
    let dir = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    let copied = result.copy_to(tmp.as_file_mut())?;
    tmp.as_file().sync_all()?;
    tmp.persist(target).map_err(|e| e.error)?;
    tracing::debug!(bytes = copied, "wrote processed content to '{}'", target.display());
    Ok(true)
}
