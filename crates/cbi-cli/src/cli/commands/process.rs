//! `cbi process <file>` – replace a file with the service's processed result.

use anyhow::{bail, Context, Result};
use cbi_core::checksum;
use cbi_core::config::CbiConfig;
use cbi_core::{CurlTransport, FileProcessor};
use std::fs;
use std::path::Path;

pub fn run_process(
    cfg: &CbiConfig,
    file: &Path,
    url: &str,
    part: &str,
    params: &[(String, String)],
) -> Result<()> {
    let error_log_dir = cfg.error_log_dir();
    fs::create_dir_all(&error_log_dir)
        .with_context(|| format!("create error log dir {}", error_log_dir.display()))?;

    let transport = cfg.retrying(CurlTransport::new())?;
    let mut processor = FileProcessor::new(transport, url, part)?.error_log_dir(error_log_dir);
    for (name, value) in params {
        processor = processor.with_param(name, value.as_str());
    }

    let processed = processor
        .process_with(file, &cfg.request_config())
        .with_context(|| format!("processing {} on {}", file.display(), url))?;
    if !processed {
        bail!("{} was rejected by {}", file.display(), url);
    }

    let digest = checksum::sha256_path(file)?;
    println!("{}  {}", digest, file.display());
    Ok(())
}
