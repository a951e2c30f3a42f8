//! `cbi send` – post an arbitrary multipart request and keep the response.

use anyhow::{bail, Context, Result};
use cbi_core::config::CbiConfig;
use cbi_core::{CurlTransport, ErrorReportingHandler, RequestDescriptor, Transport};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub fn run_send(
    cfg: &CbiConfig,
    url: &str,
    files: &[(String, PathBuf)],
    params: &[(String, String)],
    output: &Path,
) -> Result<()> {
    let mut builder = RequestDescriptor::on(url);
    for (name, path) in files {
        builder = builder.with_path_param(name, path);
    }
    for (name, value) in params {
        builder = builder.with_param(name, value.as_str());
    }
    let request = builder.build()?;

    let error_log_dir = cfg.error_log_dir();
    fs::create_dir_all(&error_log_dir)
        .with_context(|| format!("create error log dir {}", error_log_dir.display()))?;
    let target = output.to_path_buf();
    let handler = ErrorReportingHandler::new(&error_log_dir, "cbi-send", "response", move |result| {
        let bytes = result.copy_to_path(&target)?;
        tracing::info!(bytes, "response saved to {}", target.display());
        Ok(true)
    })?;

    let transport = cfg.retrying(CurlTransport::new())?;
    let sent = transport
        .send_with(&request, &cfg.request_config(), Arc::new(handler))
        .with_context(|| format!("sending {}", request))?;
    if !sent {
        bail!("request to {} failed", url);
    }
    println!("{}", output.display());
    Ok(())
}
