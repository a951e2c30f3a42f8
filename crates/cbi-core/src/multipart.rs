//! Multipart body plan for a request descriptor, and its curl form.
//!
//! One part per descriptor entry: file parameters become binary parts carrying
//! the file's base name, text parameters become UTF-8 text parts. File parts are
//! streamed from disk by curl at send time.

use std::path::PathBuf;

use crate::error::TransportError;
use crate::request::RequestDescriptor;

pub const BINARY_CONTENT_TYPE: &str = "application/octet-stream";
pub const TEXT_CONTENT_TYPE: &str = "text/plain; charset=UTF-8";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartBody {
    Text(String),
    File { path: PathBuf, filename: String },
}

/// One named field of the multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    pub name: String,
    pub body: PartBody,
}

impl Part {
    pub fn is_binary(&self) -> bool {
        matches!(self.body, PartBody::File { .. })
    }

    pub fn content_type(&self) -> &'static str {
        match self.body {
            PartBody::Text(_) => TEXT_CONTENT_TYPE,
            PartBody::File { .. } => BINARY_CONTENT_TYPE,
        }
    }
}

/// Plan the parts of `request`: text parts first, then file parts, each in name order.
pub fn parts(request: &RequestDescriptor) -> Vec<Part> {
    let texts = request.string_params().iter().map(|(name, value)| Part {
        name: name.clone(),
        body: PartBody::Text(value.clone()),
    });
    let files = request.path_params().iter().map(|(name, path)| Part {
        name: name.clone(),
        body: PartBody::File {
            path: path.clone(),
            filename: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        },
    });
    texts.chain(files).collect()
}

/// Turn planned parts into a curl form.
pub(crate) fn build_form(parts: &[Part]) -> Result<curl::easy::Form, TransportError> {
    let mut form = curl::easy::Form::new();
    for part in parts {
        match &part.body {
            PartBody::Text(value) => {
                form.part(&part.name)
                    .contents(value.as_bytes())
                    .content_type(TEXT_CONTENT_TYPE)
                    .add()?;
            }
            PartBody::File { path, filename } => {
                form.part(&part.name)
                    .file(path)
                    .filename(filename.as_str())
                    .content_type(BINARY_CONTENT_TYPE)
                    .add()?;
            }
        }
    }
    Ok(form)
}
