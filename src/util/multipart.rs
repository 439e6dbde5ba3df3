use std::collections::HashMap;

use actix_multipart::Multipart;
use bytes::BytesMut;
use futures_util::StreamExt;

use crate::model::global_error::AppError;

pub const ATTACHMENT_FIELD: &str = "attachment";
/// Upper bound for a single text part, independent of the attachment limit.
pub const MAX_TEXT_FIELD_BYTES: usize = 64 * 1024;

#[derive(Debug)]
pub struct UploadedFile {
    pub filename: String,
    pub content: BytesMut,
}

/// A fully read multipart form. Text parts become `fields`; the attachment
/// part becomes `file` unless the browser sent an empty file input.
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub fields: HashMap<String, String>,
    pub file: Option<UploadedFile>,
    /// Set when the attachment exceeded the upload limit and was discarded.
    pub file_too_large: bool,
    /// Text parts cut off at `MAX_TEXT_FIELD_BYTES`.
    pub oversized_fields: Vec<String>,
}

pub async fn read_multipart(mut payload: Multipart, max_upload_bytes: usize) -> Result<MultipartForm, AppError> {
    let mut form = MultipartForm::default();

    while let Some(field) = payload.next().await {
        let mut field = field?;

        let (name, filename) = match field.content_disposition() {
            Some(cd) => (
                cd.get_name().unwrap_or_default().to_string(),
                cd.get_filename().map(str::to_string),
            ),
            None => continue,
        };

        let is_attachment = filename.is_some() && name == ATTACHMENT_FIELD;
        let limit = if is_attachment { max_upload_bytes } else { MAX_TEXT_FIELD_BYTES };

        let mut buffer = BytesMut::new();
        let mut oversized = false;
        while let Some(chunk) = field.next().await {
            let chunk = chunk?;
            if oversized {
                continue;
            }
            if buffer.len() + chunk.len() > limit {
                oversized = true;
                if is_attachment {
                    buffer.clear();
                } else {
                    // keep what fits so the form re-renders with the user's text
                    let room = limit - buffer.len();
                    buffer.extend_from_slice(&chunk[..room]);
                }
                continue;
            }
            buffer.extend_from_slice(&chunk);
        }

        match filename {
            Some(filename) if is_attachment => {
                if oversized {
                    form.file_too_large = true;
                } else if !filename.is_empty() && !buffer.is_empty() {
                    form.file = Some(UploadedFile { filename, content: buffer });
                }
            }
            _ => {
                if oversized {
                    form.oversized_fields.push(name.clone());
                }
                form.fields
                    .insert(name, String::from_utf8_lossy(&buffer).into_owned());
            }
        }
    }

    Ok(form)
}
