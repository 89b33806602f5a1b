// src/handlers/form.rs

use std::collections::HashMap;

use axum::extract::Multipart;

use crate::{error::AppError, services::extract::UploadedFile};

/// Text fields plus the optional `file` part of a multipart upload.
#[derive(Debug, Default)]
pub struct DocumentForm {
    fields: HashMap<String, String>,
    pub file: Option<UploadedFile>,
}

impl DocumentForm {
    /// Trimmed value of a text field; blank values count as absent.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Drains the multipart stream. A `file` part without a filename is
    /// ignored, as browsers send one for an empty file input.
    pub async fn read(mut multipart: Multipart, max_bytes: usize) -> Result<Self, AppError> {
        let mut form = DocumentForm::default();

        while let Some(mut field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();

            if name == "file" {
                let Some(filename) = field.file_name().map(str::to_string) else {
                    continue;
                };
                if filename.is_empty() {
                    continue;
                }

                let mut bytes = Vec::new();
                while let Some(chunk) = field.chunk().await? {
                    if bytes.len() + chunk.len() > max_bytes {
                        return Err(AppError::BadRequest(format!(
                            "File too large. Maximum size is {}MB.",
                            max_bytes / (1024 * 1024)
                        )));
                    }
                    bytes.extend_from_slice(&chunk);
                }
                form.file = Some(UploadedFile { filename, bytes });
            } else {
                let value = field.text().await?;
                form.fields.insert(name, value);
            }
        }

        Ok(form)
    }
}
