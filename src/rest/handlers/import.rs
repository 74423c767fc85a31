//! Endpoint file import handler.

use axum::{Json, extract::Multipart, http::StatusCode};

use super::{HandlerError, bad_request};
use crate::endpoint::import::{self, ImportError, ImportFormat, ImportedRow};

/// Multipart field carrying the upload.
const FILE_FIELD: &str = "file";

/// POST /parse - Parse an uploaded endpoint file.
///
/// Expects exactly one `file` part, CSV or single-sheet `.xlsx`. The header
/// row is skipped and each remaining row is returned as text.
pub async fn parse_file(
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Vec<ImportedRow>>), HandlerError> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(e.body_text(), "invalid_multipart"))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        if upload.is_some() {
            return Err(bad_request(
                "Multiple files uploaded but only one file is allowed at a time",
                "multiple_files",
            ));
        }

        let mime = field.content_type().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| bad_request(e.body_text(), "invalid_multipart"))?;
        upload = Some((mime, data.to_vec()));
    }

    let Some((mime, data)) = upload else {
        return Err(bad_request("No files specified", "no_file"));
    };

    let format = ImportFormat::from_mime(&mime).ok_or_else(|| {
        bad_request(
            ImportError::UnsupportedFormat(mime.clone()).to_string(),
            "unsupported_format",
        )
    })?;

    let rows = import::parse(format, &data).map_err(|e| {
        tracing::warn!(mime = %mime, error = %e, "import failed");
        let code = match e {
            ImportError::WorksheetCount(_) => "worksheet_count",
            _ => "unreadable_file",
        };
        bad_request(e.to_string(), code)
    })?;

    tracing::info!(rows = rows.len(), mime = %mime, "imported endpoint file");
    Ok((StatusCode::CREATED, Json(rows)))
}
