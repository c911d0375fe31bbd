use crate::format::TargetFormat;
use crate::server::ApiError;
use crate::server::AppState;
use crate::session::process_file;
use crate::session::process_files;
use crate::session::FileOptions;
use crate::session::FileOutcome;
use crate::session::UploadedFile;
use axum::extract::Multipart;
use axum::extract::State;
use axum::http::header;
use axum::response::Html;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use serde_json::json;

const INDEX_HTML: &str = include_str!("index.html");

#[derive(Serialize)]
pub(crate) struct ProcessResponse {
    files: Vec<FileOutcome>,
}

pub(crate) async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub(crate) async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

/// Runs the pipeline over every uploaded file.
pub(crate) async fn process(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ProcessResponse>, ApiError> {
    let uploads = read_uploads(multipart).await?;
    tracing::debug!(files = uploads.len(), "processing upload");
    let settings = state.settings.clone();
    let files = tokio::task::spawn_blocking(move || process_files(uploads, &settings)).await?;
    Ok(Json(ProcessResponse { files }))
}

/// Converts a single file and answers with the artifact as an attachment.
pub(crate) async fn convert(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut uploads = read_uploads(multipart).await?;
    if uploads.len() != 1 {
        return Err(ApiError::BadRequest(format!("Expected exactly one file, got {}", uploads.len())));
    }
    let (file, mut options) = uploads.remove(0);
    options.convert.get_or_insert(TargetFormat::Csv);

    let settings = state.settings.clone();
    let report = tokio::task::spawn_blocking(move || process_file(&file, &options, &settings)).await??;
    let artifact = report
        .artifact
        .ok_or_else(|| ApiError::BadRequest("Nothing to convert".to_owned()))?;

    let headers = [
        (header::CONTENT_TYPE, artifact.mime_type),
        (header::CONTENT_DISPOSITION, content_disposition(&artifact.file_name)),
    ];
    Ok((headers, artifact.content))
}

/// Collects `file` parts, each paired with the `options` part that follows it.
async fn read_uploads(mut multipart: Multipart) -> Result<Vec<(UploadedFile, FileOptions)>, ApiError> {
    let mut uploads = Vec::<(UploadedFile, FileOptions)>::new();
    while let Some(field) = multipart.next_field().await? {
        let part = field.name().unwrap_or_default().to_owned();
        match part.as_str() {
            "file" => {
                let name = field.file_name().unwrap_or_default().to_owned();
                let content = field.bytes().await?;
                uploads.push((UploadedFile::new(name, content.to_vec()), FileOptions::default()));
            }
            "options" => {
                let text = field.text().await?;
                let options = serde_json::from_str::<FileOptions>(&text)
                    .map_err(|error| ApiError::BadRequest(format!("Invalid options: {error}")))?;
                match uploads.last_mut() {
                    Some((_, slot)) => *slot = options,
                    None => return Err(ApiError::BadRequest("An options part must follow a file part".to_owned())),
                }
            }
            _ => (),
        }
    }
    if uploads.is_empty() {
        return Err(ApiError::BadRequest("No file uploaded".to_owned()));
    }
    Ok(uploads)
}

/// Header value with characters unsafe in a quoted ASCII parameter replaced.
fn content_disposition(file_name: &str) -> String {
    let safe = file_name
        .chars()
        .map(|c| if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' { c } else { '_' })
        .collect::<String>();
    format!("attachment; filename=\"{safe}\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disposition_is_ascii() {
        assert_eq!(content_disposition("report 1.csv"), "attachment; filename=\"report 1.csv\"");
        assert_eq!(content_disposition("bé\"r.xlsx"), "attachment; filename=\"b__r.xlsx\"");
    }
}
