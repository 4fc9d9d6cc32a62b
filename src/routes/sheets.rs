use axum::{
    extract::{Multipart, Query, State},
    http::{header, Method},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use crate::{
    AppState,
    error::AppError,
    services::{excel::utils, file_processor},
};
use tower_http::cors::{Any, CorsLayer};

pub fn routes() -> Router<Arc<AppState>> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/", get(index))
        .route("/upload", post(upload))
        .route("/download", get(download))
        .layer(cors)
}

const PAGE_STYLE: &str = r#"
        body { font-family: Arial, sans-serif; background-color: #f4f4f4; padding: 30px; text-align: center; }
        h1 { color: #1F4E78; }
        h2 { color: #48A6A7; }
        form, .buttons { background: #fff; padding: 20px; border-radius: 8px; display: inline-block; box-shadow: 0 0 10px rgba(0,0,0,0.1); }
        input[type=file] { margin: 10px 0; }
        button, a { background-color: #48A6A7; color: white; padding: 10px 20px; border: none; border-radius: 5px; cursor: pointer; text-decoration: none; }
        button:hover, a:hover { background-color: #163b5c; }
        a.download-link { background: #28a745; }
        a.download-link:hover { background: #218838; }
"#;

/// Upload page, or the download page once a formatted file is ready.
/// The filename only ever comes out of `utils::output_filename`, so it is
/// safe to splice into the markup.
fn render_page(ready_file: Option<&str>) -> Html<String> {
    let body = match ready_file {
        None => r#"<form action="/upload" method="post" enctype="multipart/form-data">
        <label>Select your Excel file (.xlsx only):</label><br>
        <input type="file" name="excel_file" accept=".xlsx" required><br>
        <button type="submit">Upload &amp; Format</button>
    </form>"#
            .to_string(),
        Some(filename) => format!(
            r#"<div class="buttons">
        <a class="download-link" href="/download?filename={filename}">⬇️ Download Formatted File</a><br><br>
        <a href="/">🔁 Upload Another File</a>
    </div>"#
        ),
    };

    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>📚BWU Attendance Summarizer</title>
    <style>{PAGE_STYLE}</style>
</head>
<body>
    <h1>📊 Format your BWU Attendance File</h1>
    <h2>👇Upload your file to see the Magic👇</h2>

    {body}
</body>
</html>"#
    ))
}

async fn index() -> Html<String> {
    render_page(None)
}

#[axum::debug_handler]
async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Html<String>, AppError> {
    let start = std::time::Instant::now();

    let mut payload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Invalid multipart payload: {}", e)))?
    {
        if field.name() != Some("excel_file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload.xlsx").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::InvalidInput(format!("Failed to read upload: {}", e)))?;
        payload = Some((file_name, data));
        break;
    }

    let (file_name, data) = payload
        .ok_or_else(|| AppError::InvalidInput("No file uploaded".to_string()))?;

    tracing::info!("Received upload: {}, size: {}KB", file_name, data.len() / 1024);

    if !file_name.to_lowercase().ends_with(".xlsx") {
        tracing::error!("Unsupported file type: {}", file_name);
        return Err(AppError::InvalidInput("Only XLSX files are supported".to_string()));
    }
    if data.is_empty() {
        return Err(AppError::InvalidInput("No file uploaded".to_string()));
    }

    let format_start = std::time::Instant::now();
    let output = file_processor::format_workbook(data)?;
    tracing::info!("Workbook formatted in {:?}", format_start.elapsed());

    let new_filename = utils::output_filename(&file_name);
    let output_path = state.config.upload_dir.join(&new_filename);
    std::fs::write(&output_path, &output)?;

    tracing::info!(
        "Saved {} ({}KB) in {:?} total",
        output_path.display(),
        output.len() / 1024,
        start.elapsed()
    );

    Ok(render_page(Some(&new_filename)))
}

#[derive(Debug, Deserialize)]
struct DownloadParams {
    filename: String,
}

async fn download(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DownloadParams>,
) -> Result<Response, AppError> {
    let filename = params.filename;

    // Never resolve path-like names against the upload dir
    if filename.contains('/') || filename.contains('\\') || filename.contains("..") {
        return Err(AppError::InvalidInput("Invalid filename".to_string()));
    }

    let path = state.config.upload_dir.join(&filename);
    if !path.is_file() {
        return Err(AppError::NotFound(format!("File not found: {}", filename)));
    }

    let data = std::fs::read(&path)?;
    tracing::info!("Serving download: {} ({}KB)", filename, data.len() / 1024);

    Ok((
        [
            (
                header::CONTENT_TYPE,
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet".to_string(),
            ),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        data,
    )
        .into_response())
}
