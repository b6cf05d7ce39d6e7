use axum::{
    extract::Path,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use rust_embed::RustEmbed;

/// Chat UI assets compiled into the binary, so the server ships as a single
/// executable with no asset directory to deploy.
#[derive(RustEmbed)]
#[folder = "static/"]
struct UiAssets;

pub async fn static_handler(Path(path): Path<String>) -> Response {
    let path = path.trim_start_matches('/');
    match UiAssets::get(path) {
        Some(asset) => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            ([(header::CONTENT_TYPE, mime.as_ref())], asset.data.to_vec()).into_response()
        }
        None => (StatusCode::NOT_FOUND, "no such asset").into_response(),
    }
}

pub fn embedded_text(path: &str) -> Option<String> {
    UiAssets::get(path).map(|asset| String::from_utf8_lossy(&asset.data).into_owned())
}
