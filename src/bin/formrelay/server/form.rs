use axum::body;
use axum::extract::Path;
use axum::response::{IntoResponse, Response};
use http::{header, StatusCode};
use include_dir::{include_dir, Dir};
use tracing::{error, trace, warn};

static STATIC_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/files/form");

/// Serve a file from the embedded form assets. Requests to the root serve the
/// form document itself. Returns 404 if the file was not found.
pub(crate) async fn handler(optional_path: Option<Path<String>>) -> impl IntoResponse {
    let path = optional_path.map_or_else(|| "form.html".to_string(), |path| path.0);

    trace!(?path, "Serving static file");

    match STATIC_DIR.get_file(&path) {
        None => {
            warn!(?path, "Requested file was not found in the form assets");
            StatusCode::NOT_FOUND.into_response()
        }
        Some(file) => {
            let content_type = mime_guess::from_path(file.path()).first_or_octet_stream();

            Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, content_type.as_ref())
                .body(body::boxed(body::Full::from(file.contents())))
                .map(|res| res.into_response())
                .unwrap_or_else(|err| {
                    error!("Failed to build response: {}", err);
                    StatusCode::INTERNAL_SERVER_ERROR.into_response()
                })
        }
    }
}
