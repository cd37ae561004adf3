use crate::commands::CLIENT;
use anyhow::{bail, Context, Result};
use axum::body::Bytes;
use axum::response::{Html, IntoResponse, Response};
use http::{header, HeaderMap, StatusCode};
use serde_json::{Map, Value};
use tracing::{debug, trace, warn};
use url::Url;

/// A form submission as received from the browser, an open-ended mapping of
/// field names to values.
type Submission = Map<String, Value>;

/// The backend's JSON response. The shape is not validated, missing or
/// non-string fields degrade when the fragment is rendered instead of failing
/// the request.
struct BackendResult(Value);

impl BackendResult {
    /// Returns the named field as text. Missing and null fields come back as
    /// the empty string, other non-string values in their JSON display form.
    fn text_field(&self, name: &str) -> String {
        match self.0.get(name) {
            Some(Value::String(text)) => text.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }
}

pub(crate) async fn handler(headers: HeaderMap, body: Bytes, backend_url: Url) -> Response {
    let submission = match parse_submission(&headers, &body) {
        Ok(submission) => submission,
        Err(err) => {
            debug!(%err, "Rejecting submission with an unparseable body");
            return (StatusCode::BAD_REQUEST, "Invalid submission body").into_response();
        }
    };

    let endpoint = process_endpoint(&backend_url);

    trace!(endpoint=%endpoint, "Forwarding submission to backend");

    match forward(&endpoint, &submission).await {
        Ok(result) => Html(render_fragment(&result)).into_response(),
        Err(err) => {
            warn!(
                endpoint=%endpoint,
                err=%err,
                "Unable to forward submission to backend",
            );
            (StatusCode::INTERNAL_SERVER_ERROR, "Error connecting to backend").into_response()
        }
    }
}

/// Decode the submission body. The Content-Type header selects between a JSON
/// object and URL-encoded form data, without one the body is treated as form
/// data.
fn parse_submission(headers: &HeaderMap, body: &[u8]) -> Result<Submission> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if content_type.starts_with("application/json") {
        let value: Value = serde_json::from_slice(body).context("invalid JSON body")?;
        match value {
            Value::Object(fields) => Ok(fields),
            _ => bail!("JSON body is not an object"),
        }
    } else {
        Ok(url::form_urlencoded::parse(body)
            .into_owned()
            .map(|(name, value)| (name, Value::String(value)))
            .collect())
    }
}

/// POST the submission to the backend and decode its JSON response. Every
/// failure mode of the exchange surfaces here, the caller does not distinguish
/// between them.
async fn forward(endpoint: &Url, submission: &Submission) -> reqwest::Result<BackendResult> {
    let response = CLIENT
        .post(endpoint.as_str())
        .json(submission)
        .send()
        .await?
        .error_for_status()?;

    Ok(BackendResult(response.json().await?))
}

/// Join the fixed process path onto the backend base URL, keeping any path the
/// base already carries.
fn process_endpoint(base: &Url) -> Url {
    let mut url = base.clone();
    let path = format!("{}/process", base.path().trim_end_matches('/'));
    url.set_path(&path);
    url
}

/// Render the fragment returned to the browser. Interpolated values are
/// escaped, the backend is not trusted to return safe HTML.
fn render_fragment(result: &BackendResult) -> String {
    format!(
        "<h2>Response from backend</h2>\n\
         <p><b>Name:</b> {}</p>\n\
         <p><b>Email:</b> {}</p>\n\
         <p>{}</p>\n",
        escape_html(&result.text_field("name")),
        escape_html(&result.text_field("email")),
        escape_html(&result.text_field("message")),
    )
}

/// Escape special characters for HTML text content
fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
