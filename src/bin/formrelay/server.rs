use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::routing::{get, post};
use axum::{Router, Server};
use http::HeaderMap;
use std::net::SocketAddr;
use tracing::{debug, info};
use url::Url;

mod form;
mod relay;

pub(crate) async fn start_web_server(listen_address: &SocketAddr, backend_url: Url) -> Result<()> {
    let app = router(backend_url);

    let server = Server::try_bind(listen_address)
        .with_context(|| format!("failed to bind to {}", listen_address))?
        .serve(app.into_make_service());

    debug!("Web server listening on {}", server.local_addr());

    info!("Form endpoint: http://{}", server.local_addr());

    // TODO: Add support for graceful shutdown
    // server.with_graceful_shutdown(shutdown_signal()).await?;
    server.await?;

    Ok(())
}

/// Build the application router. The backend URL is resolved once at startup
/// and moved into the submit handler, request handling never consults the
/// environment.
fn router(backend_url: Url) -> Router {
    Router::new()
        .route("/", get(form::handler))
        .route(
            "/submit",
            post(move |headers: HeaderMap, body: Bytes| relay::handler(headers, body, backend_url)),
        )
        .route("/*path", get(form::handler))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Json;
    use http::StatusCode;
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    /// Bind the given router to an ephemeral port and serve it in the
    /// background, returning the bound address.
    fn serve(app: Router) -> SocketAddr {
        let server = Server::bind(&SocketAddr::from(([127, 0, 0, 1], 0)))
            .serve(app.into_make_service());
        let addr = server.local_addr();
        tokio::spawn(server);
        addr
    }

    /// A stand-in for the backend service. It echoes the submission back with
    /// a fixed message field and records the body it received.
    fn stub_backend(received: Arc<Mutex<Option<Value>>>) -> Router {
        Router::new().route(
            "/process",
            post(move |Json(body): Json<Value>| {
                let received = received.clone();
                async move {
                    *received.lock().unwrap() = Some(body.clone());

                    let mut reply = body;
                    reply["message"] = json!("Data received successfully");
                    Json(reply)
                }
            }),
        )
    }

    /// A backend URL that nothing listens on, port 1 refuses connections.
    fn unreachable_backend() -> Url {
        Url::parse("http://127.0.0.1:1").unwrap()
    }

    #[tokio::test]
    async fn form_is_served_at_root() {
        let addr = serve(router(unreachable_backend()));

        let response = reqwest::get(format!("http://{addr}/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers()[http::header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .to_string();
        assert!(content_type.starts_with("text/html"));

        let body = response.text().await.unwrap();
        assert!(body.contains("<form"));
        assert!(body.contains("/submit"));
    }

    #[tokio::test]
    async fn assets_are_served_with_a_content_type() {
        let addr = serve(router(unreachable_backend()));

        let response = reqwest::get(format!("http://{addr}/style.css")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[http::header::CONTENT_TYPE], "text/css");
    }

    #[tokio::test]
    async fn unknown_assets_return_not_found() {
        let addr = serve(router(unreachable_backend()));

        let response = reqwest::get(format!("http://{addr}/missing.js")).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn submit_renders_backend_reply() {
        let received = Arc::new(Mutex::new(None));
        let backend_addr = serve(stub_backend(received.clone()));
        let backend_url = Url::parse(&format!("http://{backend_addr}")).unwrap();
        let addr = serve(router(backend_url));

        let response = reqwest::Client::new()
            .post(format!("http://{addr}/submit"))
            .json(&json!({"name": "Alice", "email": "a@x.com"}))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.text().await.unwrap();
        assert!(body.contains("Alice"));
        assert!(body.contains("a@x.com"));
        assert!(body.contains("Data received successfully"));
    }

    #[tokio::test]
    async fn submission_is_forwarded_verbatim() {
        let received = Arc::new(Mutex::new(None));
        let backend_addr = serve(stub_backend(received.clone()));
        let backend_url = Url::parse(&format!("http://{backend_addr}")).unwrap();
        let addr = serve(router(backend_url));

        reqwest::Client::new()
            .post(format!("http://{addr}/submit"))
            .json(&json!({"a": "1", "b": "2"}))
            .send()
            .await
            .unwrap();

        assert_eq!(*received.lock().unwrap(), Some(json!({"a": "1", "b": "2"})));
    }

    #[tokio::test]
    async fn form_encoded_submissions_forward_as_json() {
        let received = Arc::new(Mutex::new(None));
        let backend_addr = serve(stub_backend(received.clone()));
        let backend_url = Url::parse(&format!("http://{backend_addr}")).unwrap();
        let addr = serve(router(backend_url));

        reqwest::Client::new()
            .post(format!("http://{addr}/submit"))
            .form(&[("a", "1"), ("b", "2")])
            .send()
            .await
            .unwrap();

        assert_eq!(*received.lock().unwrap(), Some(json!({"a": "1", "b": "2"})));
    }

    #[tokio::test]
    async fn unreachable_backend_returns_server_error() {
        let addr = serve(router(unreachable_backend()));

        let response = reqwest::Client::new()
            .post(format!("http://{addr}/submit"))
            .json(&json!({"name": "Alice"}))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.text().await.unwrap(), "Error connecting to backend");
    }

    #[tokio::test]
    async fn non_json_backend_reply_returns_server_error() {
        let backend = Router::new().route("/process", post(|| async { "not json" }));
        let backend_addr = serve(backend);
        let backend_url = Url::parse(&format!("http://{backend_addr}")).unwrap();
        let addr = serve(router(backend_url));

        let response = reqwest::Client::new()
            .post(format!("http://{addr}/submit"))
            .json(&json!({"name": "Alice"}))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.text().await.unwrap(), "Error connecting to backend");
    }

    #[tokio::test]
    async fn backend_error_status_returns_server_error() {
        let backend = Router::new().route(
            "/process",
            post(|| async { (StatusCode::BAD_GATEWAY, "upstream is down") }),
        );
        let backend_addr = serve(backend);
        let backend_url = Url::parse(&format!("http://{backend_addr}")).unwrap();
        let addr = serve(router(backend_url));

        let response = reqwest::Client::new()
            .post(format!("http://{addr}/submit"))
            .json(&json!({"name": "Alice"}))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.text().await.unwrap(), "Error connecting to backend");
    }

    #[tokio::test]
    async fn unparseable_body_is_rejected_without_backend_call() {
        let received = Arc::new(Mutex::new(None));
        let backend_addr = serve(stub_backend(received.clone()));
        let backend_url = Url::parse(&format!("http://{backend_addr}")).unwrap();
        let addr = serve(router(backend_url));

        let response = reqwest::Client::new()
            .post(format!("http://{addr}/submit"))
            .header(http::header::CONTENT_TYPE, "application/json")
            .body("{not json")
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(*received.lock().unwrap(), None);
    }
}
