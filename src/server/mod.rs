use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tracing::{error, info};

use crate::search::SearchEngine;

pub mod api;
pub mod routes;

/// Every request goes through [routes::route_request]; axum only owns the socket.
pub fn router(engine: Arc<SearchEngine>) -> Router {
    Router::new().fallback(dispatch).with_state(engine)
}

pub fn run_server(bind_addr: &str, engine: Arc<SearchEngine>) -> std::io::Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let listener = tokio::net::TcpListener::bind(bind_addr).await?;
        info!(bind_addr, "capexempt server listening on http://{bind_addr}");
        axum::serve(listener, router(engine)).await
    })
}

async fn dispatch(
    State(engine): State<Arc<SearchEngine>>,
    method: Method,
    uri: Uri,
    body: String,
) -> Response {
    let path = uri.path().to_string();
    // Queries are CPU-bound over the whole table.
    let routed = tokio::task::spawn_blocking(move || {
        routes::route_request(&engine, method.as_str(), &path, &body)
    })
    .await;

    match routed {
        Ok(response) => response.into_response(),
        Err(err) => {
            error!(error = %err, path = uri.path(), "request handler failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

impl IntoResponse for routes::HttpResponse {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = status;
        let headers = response.headers_mut();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(self.content_type));
        if self.content_type.starts_with("text/csv") {
            headers.insert(
                header::CONTENT_DISPOSITION,
                HeaderValue::from_static(
                    "attachment; filename=\"cap_exempt_employers.csv\"",
                ),
            );
        }
        response
    }
}
