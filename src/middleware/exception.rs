use std::panic::AssertUnwindSafe;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures::FutureExt;

use crate::config::Environment;
use crate::error::Fault;

/// Outermost failure boundary: every fault below it leaves as an [`ApiError`] body
#[derive(Clone, Copy, Debug)]
pub struct ErrorBoundary {
    environment: Environment,
}

/// Per-request state. `Faulted` is terminal; nothing is retried.
enum RequestState {
    Normal(Response),
    Faulted {
        fault: Fault,
        response: Option<Response>,
    },
}

impl ErrorBoundary {
    pub fn new(environment: Environment) -> Self {
        Self { environment }
    }

    fn render(&self, fault: &Fault, response: Option<Response>) -> Response {
        let api_error = fault.to_api_error(self.environment.is_production());

        let body = match serde_json::to_vec(&api_error) {
            Ok(body) => body,
            Err(e) => {
                tracing::error!("Failed to serialize error body: {}", e);
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        };

        // Keep whatever headers earlier layers already set on the faulted response
        let mut parts = match response {
            Some(response) => response.into_parts().0,
            None => axum::http::Response::new(()).into_parts().0,
        };
        parts.status = api_error.status();
        parts.extensions.remove::<Fault>();
        parts.headers.remove(header::CONTENT_LENGTH);
        parts.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );

        Response::from_parts(parts, Body::from(body))
    }
}

pub async fn exception_boundary(
    State(boundary): State<ErrorBoundary>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();

    let state = match AssertUnwindSafe(next.run(request)).catch_unwind().await {
        Ok(response) => match response.extensions().get::<Fault>().cloned() {
            Some(fault) => RequestState::Faulted {
                fault,
                response: Some(response),
            },
            None => RequestState::Normal(response),
        },
        Err(payload) => RequestState::Faulted {
            fault: Fault::from_panic(payload.as_ref()),
            response: None,
        },
    };

    match state {
        RequestState::Normal(response) => response,
        RequestState::Faulted { fault, response } => {
            if fault.status.is_server_error() {
                tracing::error!(
                    %method,
                    %path,
                    status = fault.status.as_u16(),
                    details = fault.details.as_deref().unwrap_or(""),
                    "{}",
                    fault.message
                );
            } else {
                tracing::warn!(%method, %path, status = fault.status.as_u16(), "{}", fault.message);
            }
            boundary.render(&fault, response)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ApiError, AppError};
    use axum::{
        http::HeaderName,
        middleware::{from_fn, from_fn_with_state},
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    async fn ok() -> &'static str {
        "fine"
    }

    async fn not_found() -> Result<&'static str, AppError> {
        Err(AppError::not_found("Member 42 not found"))
    }

    async fn internal() -> Result<&'static str, AppError> {
        Err(anyhow::anyhow!("disk on fire").context("saving member").into())
    }

    async fn bad_request() -> Result<&'static str, AppError> {
        Err(AppError::validation("Bad Request", "field X required"))
    }

    async fn boom() -> &'static str {
        panic!("handler exploded")
    }

    async fn tag_response(request: Request, next: Next) -> Response {
        let mut response = next.run(request).await;
        response.headers_mut().insert(
            HeaderName::from_static("x-request-tag"),
            HeaderValue::from_static("tagged"),
        );
        response
    }

    fn app(environment: Environment) -> Router {
        Router::new()
            .route("/ok", get(ok))
            .route("/not-found", get(not_found))
            .route("/internal", get(internal))
            .route("/bad-request", get(bad_request))
            .route("/panic", get(boom))
            .layer(from_fn(tag_response))
            .layer(from_fn_with_state(
                ErrorBoundary::new(environment),
                exception_boundary,
            ))
    }

    async fn get_error(environment: Environment, uri: &str) -> (Response, Option<ApiError>) {
        let response = app(environment)
            .oneshot(
                axum::http::Request::builder()
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let (parts, body) = response.into_parts();
        let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
        let parsed = serde_json::from_slice::<ApiError>(&bytes).ok();
        (Response::from_parts(parts, Body::empty()), parsed)
    }

    #[tokio::test]
    async fn success_passes_through_untouched() {
        let (response, body) = get_error(Environment::Development, "/ok").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body.is_none());
    }

    #[tokio::test]
    async fn specific_status_is_kept() {
        let (response, body) = get_error(Environment::Production, "/not-found").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );

        let body = body.unwrap();
        assert_eq!(body.status_code, 404);
        assert_eq!(body.message, "Member 42 not found");
        assert_eq!(body.details, None);
        assert!(response.extensions().get::<Fault>().is_none());
    }

    #[tokio::test]
    async fn development_includes_details() {
        let (response, body) = get_error(Environment::Development, "/internal").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body.unwrap();
        assert_eq!(body.status_code, 500);
        assert!(body.message.contains("saving member"));
        assert!(body.details.unwrap().contains("disk on fire"));
    }

    #[tokio::test]
    async fn production_never_includes_details() {
        for uri in ["/internal", "/bad-request", "/panic"] {
            let (_, body) = get_error(Environment::Production, uri).await;
            let body = body.unwrap();
            assert_eq!(body.details, None, "{uri}");
            assert!(!body.message.is_empty());
        }

        let (_, body) = get_error(Environment::Production, "/internal").await;
        assert_eq!(body.unwrap().message, "Internal Server Error");
    }

    #[tokio::test]
    async fn validation_details_are_shown_outside_production() {
        let (_, body) = get_error(Environment::Staging, "/bad-request").await;
        assert_eq!(
            body.unwrap(),
            ApiError::new(
                StatusCode::BAD_REQUEST,
                "Bad Request",
                Some("field X required".to_string())
            )
        );
    }

    #[tokio::test]
    async fn panics_become_500() {
        let (response, body) = get_error(Environment::Development, "/panic").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body.unwrap();
        assert_eq!(body.message, "handler exploded");
        assert!(body.details.unwrap().contains("handler exploded"));
    }

    #[tokio::test]
    async fn faulted_response_keeps_inner_headers() {
        let (response, _) = get_error(Environment::Development, "/not-found").await;
        assert_eq!(response.headers()["x-request-tag"], "tagged");
    }
}
