use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::auth::{Claims, TokenError, TokenService};

/// Authenticated user context extracted from the bearer token
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: String,
    pub username: String,
    pub roles: Vec<String>,
}

impl AuthUser {
    /// Exact, case-sensitive match
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            username: claims.unique_name,
            roles: claims.roles,
        }
    }
}

/// What a route requires of the caller, declared where the route is mounted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccessPolicy {
    Authenticated,
    Role(&'static str),
}

/// Why the gate turned a request away. Rendered without a body.
#[derive(Debug)]
pub enum GateRejection {
    MissingToken,
    MalformedHeader,
    InvalidToken(TokenError),
    MissingRole(&'static str),
}

impl IntoResponse for GateRejection {
    fn into_response(self) -> Response {
        match self {
            GateRejection::MissingToken | GateRejection::MalformedHeader => (
                StatusCode::UNAUTHORIZED,
                [(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"))],
            )
                .into_response(),
            GateRejection::InvalidToken(TokenError::Expired) => (
                StatusCode::UNAUTHORIZED,
                [(
                    header::WWW_AUTHENTICATE,
                    HeaderValue::from_static(
                        r#"Bearer error="invalid_token", error_description="The token expired""#,
                    ),
                )],
            )
                .into_response(),
            GateRejection::InvalidToken(_) => (
                StatusCode::UNAUTHORIZED,
                [(
                    header::WWW_AUTHENTICATE,
                    HeaderValue::from_static(r#"Bearer error="invalid_token""#),
                )],
            )
                .into_response(),
            GateRejection::MissingRole(_) => StatusCode::FORBIDDEN.into_response(),
        }
    }
}

/// Token validation plus the access policy of the routes it guards
#[derive(Clone, Debug)]
pub struct AuthGate {
    tokens: Arc<TokenService>,
    policy: AccessPolicy,
}

impl AuthGate {
    pub fn new(tokens: Arc<TokenService>, policy: AccessPolicy) -> Self {
        Self { tokens, policy }
    }

    pub fn authorize(&self, headers: &HeaderMap) -> Result<AuthUser, GateRejection> {
        let token = extract_bearer(headers)?;
        let claims = self
            .tokens
            .validate(token)
            .map_err(GateRejection::InvalidToken)?;
        let user = AuthUser::from(claims);

        match self.policy {
            AccessPolicy::Authenticated => Ok(user),
            AccessPolicy::Role(role) if user.has_role(role) => Ok(user),
            AccessPolicy::Role(role) => Err(GateRejection::MissingRole(role)),
        }
    }
}

/// Bearer authentication middleware; inserts [`AuthUser`] into the request on success
pub async fn require_auth(
    State(gate): State<AuthGate>,
    mut request: Request,
    next: Next,
) -> Response {
    match gate.authorize(request.headers()) {
        Ok(user) => {
            tracing::debug!(user = %user.username, path = %request.uri().path(), "request authenticated");
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(rejection) => {
            tracing::info!(
                path = %request.uri().path(),
                reason = ?rejection,
                "request rejected by auth gate"
            );
            rejection.into_response()
        }
    }
}

/// Extract the token from `Authorization: Bearer <token>`
fn extract_bearer(headers: &HeaderMap) -> Result<&str, GateRejection> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(GateRejection::MissingToken)?
        .to_str()
        .map_err(|_| GateRejection::MalformedHeader)?;

    let (scheme, token) = value
        .split_once(' ')
        .ok_or(GateRejection::MalformedHeader)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(GateRejection::MalformedHeader);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(GateRejection::MissingToken);
    }
    Ok(token)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = GateRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(GateRejection::MissingToken)
    }
}
