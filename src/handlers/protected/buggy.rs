// handlers/protected/buggy.rs - GET /api/buggy/auth

use crate::middleware::AuthUser;

/// Succeeds only behind the auth gate
pub async fn auth(user: AuthUser) -> String {
    tracing::debug!(user = %user.username, "secret text requested");
    "secret text".to_string()
}
