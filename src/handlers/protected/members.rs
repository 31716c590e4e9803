// handlers/protected/members.rs - /api/members and /api/admin/members

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::app::AppState;
use crate::database::{models::AppUser, UserRepository};
use crate::error::AppError;
use crate::middleware::AuthUser;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMemberRequest {
    #[serde(default)]
    pub user_name: String,
}

/// GET /api/members
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<AppUser>>, AppError> {
    let members = UserRepository::new(state.db.clone()).list().await?;
    Ok(Json(members))
}

/// GET /api/members/:id
pub async fn get(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<AppUser>, AppError> {
    let Path(id) = id?;
    UserRepository::new(state.db.clone())
        .find(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("Member {id} not found")))
}

/// POST /api/admin/members
pub async fn create(
    State(state): State<AppState>,
    admin: AuthUser,
    request: Result<Json<CreateMemberRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AppUser>), AppError> {
    let Json(request) = request?;
    let user_name = request.user_name.trim().to_lowercase();
    if user_name.is_empty() {
        return Err(AppError::validation(
            "One or more validation errors occurred",
            "userName: The UserName field is required.",
        ));
    }

    let taken = || AppError::conflict(format!("Username '{user_name}' is taken"));

    let users = UserRepository::new(state.db.clone());
    if users.exists(&user_name).await? {
        return Err(taken());
    }

    // A concurrent create can still win between the check and the insert
    let member = match users.insert(&user_name).await.map_err(AppError::from) {
        Ok(member) => member,
        Err(AppError::Conflict(_)) => return Err(taken()),
        Err(e) => return Err(e),
    };
    tracing::info!(admin = %admin.username, member = %member.user_name, "member created");
    Ok((StatusCode::CREATED, Json(member)))
}
