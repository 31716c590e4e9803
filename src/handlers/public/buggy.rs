// handlers/public/buggy.rs - Deliberate failures for exercising the error boundary
//
// Every handler here fails; the exception boundary is what shapes the response.

use anyhow::Context;

use crate::error::AppError;

/// GET /api/buggy/not-found
pub async fn not_found() -> Result<(), AppError> {
    Err(AppError::not_found("Not Found"))
}

/// GET /api/buggy/bad-request
pub async fn bad_request() -> Result<(), AppError> {
    Err(AppError::validation(
        "This was not a good request",
        "userName: The UserName field is required.",
    ))
}

/// GET /api/buggy/server-error
pub async fn server_error() -> Result<(), AppError> {
    let _id = "thing".parse::<i64>().context("Failed to parse member id")?;
    Ok(())
}

/// GET /api/buggy/panic
pub async fn panic() -> &'static str {
    panic!("This is a server panic")
}
