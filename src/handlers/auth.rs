use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};

use crate::error::{ApiResponse, Result};
use crate::models::{
    CreateUserRequest, ForgotPasswordRequest, LoginRequest, LoginResponse, ResetPasswordRequest,
    UserResponse, VerifyEmailQuery,
};
use crate::services::AuthService;
use crate::AppState;

/// Register a new user
/// POST /api/v1/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserResponse>>)> {
    let user = AuthService::register(
        &state.db,
        state.mailer.as_ref(),
        &state.config.server.public_url,
        req,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(user))))
}

/// Verify user email
/// GET /api/v1/auth/verify-email?token=...
pub async fn verify_email(
    State(state): State<AppState>,
    Query(query): Query<VerifyEmailQuery>,
) -> Result<Json<ApiResponse<()>>> {
    AuthService::verify_email(&state.db, &query.token).await?;
    Ok(Json(ApiResponse::<()>::success_message(
        "Email verified. You can now log in.",
    )))
}

/// Login user
/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>> {
    let response = AuthService::login(&state.db, &state.config, req).await?;
    Ok(Json(ApiResponse::success(response)))
}

/// Request a password reset email
/// POST /api/v1/auth/forgot-password
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<Json<ApiResponse<()>>> {
    AuthService::forgot_password(
        &state.db,
        state.mailer.as_ref(),
        &state.config.server.public_url,
        &req.email,
    )
    .await?;
    Ok(Json(ApiResponse::<()>::success_message(
        "Password reset email sent",
    )))
}

/// Reset password with a token
/// POST /api/v1/auth/reset-password
pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<ApiResponse<()>>> {
    AuthService::reset_password(&state.db, &req.token, &req.password, &req.confirm_password)
        .await?;
    Ok(Json(ApiResponse::<()>::success_message(
        "Password has been updated",
    )))
}
