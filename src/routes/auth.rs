/// Session Routes
///
/// Registration, login, logout of either token, and access-token refresh.
/// The logout and refresh routes sit behind `JwtMiddleware`, which has
/// already validated the bearer token by the time these handlers run.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::Claims;
use crate::error::{AppError, ErrorContext};
use crate::session::{Registration, SessionController};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub role: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct RegistrationResponse {
    pub message: String,
    pub id: String,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: String,
    pub role: String,
    pub jwt_token: String,
    pub jwt_refresh_token: String,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// The new access token travels under this historical key.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub jwt_refresh_token: String,
}

/// POST /registration
///
/// # Errors
/// - 400: blank or malformed fields
/// - 409: username already taken
/// - 500: storage failure
pub async fn register(
    form: web::Json<RegisterRequest>,
    sessions: web::Data<SessionController>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_registration");
    let form = form.into_inner();

    let session = sessions
        .register(Registration {
            username: form.username,
            password: form.password,
            role: form.role,
            first_name: form.first_name,
            last_name: form.last_name,
        })
        .await
        .map_err(|e| context.record(e))?;

    Ok(HttpResponse::Ok().json(RegistrationResponse {
        message: format!("User {} was created", session.user.username),
        id: session.user.id.to_string(),
        access_token: session.tokens.access.token,
        refresh_token: session.tokens.refresh.token,
    }))
}

/// POST /login
///
/// Unknown user and wrong password give the same 401.
pub async fn login(
    form: web::Json<LoginRequest>,
    sessions: web::Data<SessionController>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_login");

    let session = sessions
        .login(&form.username, &form.password)
        .await
        .map_err(|e| context.record(e))?;
    let user = session.user;

    Ok(HttpResponse::Ok().json(LoginResponse {
        id: user.id.to_string(),
        first_name: user.first_name,
        last_name: user.last_name,
        username: user.username,
        role: user.role,
        jwt_token: session.tokens.access.token,
        jwt_refresh_token: session.tokens.refresh.token,
    }))
}

/// POST /logout/access
pub async fn logout_access(
    claims: web::ReqData<Claims>,
    sessions: web::Data<SessionController>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("logout_access").with_subject(claims.sub.clone());
    sessions.revoke(&claims).await.map_err(|e| context.record(e))?;

    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Access token has been revoked".to_string(),
    }))
}

/// POST /logout/refresh
pub async fn logout_refresh(
    claims: web::ReqData<Claims>,
    sessions: web::Data<SessionController>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("logout_refresh").with_subject(claims.sub.clone());
    sessions.revoke(&claims).await.map_err(|e| context.record(e))?;

    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Refresh token has been revoked".to_string(),
    }))
}

/// POST /token/refresh
///
/// The presented refresh token is neither revoked nor rotated.
pub async fn refresh(
    claims: web::ReqData<Claims>,
    sessions: web::Data<SessionController>,
) -> Result<HttpResponse, AppError> {
    let access = sessions.reissue_access(&claims)?;

    Ok(HttpResponse::Ok().json(RefreshResponse {
        jwt_refresh_token: access.token,
    }))
}
