/// User Administration Routes
///
/// Listing and bulk deletion of users. Password hashes never leave the
/// service.

use actix_web::{web, HttpResponse};
use serde::Serialize;

use crate::error::{AppError, ErrorContext};
use crate::session::SessionController;
use crate::store::User;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub role: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id.to_string(),
            username: user.username,
            role: user.role,
            first_name: user.first_name,
            last_name: user.last_name,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
pub struct UserListResponse {
    pub users: Vec<UserResponse>,
}

/// GET /users
pub async fn list_users(
    sessions: web::Data<SessionController>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("list_users");
    let users = sessions.list_users().await.map_err(|e| context.record(e))?;

    Ok(HttpResponse::Ok().json(UserListResponse {
        users: users.into_iter().map(UserResponse::from).collect(),
    }))
}

/// DELETE /users
pub async fn delete_users(
    sessions: web::Data<SessionController>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("delete_users");
    let removed = sessions.delete_users().await.map_err(|e| context.record(e))?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": format!("{} row(s) deleted", removed)
    })))
}
