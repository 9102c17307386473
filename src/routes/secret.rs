use actix_web::{web, HttpResponse};

use crate::auth::Claims;

/// GET /secret
///
/// Static payload behind an access token.
pub async fn secret(claims: web::ReqData<Claims>) -> HttpResponse {
    tracing::debug!(sub = %claims.sub, "Secret resource served");
    HttpResponse::Ok().json(serde_json::json!([{ "id": 12, "uid": 32 }]))
}
