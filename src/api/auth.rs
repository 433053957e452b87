use actix_web::{web, HttpRequest, HttpResponse};

use crate::middleware::auth::{cleared_cookies, session_cookies, ACCESS_COOKIE};
use crate::models::{LoginRequest, LoginResponse, Session, User};
use crate::state::AppState;
use crate::utils::AppError;

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    state: web::Data<AppState>,
    request: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("🔐 POST /auth/login - email: {}", request.email);

    match state.auth.sign_in(&request.email, &request.password).await {
        Ok(session) => {
            log::info!("✅ Login successful: {}", request.email);
            let mut builder = HttpResponse::Ok();
            for cookie in session_cookies(&session, state.config.cookie_secure) {
                builder.cookie(cookie);
            }
            Ok(builder.json(LoginResponse::from(session)))
        }
        Err(e) => {
            log::warn!("❌ Login failed: {} - {}", request.email, e);
            Err(e)
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "Auth",
    responses(
        (status = 200, description = "Session revoked and cookies cleared")
    )
)]
pub async fn logout(state: web::Data<AppState>, req: HttpRequest) -> HttpResponse {
    log::info!("👋 POST /auth/logout");

    if let Some(token) = request_token(&req) {
        // Revogar é best-effort: os cookies saem de qualquer jeito.
        if let Err(e) = state.auth.sign_out(&token).await {
            log::warn!("⚠️  Logout at auth provider failed: {}", e);
        }
    }

    let mut builder = HttpResponse::Ok();
    for cookie in cleared_cookies() {
        builder.cookie(cookie);
    }
    builder.json(serde_json::json!({ "success": true }))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_me(session: web::ReqData<Session>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "user": session.user,
        "expires_at": session.expires_at,
    }))
}

pub(crate) fn request_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(actix_web::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .or_else(|| req.cookie(ACCESS_COOKIE).map(|c| c.value().to_string()))
}
