use actix_web::{http::header, web, HttpRequest, HttpResponse};
use askama::Template;
use serde::Deserialize;

use super::{html, see_other};
use crate::api::auth::request_token;
use crate::middleware::auth::{cleared_cookies, safe_next, session_cookies};
use crate::state::AppState;
use crate::utils::AppError;

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginPageTemplate {
    pub next: String,
    pub email: String,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

/// GET /auth
pub async fn login_page(query: web::Query<LoginQuery>) -> Result<HttpResponse, AppError> {
    let template = LoginPageTemplate {
        next: safe_next(query.next.as_deref()),
        email: String::new(),
        error: query.error.clone(),
    };
    Ok(html(template.render()?))
}

/// POST /auth - login com email e senha; em caso de sucesso grava os cookies
/// e volta para onde o usuário queria ir.
pub async fn login_submit(
    state: web::Data<AppState>,
    form: web::Form<LoginForm>,
) -> Result<HttpResponse, AppError> {
    let form = form.into_inner();
    let next = safe_next(form.next.as_deref());
    log::info!("🔐 POST /auth - email: {}", form.email);

    let message = match state.auth.sign_in(&form.email, &form.password).await {
        Ok(session) => {
            log::info!("✅ Login successful: {}", form.email);
            let mut builder = HttpResponse::SeeOther();
            builder.insert_header((header::LOCATION, next));
            for cookie in session_cookies(&session, state.config.cookie_secure) {
                builder.cookie(cookie);
            }
            return Ok(builder.finish());
        }
        Err(AppError::InvalidRequest(_)) => "Email dan kata sandi wajib diisi",
        Err(AppError::Unauthorized(_)) => "Email atau kata sandi salah",
        Err(e) => {
            log::error!("❌ Login failed: {} - {}", form.email, e);
            return Err(e);
        }
    };

    log::warn!("❌ Login rejected: {}", form.email);
    let template = LoginPageTemplate {
        next,
        email: form.email,
        error: Some(message.to_string()),
    };
    Ok(HttpResponse::Unauthorized()
        .content_type("text/html; charset=utf-8")
        .body(template.render()?))
}

/// POST /auth/logout
pub async fn logout(state: web::Data<AppState>, req: HttpRequest) -> HttpResponse {
    if let Some(token) = request_token(&req) {
        if let Err(e) = state.auth.sign_out(&token).await {
            log::warn!("⚠️  Logout at auth provider failed: {}", e);
        }
    }

    let mut response = see_other("/auth");
    for cookie in cleared_cookies() {
        if let Err(e) = response.add_cookie(&cookie) {
            log::warn!("⚠️  Could not clear cookie {}: {}", cookie.name(), e);
        }
    }
    response
}
