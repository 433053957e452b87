use actix_web::{
    body::EitherBody,
    cookie::{time::Duration as CookieDuration, Cookie, SameSite},
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    web, Error, HttpMessage, HttpResponse,
};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::rc::Rc;

use crate::models::{AuthState, Session};
use crate::services::auth_service::{self, Credentials};
use crate::state::AppState;

pub const ACCESS_COOKIE: &str = "sb-access-token";
pub const REFRESH_COOKIE: &str = "sb-refresh-token";

/// O que fazer quando a rota é protegida e não há sessão.
#[derive(Clone, Copy, Debug)]
pub enum OnMissing {
    /// Páginas HTML: redireciona para a tela de login.
    Redirect(&'static str),
    /// API JSON: 401.
    Reject,
}

/// Guards a scope: children only run with an authenticated `Session`, which
/// is inserted into the request extensions (`web::ReqData<Session>`).
pub struct RequireSession {
    on_missing: OnMissing,
}

impl RequireSession {
    pub fn redirect_to(path: &'static str) -> Self {
        Self { on_missing: OnMissing::Redirect(path) }
    }

    pub fn bearer() -> Self {
        Self { on_missing: OnMissing::Reject }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequireSession
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RequireSessionMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequireSessionMiddleware {
            service: Rc::new(service),
            on_missing: self.on_missing,
        }))
    }
}

pub struct RequireSessionMiddleware<S> {
    service: Rc<S>,
    on_missing: OnMissing,
}

impl<S, B> Service<ServiceRequest> for RequireSessionMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let on_missing = self.on_missing;

        Box::pin(async move {
            let credentials = credentials_from(&req);
            let had_cookies = req.cookie(ACCESS_COOKIE).is_some() || req.cookie(REFRESH_COOKIE).is_some();

            let resolution = match req.app_data::<web::Data<AppState>>() {
                Some(state) => {
                    auth_service::resolve_session(state.auth.as_ref(), state.jwt.as_ref(), credentials).await
                }
                None => {
                    log::error!("❌ AppState missing; treating request as unauthenticated");
                    auth_service::Resolution { state: AuthState::Unauthenticated, refreshed: None }
                }
            };

            match resolution.state {
                AuthState::Authenticated(session) => {
                    req.extensions_mut().insert(session);
                    let mut res = service.call(req).await?;

                    if let Some(refreshed) = resolution.refreshed {
                        let secure = res
                            .request()
                            .app_data::<web::Data<AppState>>()
                            .map_or(false, |s| s.config.cookie_secure);
                        for cookie in session_cookies(&refreshed, secure) {
                            res.response_mut().add_cookie(&cookie)?;
                        }
                    }

                    Ok(res.map_into_left_body())
                }
                AuthState::Unauthenticated => {
                    log::debug!("🔒 No session for {}", req.path());
                    let mut response = match on_missing {
                        OnMissing::Redirect(to) => {
                            let location = login_location(to, req.path());
                            HttpResponse::SeeOther()
                                .insert_header((header::LOCATION, location))
                                .finish()
                        }
                        OnMissing::Reject => HttpResponse::Unauthorized().json(serde_json::json!({
                            "success": false,
                            "error": "Missing or invalid session"
                        })),
                    };

                    if had_cookies {
                        for cookie in cleared_cookies() {
                            response.add_cookie(&cookie)?;
                        }
                    }

                    Ok(req.into_response(response).map_into_right_body())
                }
            }
        })
    }
}

/// Bearer header wins over cookies; the refresh token only comes from cookies.
pub fn credentials_from(req: &ServiceRequest) -> Credentials {
    let bearer = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string());

    Credentials {
        access_token: bearer.or_else(|| req.cookie(ACCESS_COOKIE).map(|c| c.value().to_string())),
        refresh_token: req.cookie(REFRESH_COOKIE).map(|c| c.value().to_string()),
    }
}

/// `/auth?next=/admin/abc`
pub fn login_location(login_path: &str, requested: &str) -> String {
    format!("{}?next={}", login_path, urlencoding::encode(requested))
}

/// Only same-origin absolute paths are accepted as post-login targets.
/// Browsers drop tab/CR/LF inside a URL, so `/\t/host` would turn into
/// `//host`; any control character sends the user to `/admin`.
pub fn safe_next(next: Option<&str>) -> String {
    match next {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.contains('\\')
                && !path.chars().any(|c| c.is_control()) =>
        {
            path.to_string()
        }
        _ => "/admin".to_string(),
    }
}

pub fn session_cookies(session: &Session, secure: bool) -> Vec<Cookie<'static>> {
    let mut cookies = vec![Cookie::build(ACCESS_COOKIE, session.access_token.clone())
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .finish()];

    if let Some(refresh) = &session.refresh_token {
        cookies.push(
            Cookie::build(REFRESH_COOKIE, refresh.clone())
                .path("/")
                .http_only(true)
                .secure(secure)
                .same_site(SameSite::Lax)
                .max_age(CookieDuration::days(30))
                .finish(),
        );
    }

    cookies
}

pub fn cleared_cookies() -> Vec<Cookie<'static>> {
    [ACCESS_COOKIE, REFRESH_COOKIE]
        .into_iter()
        .map(|name| {
            let mut cookie = Cookie::build(name, "").path("/").finish();
            cookie.make_removal();
            cookie
        })
        .collect()
}
