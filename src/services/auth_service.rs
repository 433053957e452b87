use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::database::Supabase;
use crate::models::{AuthState, Session, User};
use crate::utils::AppError;

/// Serviço de autenticação externo (GoTrue). Sessões são emitidas e
/// revogadas lá; aqui só as consumimos.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AppError>;
    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, AppError>;
    async fn get_user(&self, access_token: &str) -> Result<User, AppError>;
    async fn sign_out(&self, access_token: &str) -> Result<(), AppError>;
}

// Resposta do endpoint /token do GoTrue
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    expires_at: Option<i64>,
    user: User,
}

impl TokenResponse {
    fn into_session(self, now: DateTime<Utc>) -> Session {
        let expires_at = match (self.expires_at, self.expires_in) {
            (Some(ts), _) => Utc.timestamp_opt(ts, 0).single(),
            (None, Some(secs)) => Some(now + Duration::seconds(secs)),
            (None, None) => None,
        };

        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user,
        }
    }
}

#[async_trait]
impl AuthProvider for Supabase {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AppError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AppError::InvalidRequest("email and password are required".into()));
        }

        let request = self
            .auth(Method::POST, "token", None)
            .query(&[("grant_type", "password")])
            .json(&serde_json::json!({ "email": email.trim(), "password": password }));

        let token: TokenResponse = Supabase::send_json(request).await.map_err(invalid_grant)?;
        Ok(token.into_session(Utc::now()))
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, AppError> {
        let request = self
            .auth(Method::POST, "token", None)
            .query(&[("grant_type", "refresh_token")])
            .json(&serde_json::json!({ "refresh_token": refresh_token }));

        let token: TokenResponse = Supabase::send_json(request).await.map_err(invalid_grant)?;
        Ok(token.into_session(Utc::now()))
    }

    async fn get_user(&self, access_token: &str) -> Result<User, AppError> {
        let request = self.auth(Method::GET, "user", Some(access_token));
        Supabase::send_json(request).await
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AppError> {
        let request = self.auth(Method::POST, "logout", Some(access_token));
        Supabase::send(request).await?;
        Ok(())
    }
}

/// GoTrue answers bad credentials with 400 `invalid_grant`.
fn invalid_grant(err: AppError) -> AppError {
    match err {
        AppError::Backend { status: 400, message } => AppError::Unauthorized(message),
        other => other,
    }
}

// JWT Claims emitidos pelo Supabase
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    pub exp: usize,
    pub aud: String,
    #[serde(default)]
    pub role: Option<String>,
}

/// Local verification of access tokens when the project JWT secret is known.
#[derive(Clone)]
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&["authenticated"]);

        Self {
            key: DecodingKey::from_secret(secret.as_ref()),
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Result<(User, DateTime<Utc>), AppError> {
        let claims = decode::<Claims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))?;

        let expires_at = Utc
            .timestamp_opt(claims.exp as i64, 0)
            .single()
            .ok_or_else(|| AppError::Unauthorized("Invalid token expiry".into()))?;

        Ok((User { id: claims.sub, email: claims.email }, expires_at))
    }
}

/// Tokens que chegaram com a requisição (cookie ou header).
#[derive(Debug, Default, Clone)]
pub struct Credentials {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

/// Outcome of resolving a request's credentials. `refreshed` carries a new
/// session when the access token had to be renewed, so the caller can write
/// the new cookies.
#[derive(Debug)]
pub struct Resolution {
    pub state: AuthState,
    pub refreshed: Option<Session>,
}

pub async fn resolve_session(
    auth: &dyn AuthProvider,
    verifier: Option<&JwtVerifier>,
    credentials: Credentials,
) -> Resolution {
    let now = Utc::now();

    if let Some(token) = credentials.access_token.clone().filter(|t| !t.is_empty()) {
        let verified = match verifier {
            Some(verifier) => verifier.verify(&token).map(|(user, exp)| (user, Some(exp))),
            None => auth.get_user(&token).await.map(|user| (user, None)),
        };

        match verified {
            Ok((user, expires_at)) => {
                let state = AuthState::from_parts(
                    Some(user),
                    Some(token),
                    credentials.refresh_token.clone(),
                    expires_at,
                    now,
                );
                if state.is_authenticated() {
                    return Resolution { state, refreshed: None };
                }
            }
            Err(e) => log::debug!("🔑 Access token rejected: {}", e),
        }
    }

    if let Some(refresh) = credentials.refresh_token.filter(|t| !t.is_empty()) {
        match auth.refresh_session(&refresh).await {
            Ok(session) => {
                log::info!("🔄 Session refreshed for user {}", session.user.id);
                let state = AuthState::Unauthenticated.sign_in(session.clone()).expire_if_needed(now);
                let refreshed = state.session().cloned();
                return Resolution { state, refreshed };
            }
            Err(e) => log::warn!("❌ Session refresh failed: {}", e),
        }
    }

    Resolution { state: AuthState::Unauthenticated, refreshed: None }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryBackend;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "super-secret-jwt-token-with-at-least-32-characters";

    fn token(aud: &str, exp: DateTime<Utc>) -> String {
        let claims = Claims {
            sub: "user-1".into(),
            email: Some("admin@resto.id".into()),
            exp: exp.timestamp() as usize,
            aud: aud.into(),
            role: Some("authenticated".into()),
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_ref())).unwrap()
    }

    #[test]
    fn test_verify_valid_token() {
        let verifier = JwtVerifier::new(SECRET);
        let (user, exp) = verifier.verify(&token("authenticated", Utc::now() + Duration::hours(1))).unwrap();
        assert_eq!(user.id, "user-1");
        assert_eq!(user.email.as_deref(), Some("admin@resto.id"));
        assert!(exp > Utc::now());
    }

    #[test]
    fn test_verify_rejects_wrong_audience_and_expired() {
        let verifier = JwtVerifier::new(SECRET);
        assert!(verifier.verify(&token("anon", Utc::now() + Duration::hours(1))).is_err());
        assert!(verifier.verify(&token("authenticated", Utc::now() - Duration::hours(1))).is_err());
        assert!(JwtVerifier::new("other-secret").verify(&token("authenticated", Utc::now() + Duration::hours(1))).is_err());
    }

    #[test]
    fn test_token_response_expiry() {
        let now = Utc::now();
        let response = TokenResponse {
            access_token: "a".into(),
            refresh_token: Some("r".into()),
            expires_in: Some(3600),
            expires_at: None,
            user: User { id: "u".into(), email: None },
        };
        let session = response.into_session(now);
        assert_eq!(session.expires_at, Some(now + Duration::seconds(3600)));
    }

    #[tokio::test]
    async fn test_resolve_with_local_verifier() {
        let backend = MemoryBackend::new();
        let verifier = JwtVerifier::new(SECRET);
        let credentials = Credentials {
            access_token: Some(token("authenticated", Utc::now() + Duration::hours(1))),
            refresh_token: None,
        };

        let resolution = resolve_session(&backend, Some(&verifier), credentials).await;
        assert!(resolution.state.is_authenticated());
        assert!(resolution.refreshed.is_none());
    }

    #[tokio::test]
    async fn test_resolve_remote_and_refresh() {
        let backend = MemoryBackend::new();
        let session = backend.issue_session("admin@resto.id");

        let ok = resolve_session(
            &backend,
            None,
            Credentials { access_token: Some(session.access_token.clone()), refresh_token: None },
        )
        .await;
        assert!(ok.state.is_authenticated());

        // token desconhecido, mas refresh válido
        let refreshed = resolve_session(
            &backend,
            None,
            Credentials {
                access_token: Some("stale-token".into()),
                refresh_token: session.refresh_token.clone(),
            },
        )
        .await;
        assert!(refreshed.state.is_authenticated());
        assert!(refreshed.refreshed.is_some());
    }

    #[tokio::test]
    async fn test_resolve_without_credentials() {
        let backend = MemoryBackend::new();
        let resolution = resolve_session(&backend, None, Credentials::default()).await;
        assert_eq!(resolution.state, AuthState::Unauthenticated);
    }
}
