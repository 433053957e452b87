use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, utoipa::ToSchema)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Sessão emitida pelo serviço de autenticação externo.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub user: User,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(false, |exp| exp <= now)
    }
}

/// Route protection state. A session counts only when both the user record
/// and the token are present and the session has not expired.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    Authenticated(Session),
    Unauthenticated,
}

impl AuthState {
    pub fn from_parts(
        user: Option<User>,
        access_token: Option<String>,
        refresh_token: Option<String>,
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        match (user, access_token) {
            (Some(user), Some(token)) if !token.is_empty() => {
                let session = Session {
                    access_token: token,
                    refresh_token,
                    expires_at,
                    user,
                };
                if session.is_expired(now) {
                    AuthState::Unauthenticated
                } else {
                    AuthState::Authenticated(session)
                }
            }
            _ => AuthState::Unauthenticated,
        }
    }

    /// Successful sign-in callback.
    pub fn sign_in(self, session: Session) -> Self {
        AuthState::Authenticated(session)
    }

    /// Logout or expiry; both end in the same place.
    pub fn sign_out(self) -> Self {
        AuthState::Unauthenticated
    }

    pub fn expire_if_needed(self, now: DateTime<Utc>) -> Self {
        let expired = matches!(&self, AuthState::Authenticated(session) if session.is_expired(now));
        if expired {
            self.sign_out()
        } else {
            self
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated(_))
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            AuthState::Authenticated(session) => Some(session),
            AuthState::Unauthenticated => None,
        }
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct LoginResponse {
    pub success: bool,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub user: User,
}

impl From<Session> for LoginResponse {
    fn from(session: Session) -> Self {
        Self {
            success: true,
            access_token: session.access_token,
            refresh_token: session.refresh_token,
            expires_at: session.expires_at,
            user: session.user,
        }
    }
}
