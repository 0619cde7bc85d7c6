use axum::{
    extract::{FromRef, FromRequestParts, OriginalUri},
    http::request::Parts,
    response::{IntoResponse, IntoResponseParts, Redirect, Response, ResponseParts},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use uuid::Uuid;

use crate::{
    config::AppConfig,
    error::AppError,
    models::{Account, Role},
    repository::AccountRepositoryState,
};

/// Name of the cookie carrying the signed session token.
pub const SESSION_COOKIE: &str = "course_portal_session";

const SESSION_TTL_DAYS: i64 = 7;

/// Flash message shown once on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Error,
}

/// SessionData
///
/// Everything a session remembers between requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    /// Account id of the logged-in principal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<Uuid>,
    /// Single-slot memory of the path a login redirect interrupted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_to: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flash: Vec<Flash>,
}

/// SessionClaims
///
/// The JWT payload stored in the cookie: the session data plus the standard
/// issued-at / expiry claims checked on every decode.
#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    #[serde(flatten)]
    data: SessionData,
    iat: i64,
    exp: i64,
}

/// Session
///
/// Cookie-backed session state. Extracting it never fails: a missing,
/// tampered or expired cookie yields an empty session. Returning it from a
/// handler (as part of a response tuple) re-signs and re-sets the cookie.
#[derive(Debug, Clone)]
pub struct Session {
    data: SessionData,
    secret: String,
    secure: bool,
}

impl Session {
    /// Creates an empty session signed with the configured secret.
    pub fn new(config: &AppConfig) -> Self {
        Self {
            data: SessionData::default(),
            secret: config.session_secret.clone(),
            secure: config.secure_cookies(),
        }
    }

    /// Decodes a session token. Invalid tokens produce an empty session.
    pub fn from_token(token: &str, config: &AppConfig) -> Self {
        let mut session = Self::new(config);
        let key = DecodingKey::from_secret(config.session_secret.as_bytes());
        match decode::<SessionClaims>(token, &key, &Validation::default()) {
            Ok(token_data) => session.data = token_data.claims.data,
            Err(e) => tracing::debug!(error = %e, "discarding invalid session cookie"),
        }
        session
    }

    /// Signs the current state into a token.
    pub fn to_token(&self) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let claims = SessionClaims {
            data: self.data.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::days(SESSION_TTL_DAYS)).timestamp(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
    }

    pub fn data(&self) -> &SessionData {
        &self.data
    }

    pub fn account_id(&self) -> Option<Uuid> {
        self.data.sub
    }

    pub fn login(&mut self, account_id: Uuid) {
        self.data.sub = Some(account_id);
    }

    /// Drops the principal. Pending flashes and the return-to slot survive.
    pub fn logout(&mut self) {
        self.data.sub = None;
    }

    /// Overwrites the return-to slot.
    pub fn set_return_to(&mut self, path: impl Into<String>) {
        self.data.return_to = Some(path.into());
    }

    pub fn take_return_to(&mut self) -> Option<String> {
        self.data.return_to.take()
    }

    pub fn flash_success(&mut self, message: impl Into<String>) {
        self.push_flash(FlashKind::Success, message.into());
    }

    pub fn flash_error(&mut self, message: impl Into<String>) {
        self.push_flash(FlashKind::Error, message.into());
    }

    fn push_flash(&mut self, kind: FlashKind, message: String) {
        self.data.flash.push(Flash { kind, message });
    }

    /// Removes and returns all pending flashes.
    pub fn take_flashes(&mut self) -> Vec<Flash> {
        std::mem::take(&mut self.data.flash)
    }

    fn to_cookie(&self) -> Result<Cookie<'static>, jsonwebtoken::errors::Error> {
        Ok(Cookie::build((SESSION_COOKIE, self.to_token()?))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .build())
    }
}

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);
        let jar = CookieJar::from_headers(&parts.headers);
        Ok(match jar.get(SESSION_COOKIE) {
            Some(cookie) => Session::from_token(cookie.value(), &config),
            None => Session::new(&config),
        })
    }
}

impl IntoResponseParts for Session {
    type Error = AppError;

    fn into_response_parts(self, res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        let jar = CookieJar::new().add(self.to_cookie()?);
        match jar.into_response_parts(res) {
            Ok(parts) => Ok(parts),
            Err(never) => match never {},
        }
    }
}

/// Principal
///
/// The account bound to the current request. Resolved once per request (by a
/// role guard, which stores it in the request extensions) and read back by
/// handlers through this extractor.
///
/// Rejection: unauthenticated requests are redirected to `/login` with the
/// original path remembered in the session; store failures render the 500 page.
#[derive(Debug, Clone)]
pub struct Principal {
    pub account: Account,
}

impl Principal {
    pub fn id(&self) -> Uuid {
        self.account.id
    }

    pub fn role(&self) -> Role {
        self.account.role
    }
}

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
    AccountRepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // 1. Already resolved earlier in this request.
        if let Some(principal) = parts.extensions.get::<Principal>() {
            return Ok(principal.clone());
        }

        let mut session = match Session::from_request_parts(parts, state).await {
            Ok(session) => session,
            Err(never) => match never {},
        };

        // 2. Session names an account that still exists.
        if let Some(account_id) = session.account_id() {
            let accounts = AccountRepositoryState::from_ref(state);
            match accounts.find_by_id(account_id).await {
                Ok(Some(account)) => {
                    let principal = Principal { account };
                    parts.extensions.insert(principal.clone());
                    return Ok(principal);
                }
                Ok(None) => {
                    tracing::warn!(%account_id, "session refers to a missing account");
                }
                Err(e) => return Err(AppError::from(e).into_response()),
            }
        }

        // 3. Anonymous: remember where the user was going and send them to login.
        let target = parts
            .extensions
            .get::<OriginalUri>()
            .map(|uri| &uri.0)
            .unwrap_or(&parts.uri);
        let path = target
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());

        session.logout();
        session.set_return_to(path);
        session.flash_error("Please log in first.");
        Err((session, Redirect::to("/login")).into_response())
    }
}
