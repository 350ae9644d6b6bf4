//! OpenID Connect authorization-code login with PKCE, plus the in-memory
//! session store backing the role check on `/greetings`.

use crate::config::app_config::{AuthConfig, RESERVED_PATHS};
use crate::utils::error::{Result, ShowcaseError};
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use dashmap::DashMap;
use rand::RngExt;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::handlers::AppState;

pub const SESSION_COOKIE: &str = "SHOWCASE_SESSION";
const PENDING_LOGIN_TTL: Duration = Duration::from_secs(10 * 60);
const SESSION_TTL: Duration = Duration::from_secs(8 * 60 * 60);

struct PendingLogin {
    verifier: String,
    nonce: String,
    created: Instant,
}

#[derive(Debug, Clone)]
pub struct UserSession {
    pub subject: String,
    pub display_name: String,
    pub roles: Vec<String>,
    created: Instant,
}

impl UserSession {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    id_token: String,
}

#[derive(Debug, Deserialize)]
pub struct IdTokenClaims {
    pub sub: String,
    pub name: Option<String>,
    pub preferred_username: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub groups: Vec<String>,
    pub nonce: Option<String>,
    #[serde(default)]
    pub aud: serde_json::Value,
    pub exp: Option<i64>,
}

impl IdTokenClaims {
    fn audience_contains(&self, client_id: &str) -> bool {
        match &self.aud {
            serde_json::Value::String(aud) => aud == client_id,
            serde_json::Value::Array(auds) => auds.iter().any(|a| a.as_str() == Some(client_id)),
            _ => false,
        }
    }
}

/// Reads the claims segment of a JWT. The token comes straight from the
/// token endpoint over TLS, so the signature is not checked here.
pub fn decode_id_token_claims(id_token: &str) -> Result<IdTokenClaims> {
    let payload = id_token
        .split('.')
        .nth(1)
        .ok_or_else(|| ShowcaseError::AuthError {
            message: "id_token is not a JWT".to_string(),
        })?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| ShowcaseError::AuthError {
            message: format!("id_token payload is not base64url: {}", e),
        })?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn random_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(bytes)
}

fn pkce_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

pub fn session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
}

pub struct OidcAuth {
    config: AuthConfig,
    authorize_endpoint: String,
    token_endpoint: String,
    client: reqwest::Client,
    pending_ttl: Duration,
    pending: DashMap<String, PendingLogin>,
    sessions: DashMap<String, UserSession>,
}

impl OidcAuth {
    pub fn new(config: AuthConfig) -> Result<Self> {
        let callback = config.callback_path();
        if RESERVED_PATHS.contains(&callback.as_str()) {
            return Err(ShowcaseError::InvalidConfigValueError {
                field: "auth.redirect_uri".to_string(),
                value: config.redirect_uri.clone(),
                reason: format!("Callback path {} is already served by another route", callback),
            });
        }

        Ok(Self {
            authorize_endpoint: config.authorize_endpoint()?,
            token_endpoint: config.token_endpoint()?,
            config,
            client: reqwest::Client::new(),
            pending_ttl: PENDING_LOGIN_TTL,
            pending: DashMap::new(),
            sessions: DashMap::new(),
        })
    }

    pub fn required_role(&self) -> &str {
        &self.config.required_role
    }

    pub fn callback_path(&self) -> String {
        self.config.callback_path()
    }

    /// Returns the authorize URL to redirect the browser to.
    pub fn begin_login(&self) -> Result<String> {
        self.pending
            .retain(|_, login| login.created.elapsed() < self.pending_ttl);

        let state = random_token();
        let verifier = random_token();
        let nonce = random_token();
        let challenge = pkce_challenge(&verifier);

        let url = url::Url::parse_with_params(
            &self.authorize_endpoint,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("response_type", "code"),
                ("response_mode", "query"),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("scope", self.config.scope().as_str()),
                ("state", state.as_str()),
                ("nonce", nonce.as_str()),
                ("code_challenge", challenge.as_str()),
                ("code_challenge_method", "S256"),
            ],
        )
        .map_err(|e| ShowcaseError::ConfigError {
            message: format!("Invalid authorize endpoint: {}", e),
        })?;

        self.pending.insert(
            state,
            PendingLogin {
                verifier,
                nonce,
                created: Instant::now(),
            },
        );
        Ok(url.to_string())
    }

    /// Exchanges the authorization code and opens a session; returns its id.
    pub async fn complete_login(&self, state: &str, code: &str) -> Result<String> {
        let (_, pending) = self
            .pending
            .remove(state)
            .ok_or_else(|| ShowcaseError::AuthError {
                message: "Unknown or already used login state".to_string(),
            })?;
        if pending.created.elapsed() >= self.pending_ttl {
            return Err(ShowcaseError::AuthError {
                message: "Login attempt expired".to_string(),
            });
        }

        let response = self
            .client
            .post(&self.token_endpoint)
            .form(&[
                ("grant_type", "authorization_code"),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("code_verifier", pending.verifier.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ShowcaseError::AuthError {
                message: format!("Token exchange failed ({}): {}", status, text),
            });
        }

        let token: TokenResponse = response.json().await?;
        let claims = decode_id_token_claims(&token.id_token)?;
        self.check_claims(&claims, &pending.nonce)?;

        let session = UserSession {
            display_name: claims
                .name
                .clone()
                .or_else(|| claims.preferred_username.clone())
                .unwrap_or_else(|| claims.sub.clone()),
            subject: claims.sub,
            roles: claims.roles.into_iter().chain(claims.groups).collect(),
            created: Instant::now(),
        };
        tracing::info!(
            "🔐 {} logged in with roles {:?}",
            session.display_name,
            session.roles
        );

        let id = random_token();
        self.sessions.insert(id.clone(), session);
        Ok(id)
    }

    fn check_claims(&self, claims: &IdTokenClaims, expected_nonce: &str) -> Result<()> {
        if claims.nonce.as_deref() != Some(expected_nonce) {
            return Err(ShowcaseError::AuthError {
                message: "id_token nonce does not match the login request".to_string(),
            });
        }
        if !claims.audience_contains(&self.config.client_id) {
            return Err(ShowcaseError::AuthError {
                message: "id_token was issued for a different client".to_string(),
            });
        }
        if let Some(exp) = claims.exp {
            if exp <= chrono::Utc::now().timestamp() {
                return Err(ShowcaseError::AuthError {
                    message: "id_token has expired".to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn session(&self, id: &str) -> Option<UserSession> {
        let session = self.sessions.get(id)?.value().clone();
        if session.created.elapsed() >= SESSION_TTL {
            self.sessions.remove(id);
            return None;
        }
        Some(session)
    }

    pub fn end_session(&self, id: &str) -> bool {
        self.sessions.remove(id).is_some()
    }

    pub fn session_cookie(id: &str) -> String {
        format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            SESSION_COOKIE,
            id,
            SESSION_TTL.as_secs()
        )
    }

    pub fn cleared_cookie() -> String {
        format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
    }
}

/// Lets the request through when auth is off or the session has the role.
pub async fn require_role(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(auth) = &state.auth else {
        return next.run(request).await;
    };

    match session_id(request.headers()).and_then(|id| auth.session(&id)) {
        None => Redirect::to("/login").into_response(),
        Some(session) if session.has_role(auth.required_role()) => next.run(request).await,
        Some(session) => {
            tracing::warn!(
                "{} lacks role '{}' for {}",
                session.subject,
                auth.required_role(),
                request.uri().path()
            );
            StatusCode::FORBIDDEN.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn jwt(claims: serde_json::Value) -> String {
        format!(
            "{}.{}.sig",
            URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256"}"#),
            URL_SAFE_NO_PAD.encode(claims.to_string())
        )
    }

    #[test]
    fn test_decode_id_token_claims() {
        let token = jwt(serde_json::json!({
            "sub": "user-1",
            "name": "Ada",
            "roles": ["group1"],
            "aud": "client",
            "nonce": "n"
        }));
        let claims = decode_id_token_claims(&token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.roles, vec!["group1"]);
        assert!(claims.groups.is_empty());
        assert!(claims.audience_contains("client"));
        assert!(!claims.audience_contains("other"));
    }

    #[test]
    fn test_decode_rejects_non_jwt() {
        assert!(decode_id_token_claims("opaque-token").is_err());
    }

    #[test]
    fn test_pkce_challenge_is_s256_of_verifier() {
        // Example from RFC 7636 appendix B.
        assert_eq!(
            pkce_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    fn auth_config(token_url: String) -> AuthConfig {
        AuthConfig {
            tenant_id: None,
            authorize_url: Some("https://login.example.com/authorize".to_string()),
            token_url: Some(token_url),
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            redirect_uri: "http://localhost:8080/login/oauth2/code".to_string(),
            required_role: "group1".to_string(),
            scopes: None,
        }
    }

    fn state_param(authorize_url: &str) -> String {
        url::Url::parse(authorize_url)
            .unwrap()
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.into_owned())
            .unwrap()
    }

    #[tokio::test]
    async fn test_expired_login_is_rejected_without_token_exchange() {
        let server = httpmock::MockServer::start();
        let token_mock = server.mock(|when, then| {
            when.method(httpmock::Method::POST).path("/token");
            then.status(200);
        });

        let mut auth = OidcAuth::new(auth_config(server.url("/token"))).unwrap();
        auth.pending_ttl = Duration::ZERO;
        let state = state_param(&auth.begin_login().unwrap());

        let err = auth.complete_login(&state, "code").await.unwrap_err();

        assert!(matches!(err, ShowcaseError::AuthError { .. }));
        assert_eq!(token_mock.hits(), 0);
        assert!(auth.pending.is_empty());
    }

    #[test]
    fn test_begin_login_prunes_stale_attempts() {
        let mut auth = OidcAuth::new(auth_config("https://login.example.com/token".to_string())).unwrap();
        auth.begin_login().unwrap();
        auth.begin_login().unwrap();
        assert_eq!(auth.pending.len(), 2);

        auth.pending_ttl = Duration::ZERO;
        let latest = state_param(&auth.begin_login().unwrap());
        assert_eq!(auth.pending.len(), 1);
        assert!(auth.pending.contains_key(&latest));
    }

    #[test]
    fn test_callback_on_fixed_route_is_rejected() {
        let mut config = auth_config("https://login.example.com/token".to_string());
        config.redirect_uri = "http://localhost:8080/login".to_string();
        assert!(matches!(
            OidcAuth::new(config),
            Err(ShowcaseError::InvalidConfigValueError { .. })
        ));
    }

    #[test]
    fn test_session_id_from_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; SHOWCASE_SESSION=abc123; other=1"),
        );
        assert_eq!(session_id(&headers).as_deref(), Some("abc123"));
        assert_eq!(session_id(&HeaderMap::new()), None);
    }
}
