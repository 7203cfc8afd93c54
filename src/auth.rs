//! # Service Account Authentication
//!
//! Init calls the storage provider as a service account. The credential flow is
//! the OAuth 2.0 JWT bearer grant: an RS256 assertion signed with the account's
//! private key is exchanged at the key's `token_uri` for a short-lived access
//! token.
//!
//! Handlers only see [`TokenProvider`], so the exchange can be mocked in tests.

use async_trait::async_trait;
use chrono::Utc;
use http::Method;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use crate::constants::{
    ASSERTION_LIFETIME_SECS, DEFAULT_TOKEN_URI, ENV_SERVICE_ACCOUNT, JWT_BEARER_GRANT_TYPE,
};
use crate::errors::{AppError, AppResult};
use crate::models::TokenResponse;
use crate::transport::{HttpTransport, OutboundRequest};

/// Capability to obtain a bearer token for an OAuth scope.
#[async_trait(?Send)]
pub trait TokenProvider {
    async fn access_token(&self, scope: &str) -> AppResult<String>;
}

/// Fields of a service account key file used by the token exchange.
#[derive(Clone, Debug, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default)]
    pub token_uri: Option<String>,
}

impl ServiceAccountKey {
    pub fn from_json(raw: &str) -> AppResult<Self> {
        let mut key: Self = serde_json::from_str(raw)
            .map_err(|e| AppError::Credential(format!("invalid service account JSON: {e}")))?;
        // Keys pasted into dashboards often keep the JSON escapes literally.
        if key.private_key.contains("\\n") {
            key.private_key = key.private_key.replace("\\n", "\n");
        }
        Ok(key)
    }

    pub fn token_uri(&self) -> &str {
        self.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct AssertionClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signs the JWT bearer assertion for `scope`, issued at `issued_at`.
pub(crate) fn sign_assertion(
    key: &ServiceAccountKey,
    scope: &str,
    issued_at: i64,
) -> AppResult<String> {
    let claims = AssertionClaims {
        iss: key.client_email.clone(),
        scope: scope.to_string(),
        aud: key.token_uri().to_string(),
        iat: issued_at,
        exp: issued_at + ASSERTION_LIFETIME_SECS,
    };

    let mut header = Header::new(Algorithm::RS256);
    header.kid = key.private_key_id.clone();

    let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .map_err(|e| AppError::Credential(format!("invalid private key: {e}")))?;

    encode(&header, &claims, &signing_key)
        .map_err(|e| AppError::Credential(format!("failed to sign assertion: {e}")))
}

/// Token provider backed by the service account key in configuration.
///
/// The key is parsed on first use so a malformed secret only affects Init.
pub struct ServiceAccountTokenProvider<'a> {
    key_json: Option<&'a str>,
    transport: &'a dyn HttpTransport,
}

impl<'a> ServiceAccountTokenProvider<'a> {
    pub fn new(key_json: Option<&'a str>, transport: &'a dyn HttpTransport) -> Self {
        Self {
            key_json,
            transport,
        }
    }
}

#[async_trait(?Send)]
impl<'a> TokenProvider for ServiceAccountTokenProvider<'a> {
    async fn access_token(&self, scope: &str) -> AppResult<String> {
        let raw = self
            .key_json
            .ok_or(AppError::MissingConfig(ENV_SERVICE_ACCOUNT))?;
        let key = ServiceAccountKey::from_json(raw)?;
        let assertion = sign_assertion(&key, scope, Utc::now().timestamp())?;

        let form = form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", JWT_BEARER_GRANT_TYPE)
            .append_pair("assertion", &assertion)
            .finish();
        let request = OutboundRequest::new(Method::POST, key.token_uri())
            .header("content-type", "application/x-www-form-urlencoded")?
            .body(form.into_bytes());

        let reply = self.transport.send(request).await?;
        if !reply.is_success() {
            return Err(AppError::Credential(format!(
                "token exchange failed with status {}: {}",
                reply.status, reply.body
            )));
        }

        let token: TokenResponse = serde_json::from_str(&reply.body)
            .map_err(|e| AppError::Credential(format!("invalid token response: {e}")))?;
        Ok(token.access_token)
    }
}
