// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity-token verification against the Firebase securetoken endpoint.
//!
//! Verification never fails a request: `verify_bearer` yields an identity
//! or nothing. Routes that need an identity reject the absent case
//! themselves, which keeps "not signed in" and "signed in but not allowed"
//! distinguishable at every authorization site.

use crate::config::Config;
use anyhow::Context;
use axum::http::HeaderValue;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::header::CACHE_CONTROL;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::{Mutex, RwLock};

const SECURE_TOKEN_ISSUER_BASE: &str = "https://securetoken.google.com";
const FALLBACK_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwks/securetoken@system.gserviceaccount.com";
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);
const CLOCK_SKEW_SECS: u64 = 60;

/// Verified identity extracted from a valid ID token.
#[derive(Debug, Clone)]
pub struct VerifiedIdentity {
    pub email: String,
    pub subject: String,
}

/// Identity verification error categories.
///
/// These never escape the verifier; `verify_bearer` logs and swallows them.
#[derive(Debug, Clone)]
pub enum IdentityError {
    /// The token is missing/invalid or claims do not match expectations.
    Rejected(String),
    /// A transient infrastructure failure occurred (JWKS fetch etc).
    Transient(String),
}

#[derive(Clone)]
enum VerifierMode {
    Firebase,
    StaticKey {
        kid: String,
        decoding_key: Arc<DecodingKey>,
    },
}

#[derive(Clone)]
struct DiscoveryCacheEntry {
    jwks_uri: String,
    expires_at: Instant,
}

#[derive(Clone)]
struct JwksCacheEntry {
    keys_by_kid: HashMap<String, Arc<DecodingKey>>,
    expires_at: Instant,
}

/// Verifier for Firebase-issued ID tokens.
pub struct TokenVerifier {
    http_client: reqwest::Client,
    expected_issuer: String,
    expected_audience: String,
    discovery_url: String,
    mode: VerifierMode,
    discovery_cache: RwLock<Option<DiscoveryCacheEntry>>,
    jwks_cache: RwLock<Option<JwksCacheEntry>>,
    refresh_lock: Mutex<()>,
}

impl TokenVerifier {
    /// Create a production verifier that discovers and caches the provider's
    /// JWKS keys for the configured project.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .context("failed building identity HTTP client")?;

        let expected_issuer = format!(
            "{}/{}",
            SECURE_TOKEN_ISSUER_BASE, config.gcp_project_id
        );
        let discovery_url = format!(
            "{}/.well-known/openid-configuration",
            expected_issuer
        );

        tracing::info!(
            issuer = %expected_issuer,
            audience = %config.gcp_project_id,
            "Initialized identity-token verifier"
        );

        Ok(Self {
            http_client,
            expected_issuer,
            expected_audience: config.gcp_project_id.clone(),
            discovery_url,
            mode: VerifierMode::Firebase,
            discovery_cache: RwLock::new(None),
            jwks_cache: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        })
    }

    /// Create a verifier with a static RSA public key.
    ///
    /// This is intended for deterministic local/integration tests.
    pub fn new_with_static_key(
        config: &Config,
        kid: impl Into<String>,
        decoding_key: DecodingKey,
    ) -> anyhow::Result<Self> {
        let kid = kid.into();
        if kid.trim().is_empty() {
            anyhow::bail!("static verifier kid must not be empty");
        }

        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .context("failed building identity HTTP client")?;

        let expected_issuer = format!(
            "{}/{}",
            SECURE_TOKEN_ISSUER_BASE, config.gcp_project_id
        );
        let discovery_url = format!(
            "{}/.well-known/openid-configuration",
            expected_issuer
        );

        Ok(Self {
            http_client,
            expected_issuer,
            expected_audience: config.gcp_project_id.clone(),
            discovery_url,
            mode: VerifierMode::StaticKey {
                kid,
                decoding_key: Arc::new(decoding_key),
            },
            discovery_cache: RwLock::new(None),
            jwks_cache: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        })
    }

    /// Verify an Authorization header, yielding the identity it attests.
    ///
    /// Returns None for absent, malformed, expired, or unverifiable tokens;
    /// the reason is logged (debug for rejections, warn for infrastructure
    /// failures) and never surfaced as a request error.
    pub async fn verify_bearer(
        &self,
        auth_header: Option<&HeaderValue>,
    ) -> Option<VerifiedIdentity> {
        match self.verify_token(auth_header).await {
            Ok(identity) => Some(identity),
            Err(IdentityError::Rejected(reason)) => {
                tracing::debug!(reason = %reason, "Bearer token rejected");
                None
            }
            Err(IdentityError::Transient(reason)) => {
                tracing::warn!(reason = %reason, "Identity verification unavailable");
                None
            }
        }
    }

    async fn verify_token(
        &self,
        auth_header: Option<&HeaderValue>,
    ) -> Result<VerifiedIdentity, IdentityError> {
        let token = extract_bearer_token(auth_header)?;

        let header = decode_header(token)
            .map_err(|e| IdentityError::Rejected(format!("invalid JWT header: {e}")))?;

        if header.alg != Algorithm::RS256 {
            return Err(IdentityError::Rejected(format!(
                "unexpected JWT alg: {:?}",
                header.alg
            )));
        }

        let kid = header
            .kid
            .ok_or_else(|| IdentityError::Rejected("missing JWT kid".to_string()))?;

        let decoding_key = self.decoding_key_for_kid(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.set_issuer(&[self.expected_issuer.as_str()]);
        validation.set_audience(&[self.expected_audience.as_str()]);
        validation.validate_nbf = true;
        validation.leeway = CLOCK_SKEW_SECS;

        let token_data = decode::<IdTokenClaims>(token, decoding_key.as_ref(), &validation)
            .map_err(|e| IdentityError::Rejected(format!("JWT validation failed: {e}")))?;

        let claims = token_data.claims;

        tracing::debug!(
            email = claims.email.as_deref().unwrap_or("<missing>"),
            email_verified = ?claims.email_verified,
            subject = %claims.sub,
            "ID token claims"
        );

        validate_iat(claims.iat)?;

        let email = claims
            .email
            .ok_or_else(|| IdentityError::Rejected("missing email claim".to_string()))?;

        match claims.email_verified {
            Some(true) => {}
            Some(false) => {
                return Err(IdentityError::Rejected(
                    "email_verified claim is false".to_string(),
                ));
            }
            None => {
                return Err(IdentityError::Rejected(
                    "email_verified claim is missing".to_string(),
                ));
            }
        }

        Ok(VerifiedIdentity {
            email,
            subject: claims.sub,
        })
    }

    async fn decoding_key_for_kid(&self, kid: &str) -> Result<Arc<DecodingKey>, IdentityError> {
        match &self.mode {
            VerifierMode::StaticKey {
                kid: static_kid,
                decoding_key,
            } => {
                if kid == static_kid {
                    return Ok(decoding_key.clone());
                }

                return Err(IdentityError::Rejected(format!(
                    "unknown JWT kid for static verifier: {kid}"
                )));
            }
            VerifierMode::Firebase => {}
        }

        if let Some(key) = self.lookup_cached_key(kid).await {
            return Ok(key);
        }

        for force_refresh in [false, true] {
            self.refresh_jwks(force_refresh).await?;
            if let Some(key) = self.lookup_cached_key(kid).await {
                return Ok(key);
            }
        }

        Err(IdentityError::Rejected(format!(
            "JWT kid not found in JWKS after refresh: {kid}"
        )))
    }

    async fn lookup_cached_key(&self, kid: &str) -> Option<Arc<DecodingKey>> {
        let cache = self.jwks_cache.read().await;
        let now = Instant::now();
        cache
            .as_ref()
            .filter(|entry| entry.expires_at > now)
            .and_then(|entry| entry.keys_by_kid.get(kid))
            .cloned()
    }

    async fn refresh_jwks(&self, force_refresh: bool) -> Result<(), IdentityError> {
        let _guard = self.refresh_lock.lock().await;

        if !force_refresh {
            let cache = self.jwks_cache.read().await;
            if cache
                .as_ref()
                .is_some_and(|entry| entry.expires_at > Instant::now())
            {
                return Ok(());
            }
        }

        let jwks_uri = self.resolve_jwks_uri(force_refresh).await;
        let jwks_uri = match jwks_uri {
            Ok(uri) => uri,
            Err(e) => {
                tracing::error!(error = ?e, "Failed to resolve JWKS URI");
                return Err(e);
            }
        };

        tracing::debug!(jwks_uri = %jwks_uri, "Refreshing JWKS cache");

        let response = self
            .http_client
            .get(&jwks_uri)
            .send()
            .await
            .map_err(|e| IdentityError::Transient(format!("JWKS request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(IdentityError::Transient(format!(
                "JWKS request returned status {}",
                response.status()
            )));
        }

        let ttl = cache_ttl_from_headers(response.headers(), DEFAULT_CACHE_TTL);

        let jwks: Jwks = response
            .json()
            .await
            .map_err(|e| IdentityError::Transient(format!("invalid JWKS JSON: {e}")))?;

        let mut keys_by_kid: HashMap<String, Arc<DecodingKey>> = HashMap::new();

        for jwk in jwks.keys {
            if jwk.kty != "RSA" {
                continue;
            }

            if jwk.kid.trim().is_empty() {
                continue;
            }

            if let Some(alg) = &jwk.alg {
                if alg != "RS256" {
                    continue;
                }
            }

            if let Some(use_) = &jwk.use_ {
                if use_ != "sig" {
                    continue;
                }
            }

            match DecodingKey::from_rsa_components(&jwk.n, &jwk.e) {
                Ok(key) => {
                    keys_by_kid.insert(jwk.kid, Arc::new(key));
                }
                Err(e) => {
                    tracing::warn!(error = %e, kid = %jwk.kid, "Skipping invalid RSA JWKS key");
                }
            }
        }

        if keys_by_kid.is_empty() {
            return Err(IdentityError::Transient(
                "JWKS response did not include any usable RSA keys".to_string(),
            ));
        }

        let entry = JwksCacheEntry {
            keys_by_kid,
            expires_at: Instant::now() + ttl,
        };

        *self.jwks_cache.write().await = Some(entry);

        tracing::debug!(ttl_secs = ttl.as_secs(), "JWKS cache refreshed");
        Ok(())
    }

    async fn resolve_jwks_uri(&self, force_refresh: bool) -> Result<String, IdentityError> {
        if !force_refresh {
            let cache = self.discovery_cache.read().await;
            if let Some(entry) = cache
                .as_ref()
                .filter(|entry| entry.expires_at > Instant::now())
            {
                return Ok(entry.jwks_uri.clone());
            }
        }

        let cached_jwks_uri = self
            .discovery_cache
            .read()
            .await
            .as_ref()
            .map(|entry| entry.jwks_uri.clone());

        let response = self.http_client.get(&self.discovery_url).send().await;
        match response {
            Ok(resp) if resp.status().is_success() => {
                let ttl = cache_ttl_from_headers(resp.headers(), DEFAULT_CACHE_TTL);
                let discovery: OpenIdConfig = resp
                    .json()
                    .await
                    .map_err(|e| IdentityError::Transient(format!("invalid discovery JSON: {e}")))?;

                *self.discovery_cache.write().await = Some(DiscoveryCacheEntry {
                    jwks_uri: discovery.jwks_uri.clone(),
                    expires_at: Instant::now() + ttl,
                });

                Ok(discovery.jwks_uri)
            }
            Ok(resp) => {
                tracing::warn!(
                    status = %resp.status(),
                    "OIDC discovery returned non-success status; using fallback JWKS URI"
                );
                Ok(cached_jwks_uri.unwrap_or_else(|| FALLBACK_JWKS_URL.to_string()))
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "OIDC discovery request failed; using fallback JWKS URI"
                );
                Ok(cached_jwks_uri.unwrap_or_else(|| FALLBACK_JWKS_URL.to_string()))
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenIdConfig {
    jwks_uri: String,
}

#[derive(Debug, Deserialize)]
struct Jwks {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: String,
    kty: String,
    alg: Option<String>,
    n: String,
    e: String,
    #[serde(rename = "use")]
    use_: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    sub: String,
    iat: Option<usize>,
    email: Option<String>,
    email_verified: Option<bool>,
}

fn extract_bearer_token(auth_header: Option<&HeaderValue>) -> Result<&str, IdentityError> {
    let value = auth_header
        .ok_or_else(|| IdentityError::Rejected("missing Authorization header".to_string()))?
        .to_str()
        .map_err(|_| IdentityError::Rejected("invalid Authorization header".to_string()))?;

    let token = value.strip_prefix("Bearer ").ok_or_else(|| {
        IdentityError::Rejected("Authorization header must be Bearer token".to_string())
    })?;

    if token.is_empty() {
        return Err(IdentityError::Rejected("Bearer token is empty".to_string()));
    }

    Ok(token)
}

fn validate_iat(iat: Option<usize>) -> Result<(), IdentityError> {
    let now = now_unix_secs();

    let Some(iat) = iat else {
        return Err(IdentityError::Rejected("missing iat claim".to_string()));
    };

    if iat as u64 > now + CLOCK_SKEW_SECS {
        return Err(IdentityError::Rejected(
            "iat claim is in the future".to_string(),
        ));
    }

    Ok(())
}

fn cache_ttl_from_headers(headers: &reqwest::header::HeaderMap, fallback: Duration) -> Duration {
    let Some(cache_control) = headers
        .get(CACHE_CONTROL)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_cache_control_max_age)
    else {
        return fallback;
    };

    Duration::from_secs(cache_control)
}

fn parse_cache_control_max_age(value: &str) -> Option<u64> {
    for directive in value.split(',') {
        let directive = directive.trim();

        if let Some(raw) = directive.strip_prefix("max-age=") {
            let raw = raw.trim_matches('"');
            if let Ok(seconds) = raw.parse::<u64>() {
                return Some(seconds);
            }
        }
    }

    None
}

fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
