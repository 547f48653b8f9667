//! Bearer token verification and claim projection.

use std::collections::HashMap;

use http::{HeaderMap, HeaderName, HeaderValue};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::Value;
use tracing::debug;

use crate::{constants::headers, errors::AppError};

/// Claims of a verified token, keyed by claim name.
#[derive(Debug, Clone, Default)]
pub struct Claims(pub HashMap<String, Value>);

impl Claims {
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    /// String-valued claims; everything else is skipped.
    pub fn string_claims(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k.as_str(), s)))
    }
}

/// Verifies HMAC-signed bearer tokens against a shared secret.
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier").finish_non_exhaustive()
    }
}

impl TokenVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        // exp and nbf are checked when present but not required
        validation.required_spec_claims.clear();
        validation.validate_nbf = true;
        validation.validate_aud = false;
        validation.leeway = 0;

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Runs the credential checks against the inbound headers.
    ///
    /// Expected issuer and audience come from the caller's
    /// `X-JWT-Issuer` / `X-JWT-Audience` headers when present.
    pub fn verify(&self, headers: &HeaderMap) -> Result<Claims, AppError> {
        let token = extract_bearer_token(headers)?;

        let claims = decode::<HashMap<String, Value>>(token, &self.key, &self.validation)
            .map(|data| Claims(data.claims))
            .map_err(|error| {
                debug!(kind = ?error.kind(), "token rejected");
                AppError::InvalidToken
            })?;

        if let Some(issuer) = header_str(headers, headers::JWT_ISSUER) {
            if claims.get_str("iss") != Some(issuer) {
                return Err(AppError::IssuerMismatch);
            }
        }

        if let Some(audience) = header_str(headers, headers::JWT_AUDIENCE) {
            if claims.get_str("aud") != Some(audience) {
                return Err(AppError::AudienceMismatch);
            }
        }

        Ok(claims)
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
}

fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let auth_header = headers
        .get(headers::AUTHORIZATION)
        .map(|value| value.to_str().map_err(|_| AppError::MalformedCredential))
        .transpose()?
        .filter(|value| !value.is_empty())
        .ok_or(AppError::MissingCredential)?;

    let parts: Vec<&str> = auth_header.split(' ').collect();
    match *parts.as_slice() {
        [scheme, token] if scheme.eq_ignore_ascii_case("bearer") => Ok(token),
        _ => Err(AppError::MalformedCredential),
    }
}

/// `X-` followed by the claim name with its first character uppercased.
pub fn claim_header_name(claim: &str) -> String {
    let mut chars = claim.chars();
    match chars.next() {
        Some(first) => format!(
            "{}{}{}",
            headers::CLAIM_PREFIX,
            first.to_uppercase(),
            chars.as_str()
        ),
        None => headers::CLAIM_PREFIX.to_string(),
    }
}

/// Writes every string claim onto `headers`, replacing existing values.
///
/// Claims whose name or value cannot form a valid header are skipped.
pub fn project_claims(claims: &Claims, headers: &mut HeaderMap) {
    for (name, value) in claims.string_claims() {
        if name.is_empty() {
            continue;
        }
        let header_name = match HeaderName::try_from(claim_header_name(name)) {
            Ok(header_name) => header_name,
            Err(_) => {
                debug!(claim = name, "claim name is not a valid header name");
                continue;
            }
        };
        match HeaderValue::from_str(value) {
            Ok(header_value) => {
                headers.insert(header_name, header_value);
            }
            Err(_) => debug!(claim = name, "claim value is not a valid header value"),
        }
    }
}

/// Removes the caller-supplied verification hints.
pub fn strip_verification_headers(headers: &mut HeaderMap) {
    headers.remove(headers::JWT_SECRET);
    headers.remove(headers::JWT_ISSUER);
    headers.remove(headers::JWT_AUDIENCE);
}
