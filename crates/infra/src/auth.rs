use anyhow::Context;
use jsonwebtoken::{EncodingKey, Header, encode};
use knotlist_domain::DomainResult;
use knotlist_domain::auth::Profile;
use knotlist_domain::error::DomainError;

/// Issues compact signed tokens from authenticated profiles with a
/// symmetric secret taken from configuration.
#[derive(Clone)]
pub struct TokenIssuer {
    key: EncodingKey,
}

impl TokenIssuer {
    pub fn new(secret: &str) -> DomainResult<Self> {
        if secret.trim().is_empty() {
            return Err(DomainError::Validation(
                "signing secret must not be empty".to_string(),
            ));
        }
        Ok(Self {
            key: EncodingKey::from_secret(secret.as_bytes()),
        })
    }

    /// Signs a sanitized copy of the profile claims. The downstream verifier
    /// asserts the reserved subject claim is unset, so it is stripped first;
    /// the caller's profile is left untouched.
    pub fn generate(&self, profile: &Profile) -> DomainResult<String> {
        let claims = profile.sanitized();
        tracing::info!("generating token");
        encode(&Header::default(), &claims, &self.key)
            .map_err(|err| DomainError::Validation(format!("token signing failed: {err}")))
    }
}

/// Pulls one claim out of a compact token without verifying the signature.
/// Diagnostics only; verification belongs to the holder of the secret.
pub fn decode_jwt_claim(token: &str, claim: &str) -> Option<serde_json::Value> {
    let payload = token.split('.').nth(1)?;
    let decoded = base64_url_decode(payload).ok()?;
    let json: serde_json::Value = serde_json::from_slice(&decoded).ok()?;
    json.get(claim).cloned()
}

fn base64_url_decode(input: &str) -> anyhow::Result<Vec<u8>> {
    use base64::Engine;

    let mut s = input.to_string();
    let pad = s.len() % 4;
    if pad != 0 {
        s.extend(std::iter::repeat('=').take(4 - pad));
    }
    let engine = base64::engine::general_purpose::URL_SAFE;
    engine.decode(s).context("base64 decode")
}
