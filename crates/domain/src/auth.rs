use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Claim stripped before signing; the downstream verifier asserts it is
/// absent on freshly issued tokens.
pub const RESERVED_CLAIM: &str = "sub";

/// Authenticated identity as resolved by the upstream OpenID guard: an
/// opaque bag of claims.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    #[serde(flatten)]
    claims: Map<String, Value>,
}

impl Profile {
    pub fn from_claims(claims: Map<String, Value>) -> Self {
        Self { claims }
    }

    pub fn claims(&self) -> &Map<String, Value> {
        &self.claims
    }

    pub fn get(&self, claim: &str) -> Option<&Value> {
        self.claims.get(claim)
    }

    pub fn subject(&self) -> Option<&str> {
        self.get(RESERVED_CLAIM).and_then(Value::as_str)
    }

    /// Copy of the profile with the reserved claim removed. The receiver is
    /// untouched, so it stays safe to display or sign again.
    pub fn sanitized(&self) -> Self {
        let mut claims = self.claims.clone();
        claims.remove(RESERVED_CLAIM);
        Self { claims }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn profile() -> Profile {
        let Value::Object(claims) = json!({
            "sub": "user-123",
            "email": "user-123@example.com",
            "name": "Test User",
        }) else {
            unreachable!()
        };
        Profile::from_claims(claims)
    }

    #[test]
    fn sanitized_removes_only_the_reserved_claim() {
        let sanitized = profile().sanitized();
        assert!(sanitized.get(RESERVED_CLAIM).is_none());
        assert_eq!(
            sanitized.get("email").and_then(Value::as_str),
            Some("user-123@example.com")
        );
        assert_eq!(sanitized.get("name").and_then(Value::as_str), Some("Test User"));
    }

    #[test]
    fn sanitized_leaves_the_original_intact() {
        let original = profile();
        let _ = original.sanitized();
        assert_eq!(original.subject(), Some("user-123"));
    }
}
