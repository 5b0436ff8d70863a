use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Login status the backend reports for an accepted credential pair.
pub const VALID_STATUS: &str = "valid";

/// Persisted authentication state: the login response body as the backend
/// returned it, with token and expiry rewritten on every refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub status: String,
    pub data: SessionData,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The login payload. Only the token is interpreted on its own; every other
/// field, expiry and user id included, is kept exactly as the backend sent it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    #[serde(default)]
    pub token: String,
    #[serde(flatten)]
    pub profile: Map<String, Value>,
}

const TOKEN_EXP: &str = "token_exp";
const USER_ID: &str = "user_id";

/// New credentials issued by the refresh endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenRefresh {
    pub token: String,
    /// `None` when the response carries no expiry at all; an explicit `null`
    /// is kept.
    #[serde(default, deserialize_with = "present")]
    pub token_exp: Option<Value>,
}

fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

impl Session {
    #[must_use]
    pub fn token(&self) -> &str {
        &self.data.token
    }

    /// A login response is only usable when the backend marked it valid and
    /// actually issued a token.
    #[must_use]
    pub fn is_valid_login(&self) -> bool {
        self.status == VALID_STATUS && !self.data.token.is_empty()
    }

    /// Token expiry in whatever form the backend issued it.
    #[must_use]
    pub fn token_exp(&self) -> Option<&Value> {
        self.data.profile.get(TOKEN_EXP).filter(|v| !v.is_null())
    }

    /// Numeric id of the logged-in user; accepts numbers and numeric strings.
    #[must_use]
    pub fn user_id(&self) -> Option<i64> {
        match self.data.profile.get(USER_ID)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn display_name(&self) -> String {
        let name = |key: &str| self.data.profile.get(key).and_then(Value::as_str).unwrap_or_default();
        format!("{} {}", name("user_fname"), name("user_lname")).trim().to_string()
    }

    /// Replaces the token and its expiry. Every other field is left untouched.
    pub fn apply_refresh(&mut self, refresh: TokenRefresh) {
        self.data.token = refresh.token;
        match refresh.token_exp {
            Some(exp) => self.data.profile.insert(TOKEN_EXP.to_string(), exp),
            None => self.data.profile.remove(TOKEN_EXP),
        };
    }
}
