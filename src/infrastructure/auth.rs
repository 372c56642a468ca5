use crate::domain::ports::{Authorizer, Principal, Role};
use crate::error::{BakeryError, Result};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub id: String,
    #[serde(default)]
    pub role: Option<Role>,
    pub exp: usize,
}

/// HS256 bearer tokens carrying `{id, role}`.
#[derive(Clone)]
pub struct JwtAuthorizer {
    decoding: DecodingKey,
    encoding: EncodingKey,
}

impl JwtAuthorizer {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            decoding: DecodingKey::from_secret(secret),
            encoding: EncodingKey::from_secret(secret),
        }
    }

    /// Signs a token, e.g. for the admin tooling.
    pub fn issue(&self, claims: &Claims) -> Result<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| BakeryError::internal(format!("token signing failed: {e}")))
    }
}

impl Authorizer for JwtAuthorizer {
    fn authorize(&self, token: &str) -> Result<Principal> {
        let token = token.strip_prefix("Bearer ").unwrap_or(token).trim();
        if token.is_empty() {
            return Err(BakeryError::Unauthorized("No token provided".to_string()));
        }
        let data = decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map_err(|_| BakeryError::Unauthorized("Invalid token".to_string()))?;
        Ok(Principal {
            user_id: data.claims.id,
            role: data.claims.role.unwrap_or(Role::Customer),
        })
    }
}
