use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT payload for a session token. Carries the identity echoed back by
/// `/user/checkUser`; nothing is stored server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,        // user ID
    pub username: String, // display identity for protected handlers
    pub iat: usize,       // issued at (unix timestamp)
    pub exp: usize,       // expires at (unix timestamp)
    pub iss: String,      // issuer
    pub aud: String,      // audience
}
