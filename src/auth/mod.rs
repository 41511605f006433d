//! Bearer Tokens
//!
//! Personal access tokens are random hex strings handed to the client once.
//! Only their SHA-256 digest is persisted, so a leaked table cannot be
//! replayed against the API.

use axum::http::{header, HeaderMap};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::domain::{AccessToken, UserId};
use crate::store::{RecordStore, StoreResult};

/// Raw token length in bytes, before hex encoding
const TOKEN_BYTES: usize = 40;

/// A freshly minted token. `token` is the only copy of the plaintext.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub record: AccessToken,
}

/// Generate a new plaintext token
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// SHA-256 of a plaintext token, hex encoded
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Extract the credential from an `Authorization: Bearer <token>` header.
pub fn parse_bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Mint a token for `user_id` and store its hash
pub async fn issue_token(
    store: &dyn RecordStore,
    user_id: UserId,
    name: &str,
) -> StoreResult<IssuedToken> {
    let token = generate_token();
    let record = store
        .create_access_token(user_id, name, &hash_token(&token))
        .await?;

    tracing::info!(user_id = %user_id, token_id = %record.id, "Access token issued");

    Ok(IssuedToken { token, record })
}
