use rdm_access_core::{AppError, AppResult};

/// Generates a random secret link token and its SHA-256 hash.
///
/// Returns `(raw_token_hex, sha256_hash_hex)`.
pub(super) fn generate_token() -> AppResult<(String, String)> {
    let mut bytes = [0u8; 32];
    getrandom::fill(&mut bytes).map_err(|error| {
        AppError::Internal(format!("failed to generate secret link token: {error}"))
    })?;

    let raw_token = to_hex(&bytes);
    let hash = hash_link_token(&raw_token);
    Ok((raw_token, hash))
}

/// Computes the SHA-256 hash under which a secret link token is stored.
#[must_use]
pub fn hash_link_token(raw_token: &str) -> String {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(raw_token.as_bytes());
    to_hex(&hasher.finalize())
}

fn to_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;

    bytes
        .iter()
        .fold(String::with_capacity(bytes.len() * 2), |mut acc, byte| {
            let _ = write!(acc, "{byte:02x}");
            acc
        })
}
