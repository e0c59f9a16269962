use std::sync::OnceLock;

use argon2::password_hash::{self, SaltString};
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Argon2id with 19 MiB, two passes, one lane.
const PASSWORD_COST: (u32, u32, u32) = (19_456, 2, 1);
const SESSION_TOKEN_BYTES: usize = 32;

#[derive(Debug, Error)]
pub(crate) enum PasswordError {
    #[error("invalid argon2 parameters: {0}")]
    Params(argon2::Error),
    #[error("password hash error: {0}")]
    Hash(password_hash::Error),
}

impl From<password_hash::Error> for PasswordError {
    fn from(err: password_hash::Error) -> Self {
        Self::Hash(err)
    }
}

fn hasher() -> Result<&'static Argon2<'static>, PasswordError> {
    static HASHER: OnceLock<Argon2<'static>> = OnceLock::new();
    if let Some(hasher) = HASHER.get() {
        return Ok(hasher);
    }

    let (memory_kib, passes, lanes) = PASSWORD_COST;
    let params = Params::new(memory_kib, passes, lanes, None).map_err(PasswordError::Params)?;
    Ok(HASHER.get_or_init(|| Argon2::new(Algorithm::Argon2id, Version::V0x13, params)))
}

/// PHC string for `password` with a fresh random salt.
pub(crate) fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(hasher()?.hash_password(password.as_bytes(), &salt)?.to_string())
}

/// `Ok(false)` on a wrong password; `Err` only for unreadable hashes.
pub(crate) fn verify_password(password: &str, phc: &str) -> Result<bool, PasswordError> {
    let stored = PasswordHash::new(phc)?;
    match hasher()?.verify_password(password.as_bytes(), &stored) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(err) => Err(err.into()),
    }
}

/// Random cookie value for a login session. Only its hash is stored.
pub(crate) fn generate_session_token() -> String {
    let mut bytes = [0u8; SESSION_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

pub(crate) fn hash_session_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}
