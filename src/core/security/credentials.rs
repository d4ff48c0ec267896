//! Static-credential verification and session hash derivation.
//!
//! Exactly one reference username/password pair is configured per process.
//! Submitted credentials are compared in constant time, and a deterministic
//! session hash is derived from the reference pair so that a session token
//! survives server restarts without being stored anywhere.

use std::fmt;

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::core::config::AuthConfig;

/// Context string used as the PBKDF2 salt when deriving the per-username salt.
///
/// Shared by every deployment, so the derived salt is only as unique as the
/// username. Changing it invalidates all outstanding session tokens.
pub const SALT_DERIVATION_CONTEXT: &[u8] = b"agent_zero_salt_derivation_v1";

/// Iterations for the username -> salt derivation.
pub const SALT_ITERATIONS: u32 = 1_000;

/// Iterations for the credentials -> session hash derivation.
pub const SESSION_ITERATIONS: u32 = 100_000;

/// Length in bytes of both the derived salt and the session hash.
pub const HASH_LEN: usize = 32;

/// A 256-bit session-binding token derived from the reference credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionHash([u8; HASH_LEN]);

impl SessionHash {
    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    /// Lowercase hex rendering used on the wire.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Constant-time check of a hex token presented by a client.
    ///
    /// Malformed hex never matches. Only the length of the token can leak
    /// through timing, and the expected length is public.
    pub fn matches(&self, token: &str) -> bool {
        let mut presented = [0u8; HASH_LEN];
        if hex::decode_to_slice(token.trim(), &mut presented).is_err() {
            return false;
        }
        bool::from(self.0[..].ct_eq(&presented[..]))
    }
}

impl fmt::Debug for SessionHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionHash([REDACTED])")
    }
}

/// Compares submitted credentials against the reference pair.
///
/// Both comparisons always run and are combined without short-circuiting, so
/// a wrong username costs the same as a wrong password. An empty reference
/// username means nothing is configured and never matches.
pub fn verify_credentials(
    submitted_user: &str,
    submitted_password: &str,
    reference_user: &str,
    reference_password: Option<&str>,
) -> bool {
    if reference_user.is_empty() {
        return false;
    }

    let user_match = submitted_user.as_bytes().ct_eq(reference_user.as_bytes());
    let password_match = submitted_password
        .as_bytes()
        .ct_eq(reference_password.unwrap_or("").as_bytes());

    bool::from(user_match & password_match)
}

/// Derives the session hash for the reference credentials, or `None` when no
/// username is configured.
///
/// PBKDF2-HMAC-SHA256 is applied twice: first to the username (salted with
/// [`SALT_DERIVATION_CONTEXT`]) to get a per-username salt, then to
/// `"user:password"` with that salt.
pub fn derive_session_hash(
    reference_user: &str,
    reference_password: Option<&str>,
) -> Option<SessionHash> {
    if reference_user.is_empty() {
        return None;
    }

    let salt = derive_salt(reference_user);
    let material = format!("{}:{}", reference_user, reference_password.unwrap_or(""));

    let mut out = [0u8; HASH_LEN];
    pbkdf2_hmac::<Sha256>(material.as_bytes(), &salt, SESSION_ITERATIONS, &mut out);
    Some(SessionHash(out))
}

fn derive_salt(user: &str) -> [u8; HASH_LEN] {
    let mut salt = [0u8; HASH_LEN];
    pbkdf2_hmac::<Sha256>(
        user.as_bytes(),
        SALT_DERIVATION_CONTEXT,
        SALT_ITERATIONS,
        &mut salt,
    );
    salt
}

/// Verifier bound to the process-wide reference credentials.
#[derive(Clone)]
pub struct CredentialVerifier {
    login: String,
    password: Option<String>,
}

impl CredentialVerifier {
    pub fn new(login: Option<String>, password: Option<String>) -> Self {
        Self {
            login: login.unwrap_or_default(),
            password,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.login.clone(), config.password.clone())
    }

    /// Login is required whenever a reference username is configured.
    pub fn is_login_required(&self) -> bool {
        !self.login.is_empty()
    }

    pub fn verify(&self, submitted_user: &str, submitted_password: &str) -> bool {
        verify_credentials(
            submitted_user,
            submitted_password,
            &self.login,
            self.password.as_deref(),
        )
    }

    /// Recomputed on every call; nothing is cached.
    pub fn session_hash(&self) -> Option<SessionHash> {
        derive_session_hash(&self.login, self.password.as_deref())
    }
}

impl fmt::Debug for CredentialVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialVerifier")
            .field("login", &self.login)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}
