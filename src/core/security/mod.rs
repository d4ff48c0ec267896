// Security module for path admission and credential checks
//
// Everything that decides whether a caller may see a file, or whether a
// caller is who they claim to be, lives here. Both halves are pure functions
// of their input plus the immutable process configuration.

pub mod credentials;
pub mod path_guard;

pub use credentials::{CredentialVerifier, SessionHash, derive_session_hash, verify_credentials};
pub use path_guard::{DEFAULT_BLOCKED_PATTERNS, PathGuard, PathSecurityError, is_path_admissible};
