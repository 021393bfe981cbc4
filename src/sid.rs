//! Session identifier generation.
//!
//! Identifiers carry 256 bits of CSPRNG entropy, base64url-encoded.
//! Regeneration relies on these being unguessable and collision-free in
//! practice; a colliding insert is treated as a backend error upstream
//! rather than retried.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;

/// Random bytes per session id (43 base64url chars once encoded).
const SID_ENTROPY_BYTES: usize = 32;

/// Generate a fresh, cryptographically unpredictable session id.
///
/// Each call produces a unique value; cookie-safe alphabet, no padding.
pub fn generate() -> String {
    let mut rng = rand::rng();
    let mut bytes = [0u8; SID_ENTROPY_BYTES];
    rng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
