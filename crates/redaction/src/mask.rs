//! Masking strategies, one per visible redaction level.

use hmac::digest::InvalidLength;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Generic placeholder shown for `PARTIAL` fields.
pub const PARTIAL_PLACEHOLDER: &str = "[MASKED]";

/// Keep the last `visible` characters and replace everything before them
/// with `*`. Counts characters, not bytes.
pub fn mask_minimal(value: &str, visible: usize) -> String {
    let len = value.chars().count();
    if len == 0 {
        return String::new();
    }
    // Never reveal the whole value, even when it is shorter than the suffix.
    let keep = visible.min(len.saturating_sub(1));
    let hidden = len - keep;
    let mut out = String::with_capacity(value.len());
    out.extend(std::iter::repeat_n('*', hidden));
    out.extend(value.chars().skip(hidden));
    out
}

/// Keyed one-way digest used for `HASH_ONLY` fields.
///
/// HMAC-SHA256 under a secret key: equal values hash equally, so hashed
/// identifiers can still be joined across records, but nobody without the
/// key can rebuild the digest from a guessed value.
#[derive(Clone)]
pub struct IdentifierHasher {
    mac: HmacSha256,
}

impl IdentifierHasher {
    pub fn new(key: &[u8]) -> Result<Self, InvalidLength> {
        Ok(Self {
            mac: HmacSha256::new_from_slice(key)?,
        })
    }

    /// Lowercase hex digest of `value`.
    pub fn digest(&self, value: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(value.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

impl std::fmt::Debug for IdentifierHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("IdentifierHasher(<keyed>)")
    }
}
