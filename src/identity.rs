//! Posting identity and write-if-new persistence.

use crate::error::StoreError;
use crate::models::{Category, Posting, Source};
use crate::store::PostingStore;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

/// Field used for deduplication unless a caller asks for another
pub const DEFAULT_KEY_FIELD: &str = "id";

const SLUG_CHARS: usize = 40;
const HASH_HEX_CHARS: usize = 16;

/// Deterministic id for a listing: `{source}_{slug}_{hash}`.
///
/// The slug keeps only ASCII alphanumerics and Hangul syllables from the
/// natural key, truncated, so ids stay readable. The hash covers the whole
/// trimmed key, so keys that collapse to the same slug still get distinct ids.
pub fn generate_id(source: Source, natural_key: &str) -> String {
    let key = natural_key.trim();

    let slug: String = key
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || is_hangul_syllable(*c))
        .take(SLUG_CHARS)
        .collect();

    let mut hasher = Sha256::new();
    hasher.update(source.tag().as_bytes());
    hasher.update(b"\x00");
    hasher.update(key.as_bytes());
    let digest = format!("{:x}", hasher.finalize());

    if slug.is_empty() {
        format!("{}_{}", source.tag(), &digest[..HASH_HEX_CHARS])
    } else {
        format!("{}_{}_{}", source.tag(), slug, &digest[..HASH_HEX_CHARS])
    }
}

fn is_hangul_syllable(c: char) -> bool {
    ('\u{AC00}'..='\u{D7A3}').contains(&c)
}

/// Persist `posting` unless its `key_field` value is already stored.
///
/// Returns `Ok(true)` only when a new document was written. A posting without
/// a usable key value is skipped.
pub async fn save_if_new(
    store: &dyn PostingStore,
    category: Category,
    posting: &Posting,
    key_field: &str,
) -> Result<bool, StoreError> {
    let serialized = serde_json::to_value(posting)?;
    let key_value = match serialized.get(key_field).and_then(|v| v.as_str()) {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => {
            warn!(field = key_field, title = %posting.title, "Posting has no value for dedup field, skipping");
            return Ok(false);
        }
    };

    let collection = category.collection();
    if store.exists(collection, key_field, &key_value).await? {
        debug!(collection, key = %key_value, "Already stored");
        return Ok(false);
    }

    store.insert(collection, posting).await
}
