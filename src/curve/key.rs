//! Stable curve keys and labels.
//!
//! Key layout: `<codec>-<w>x<h>[-<fps>fps][-<content>]`. Parts are joined with
//! `-` and never contain `-` themselves (slugs use `_`), so distinct groups
//! cannot alias through the join. Free text is slugified for readability and
//! suffixed with [`content_hash8`] of the original text, because slugs are
//! lossy.

use sha2::{Digest, Sha256};

use super::CurveGroupKey;

/// Maximum slug length before the hash suffix.
pub const MAX_SLUG_LEN: usize = 48;

/// Key and label for one curve group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurveKey {
    /// Filesystem- and identifier-safe key.
    pub key: String,
    /// Human-readable label.
    pub label: String,
}

impl CurveKey {
    /// Build the key and label for a group. Pure: equal groups give equal keys.
    #[must_use]
    pub fn build(group: &CurveGroupKey) -> Self {
        let mut key = codec_part(&group.codec);
        key.push('-');
        key.push_str(&format!("{}x{}", group.width, group.height));

        let mut label = format!("{} {}x{}", group.codec.trim(), group.width, group.height);

        if let Some(fps) = group.fps {
            key.push('-');
            key.push_str(&fps_part(fps));
            key.push_str("fps");
            label.push_str(&format!(" @ {fps} fps"));
        }

        if let Some(content) = &group.content {
            key.push('-');
            key.push_str(&hashed_slug(content));
            label.push_str(&format!(" ({})", content.trim()));
        }

        Self { key, label }
    }
}

/// Lowercase ASCII alphanumerics; every other run becomes one `_`.
///
/// Leading and trailing separators are trimmed and the result is capped at
/// [`MAX_SLUG_LEN`] characters.
///
/// # Example
///
/// ```
/// use vq_curves::curve::slugify;
///
/// assert_eq!(slugify("  Big Buck Bunny (1080p)!"), "big_buck_bunny_1080p");
/// assert_eq!(slugify("---"), "");
/// ```
#[must_use]
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len().min(MAX_SLUG_LEN));
    let mut pending_sep = false;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_sep && !slug.is_empty() {
                slug.push('_');
            }
            pending_sep = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_sep = true;
        }
        if slug.len() >= MAX_SLUG_LEN {
            break;
        }
    }
    slug.truncate(MAX_SLUG_LEN);
    while slug.ends_with('_') {
        slug.pop();
    }
    slug
}

/// First 8 hex characters of the SHA-256 of `text`.
#[must_use]
pub fn content_hash8(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    format!("{digest:x}")[..8].to_string()
}

/// `29.97` becomes `29p97`; the result never contains `-` or `.`.
fn fps_part(fps: f64) -> String {
    format!("{fps}")
        .to_ascii_lowercase()
        .replace('.', "p")
        .replace('-', "m")
}

fn hashed_slug(text: &str) -> String {
    let slug = slugify(text);
    let hash = content_hash8(text);
    if slug.is_empty() {
        hash
    } else {
        format!("{slug}_{hash}")
    }
}

/// Codec identifiers made only of `[a-z0-9]` pass through unchanged; anything
/// else becomes `<slug>_<hash8>`. The hashed form always contains `_`, so it
/// can never equal a verbatim codec.
fn codec_part(codec: &str) -> String {
    let safe = !codec.is_empty()
        && codec
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit());
    if safe {
        codec.to_string()
    } else {
        format!("{}_{}", slugify(codec), content_hash8(codec))
    }
}
