//! Thread slug derivation.
//!
//! Slugs are unique per server and derived from the title, with a numeric
//! suffix resolving collisions (`release-notes`, `release-notes-2`, ...).

use std::sync::Arc;
use tapestry_database::MirrorStore;
use tapestry_error::DatabaseResult;

/// Lowercase a title into a hyphenated slug.
///
/// Alphanumeric runs are kept, everything else collapses into single
/// hyphens. An empty result falls back to `thread`.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_hyphen = true;

    for c in title.chars() {
        if c.is_alphanumeric() {
            for lower in c.to_lowercase() {
                slug.push(lower);
            }
            last_hyphen = false;
        } else if !last_hyphen {
            slug.push('-');
            last_hyphen = true;
        }
    }

    let slug = slug.trim_end_matches('-').to_string();
    if slug.is_empty() {
        "thread".to_string()
    } else {
        slug
    }
}

/// Resolve a unique slug for a thread within a server.
///
/// `current` is the slug the thread already holds (if it is already
/// mirrored); a candidate equal to it is not a collision.
pub async fn resolve_slug(
    store: &Arc<dyn MirrorStore>,
    server_id: &str,
    title: &str,
    current: Option<&str>,
) -> DatabaseResult<String> {
    let base = slugify(title);
    let mut candidate = base.clone();
    let mut suffix = 2;

    loop {
        if Some(candidate.as_str()) == current {
            return Ok(candidate);
        }
        if !store.thread_slug_exists(server_id, &candidate).await? {
            return Ok(candidate);
        }
        candidate = format!("{base}-{suffix}");
        suffix += 1;
    }
}
