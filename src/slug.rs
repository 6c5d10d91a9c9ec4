//! Slug derivation for store records.

/// Derives a URL-safe slug from a display name: lowercase ASCII alphanumeric
/// runs joined by single hyphens. Names with no usable characters fall back
/// to `"store"` so a record always has a non-empty slug.
pub fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_gap = false;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_gap && !out.is_empty() {
                out.push('-');
            }
            pending_gap = false;
            out.push(ch.to_ascii_lowercase());
        } else {
            pending_gap = true;
        }
    }
    if out.is_empty() {
        "store".to_string()
    } else {
        out
    }
}

/// Returns `base` if unused, otherwise `base-N` with the smallest free
/// counter N >= 2. `existing` is the set of slugs already persisted.
pub fn next_available_slug(base: &str, existing: &[String]) -> String {
    if !existing.iter().any(|s| s == base) {
        return base.to_string();
    }
    let mut n: u64 = 2;
    loop {
        let candidate = format!("{base}-{n}");
        if !existing.iter().any(|s| s == &candidate) {
            return candidate;
        }
        n += 1;
    }
}
