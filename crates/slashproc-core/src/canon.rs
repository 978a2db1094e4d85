//! Key normalization for group and variable identifiers.
//!
//! Sources label things the way the kernel does (`MemTotal`, `model name`,
//! `Active(anon)`); the tree only admits canonical ids. Producers are expected
//! to canonicalize before publishing. The validators use [`is_canonical`] to
//! catch the ones that don't.

/// Characters replaced by `_` during canonicalization.
const SEPARATORS: [char; 3] = [' ', '-', '/'];

/// Canonicalizes a label into an identifier.
///
/// Strips enclosing `()` / `[]` pairs, replaces spaces, hyphens and slashes
/// with underscores, then lower-cases. Stripping repeats until no enclosing
/// pair is left, which keeps the function idempotent for nested brackets.
pub fn canonicalize(text: &str) -> String {
    let mut inner = text;
    while let Some(stripped) = strip_enclosing(inner) {
        inner = stripped;
    }

    inner
        .chars()
        .map(|c| if SEPARATORS.contains(&c) { '_' } else { c })
        .collect::<String>()
        .to_lowercase()
}

/// Returns `true` if `id` is non-empty and already in canonical form.
pub fn is_canonical(id: &str) -> bool {
    !id.is_empty() && canonicalize(id) == id
}

/// Turns a canonical id back into a display label (`model_name` -> `Model Name`).
pub fn label_format(id: &str) -> String {
    id.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn strip_enclosing(text: &str) -> Option<&str> {
    ["()", "[]"].iter().find_map(|pair| {
        let mut delims = pair.chars();
        let (open, close) = (delims.next()?, delims.next()?);
        text.strip_prefix(open)?.strip_suffix(close)
    })
}
