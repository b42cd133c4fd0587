//! Sanitization of free-text tokens into logic-term identifiers.

/// Turn an arbitrary string into a term-safe identifier: trimmed, lowercased,
/// with internal whitespace runs collapsed to single underscores.
///
/// Total and deterministic; never fails. Characters outside the term syntax
/// (punctuation, non-ASCII) pass through verbatim, which is a documented
/// limitation: [`super::KnowledgeBase::assert_fact`] is the backstop for
/// tokens that would not render as a valid term.
pub fn sanitize(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}
