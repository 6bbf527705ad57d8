//! Search document normalization.
//!
//! Mirrors what `to_tsvector('simple', title || ' ' || description)` keeps
//! for plain text: lowercased alphanumeric words, deduplicated and sorted.
//! PostgreSQL exposes the same shape through `tsvector_to_array`.

use std::collections::BTreeSet;

/// Builds the normalized search document for a title and description.
pub fn document(title: &str, description: &str) -> String {
    let lexemes: BTreeSet<String> = title
        .split(|c: char| !c.is_alphanumeric())
        .chain(description.split(|c: char| !c.is_alphanumeric()))
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect();

    lexemes.into_iter().collect::<Vec<_>>().join(" ")
}

/// Returns true when every word of `query` appears in `document`.
pub fn matches(document: &str, query: &str) -> bool {
    let lexemes: BTreeSet<&str> = document.split(' ').collect();
    let mut words = query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .peekable();

    words.peek().is_some() && words.all(|word| lexemes.contains(word.to_lowercase().as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_is_lowercased_sorted_and_unique() {
        assert_eq!(
            document("Red Running Shoe", "A shoe for running."),
            "a for red running shoe"
        );
    }

    #[test]
    fn empty_description_uses_title_only() {
        assert_eq!(document("Runner", ""), "runner");
        assert_eq!(document("", ""), "");
    }

    #[test]
    fn matches_requires_every_query_word() {
        let doc = document("Trail Runner", "waterproof");
        assert!(matches(&doc, "trail"));
        assert!(matches(&doc, "Waterproof runner"));
        assert!(!matches(&doc, "road runner"));
        assert!(!matches(&doc, "  "));
    }
}
