//! "Did you mean" candidates for unknown command names.
//!
//! Exact and pluralized lookups plus case-insensitive prefix matches on a
//! guess that loses its last character each round.

use tracing::trace;

/// Guesses shorter than this are not worth matching.
const MIN_GUESS_LEN: usize = 3;

/// Simple English pluralization of a command word.
pub fn pluralize(word: &str) -> String {
    if word.ends_with('s') {
        return word.to_string();
    }
    if ["x", "z", "ch", "sh"].iter().any(|end| word.ends_with(end)) {
        return format!("{word}es");
    }
    let mut chars = word.chars().rev();
    if let (Some('y'), Some(before)) = (chars.next(), chars.next()) {
        if !"aeiou".contains(before) {
            return format!("{}ies", &word[..word.len() - 1]);
        }
    }
    format!("{word}s")
}

/// Candidate names for `unknown`, taken from `names`.
///
/// Ordered by number of hyphen-separated words, then alphabetically. Empty
/// when nothing plausible exists.
pub fn suggest(unknown: &str, names: &[String]) -> Vec<String> {
    let mut guess = unknown.to_string();
    let mut found: Vec<String> = Vec::new();

    while guess.chars().count() >= MIN_GUESS_LEN && found.is_empty() {
        let plural = pluralize(&guess);
        let prefix = guess.to_lowercase();

        if names.contains(&guess) {
            found.push(guess.clone());
        }
        if names.contains(&plural) {
            found.push(plural);
        }
        found.extend(
            names
                .iter()
                .filter(|name| name.to_lowercase().starts_with(&prefix))
                .cloned(),
        );

        trace!(%guess, candidates = found.len(), "suggestion round");
        guess.pop();
    }

    found.sort_by_key(|name| (name.split('-').count(), name.clone()));
    found.dedup();
    found
}
