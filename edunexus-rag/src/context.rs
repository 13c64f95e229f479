//! Context assembly: surviving chunks → one prompt-ready string.

use tracing::debug;

/// Marker placed before each excerpt.
const ITEM_PREFIX: &str = "- ";

/// Join chunk texts into a context block, one `- {text}` line per chunk, in
/// the order given.
///
/// An empty input yields the empty string, which tells the answer generator
/// that no grounding was found. Duplicates are kept.
pub fn assemble<S: AsRef<str>>(candidates: &[S]) -> String {
    assemble_capped(candidates, None)
}

/// Like [`assemble`], with an optional length cap.
///
/// When `max_chars` is set, whole excerpts are appended for as long as the
/// block stays within that many characters; the first excerpt that would
/// overflow and everything after it are dropped.
pub fn assemble_capped<S: AsRef<str>>(candidates: &[S], max_chars: Option<usize>) -> String {
    let mut context = String::new();
    let mut used = 0;

    for (i, candidate) in candidates.iter().enumerate() {
        let line = format!("{ITEM_PREFIX}{}\n", candidate.as_ref());
        let len = line.chars().count();
        if let Some(limit) = max_chars {
            if used + len > limit {
                debug!(kept = i, dropped = candidates.len() - i, limit, "context cap reached");
                break;
            }
        }
        used += len;
        context.push_str(&line);
    }

    context
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_empty_context() {
        let none: [&str; 0] = [];
        assert_eq!(assemble(&none), "");
    }

    #[test]
    fn single_candidate_is_contained() {
        let context = assemble(&["Atoms are tiny."]);
        assert_eq!(context, "- Atoms are tiny.\n");
    }

    #[test]
    fn order_is_preserved_and_duplicates_kept() {
        let context = assemble(&["first", "second", "first"]);
        assert_eq!(context, "- first\n- second\n- first\n");
    }

    #[test]
    fn cap_keeps_whole_excerpts_only() {
        // "- aaaa\n" is 7 characters.
        let context = assemble_capped(&["aaaa", "bbbb", "cccc"], Some(15));
        assert_eq!(context, "- aaaa\n- bbbb\n");
    }

    #[test]
    fn cap_smaller_than_first_excerpt_yields_empty() {
        assert_eq!(assemble_capped(&["a long excerpt"], Some(3)), "");
    }
}
