//! # Matcher
//! Pure resolution of an input string against the answer table.
//! No I/O, suitable for unit tests and future offline evaluation.
//!
//! Policy: an exact normalized match wins outright; otherwise the table
//! question that is the longest substring of the input wins (most
//! specific). Ties break on table order, first entry wins.

use crate::lookup::LookupEntry;

/// Lowercase + trim, applied to both sides before any comparison.
fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Resolve `input` against `entries` with exact-then-longest-partial
/// semantics. Entries with an empty question never match.
pub fn best_match<'a>(input: &str, entries: &'a [LookupEntry]) -> Option<&'a LookupEntry> {
    let needle = normalize(input);
    if needle.is_empty() {
        return None;
    }

    // 1) Exact pass: first normalized equality wins.
    for entry in entries {
        let q = normalize(&entry.question);
        if !q.is_empty() && q == needle {
            return Some(entry);
        }
    }

    // 2) Partial pass: among questions contained in the input, pick the
    //    longest one; `>` keeps the earlier entry on equal lengths.
    let mut best: Option<(&LookupEntry, usize)> = None;
    for entry in entries {
        let q = normalize(&entry.question);
        if q.is_empty() || !needle.contains(q.as_str()) {
            continue;
        }
        match best {
            Some((_, len)) if q.len() <= len => {}
            _ => best = Some((entry, q.len())),
        }
    }
    best.map(|(entry, _)| entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::LookupEntry;

    fn entry(q: &str, a: &str) -> LookupEntry {
        LookupEntry {
            question: q.to_string(),
            answer: a.to_string(),
        }
    }

    #[test]
    fn exact_match_ignores_case_and_whitespace() {
        let table = vec![entry("Library Hours", "9am-9pm")];
        let hit = best_match("  library hours ", &table).expect("should match");
        assert_eq!(hit.answer, "9am-9pm");
    }

    #[test]
    fn exact_beats_partial() {
        let table = vec![
            entry("hours", "generic hours"),
            entry("what are the hours", "exact answer"),
        ];
        let hit = best_match("what are the hours", &table).expect("should match");
        assert_eq!(hit.answer, "exact answer");
    }

    #[test]
    fn longest_partial_wins() {
        let table = vec![entry("hours", "A"), entry("office hours", "B")];
        let hit = best_match("what are the office hours", &table).expect("should match");
        assert_eq!(hit.answer, "B");
    }

    #[test]
    fn partial_ties_break_on_table_order() {
        let table = vec![entry("exam fee", "first"), entry("fee exam", "second")];
        // Both are 8 chars and both substrings of the input.
        let hit = best_match("exam fee or fee exam?", &table).expect("should match");
        assert_eq!(hit.answer, "first");
    }

    #[test]
    fn empty_questions_never_match() {
        let table = vec![entry("", "junk"), entry("   ", "junk2"), entry("mess", "ok")];
        let hit = best_match("mess", &table).expect("should match");
        assert_eq!(hit.answer, "ok");
        assert!(best_match("anything else", &table[..2]).is_none());
    }

    #[test]
    fn exact_ties_break_on_table_order() {
        let table = vec![entry("fees", "first"), entry("FEES", "second")];
        let hit = best_match("fees", &table).expect("should match");
        assert_eq!(hit.answer, "first");
    }

    #[test]
    fn no_candidate_returns_none() {
        let table = vec![entry("canteen menu", "see board")];
        assert!(best_match("when is the next holiday", &table).is_none());
        assert!(best_match("", &table).is_none());
    }
}
