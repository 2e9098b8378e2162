//! Property-based invariant tests for delimited tables.
//!
//! 1. `parse` never panics on arbitrary input
//! 2. Every well-formed row is found by its key
//! 3. The first row with a given key wins
//! 4. CRLF line endings and a BOM parse like plain LF text

use lokal_providers::Table;
use proptest::prelude::*;

fn field() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_ .]{1,16}"
}

fn rows() -> impl Strategy<Value = Vec<(String, String)>> {
    proptest::collection::vec((field(), field()), 0..24)
}

fn render(rows: &[(String, String)], newline: &str) -> String {
    rows.iter()
        .map(|(k, v)| format!("{k};{v}"))
        .collect::<Vec<_>>()
        .join(newline)
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Robustness
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn parse_never_panics(text in "\\PC{0,200}", has_header in any::<bool>()) {
        let table = Table::parse(&text, ';', has_header);
        prop_assert!(table.len() <= text.lines().count());
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2–3. Lookup
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn every_row_key_resolves_to_first_occurrence(rows in rows()) {
        let table = Table::parse(&render(&rows, "\n"), ';', false);
        prop_assert_eq!(table.len(), rows.len());
        for (key, _) in &rows {
            let first = rows
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str());
            prop_assert_eq!(table.get(key), first);
        }
    }

    #[test]
    fn header_skips_exactly_one_row(rows in rows()) {
        let with = Table::parse(&render(&rows, "\n"), ';', true);
        prop_assert_eq!(with.len(), rows.len().saturating_sub(1));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Line endings
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn crlf_and_bom_match_plain_text(rows in rows()) {
        let plain = Table::parse(&render(&rows, "\n"), ';', false);
        let windows = format!("\u{feff}{}", render(&rows, "\r\n"));
        let windows = Table::parse(&windows, ';', false);
        prop_assert_eq!(plain, windows);
    }
}
