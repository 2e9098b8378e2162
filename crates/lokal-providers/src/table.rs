#![forbid(unsafe_code)]

//! Delimited key/value tables.
//!
//! One row per line, fields separated by a single delimiter character
//! (`;` by default). The first field is the key, the second the value;
//! further fields are ignored. Rows with fewer than two fields are skipped.
//!
//! Lookup is a linear scan with exact, case-sensitive key comparison; the
//! first matching row wins.

/// Default field delimiter.
pub const DEFAULT_DELIMITER: char = ';';

/// A parsed table, kept in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    rows: Vec<(String, String)>,
}

impl Table {
    /// Parse `text`. A leading UTF-8 BOM and `\r\n` line endings are tolerated.
    #[must_use]
    pub fn parse(text: &str, delimiter: char, has_header: bool) -> Self {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let rows = text
            .lines()
            .skip(usize::from(has_header))
            .filter_map(|line| {
                let mut fields = line.split(delimiter);
                let key = fields.next()?;
                let value = fields.next()?;
                Some((key.to_string(), value.to_string()))
            })
            .collect();
        Self { rows }
    }

    /// First value whose key equals `key` exactly.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.rows
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate rows in file order.
    pub fn rows(&self) -> impl Iterator<Item = (&str, &str)> {
        self.rows.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_row_is_skipped() {
        let table = Table::parse("Key;Value\nabacaba;Found", ';', true);
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("abacaba"), Some("Found"));
        assert_eq!(table.get("Key"), None);
    }

    #[test]
    fn without_header_first_row_counts() {
        let table = Table::parse("Key;Value\nabacaba;Found", ';', false);
        assert_eq!(table.get("Key"), Some("Value"));
    }

    #[test]
    fn first_match_wins_and_is_exact() {
        let table = Table::parse("a;1\na;2\nab;3\nA;4", ';', false);
        assert_eq!(table.get("a"), Some("1"));
        assert_eq!(table.get("A"), Some("4"));
        assert_eq!(table.get("b"), None);
    }

    #[test]
    fn short_rows_skipped_and_extra_fields_ignored() {
        let table = Table::parse("lonely\nk;v;comment\n\n", ';', false);
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("k"), Some("v"));
    }

    #[test]
    fn bom_and_crlf_tolerated() {
        let table = Table::parse("\u{feff}k;v\r\nx;y\r\n", ';', false);
        assert_eq!(table.get("k"), Some("v"));
        assert_eq!(table.get("x"), Some("y"));
    }

    #[test]
    fn custom_delimiter() {
        let table = Table::parse("k,v", ',', false);
        assert_eq!(table.get("k"), Some("v"));
    }
}
