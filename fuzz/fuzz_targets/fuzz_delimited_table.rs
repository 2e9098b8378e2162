#![no_main]

use arbitrary::Arbitrary;
use lokal_providers::Table;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input<'a> {
    text: &'a str,
    delimiter: char,
    has_header: bool,
    probe: &'a str,
}

fuzz_target!(|input: Input<'_>| {
    let table = Table::parse(input.text, input.delimiter, input.has_header);

    // Post-conditions that must always hold:
    assert_eq!(table.len(), table.rows().count());
    assert!(table.len() <= input.text.lines().count());

    // The first row for a key wins.
    if let Some(value) = table.get(input.probe) {
        let first = table
            .rows()
            .find(|(key, _)| *key == input.probe)
            .map(|(_, value)| value);
        assert_eq!(first, Some(value));
    }
});
