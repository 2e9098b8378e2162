#![no_main]

use lokal_core::{KeyAddress, SegmentKind};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    let Ok(address) = KeyAddress::parse(data) else {
        return;
    };

    // Post-conditions that must always hold:
    assert!(!address.key().is_empty(), "parsed key is empty");

    // Canonical form re-parses to the same address.
    let canonical = address.to_string();
    let reparsed = KeyAddress::parse(&canonical).expect("canonical form parses");
    assert_eq!(reparsed, address, "canonical round-trip changed the address");

    // Explicit segments survive ambient defaulting.
    let resolved = address.resolve_defaults(|kind| match kind {
        SegmentKind::Assembly => Some("Ambient".to_string()),
        SegmentKind::Dictionary => Some(String::new()),
    });
    assert_eq!(resolved.key, address.key());
    if let Some(dictionary) = address.dictionary() {
        assert_eq!(resolved.dictionary.as_deref(), Some(dictionary));
    } else {
        assert!(resolved.dictionary.is_none(), "empty ambient default was used");
    }
});
