#![no_main]

use lokal_core::Culture;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    let Ok(culture) = Culture::parse(data) else {
        return;
    };

    // One level per subtag, then invariant.
    let levels = if culture.is_invariant() {
        1
    } else {
        culture.name().split('-').count() + 1
    };
    let chain: Vec<Culture> = culture.fallback_chain().take(levels + 1).collect();

    // Post-conditions that must always hold:
    assert_eq!(chain.len(), levels, "fallback chain does not terminate");
    assert_eq!(chain.first(), Some(&culture));
    assert!(chain.last().is_some_and(Culture::is_invariant));

    // Normalization is idempotent.
    let again = Culture::parse(culture.name()).expect("normalized name parses");
    assert_eq!(again, culture);
});
