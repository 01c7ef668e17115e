//! Fuzz target: decimal and coin-bag parsing
//!
//! Feeds arbitrary text to Dec::from_str and arbitrary JSON to the
//! DecCoins deserializer. Anything accepted must print back to a value
//! that parses to the same Dec, and any accepted bag must be normalized.
//!
//! Run: cargo +nightly fuzz run fuzz_dec_parse -- -max_len=256

#![no_main]
use distr_core::{Dec, DecCoins};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(d) = s.parse::<Dec>() {
            let back: Dec = d.to_string().parse().expect("display output must parse");
            assert_eq!(back, d);
        }
    }

    if let Ok(coins) = serde_json::from_slice::<DecCoins>(data) {
        assert!(coins.is_valid(), "deserialized bag not normalized: {}", coins);
    }
});
