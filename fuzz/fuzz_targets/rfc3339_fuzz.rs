//! Fuzz test for RFC3339 timestamp conversion
//!
//! Arbitrary strings must never panic the parser, and anything it accepts
//! must format back to a timestamp that parses to the same instant.
//!
//! Run with: cargo +nightly fuzz run rfc3339_fuzz -- -max_total_time=60

#![no_main]

use chronomark_core::{ms_to_rfc3339, rfc3339_to_ms};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        if let Ok(ms) = rfc3339_to_ms(input) {
            if let Ok(formatted) = ms_to_rfc3339(ms) {
                assert_eq!(rfc3339_to_ms(&formatted).ok(), Some(ms));
            }
        }
    }
});
