//! Fuzz test for the editor's date input parsing
//!
//! Typed input goes through the same path as the annotation editor form:
//! parsing must never panic and a rejected date must block the draft.
//!
//! Run with: cargo +nightly fuzz run datetime_input_fuzz -- -max_total_time=60

#![no_main]

use chronomark_core::{parse_datetime_input, Annotation, AnnotationEditorForm};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        let parsed = parse_datetime_input(input);

        let mut form = AnnotationEditorForm::new(&Annotation::point("fuzz", "fuzz", 0));
        form.set_start_input(input);
        form.commit_start_time();

        if parsed.is_none() {
            assert!(form.start_error().is_some());
            assert!(form.draft().is_none());
        }
    }
});
