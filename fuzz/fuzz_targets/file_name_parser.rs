//! Fuzz target for the migration file name parser.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_file_name_parser
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;
use pgmig_migrate::{Direction, parse_file_name};

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        if let Some(parsed) = parse_file_name(input) {
            assert!(parsed.version >= 0);
            assert!(!parsed.name.is_empty());
            let suffix = match parsed.direction {
                Direction::Up => ".up.sql",
                Direction::Down => ".down.sql",
            };
            assert!(input.ends_with(suffix));
        }
    }
});
