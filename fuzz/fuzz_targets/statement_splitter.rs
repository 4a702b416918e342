//! Fuzz target for the SQL statement splitter.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_statement_splitter
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;
use pgmig_migrate::split_statements;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        let statements = split_statements(input);

        // Every statement is trimmed, non-empty and free of separators.
        for statement in &statements {
            assert!(!statement.is_empty());
            assert_eq!(*statement, statement.trim());
            assert!(!statement.contains(';'));
        }
        assert!(statements.len() <= input.matches(';').count() + 1);
    }
});
