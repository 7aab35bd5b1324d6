//! Test for logging is isolated in its own module to avoid messing with the global settings of
//! other, non-logging related tests.
mod common;

use common::{FakeColumn, FakeStatement, text};
use log::Level;
use odbc_row_cursor::{
    RowCursor,
    handles::{DiagnosticResult, Diagnostics, SqlDataType, State, log_diagnostics},
};

#[test]
fn emit_a_warning_for_each_diagnostic() {
    // Given a handle which would have two diagnostics
    struct DiagnosticStub;

    impl DiagnosticStub {
        fn write_message(text: &[u8], buf: &mut [u8]) -> DiagnosticResult {
            let len = text.len().min(buf.len());
            buf[..len].copy_from_slice(&text[..len]);
            DiagnosticResult {
                state: State(*b"01000"),
                native_error: 0,
                text_length: text.len() as i16,
            }
        }
    }

    impl Diagnostics for DiagnosticStub {
        fn diagnostic_record(
            &self,
            rec_number: i16,
            message_text: &mut [u8],
        ) -> Option<DiagnosticResult> {
            match rec_number {
                1 => Some(Self::write_message(b"first diagnostic", message_text)),
                2 => Some(Self::write_message(b"second diagnostic", message_text)),
                _ => None,
            }
        }
    }

    testing_logger::setup();

    // When logging the diagnostics of the handle
    log_diagnostics(&DiagnosticStub);

    // Both diagnostics are logged as warnings
    testing_logger::validate(|captured_logs| {
        assert_eq!(captured_logs.len(), 2);
        assert_eq!(captured_logs[0].level, Level::Warn);
        assert!(captured_logs[0].body.contains("first diagnostic"));
        assert_eq!(captured_logs[1].level, Level::Warn);
        assert!(captured_logs[1].body.contains("second diagnostic"));
    });
}

#[test]
fn warn_about_truncated_value_of_unknown_type() {
    // Given a value of a type without dedicated decoding, which exceeds the fallback buffer
    let statement = FakeStatement::single(
        vec![FakeColumn::new("guid", SqlDataType::EXT_GUID, 36)],
        vec![vec![text(&"x".repeat(300))]],
    );
    let mut cursor = RowCursor::new(statement).unwrap();
    cursor.advance().unwrap();

    testing_logger::setup();

    // When decoding it
    cursor.value_at(0).unwrap();

    // Then the truncation is reported exactly once
    testing_logger::validate(|captured_logs| {
        let warnings: Vec<_> = captured_logs
            .iter()
            .filter(|log| log.level == Level::Warn)
            .collect();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].body.contains("truncated to 254 bytes"));
    });
}
