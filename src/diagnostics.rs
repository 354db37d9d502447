//! Rich, source-annotated error reporting.
//!
//! Every error that carries a [`crate::token::Span`] is rendered through
//! [ariadne] with the offending range underlined in the original source.
//! Everything else (I/O, subprocess failures) falls back to a plain
//! `eprintln!`.

use crate::driver::CompileError;
use ariadne::{Color, Label, Report, ReportKind, Source};
use std::ops::Range;

/// Locates a 1-indexed `(line, column)` within `source` as a byte offset.
/// `LexError`/`AdapterError` only carry a line/column, not a byte span, so
/// this recovers a single-character range to underline.
fn offset_of(source: &str, line: usize, column: usize) -> usize {
    let mut offset = 0;
    for (idx, text) in source.split('\n').enumerate() {
        if idx + 1 == line {
            return offset + (column.saturating_sub(1)).min(text.len());
        }
        offset += text.len() + 1;
    }
    source.len()
}

fn point_range(source: &str, line: usize, column: usize) -> Range<usize> {
    let start = offset_of(source, line, column);
    let end = (start + 1).min(source.len()).max(start);
    start..end
}

fn print_range_report(filename: &str, source: &str, range: Range<usize>, message: &str) {
    let report = Report::build(ReportKind::Error, (filename, range.clone()))
        .with_message(message)
        .with_label(
            Label::new((filename, range))
                .with_message(message)
                .with_color(Color::Red),
        )
        .finish();

    if let Err(print_err) = report.eprint((filename, Source::from(source))) {
        eprintln!("{}: {}", filename, message);
        eprintln!("(failed to render diagnostic: {})", print_err);
    }
}

/// Reports a [`CompileError`] to stderr, using source-span highlighting
/// where the error carries one.
pub fn report(filename: &str, source: &str, error: &CompileError) {
    match error {
        CompileError::Lex(e) => {
            print_range_report(filename, source, point_range(source, e.line, e.column), &e.message)
        }
        CompileError::Adapt(e) => {
            print_range_report(filename, source, point_range(source, e.line, e.column), &e.message)
        }
        CompileError::Parse(e) => {
            let end = e.span.end.max(e.span.start + 1).min(source.len().max(e.span.start));
            print_range_report(filename, source, e.span.start..end, &e.message)
        }
        CompileError::Io { .. } | CompileError::Nasm(_) | CompileError::Link(_) => {
            eprintln!("Error: {}", error);
        }
    }
}
