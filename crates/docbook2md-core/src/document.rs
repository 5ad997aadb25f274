//! Document assembler
//!
//! Turns the renderer's line sequence into the final Markdown text.

use crate::diagnostics::Diagnostics;

/// Join rendered lines into a document
///
/// Runs of blank lines collapse into one, surrounding blank space is trimmed
/// and the diagnostics table (if any) is appended after a blank line. The
/// result ends with a single newline unless it is empty.
pub fn assemble(lines: &[String], diagnostics: Option<&Diagnostics>) -> String {
    let mut body: Vec<&str> = Vec::with_capacity(lines.len());
    for line in lines {
        let blank = line.trim().is_empty();
        if blank && body.last().is_none_or(|l| l.is_empty()) {
            continue;
        }
        body.push(if blank { "" } else { line.as_str() });
    }

    let mut output = body.join("\n").trim().to_string();

    if let Some(table) = diagnostics.and_then(Diagnostics::to_markdown_table) {
        if !output.is_empty() {
            output.push_str("\n\n");
        }
        output.push_str(&table);
    }

    if !output.is_empty() {
        output.push('\n');
    }
    output
}
