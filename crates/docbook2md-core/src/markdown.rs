//! Markdown syntax helpers

/// Deepest heading Markdown supports
pub const MAX_HEADING_DEPTH: usize = 6;

/// ATX heading, depth clamped to 1..=6
pub fn heading(depth: usize, text: &str) -> String {
    let depth = depth.clamp(1, MAX_HEADING_DEPTH);
    format!("{} {}", "#".repeat(depth), text)
}

pub fn strong(text: &str) -> String {
    format!("**{text}**")
}

pub fn emphasis(text: &str) -> String {
    format!("*{text}*")
}

/// Inline code span
///
/// Content containing backticks is padded and delimited by one backtick more
/// than its longest backtick run.
pub fn inline_code(text: &str) -> String {
    match longest_backtick_run(text) {
        0 => format!("`{text}`"),
        run => {
            let fence = "`".repeat(run + 1);
            format!("{fence} {text} {fence}")
        }
    }
}

pub fn link(text: &str, url: &str) -> String {
    format!("[{text}]({url})")
}

/// Bold key followed by its value, e.g. `**Package:** stdlib`
pub fn key_value(key: &str, value: &str) -> String {
    format!("**{key}:** {value}")
}

/// Fenced code block as a single (multi-line) entry
///
/// The fence grows past the longest backtick run in the body.
pub fn code_block(lang: &str, code: &str) -> String {
    let fence = "`".repeat(longest_backtick_run(code).max(2) + 1);
    format!("{fence}{lang}\n{code}\n{fence}")
}

fn longest_backtick_run(text: &str) -> usize {
    text.split(|c| c != '`').map(str::len).max().unwrap_or(0)
}

/// One row of a pipe table
pub fn table_row<S: AsRef<str>>(cells: &[S]) -> String {
    let mut row = String::from("|");
    for cell in cells {
        row.push(' ');
        row.push_str(&escape_table_cell(cell.as_ref()));
        row.push_str(" |");
    }
    row
}

/// Separator row between a pipe table's header and body
pub fn table_separator<S: AsRef<str>>(headers: &[S]) -> String {
    let mut row = String::from("|");
    for header in headers {
        row.push_str(&"-".repeat(header.as_ref().len() + 2));
        row.push('|');
    }
    row
}

fn escape_table_cell(s: &str) -> String {
    s.replace('|', "\\|")
}
