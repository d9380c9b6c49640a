// ============================================================================
// vidcoder-cli/src/terminal.rs
// ============================================================================
//
// TERMINAL OUTPUT: UI Components and Styling
//
// Sections, status lines and success/error messages with one consistent
// look. Regular output goes through `info!` so it shares the logger's
// destination; errors are written straight to stderr.
//
// Visual hierarchy:
// 1. Sections          ===== SECTION =====
// 2. Processing steps  » Step description
// 3. Status items        Label:          Value
// 4. Results           ✓ Success / ✗ Error

use console::style;
use log::info;

/// Styling constants for terminal output
pub mod styling {
    pub const SUCCESS_SYMBOL: &str = "✓";
    pub const PROCESSING_SYMBOL: &str = "»";
    pub const ERROR_SYMBOL: &str = "✗";

    pub const SECTION_PREFIX: &str = "===== ";
    pub const SECTION_SUFFIX: &str = " =====";

    pub const STATUS_INDENT: &str = "  ";
    pub const LABEL_WIDTH: usize = 15;
}

/// Print a section header for major workflow phases
pub fn print_section(title: &str) {
    info!("");
    info!(
        "{}{}{}",
        styling::SECTION_PREFIX,
        style(title.to_uppercase()).cyan().bold(),
        styling::SECTION_SUFFIX
    );
    info!("");
}

/// Print a processing step message
pub fn print_processing(message: &str) {
    info!(
        "{}{} {}",
        styling::STATUS_INDENT,
        styling::PROCESSING_SYMBOL,
        style(message).bold()
    );
}

/// Print a status line (key-value pair), optionally emphasizing the value
pub fn print_status(label: &str, value: &str, highlight: bool) {
    let line = format_status(label, value);
    if highlight {
        let (head, _) = line.split_at(line.len() - value.len());
        info!("{}{}", head, style(value).bold());
    } else {
        info!("{line}");
    }
}

/// Print a plain indented line
pub fn print_line(message: &str) {
    info!("{}{}", styling::STATUS_INDENT, message);
}

/// Print a success message
pub fn print_success(message: &str) {
    info!(
        "{}{} {}",
        styling::STATUS_INDENT,
        style(styling::SUCCESS_SYMBOL).green(),
        message
    );
}

/// Print an error message with context to stderr
pub fn print_error(title: &str, message: &str, suggestion: Option<&str>) {
    eprintln!(
        "{} {}",
        styling::ERROR_SYMBOL,
        style(title).red().bold().for_stderr()
    );
    eprintln!();
    eprintln!("  Message:  {message}");
    if let Some(suggestion) = suggestion {
        eprintln!();
        eprintln!("  Suggestion: {suggestion}");
    }
    eprintln!();
}

/// `  Label:          value`, with the label padded to a fixed column.
fn format_status(label: &str, value: &str) -> String {
    let padding = styling::LABEL_WIDTH.saturating_sub(label.len()).max(1);
    format!(
        "{}{}:{}{}",
        styling::STATUS_INDENT,
        label,
        " ".repeat(padding),
        value
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_status_alignment() {
        assert_eq!(format_status("Input", "a.mkv"), "  Input:          a.mkv");
        assert_eq!(format_status("Output", "b.mp4"), "  Output:         b.mp4");
    }

    #[test]
    fn test_format_status_long_label() {
        assert_eq!(
            format_status("A very long label here", "x"),
            "  A very long label here: x"
        );
    }
}
