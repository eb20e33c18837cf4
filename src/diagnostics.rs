// Diagnostic rendering for compiler errors.
//
// Keeps the severity/color/snippet plumbing from the teacher's diagnostics
// module; drops the framework-specific suggestion builders (JSX, CSS nesting,
// borrow-checker notes) that have no counterpart in this language.

/// ANSI color codes for terminal output.
pub mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";

    pub const RED: &str = "\x1b[31m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GREEN: &str = "\x1b[32m";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn color(&self) -> &'static str {
        match self {
            Severity::Error => colors::RED,
            Severity::Warning => colors::YELLOW,
            Severity::Info => colors::CYAN,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

/// A position in a source file, used for both lexer/parser diagnostics and
/// rendered error snippets.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
    pub length: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        SourceLocation { line, column, length: 1 }
    }

    pub fn spanning(line: usize, column: usize, length: usize) -> Self {
        SourceLocation { line, column, length: length.max(1) }
    }
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub location: Option<SourceLocation>,
    pub notes: Vec<String>,
    pub code: Option<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Error,
            message: message.into(),
            location: None,
            notes: Vec::new(),
            code: None,
        }
    }

    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Render with ANSI colors, optionally showing a source snippet.
    pub fn display(&self, source: Option<&str>) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "{bold}{color}{severity}:{reset} {bold}{message}{reset}\n",
            bold = colors::BOLD,
            color = self.severity.color(),
            severity = self.severity.label(),
            reset = colors::RESET,
            message = self.message,
        ));

        if let Some(loc) = &self.location {
            output.push_str(&format!(
                "  {dim}-->{reset} {line}:{column}\n",
                dim = colors::DIM,
                reset = colors::RESET,
                line = loc.line,
                column = loc.column,
            ));

            if let Some(source) = source {
                output.push_str(&self.format_snippet(source, loc));
            }
        }

        if let Some(code) = &self.code {
            output.push_str(&format!("  {dim}[{code}]{reset}\n", dim = colors::DIM, reset = colors::RESET, code = code));
        }

        for note in &self.notes {
            output.push_str(&format!("  {cyan}note:{reset} {note}\n", cyan = colors::CYAN, reset = colors::RESET, note = note));
        }

        output
    }

    fn format_snippet(&self, source: &str, loc: &SourceLocation) -> String {
        let mut output = String::new();
        let lines: Vec<&str> = source.lines().collect();
        if loc.line == 0 || loc.line > lines.len() {
            return output;
        }

        let line_idx = loc.line - 1;
        let width = loc.line.to_string().len();

        output.push_str(&format!(
            "   {cyan}{:>width$} |{reset} {}\n",
            loc.line,
            lines[line_idx],
            cyan = colors::CYAN,
            reset = colors::RESET,
            width = width,
        ));

        let padding = " ".repeat(width + 3 + loc.column.saturating_sub(1));
        let underline = "^".repeat(loc.length.max(1));
        output.push_str(&format!(
            "   {dim}{:>width$} |{reset}{padding}{color}{underline}{reset}\n",
            "",
            dim = colors::DIM,
            reset = colors::RESET,
            width = width,
            padding = padding,
            color = self.severity.color(),
            underline = underline,
        ));

        output
    }
}
