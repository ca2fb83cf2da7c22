use tower_lsp::lsp_types::{self, Position, Range};

use crate::text::position_to_byte_offset;

/// A diagnostic in the coordinate space of whichever buffer produced it.
///
/// Dialect syntax errors are born in dialect coordinates. Verifier
/// diagnostics are born in host coordinates and stay there until the
/// mapper moves them onto the dialect buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub range: Range,
    pub message: String,
    pub severity: Severity,
    pub origin: Origin,
}

/// Both toolchains only ever report errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Error,
}

/// Which toolchain reported the diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    /// The dialect compiler (syntax errors).
    Compiler,
    /// The host-language verifier (type errors).
    Verifier,
}

impl Origin {
    pub fn label(self) -> &'static str {
        match self {
            Origin::Compiler => "coffee",
            Origin::Verifier => "tsc",
        }
    }
}

impl Diagnostic {
    pub fn error(message: String, range: Range, origin: Origin) -> Self {
        Self {
            range,
            message,
            severity: Severity::Error,
            origin,
        }
    }

    /// Convert to the LSP wire representation.
    pub fn to_lsp(&self) -> lsp_types::Diagnostic {
        let severity = match self.severity {
            Severity::Error => lsp_types::DiagnosticSeverity::ERROR,
        };
        lsp_types::Diagnostic {
            range: self.range,
            severity: Some(severity),
            source: Some(format!("brewline ({})", self.origin.label())),
            message: self.message.clone(),
            ..Default::default()
        }
    }

    /// Render the diagnostic to stderr using ariadne.
    pub fn render(&self, filename: &str, source: &str) -> std::io::Result<()> {
        use ariadne::{Color, Label, Report, ReportKind, Source};

        let (kind, color) = match self.severity {
            Severity::Error => (ReportKind::Error, Color::Red),
        };

        let (start, end) = byte_span(source, self.range);
        Report::build(kind, filename, start)
            .with_message(&self.message)
            .with_label(
                Label::new((filename, start..end))
                    .with_message(self.origin.label())
                    .with_color(color),
            )
            .finish()
            .eprint((filename, Source::from(source)))
    }
}

/// Byte span of `range` inside `source`, clamped to the text.
fn byte_span(source: &str, range: Range) -> (usize, usize) {
    let clamp = |pos: Position| position_to_byte_offset(source, pos).unwrap_or(source.len());
    let start = clamp(range.start);
    let end = clamp(range.end).max(start);
    (start, end)
}

/// Render a list of diagnostics.
pub fn render_diagnostics(
    diagnostics: &[Diagnostic],
    filename: &str,
    source: &str,
) -> std::io::Result<()> {
    for diag in diagnostics {
        diag.render(filename, source)?;
    }
    Ok(())
}
