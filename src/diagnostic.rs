use std::ops::Range;

use crate::span::Span;

/// A configuration error tied to a source span.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub message: String,
    pub span: Span,
    pub help: Option<String>,
}

impl Diagnostic {
    pub fn error(message: String, span: Span) -> Self {
        Self {
            message,
            span,
            help: None,
        }
    }

    pub fn with_help(mut self, help: String) -> Self {
        self.help = Some(help);
        self
    }

    fn report<'a>(
        &self,
        filename: &'a str,
        color: bool,
    ) -> ariadne::Report<'static, (&'a str, Range<usize>)> {
        use ariadne::{Color, Config, Label, Report, ReportKind};

        let mut report = Report::build(ReportKind::Error, filename, self.span.start as usize)
            .with_config(Config::default().with_color(color))
            .with_message(&self.message)
            .with_label(
                Label::new((filename, self.span.range()))
                    .with_message(&self.message)
                    .with_color(Color::Red),
            );

        if let Some(help) = &self.help {
            report = report.with_help(help);
        }

        report.finish()
    }

    /// Render the diagnostic to stderr using ariadne.
    pub fn render(&self, filename: &str, source: &str) {
        use ariadne::Source;

        let report = self.report(filename, true);
        if report.eprint((filename, Source::from(source))).is_err() {
            eprintln!("error: {}", self.message);
        }
    }

    /// Render without colors into a string.
    pub fn render_plain(&self, filename: &str, source: &str) -> String {
        use ariadne::Source;

        let mut buf = Vec::new();
        let report = self.report(filename, false);
        if report.write((filename, Source::from(source)), &mut buf).is_err() {
            return format!("error: {}", self.message);
        }
        String::from_utf8_lossy(&buf).into_owned()
    }
}
