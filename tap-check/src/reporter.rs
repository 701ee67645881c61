// Copyright (c) The tap-runner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Printing diagnostics.

use crate::output::ReportStyles;
use clap::ValueEnum;
use owo_colors::OwoColorize;
use std::io::{self, Write};
use tap_runner::diagnostic::{Diagnostic, Severity};

/// The format diagnostics are printed in.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum MessageFormat {
    /// Colored headings followed by indented details
    #[default]
    Human,
    /// One JSON object per line
    Json,
}

/// Counts of diagnostics by severity.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct DiagnosticCounts {
    pub(crate) errors: usize,
    pub(crate) warnings: usize,
}

impl DiagnosticCounts {
    pub(crate) fn new(diagnostics: &[Diagnostic]) -> Self {
        let mut counts = Self::default();
        for diagnostic in diagnostics {
            match diagnostic.severity {
                Severity::Error => counts.errors += 1,
                Severity::Warning => counts.warnings += 1,
            }
        }
        counts
    }
}

pub(crate) struct DiagnosticReporter {
    format: MessageFormat,
    styles: ReportStyles,
}

impl DiagnosticReporter {
    pub(crate) fn new(format: MessageFormat, styles: ReportStyles) -> Self {
        Self { format, styles }
    }

    /// Writes all diagnostics to `writer`, in order.
    pub(crate) fn write_diagnostics(
        &self,
        diagnostics: &[Diagnostic],
        mut writer: impl Write,
    ) -> io::Result<()> {
        for diagnostic in diagnostics {
            match self.format {
                MessageFormat::Human => self.write_human(diagnostic, &mut writer)?,
                MessageFormat::Json => {
                    serde_json::to_writer(&mut writer, diagnostic)?;
                    writeln!(writer)?;
                }
            }
        }
        writer.flush()
    }

    /// Writes a one-line summary. Only used for the human format.
    pub(crate) fn write_summary(
        &self,
        counts: DiagnosticCounts,
        mut writer: impl Write,
    ) -> io::Result<()> {
        if self.format != MessageFormat::Human {
            return Ok(());
        }
        writeln!(
            writer,
            "{}: {} {}, {} {}",
            "summary".style(self.styles.summary),
            counts.errors,
            plural(counts.errors, "error", "errors"),
            counts.warnings,
            plural(counts.warnings, "warning", "warnings"),
        )?;
        writer.flush()
    }

    fn write_human(&self, diagnostic: &Diagnostic, writer: &mut impl Write) -> io::Result<()> {
        let style = match diagnostic.severity {
            Severity::Error => self.styles.error,
            Severity::Warning => self.styles.warning,
        };
        writeln!(
            writer,
            "{}: {}",
            diagnostic.severity.style(style),
            diagnostic.summary.style(self.styles.summary),
        )?;
        for line in diagnostic.detail.trim_end().lines() {
            if line.is_empty() {
                writeln!(writer)?;
            } else {
                writeln!(writer, "  {line}")?;
            }
        }
        writeln!(writer)
    }
}

fn plural(count: usize, singular: &'static str, plural: &'static str) -> &'static str {
    if count == 1 { singular } else { plural }
}
