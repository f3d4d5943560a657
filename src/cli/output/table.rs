//! Table output formatting for CLI commands
//!
//! Renders reports and injected changes using comfy-table.

use crate::domain::models::{InjectedChange, Report, Tag};
use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use std::env;

/// Table formatter for CLI output
pub struct TableFormatter {
    /// Whether to use colors in output
    use_colors: bool,
    /// Maximum width for tables (None = auto)
    max_width: Option<u16>,
}

impl TableFormatter {
    /// Create a new table formatter
    pub fn new() -> Self {
        Self {
            use_colors: supports_color(),
            max_width: None,
        }
    }

    /// Create a new table formatter with custom settings
    pub const fn with_config(use_colors: bool, max_width: Option<u16>) -> Self {
        Self {
            use_colors,
            max_width,
        }
    }

    /// Format tagged reports, one row per root fix
    pub fn format_reports(&self, reports: &[Report]) -> String {
        let mut table = self.create_base_table();

        table.set_header(vec![
            Cell::new("Root").add_attribute(Attribute::Bold),
            Cell::new("Tree").add_attribute(Attribute::Bold),
            Cell::new("Local").add_attribute(Attribute::Bold),
            Cell::new("Lower").add_attribute(Attribute::Bold),
            Cell::new("Upper").add_attribute(Attribute::Bold),
            Cell::new("Depth").add_attribute(Attribute::Bold),
            Cell::new("Tag").add_attribute(Attribute::Bold),
        ]);

        for report in reports {
            let tag_cell = if self.use_colors {
                Cell::new(report.tag.to_string()).fg(tag_color(report.tag))
            } else {
                Cell::new(format!("{} {}", tag_icon(report.tag), report.tag))
            };

            table.add_row(vec![
                Cell::new(report.root.location.to_string()),
                Cell::new(report.tree.len()),
                Cell::new(report.local_effect),
                Cell::new(report.lower_bound),
                Cell::new(report.upper_bound),
                Cell::new(if report.bailed_out {
                    format!("{} (bailout)", report.depth)
                } else {
                    report.depth.to_string()
                }),
                tag_cell,
            ]);
        }

        table.to_string()
    }

    /// Format the injection log
    pub fn format_injected(&self, injected: &[InjectedChange]) -> String {
        let mut table = self.create_base_table();

        table.set_header(vec![
            Cell::new("Phase").add_attribute(Attribute::Bold),
            Cell::new("Location").add_attribute(Attribute::Bold),
            Cell::new("Annotation").add_attribute(Attribute::Bold),
        ]);

        for entry in injected {
            let annotation = match &entry.change.argument {
                Some(argument) => format!("@{}(\"{argument}\")", entry.change.annotation),
                None => format!("@{}", entry.change.annotation),
            };
            table.add_row(vec![
                Cell::new(entry.phase.to_string()),
                Cell::new(entry.change.location.to_string()),
                Cell::new(annotation),
            ]);
        }

        table.to_string()
    }

    /// Create a base table with common settings
    fn create_base_table(&self) -> Table {
        let mut table = Table::new();

        table
            .load_preset(presets::UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);

        if let Some(width) = self.max_width {
            table.set_width(width);
        }

        table
    }
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self::new()
    }
}

/// Check if color output is supported
fn supports_color() -> bool {
    // Respect NO_COLOR environment variable
    if env::var("NO_COLOR").is_ok() {
        return false;
    }
    console::colors_enabled()
}

const fn tag_color(tag: Tag) -> Color {
    match tag {
        Tag::Approve => Color::Green,
        Tag::Reject => Color::DarkGrey,
    }
}

const fn tag_icon(tag: Tag) -> &'static str {
    match tag {
        Tag::Approve => "✓",
        Tag::Reject => "✗",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{CandidateFix, Change, DeclLocation, InjectionPhase};

    #[test]
    fn test_format_reports_without_colors() {
        let formatter = TableFormatter::with_config(false, Some(160));
        let mut report = Report::new(CandidateFix::new(DeclLocation::method("a.Repo", "find()"), "X"))
            .with_tag(Tag::Approve);
        report.local_effect = -5;

        let rendered = formatter.format_reports(&[report]);
        assert!(rendered.contains("a.Repo#find()"));
        assert!(rendered.contains("-5"));
        assert!(rendered.contains("✓ APPROVE"));
    }

    #[test]
    fn test_format_injected_shows_arguments() {
        let formatter = TableFormatter::with_config(false, Some(160));
        let entry = InjectedChange::now(
            InjectionPhase::ForceResolve,
            Change::with_argument(DeclLocation::field("a.B", "f"), "SuppressWarnings", "NullAway"),
        );
        let rendered = formatter.format_injected(&[entry]);
        assert!(rendered.contains("@SuppressWarnings(\"NullAway\")"));
        assert!(rendered.contains("force resolve"));
    }
}
