//! Run summary formatting.
//!
//! This module provides formatters that turn a [`RunSummary`] into JSON for
//! machines, plain text for terminals, or Markdown for reports.
//!
//! # Examples
//!
//! ```rust
//! use epi_rates::formatters::{HumanFormatter, SummaryFormatter};
//! use epi_rates::pipeline::RunSummary;
//!
//! fn print(summary: &RunSummary) -> epi_rates::prelude::Result<()> {
//!     println!("{}", HumanFormatter::new().format(summary)?);
//!     Ok(())
//! }
//! ```

use crate::pipeline::RunSummary;
use crate::prelude::*;
use std::fmt::Write;

/// Configuration options for formatting run summaries.
#[derive(Debug, Clone)]
pub struct FormatterConfig {
    /// Include the per-row rejection list
    pub include_rejections: bool,
    /// Maximum number of rejections to display (`None` for all)
    pub max_rejections: Option<usize>,
    /// Include unmatched and baseline-less states
    pub include_states: bool,
    /// Whether to use colorized output (for human formatter)
    pub use_colors: bool,
    /// Whether to include timestamps in output
    pub include_timestamps: bool,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            include_rejections: true,
            max_rejections: None,
            include_states: true,
            use_colors: true,
            include_timestamps: true,
        }
    }
}

impl FormatterConfig {
    /// Creates a minimal configuration showing only counts.
    pub fn minimal() -> Self {
        Self {
            include_rejections: false,
            max_rejections: Some(0),
            include_states: false,
            use_colors: false,
            include_timestamps: false,
        }
    }

    /// Creates a configuration suitable for CI/CD environments.
    pub fn ci() -> Self {
        Self {
            include_rejections: true,
            max_rejections: Some(50),
            include_states: true,
            use_colors: false,
            include_timestamps: true,
        }
    }

    /// Sets whether to include individual rejections.
    pub fn with_rejections(mut self, include: bool) -> Self {
        self.include_rejections = include;
        self
    }

    /// Sets the maximum number of rejections to display.
    pub fn with_max_rejections(mut self, max: Option<usize>) -> Self {
        self.max_rejections = max;
        self
    }

    /// Sets whether to use colorized output.
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    fn shown_rejections(&self, summary: &RunSummary) -> usize {
        if !self.include_rejections {
            return 0;
        }
        match self.max_rejections {
            Some(max) => max.min(summary.rejections.len()),
            None => summary.rejections.len(),
        }
    }
}

/// Trait for formatting run summaries into different output formats.
///
/// # Examples
///
/// ```rust
/// use epi_rates::formatters::SummaryFormatter;
/// use epi_rates::pipeline::RunSummary;
///
/// struct OneLine;
///
/// impl SummaryFormatter for OneLine {
///     fn format(&self, summary: &RunSummary) -> epi_rates::prelude::Result<String> {
///         Ok(format!("{} rows -> {}", summary.output_rows, summary.output.destination))
///     }
/// }
/// ```
pub trait SummaryFormatter {
    /// Formats a summary into a string representation.
    fn format(&self, summary: &RunSummary) -> Result<String>;

    /// Formats a summary with custom configuration.
    fn format_with_config(
        &self,
        summary: &RunSummary,
        _config: &FormatterConfig,
    ) -> Result<String> {
        self.format(summary)
    }
}

fn format_error(e: std::fmt::Error) -> EpiError {
    EpiError::Internal(format!("Failed to format summary: {e}"))
}

/// Formats run summaries as structured JSON.
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    config: FormatterConfig,
    pretty: bool,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self {
            config: FormatterConfig::default(),
            pretty: true,
        }
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self {
            config,
            pretty: true,
        }
    }

    /// Sets whether to use pretty-printed JSON.
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl SummaryFormatter for JsonFormatter {
    fn format(&self, summary: &RunSummary) -> Result<String> {
        self.format_with_config(summary, &self.config)
    }

    fn format_with_config(&self, summary: &RunSummary, config: &FormatterConfig) -> Result<String> {
        let mut filtered = summary.clone();
        filtered.rejections.truncate(config.shown_rejections(summary));
        if !config.include_states {
            filtered.unmatched_states.clear();
            filtered.states_without_baseline.clear();
        }

        let json = if self.pretty {
            serde_json::to_string_pretty(&filtered)
        } else {
            serde_json::to_string(&filtered)
        };
        json.map_err(|e| EpiError::Internal(format!("Failed to serialize summary to JSON: {e}")))
    }
}

/// Formats run summaries for console output.
#[derive(Debug, Clone, Default)]
pub struct HumanFormatter {
    config: FormatterConfig,
}

impl HumanFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self { config }
    }

    fn paint(&self, config: &FormatterConfig, color: &str, text: &str) -> String {
        if config.use_colors {
            format!("\x1b[{color}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    fn render(
        &self,
        summary: &RunSummary,
        config: &FormatterConfig,
        output: &mut String,
    ) -> std::fmt::Result {
        writeln!(output)?;
        if summary.is_clean() {
            writeln!(output, "{}", self.paint(config, "32", "Run COMPLETE"))?;
        } else {
            writeln!(
                output,
                "{}",
                self.paint(config, "33", "Run COMPLETE with dropped rows")
            )?;
        }
        writeln!(output)?;
        if config.include_timestamps {
            writeln!(output, "Started: {}", summary.started_at)?;
        }
        writeln!(output, "Elapsed: {}ms", summary.elapsed_ms)?;
        writeln!(output, "Output: {}", summary.output.destination)?;
        writeln!(output, "SHA-256: {}", summary.output.sha256)?;

        writeln!(output)?;
        writeln!(output, "Counts:")?;
        writeln!(output, "   Case records: {}", summary.case_records)?;
        writeln!(output, "   Demographic records: {}", summary.demographic_records)?;
        writeln!(output, "   States with baseline: {}", summary.baselines)?;
        writeln!(output, "   Output rows: {}", summary.output_rows)?;
        let rejected = format!(
            "{} (unknown state {}, invalid population {})",
            summary.rejected_rows(),
            summary.rejected_unknown_state,
            summary.rejected_invalid_population
        );
        if summary.rejected_rows() > 0 {
            writeln!(output, "   Rejected: {}", self.paint(config, "31", &rejected))?;
        } else {
            writeln!(output, "   Rejected: {rejected}")?;
        }

        if config.include_states {
            if !summary.unmatched_states.is_empty() {
                writeln!(
                    output,
                    "   Not in demographics: {}",
                    summary.unmatched_states.join(", ")
                )?;
            }
            if !summary.states_without_baseline.is_empty() {
                writeln!(
                    output,
                    "   Without baseline: {}",
                    summary.states_without_baseline.join(", ")
                )?;
            }
        }

        let shown = config.shown_rejections(summary);
        if shown > 0 {
            writeln!(output)?;
            writeln!(output, "Rejections:")?;
            for rejection in &summary.rejections[..shown] {
                writeln!(
                    output,
                    "   {} {}: {}",
                    rejection.code, rejection.date, rejection.reason
                )?;
            }
            if summary.rejections.len() > shown {
                writeln!(
                    output,
                    "   ... and {} more rejections",
                    summary.rejections.len() - shown
                )?;
            }
        }
        writeln!(output)
    }
}

impl SummaryFormatter for HumanFormatter {
    fn format(&self, summary: &RunSummary) -> Result<String> {
        self.format_with_config(summary, &self.config)
    }

    fn format_with_config(&self, summary: &RunSummary, config: &FormatterConfig) -> Result<String> {
        let mut output = String::new();
        self.render(summary, config, &mut output)
            .map_err(format_error)?;
        Ok(output)
    }
}

/// Formats run summaries as Markdown.
#[derive(Debug, Clone)]
pub struct MarkdownFormatter {
    config: FormatterConfig,
    heading_level: u8,
}

impl MarkdownFormatter {
    pub fn new() -> Self {
        Self {
            config: FormatterConfig::default(),
            heading_level: 2,
        }
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self {
            config,
            heading_level: 2,
        }
    }

    /// Sets the base heading level for the output.
    pub fn with_heading_level(mut self, level: u8) -> Self {
        self.heading_level = level.clamp(1, 5);
        self
    }

    fn render(
        &self,
        summary: &RunSummary,
        config: &FormatterConfig,
        output: &mut String,
    ) -> std::fmt::Result {
        let h = "#".repeat(self.heading_level as usize);

        writeln!(output, "{h} Metrics run")?;
        writeln!(output)?;
        if config.include_timestamps {
            writeln!(output, "**Started:** {}  ", summary.started_at)?;
        }
        writeln!(output, "**Output:** `{}`  ", summary.output.destination)?;
        writeln!(output, "**SHA-256:** `{}`", summary.output.sha256)?;
        writeln!(output)?;

        writeln!(output, "{h}# Counts")?;
        writeln!(output)?;
        writeln!(output, "| Measure | Value |")?;
        writeln!(output, "|---------|-------|")?;
        writeln!(output, "| Case records | {} |", summary.case_records)?;
        writeln!(output, "| Demographic records | {} |", summary.demographic_records)?;
        writeln!(output, "| States with baseline | {} |", summary.baselines)?;
        writeln!(output, "| Output rows | {} |", summary.output_rows)?;
        writeln!(
            output,
            "| Rejected: unknown state | {} |",
            summary.rejected_unknown_state
        )?;
        writeln!(
            output,
            "| Rejected: invalid population | {} |",
            summary.rejected_invalid_population
        )?;
        writeln!(output, "| Elapsed (ms) | {} |", summary.elapsed_ms)?;

        if config.include_states
            && !(summary.unmatched_states.is_empty() && summary.states_without_baseline.is_empty())
        {
            writeln!(output)?;
            writeln!(output, "{h}# States")?;
            writeln!(output)?;
            if !summary.unmatched_states.is_empty() {
                writeln!(
                    output,
                    "- Not in demographics: {}",
                    summary.unmatched_states.join(", ")
                )?;
            }
            if !summary.states_without_baseline.is_empty() {
                writeln!(
                    output,
                    "- Without baseline: {}",
                    summary.states_without_baseline.join(", ")
                )?;
            }
        }

        let shown = config.shown_rejections(summary);
        if shown > 0 {
            writeln!(output)?;
            writeln!(output, "{h}# Rejections")?;
            writeln!(output)?;
            writeln!(output, "| Code | Date | Reason |")?;
            writeln!(output, "|------|------|--------|")?;
            for rejection in &summary.rejections[..shown] {
                writeln!(
                    output,
                    "| `{}` | {} | {} |",
                    rejection.code,
                    rejection.date,
                    rejection.reason.replace('|', "\\|")
                )?;
            }
            if summary.rejections.len() > shown {
                writeln!(output)?;
                writeln!(
                    output,
                    "_{} more rejections not shown._",
                    summary.rejections.len() - shown
                )?;
            }
        }
        Ok(())
    }
}

impl Default for MarkdownFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl SummaryFormatter for MarkdownFormatter {
    fn format(&self, summary: &RunSummary) -> Result<String> {
        self.format_with_config(summary, &self.config)
    }

    fn format_with_config(&self, summary: &RunSummary, config: &FormatterConfig) -> Result<String> {
        let mut output = String::new();
        self.render(summary, config, &mut output)
            .map_err(format_error)?;
        Ok(output)
    }
}
