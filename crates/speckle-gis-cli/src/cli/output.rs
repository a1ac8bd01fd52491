//! Output formatting for the Speckle GIS CLI
//!
//! Every command result renders as JSON, YAML or a colored human-readable
//! table. Log entries collected while a command ran are shown with
//! level-based coloring.

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use serde_json::Value as JsonValue;
use speckle_gis_core::{
    FieldReport, FieldSource, Flattened, LogEntry, LogLevel, OutputRecord, SkippedBranch,
};
use speckle_gis_project::{StreamRef, SurveyPoint};
use std::io::{self, Write};

use crate::error::{CliError, Result};
use crate::patch::{PatchedFile, ReleaseTag};

/// Output format options for CLI results
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Default)]
pub enum OutputFormat {
    /// Human-readable table format with colors
    #[default]
    Table,
    /// JSON format for machine processing
    Json,
    /// YAML format
    Yaml,
}

/// Print a serializable value as JSON or YAML. Returns `false` for table
/// output, which each result type renders itself.
fn render_structured<T: Serialize>(value: &T, format: OutputFormat) -> Result<bool> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)
                .map_err(|e| CliError::SerializationError(e.to_string()))?;
            println!("{}", json);
            Ok(true)
        }
        OutputFormat::Yaml => {
            let yaml = serde_yaml::to_string(value)
                .map_err(|e| CliError::SerializationError(e.to_string()))?;
            println!("{}", yaml);
            Ok(true)
        }
        OutputFormat::Table => Ok(false),
    }
}

fn header(stdout: &mut io::Stdout, title: &str) {
    writeln!(stdout).ok();
    writeln!(stdout, "{}", title.cyan().bold()).ok();
    writeln!(stdout, "{}", "=".repeat(60)).ok();
}

fn render_log_entries(stdout: &mut io::Stdout, entries: &[LogEntry]) {
    if entries.is_empty() {
        return;
    }
    writeln!(stdout).ok();
    writeln!(stdout, "{}", "Messages:".cyan().bold()).ok();
    for entry in entries {
        let label = match entry.level {
            LogLevel::Error => "ERROR".red().bold(),
            LogLevel::Warning => "WARNING".yellow().bold(),
            LogLevel::Info => "INFO".blue().bold(),
        };
        writeln!(
            stdout,
            "  {} {} {}",
            label,
            format!("[{}]", entry.origin).dimmed(),
            entry.message
        )
        .ok();
    }
}

fn display_value(value: &Option<speckle_gis_core::FieldValue>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "NULL".to_string(),
    }
}

/// One assembled (or skipped) source record
#[derive(Debug, Clone, Serialize)]
pub struct RecordOutput {
    /// Position in the input file
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<OutputRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FieldReport>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of reconciling a batch of records against a schema
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileOutput {
    pub assembled: usize,
    pub skipped: usize,
    pub records: Vec<RecordOutput>,
    pub messages: Vec<LogEntry>,
    pub summary: String,
}

impl ReconcileOutput {
    pub fn new(records: Vec<RecordOutput>, messages: Vec<LogEntry>) -> Self {
        let skipped = records.iter().filter(|r| r.error.is_some()).count();
        let assembled = records.len() - skipped;
        let warnings = messages
            .iter()
            .filter(|m| m.level >= LogLevel::Warning)
            .count();

        let summary = match (skipped, warnings) {
            (0, 0) => format!("{} record(s) assembled", assembled),
            (0, w) => format!("{} record(s) assembled with {} warning(s)", assembled, w),
            (s, w) => format!(
                "{} record(s) assembled, {} skipped, {} warning(s)",
                assembled, s, w
            ),
        };

        Self {
            assembled,
            skipped,
            records,
            messages,
            summary,
        }
    }

    pub fn has_warnings(&self) -> bool {
        self.messages.iter().any(|m| m.level >= LogLevel::Warning)
    }

    pub fn render(&self, format: OutputFormat) -> Result<()> {
        if render_structured(self, format)? {
            return Ok(());
        }

        let mut stdout = io::stdout();
        header(&mut stdout, "Reconciled Records");

        for record in &self.records {
            writeln!(stdout).ok();
            let id = record.identity.as_deref().unwrap_or("-");
            match &record.error {
                Some(error) => {
                    writeln!(stdout, "{} #{} {} {}", "x".red(), record.index, id.dimmed(), error.red()).ok();
                }
                None => {
                    writeln!(stdout, "{} #{} {}", "+".green(), record.index, id.bold()).ok();
                }
            }

            if let Some(values) = &record.values {
                let width = values.keys().map(|k| k.len()).max().unwrap_or(0);
                for (name, value) in values {
                    let rendered = display_value(value);
                    let rendered = if value.is_none() {
                        rendered.dimmed()
                    } else {
                        rendered.normal()
                    };
                    let rule = record
                        .fields
                        .as_ref()
                        .and_then(|fields| fields.iter().find(|f| &f.name == name))
                        .map(describe_report)
                        .unwrap_or_default();
                    writeln!(stdout, "  {:width$}  {} {}", name, rendered, rule.dimmed(), width = width).ok();
                }
            }
        }

        render_log_entries(&mut stdout, &self.messages);

        writeln!(stdout).ok();
        let icon = if self.skipped > 0 {
            "x".red()
        } else if self.has_warnings() {
            "!".yellow()
        } else {
            "+".green()
        };
        writeln!(stdout, "{} {}", icon, self.summary).ok();
        stdout.flush().ok();
        Ok(())
    }
}

fn describe_report(report: &FieldReport) -> String {
    let source = match &report.source {
        FieldSource::Identity => "identity".to_string(),
        FieldSource::Direct => "direct".to_string(),
        FieldSource::Flattened { root } => format!("from {}", root),
        FieldSource::Missing => "missing".to_string(),
    };
    match &report.rule {
        Some(rule) => format!("({}, {:?})", source, rule),
        None => format!("({}, failed)", source),
    }
}

/// One flattened key
#[derive(Debug, Clone, Serialize)]
pub struct FlatFieldOutput {
    pub key: String,
    #[serde(rename = "type")]
    pub tag: String,
    pub value: JsonValue,
}

/// Result of flattening one nested value
#[derive(Debug, Clone, Serialize)]
pub struct FlattenOutput {
    pub root: String,
    pub fields: Vec<FlatFieldOutput>,
    pub skipped: Vec<SkippedBranch>,
    pub messages: Vec<LogEntry>,
}

impl FlattenOutput {
    pub fn new(root: &str, flattened: &Flattened, messages: Vec<LogEntry>) -> Self {
        let fields = flattened
            .values
            .iter()
            .map(|(key, value)| FlatFieldOutput {
                key: key.clone(),
                tag: flattened
                    .tags
                    .get(key)
                    .map(|t| t.to_string())
                    .unwrap_or_default(),
                value: value.to_json(),
            })
            .collect();
        Self {
            root: root.to_string(),
            fields,
            skipped: flattened.skipped.clone(),
            messages,
        }
    }

    pub fn render(&self, format: OutputFormat) -> Result<()> {
        if render_structured(self, format)? {
            return Ok(());
        }

        let mut stdout = io::stdout();
        header(&mut stdout, &format!("Flattened \"{}\"", self.root));
        writeln!(stdout).ok();

        let width = self.fields.iter().map(|f| f.key.len()).max().unwrap_or(0);
        for field in &self.fields {
            writeln!(
                stdout,
                "  {:width$}  {:5}  {}",
                field.key,
                field.tag.cyan(),
                field.value,
                width = width
            )
            .ok();
        }

        for branch in &self.skipped {
            writeln!(stdout, "  {} {} {}", "!".yellow(), branch.path, branch.reason.dimmed()).ok();
        }

        render_log_entries(&mut stdout, &self.messages);
        stdout.flush().ok();
        Ok(())
    }
}

/// Natural field type of one attribute
#[derive(Debug, Clone, Serialize)]
pub struct ClassifiedOutput {
    pub name: String,
    pub kind: String,
    #[serde(rename = "type")]
    pub tag: String,
}

/// Result of classifying the attributes of one record
#[derive(Debug, Clone, Serialize)]
pub struct ClassifyOutput {
    pub attributes: Vec<ClassifiedOutput>,
}

impl ClassifyOutput {
    pub fn render(&self, format: OutputFormat) -> Result<()> {
        if render_structured(self, format)? {
            return Ok(());
        }

        let mut stdout = io::stdout();
        header(&mut stdout, "Attribute Types");
        writeln!(stdout).ok();
        let width = self.attributes.iter().map(|a| a.name.len()).max().unwrap_or(0);
        for attribute in &self.attributes {
            writeln!(
                stdout,
                "  {:width$}  {:7}  {}",
                attribute.name,
                attribute.kind.dimmed(),
                attribute.tag.cyan(),
                width = width
            )
            .ok();
        }
        stdout.flush().ok();
        Ok(())
    }
}

/// Extrusion height of one feature
#[derive(Debug, Clone, Serialize)]
pub struct HeightOutput {
    pub index: usize,
    pub height: Option<f64>,
}

/// Result of resolving heights for a layer
#[derive(Debug, Clone, Serialize)]
pub struct HeightsOutput {
    pub layer: String,
    pub heights: Vec<HeightOutput>,
    pub messages: Vec<LogEntry>,
}

impl HeightsOutput {
    pub fn render(&self, format: OutputFormat) -> Result<()> {
        if render_structured(self, format)? {
            return Ok(());
        }

        let mut stdout = io::stdout();
        header(&mut stdout, &format!("Extrusion Heights: {}", self.layer));
        writeln!(stdout).ok();
        for item in &self.heights {
            let height = match item.height {
                Some(h) => h.to_string().normal(),
                None => "flat".dimmed(),
            };
            writeln!(stdout, "  #{:<4} {}", item.index, height).ok();
        }
        render_log_entries(&mut stdout, &self.messages);
        stdout.flush().ok();
        Ok(())
    }
}

/// Survey point and the CRS derived from it
#[derive(Debug, Clone, Serialize)]
pub struct SurveyPointOutput {
    pub lat: f64,
    pub lon: f64,
    pub crs: String,
}

impl From<&SurveyPoint> for SurveyPointOutput {
    fn from(point: &SurveyPoint) -> Self {
        Self {
            lat: point.lat,
            lon: point.lon,
            crs: point.custom_crs(),
        }
    }
}

/// Project settings after a project command
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProjectOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub streams: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layers: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub survey_point: Option<SurveyPointOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub messages: Vec<LogEntry>,
}

impl ProjectOutput {
    pub fn with_streams(mut self, streams: &[StreamRef]) -> Self {
        self.streams = Some(streams.iter().map(StreamRef::to_string).collect());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn render(&self, format: OutputFormat) -> Result<()> {
        if render_structured(self, format)? {
            return Ok(());
        }

        let mut stdout = io::stdout();
        header(&mut stdout, "Project Settings");

        if let Some(message) = &self.message {
            writeln!(stdout).ok();
            writeln!(stdout, "{} {}", "+".green(), message).ok();
        }

        if let Some(streams) = &self.streams {
            writeln!(stdout).ok();
            writeln!(stdout, "{}", "Streams:".cyan().bold()).ok();
            if streams.is_empty() {
                writeln!(stdout, "  {}", "(none)".dimmed()).ok();
            }
            for (i, stream) in streams.iter().enumerate() {
                writeln!(stdout, "  {}. {}", i + 1, stream).ok();
            }
        }

        if let Some(layers) = &self.layers {
            writeln!(stdout).ok();
            writeln!(stdout, "{}", "Layers:".cyan().bold()).ok();
            if layers.is_empty() {
                writeln!(stdout, "  {}", "(none)".dimmed()).ok();
            }
            for layer in layers {
                writeln!(stdout, "  {}", layer).ok();
            }
        }

        if let Some(point) = &self.survey_point {
            writeln!(stdout).ok();
            writeln!(stdout, "{}", "Survey point:".cyan().bold()).ok();
            writeln!(stdout, "  {} {}", "Lat:".dimmed(), point.lat).ok();
            writeln!(stdout, "  {} {}", "Lon:".dimmed(), point.lon).ok();
            writeln!(stdout, "  {} {}", "CRS:".dimmed(), point.crs).ok();
        }

        render_log_entries(&mut stdout, &self.messages);
        stdout.flush().ok();
        Ok(())
    }
}

/// Result of stamping a release tag
#[derive(Debug, Clone, Serialize)]
pub struct PatchOutput {
    pub tag: String,
    pub version: String,
    pub files: Vec<PatchedFile>,
}

impl PatchOutput {
    pub fn new(tag: &ReleaseTag, files: Vec<PatchedFile>) -> Self {
        Self {
            tag: tag.tag().to_string(),
            version: tag.version().to_string(),
            files,
        }
    }

    pub fn render(&self, format: OutputFormat) -> Result<()> {
        if render_structured(self, format)? {
            return Ok(());
        }

        let mut stdout = io::stdout();
        header(&mut stdout, &format!("Release {}", self.tag));
        writeln!(stdout).ok();
        for file in &self.files {
            let icon = if file.lines_changed > 0 {
                "+".green()
            } else {
                "-".dimmed()
            };
            writeln!(
                stdout,
                "{} {} {}",
                icon,
                file.path.display(),
                format!("({} line(s))", file.lines_changed).dimmed()
            )
            .ok();
        }
        stdout.flush().ok();
        Ok(())
    }
}
