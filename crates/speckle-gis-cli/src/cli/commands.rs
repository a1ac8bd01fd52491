//! CLI command definitions for the Speckle GIS tools
//!
//! Provides Clap-based commands for reconciling Speckle records against a
//! feature schema, inspecting nested attributes, managing project settings
//! and stamping release versions.

use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::Value as JsonValue;
use speckle_gis_core::{
    classify, AttributeValue, Flattener, HeightResolver, JsonSourceRecord, LayerContext,
    LogEntry, LogLevel, LogSink, MemorySink, RecordAssembler, ReconcileConfig, Schema,
    SourceRecord, TracingSink,
};
use speckle_gis_project::{
    FileProjectTable, LayerRef, ProjectSettings, StreamQuery, StreamRef,
};
use std::path::{Path, PathBuf};

use super::output::{
    ClassifiedOutput, ClassifyOutput, FlattenOutput, HeightOutput, HeightsOutput, OutputFormat,
    PatchOutput, ProjectOutput, ReconcileOutput, RecordOutput, SurveyPointOutput,
};
use super::ExitCode;
use crate::error::{CliError, Result};
use crate::patch::{patch_release, PatchTargets, ReleaseTag};

/// Speckle GIS CLI
///
/// Reconcile Speckle object attributes with GIS feature schemas, manage
/// per-project Speckle settings and prepare releases.
#[derive(Parser, Debug)]
#[command(name = "speckle-gis")]
#[command(about = "Speckle GIS connector tools", long_about = None)]
#[command(version)]
pub struct GisCli {
    /// Output verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: GisCommands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum GisCommands {
    /// Build feature records for a schema from Speckle objects
    ///
    /// Reads a JSON or YAML file holding one object or a list of objects,
    /// and produces one record per object with every schema field filled.
    Reconcile {
        /// Path to the target schema (JSON, YAML or TOML)
        #[arg(short, long)]
        schema: PathBuf,

        /// Path to the source records (JSON or YAML)
        #[arg(short, long)]
        records: PathBuf,

        /// Path to reconciliation settings (optional)
        #[arg(short, long, env = "SPECKLE_GIS_CONFIG")]
        config: Option<PathBuf>,

        /// Output format for the assembled records
        #[arg(long, value_enum, default_value = "table")]
        format: Option<OutputFormat>,

        /// Include how each field was filled
        #[arg(long)]
        report: bool,
    },

    /// Report the natural field type of each attribute of an object
    Classify {
        /// Path to a JSON or YAML object
        #[arg(short, long)]
        input: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: Option<OutputFormat>,
    },

    /// Expand a nested attribute value into flat keys
    Flatten {
        /// Path to the JSON or YAML value to flatten
        #[arg(short, long)]
        input: PathBuf,

        /// Root name prefixed to every key
        #[arg(long)]
        root: String,

        /// Path to reconciliation settings (optional)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: Option<OutputFormat>,
    },

    /// Resolve polygon extrusion heights for the features of a layer
    Heights {
        /// Path to the layer's features (JSON or YAML list of objects)
        #[arg(short, long)]
        records: PathBuf,

        /// Layer name
        #[arg(short, long)]
        layer: String,

        /// Saved transform, e.g. "Buildings ('height')  ->  Extrude polygons by selected attribute"
        #[arg(short, long = "transform")]
        transforms: Vec<String>,

        /// The layer uses a geographic coordinate system
        #[arg(long)]
        geographic: bool,

        /// Seed for estimated heights
        #[arg(long)]
        seed: Option<u64>,

        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: Option<OutputFormat>,
    },

    /// Read or change the Speckle settings of a GIS project
    Project {
        /// Path to the GIS project file
        #[arg(short, long)]
        project: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value = "table", global = true)]
        format: Option<OutputFormat>,

        #[command(subcommand)]
        command: ProjectCommands,
    },

    /// Stamp a release tag into installer and packaging files
    PatchVersion {
        /// Release tag, e.g. 2.14.1 or 2.14.1-beta
        tag: String,

        /// Repository root
        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// TOML file overriding the patched file paths
        #[arg(long)]
        targets: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: Option<OutputFormat>,
    },
}

/// Project settings commands
#[derive(Subcommand, Debug, Clone)]
pub enum ProjectCommands {
    /// List saved streams, most recent first
    Streams,

    /// Save a stream URL, moving it to the front of the list
    AddStream {
        /// Stream, branch, commit or object URL
        url: String,
    },

    /// Forget a saved stream
    RemoveStream {
        /// Any URL of the stream
        url: String,
    },

    /// List the saved layer selection
    Layers,

    /// Replace the saved layer selection
    SetLayers {
        /// Layer data sources
        #[arg(required = true)]
        sources: Vec<String>,
    },

    /// Show the survey point and its CRS
    SurveyPoint,

    /// Set the survey point
    SetSurveyPoint {
        /// Latitude in degrees
        #[arg(allow_hyphen_values = true)]
        lat: String,

        /// Longitude in degrees
        #[arg(allow_hyphen_values = true)]
        lon: String,
    },
}

/// Forwards messages to tracing and keeps them for the command output
#[derive(Debug, Default)]
struct CommandSink {
    memory: MemorySink,
}

impl CommandSink {
    fn entries(&self) -> Vec<LogEntry> {
        self.memory.entries()
    }
}

impl LogSink for CommandSink {
    fn log(&self, message: &str, level: LogLevel, origin: &str) {
        TracingSink.log(message, level, origin);
        self.memory.log(message, level, origin);
    }
}

/// Parse a JSON or YAML document based on its extension
pub fn load_document(path: &Path) -> Result<JsonValue> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        CliError::file_error(format!("Failed to read '{}': {}", path.display(), e))
    })?;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        "yaml" | "yml" => Ok(serde_yaml::from_str(&content)?),
        _ => Ok(serde_json::from_str(&content)?),
    }
}

fn load_config(path: Option<&Path>) -> Result<ReconcileConfig> {
    let config = match path {
        Some(path) => ReconcileConfig::from_file(path)?,
        None => ReconcileConfig::default(),
    };
    Ok(config.with_env()?)
}

/// A single object is treated as a one-element list
fn into_items(document: JsonValue) -> Vec<JsonValue> {
    match document {
        JsonValue::Array(items) => items,
        other => vec![other],
    }
}

/// Execute the reconcile command
pub fn execute_reconcile(
    schema: PathBuf,
    records: PathBuf,
    config: Option<PathBuf>,
    format: Option<OutputFormat>,
    report: bool,
) -> Result<ExitCode> {
    let config = load_config(config.as_deref())?;
    let schema = Schema::from_file(&schema)?;
    let items = into_items(load_document(&records)?);

    tracing::info!(fields = schema.len(), records = items.len(), "Reconciling records");

    let sink = CommandSink::default();
    let assembler = RecordAssembler::new(&config, &sink);

    let mut outputs = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let Some(source) = JsonSourceRecord::from_value(item) else {
            outputs.push(RecordOutput {
                index,
                identity: None,
                values: None,
                fields: None,
                error: Some("Source record is not an object".to_string()),
            });
            continue;
        };
        let source = source.with_sentinels(config.null_sentinels.clone());
        let identity = source.identity().ok();

        let output = match assembler.assemble_with_report(&schema, &source) {
            Ok(assembly) => RecordOutput {
                index,
                identity,
                values: Some(assembly.record),
                fields: report.then_some(assembly.fields),
                error: None,
            },
            Err(e) => RecordOutput {
                index,
                identity,
                values: None,
                fields: None,
                error: Some(e.to_string()),
            },
        };
        outputs.push(output);
    }

    let output = ReconcileOutput::new(outputs, sink.entries());
    output.render(format.unwrap_or_default())?;

    Ok(ExitCode::from_run_result(output.skipped > 0, output.has_warnings()))
}

/// Execute the classify command
pub fn execute_classify(input: PathBuf, format: Option<OutputFormat>) -> Result<ExitCode> {
    let document = load_document(&input)?;
    let JsonValue::Object(object) = document else {
        return Err(CliError::invalid_input(format!(
            "'{}' does not hold an object",
            input.display()
        )));
    };

    let attributes = object
        .iter()
        .map(|(name, value)| {
            let value = AttributeValue::from(value);
            ClassifiedOutput {
                name: name.clone(),
                kind: value.kind().to_string(),
                tag: classify(&value).to_string(),
            }
        })
        .collect();

    ClassifyOutput { attributes }.render(format.unwrap_or_default())?;
    Ok(ExitCode::Success)
}

/// Execute the flatten command
pub fn execute_flatten(
    input: PathBuf,
    root: String,
    config: Option<PathBuf>,
    format: Option<OutputFormat>,
) -> Result<ExitCode> {
    if root.is_empty() {
        return Err(CliError::invalid_input("Root name must not be empty"));
    }

    let config = load_config(config.as_deref())?;
    let document = load_document(&input)?;
    let value = AttributeValue::from_json_with_sentinels(&document, &config.null_sentinels);

    let sink = CommandSink::default();
    let flattened = Flattener::new(config.max_flatten_depth).flatten(&root, &value);
    for branch in &flattened.skipped {
        sink.log(
            &format!("Attribute \"{}\" skipped: {}", branch.path, branch.reason),
            LogLevel::Warning,
            "flatten_attribute",
        );
    }

    let output = FlattenOutput::new(&root, &flattened, sink.entries());
    output.render(format.unwrap_or_default())?;

    Ok(ExitCode::from_run_result(false, !flattened.skipped.is_empty()))
}

/// Execute the heights command
pub fn execute_heights(
    records: PathBuf,
    layer: String,
    transforms: Vec<String>,
    geographic: bool,
    seed: Option<u64>,
    format: Option<OutputFormat>,
) -> Result<ExitCode> {
    let sink = CommandSink::default();
    let resolver = HeightResolver::from_saved(&transforms, &sink);

    let features: Vec<JsonSourceRecord> = into_items(load_document(&records)?)
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            JsonSourceRecord::from_value(item).ok_or_else(|| {
                CliError::invalid_input(format!("Feature #{} is not an object", index))
            })
        })
        .collect::<Result<_>>()?;

    let existing_values: Vec<AttributeValue> = resolver
        .transforms()
        .iter()
        .find(|t| t.layer_name == layer)
        .and_then(|t| t.attribute.as_deref())
        .map(|attribute| {
            features
                .iter()
                .filter_map(|f| f.get(attribute).ok())
                .collect()
        })
        .unwrap_or_default();

    let context = LayerContext {
        layer_name: &layer,
        is_geographic: geographic,
        existing_values: &existing_values,
    };

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let heights = features
        .iter()
        .enumerate()
        .map(|(index, feature)| HeightOutput {
            index,
            height: resolver.resolve(&context, feature, &mut rng),
        })
        .collect();

    let output = HeightsOutput {
        layer,
        heights,
        messages: sink.entries(),
    };
    output.render(format.unwrap_or_default())?;

    let has_warnings = output.messages.iter().any(|m| m.level >= LogLevel::Warning);
    Ok(ExitCode::from_run_result(false, has_warnings))
}

/// Execute a project settings command
pub fn execute_project(
    project: PathBuf,
    command: ProjectCommands,
    format: Option<OutputFormat>,
) -> Result<ExitCode> {
    let sink = CommandSink::default();
    let table = FileProjectTable::for_project(&project);
    let mut settings = ProjectSettings::open(table, &sink)?;

    let output = match command {
        ProjectCommands::Streams => ProjectOutput::default().with_streams(&settings.streams()),
        ProjectCommands::AddStream { url } => match StreamQuery::parse(&url)? {
            StreamQuery::Url(stream) => {
                let streams = settings.add_stream(stream)?;
                ProjectOutput::default()
                    .with_streams(&streams)
                    .with_message("Stream saved")
            }
            StreamQuery::Search(text) => {
                return Err(CliError::invalid_input(format!(
                    "'{}' is not a stream URL",
                    text
                )));
            }
        },
        ProjectCommands::RemoveStream { url } => {
            let stream = StreamRef::parse(&url)?;
            let message = if settings.remove_stream(&stream)? {
                "Stream removed"
            } else {
                "Stream was not saved"
            };
            ProjectOutput::default()
                .with_streams(&settings.streams())
                .with_message(message)
        }
        ProjectCommands::Layers => ProjectOutput {
            layers: Some(settings.layer_sources()),
            ..Default::default()
        },
        ProjectCommands::SetLayers { sources } => {
            let layers: Vec<LayerRef> = sources
                .iter()
                .map(|source| LayerRef::new(layer_name(source), source.as_str()))
                .collect();
            settings.set_layer_selection(&layers)?;
            ProjectOutput {
                layers: Some(settings.layer_sources()),
                ..Default::default()
            }
            .with_message("Layer selection saved")
        }
        ProjectCommands::SurveyPoint => match settings.survey_point() {
            Some(point) => ProjectOutput {
                survey_point: Some(SurveyPointOutput::from(&point)),
                ..Default::default()
            },
            None => ProjectOutput::default().with_message("No survey point set"),
        },
        ProjectCommands::SetSurveyPoint { lat, lon } => {
            let point = settings.set_survey_point(&lat, &lon)?;
            ProjectOutput {
                survey_point: Some(SurveyPointOutput::from(&point)),
                ..Default::default()
            }
        }
    };

    let output = ProjectOutput {
        messages: sink.entries(),
        ..output
    };
    output.render(format.unwrap_or_default())?;

    let has_warnings = output.messages.iter().any(|m| m.level >= LogLevel::Warning);
    Ok(ExitCode::from_run_result(false, has_warnings))
}

/// Last path component of a data source, used as its display name
fn layer_name(source: &str) -> &str {
    source
        .rsplit(['/', '\\'])
        .find(|part| !part.is_empty())
        .unwrap_or(source)
}

/// Execute the patch-version command
pub fn execute_patch_version(
    tag: String,
    root: PathBuf,
    targets: Option<PathBuf>,
    format: Option<OutputFormat>,
) -> Result<ExitCode> {
    let tag = ReleaseTag::parse(&tag)?;
    let targets = match targets {
        Some(path) => PatchTargets::from_file(path)?,
        None => PatchTargets::default(),
    };

    tracing::info!(tag = tag.tag(), version = tag.version(), "Patching release version");
    let files = patch_release(&root, &targets, &tag)?;

    PatchOutput::new(&tag, files).render(format.unwrap_or_default())?;
    Ok(ExitCode::Success)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_reconcile() {
        let cli = GisCli::parse_from([
            "speckle-gis",
            "reconcile",
            "--schema",
            "schema.json",
            "--records",
            "records.json",
            "--format",
            "json",
            "--report",
        ]);
        match cli.command {
            GisCommands::Reconcile { format, report, config, .. } => {
                assert_eq!(format, Some(OutputFormat::Json));
                assert!(report);
                assert!(config.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_parses_negative_longitude() {
        let cli = GisCli::parse_from([
            "speckle-gis",
            "project",
            "--project",
            "site.aprx",
            "set-survey-point",
            "51.5",
            "-0.12",
        ]);
        match cli.command {
            GisCommands::Project {
                command: ProjectCommands::SetSurveyPoint { lat, lon },
                ..
            } => {
                assert_eq!(lat, "51.5");
                assert_eq!(lon, "-0.12");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_layer_name() {
        assert_eq!(layer_name("C:\\data\\site.gdb\\buildings"), "buildings");
        assert_eq!(layer_name("/data/roads.shp"), "roads.shp");
        assert_eq!(layer_name("parcels"), "parcels");
    }

    #[test]
    fn test_into_items() {
        assert_eq!(into_items(serde_json::json!({"id": "a"})).len(), 1);
        assert_eq!(into_items(serde_json::json!([{}, {}])).len(), 2);
    }

    #[test]
    fn test_load_document_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("record.yaml");
        std::fs::write(&path, "id: abc\nheight: 3.5\n").unwrap();

        let value = load_document(&path).unwrap();
        assert_eq!(value["id"], "abc");
        assert_eq!(value["height"], 3.5);
    }
}
