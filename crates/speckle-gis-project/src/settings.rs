//! Reading and writing a project's Speckle settings

use serde::{Deserialize, Serialize};
use speckle_gis_core::{LogLevel, LogSink};

use crate::error::Result;
use crate::stream::StreamRef;
use crate::survey::SurveyPoint;
use crate::table::{ProjectRow, ProjectTable};

const ORIGIN: &str = "project_settings";

/// A layer of the open project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerRef {
    pub name: String,
    /// Path of the layer's data, unique within a project
    pub data_source: String,
}

impl LayerRef {
    pub fn new(name: impl Into<String>, data_source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_source: data_source.into(),
        }
    }
}

/// Speckle settings of one GIS project, backed by its settings table
pub struct ProjectSettings<'a, T: ProjectTable> {
    table: T,
    row: ProjectRow,
    sink: &'a dyn LogSink,
}

impl<'a, T: ProjectTable> ProjectSettings<'a, T> {
    /// Open the settings, creating the table or repairing its row as needed.
    ///
    /// A table without rows gets an empty one; null columns are replaced by
    /// empty strings while the other columns are kept.
    pub fn open(mut table: T, sink: &'a dyn LogSink) -> Result<Self> {
        if !table.exists() {
            table.create()?;
        }

        let row = match table.read_row()? {
            None => {
                let row = ProjectRow::default();
                table.write_row(&row)?;
                row
            }
            Some(stored) if stored.has_nulls() => {
                tracing::debug!("Filling null project settings columns");
                let row = ProjectRow::from(stored);
                table.write_row(&row)?;
                row
            }
            Some(stored) => ProjectRow::from(stored),
        };

        Ok(Self { table, row, sink })
    }

    pub fn row(&self) -> &ProjectRow {
        &self.row
    }

    pub fn into_table(self) -> T {
        self.table
    }

    fn save(&mut self) -> Result<()> {
        self.table.write_row(&self.row)
    }

    /// Saved streams, most recently added first. Unparsable entries are
    /// reported and skipped.
    pub fn streams(&self) -> Vec<StreamRef> {
        split_list(&self.row.project_streams)
            .filter_map(|url| match StreamRef::parse(url) {
                Ok(stream) => Some(stream),
                Err(e) => {
                    self.sink.log(&e.to_string(), LogLevel::Warning, ORIGIN);
                    None
                }
            })
            .collect()
    }

    pub fn set_streams(&mut self, streams: &[StreamRef]) -> Result<()> {
        self.row.project_streams = join_list(streams.iter().map(StreamRef::stream_url));
        self.save()
    }

    /// Add a stream at the front, replacing any saved reference to the same stream
    pub fn add_stream(&mut self, stream: StreamRef) -> Result<Vec<StreamRef>> {
        let mut streams = self.streams();
        streams.retain(|s| !s.same_stream(&stream));
        streams.insert(0, stream);
        self.set_streams(&streams)?;
        Ok(streams)
    }

    /// Remove every saved reference to `stream`'s stream; returns whether any was removed
    pub fn remove_stream(&mut self, stream: &StreamRef) -> Result<bool> {
        let mut streams = self.streams();
        let before = streams.len();
        streams.retain(|s| !s.same_stream(stream));
        let removed = streams.len() != before;
        if removed {
            self.set_streams(&streams)?;
        }
        Ok(removed)
    }

    /// Saved layer data sources, as stored
    pub fn layer_sources(&self) -> Vec<String> {
        split_list(&self.row.project_layer_selection)
            .map(str::to_string)
            .collect()
    }

    /// Saved layer selection resolved against the project's layers.
    /// Saved sources with no matching layer are reported and dropped.
    pub fn layer_selection(&self, available: &[LayerRef]) -> Vec<LayerRef> {
        split_list(&self.row.project_layer_selection)
            .filter_map(|source| {
                let found = available.iter().find(|l| l.data_source == source).cloned();
                if found.is_none() {
                    self.sink.log(
                        &format!("Saved layer not found: \"{}\"", source),
                        LogLevel::Warning,
                        ORIGIN,
                    );
                }
                found
            })
            .collect()
    }

    pub fn set_layer_selection(&mut self, layers: &[LayerRef]) -> Result<()> {
        self.row.project_layer_selection =
            join_list(layers.iter().map(|l| l.data_source.clone()));
        self.save()
    }

    /// Saved survey point; an unreadable value is reported and treated as unset
    pub fn survey_point(&self) -> Option<SurveyPoint> {
        if self.row.lat_lon.trim().is_empty() {
            return None;
        }
        match SurveyPoint::parse_stored(&self.row.lat_lon) {
            Ok(point) => Some(point),
            Err(e) => {
                self.sink.log(&e.to_string(), LogLevel::Warning, ORIGIN);
                None
            }
        }
    }

    /// Validate and save a survey point typed by the user. Nothing is saved
    /// when either value is invalid.
    pub fn set_survey_point(&mut self, lat: &str, lon: &str) -> Result<SurveyPoint> {
        let point = match SurveyPoint::from_inputs(lat, lon) {
            Ok(point) => point,
            Err(e) => {
                self.sink.log(&e.to_string(), LogLevel::Warning, ORIGIN);
                return Err(e);
            }
        };
        self.row.lat_lon = point.to_stored();
        self.save()?;
        self.sink.log(
            "Custom project Spatial Reference successfully applied",
            LogLevel::Info,
            ORIGIN,
        );
        Ok(point)
    }
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn join_list<I: IntoIterator<Item = String>>(items: I) -> String {
    items.into_iter().collect::<Vec<_>>().join(",")
}
