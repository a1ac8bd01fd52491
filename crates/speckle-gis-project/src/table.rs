//! The `speckle_gis` project table
//!
//! Each GIS project keeps its Speckle settings in a one-row table with three
//! text columns. Hosts store the table wherever they keep project data; the
//! file-backed implementation writes it as TOML inside the project's
//! geodatabase folder (`MyProject.aprx` → `MyProject.gdb/speckle_gis.toml`).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Name of the settings table
pub const TABLE_NAME: &str = "speckle_gis";

/// Column names, in storage order
pub const COLUMNS: [&str; 3] = ["project_streams", "project_layer_selection", "lat_lon"];

/// The settings row as stored. Columns can be missing (added by a newer
/// plugin version) or null.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_streams: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_layer_selection: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat_lon: Option<String>,
}

impl StoredRow {
    pub fn has_nulls(&self) -> bool {
        self.project_streams.is_none()
            || self.project_layer_selection.is_none()
            || self.lat_lon.is_none()
    }
}

/// The settings row with every column present
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRow {
    /// Comma-separated stream URLs
    pub project_streams: String,
    /// Comma-separated layer data sources
    pub project_layer_selection: String,
    /// `"<lat>;<lon>"` or empty
    pub lat_lon: String,
}

impl From<StoredRow> for ProjectRow {
    fn from(row: StoredRow) -> Self {
        Self {
            project_streams: row.project_streams.unwrap_or_default(),
            project_layer_selection: row.project_layer_selection.unwrap_or_default(),
            lat_lon: row.lat_lon.unwrap_or_default(),
        }
    }
}

impl From<&ProjectRow> for StoredRow {
    fn from(row: &ProjectRow) -> Self {
        Self {
            project_streams: Some(row.project_streams.clone()),
            project_layer_selection: Some(row.project_layer_selection.clone()),
            lat_lon: Some(row.lat_lon.clone()),
        }
    }
}

/// Storage for the settings table
pub trait ProjectTable {
    fn exists(&self) -> bool;

    /// Create the table holding a single empty row
    fn create(&mut self) -> Result<()>;

    /// First row of the table, `None` if the table has no rows
    fn read_row(&self) -> Result<Option<StoredRow>>;

    /// Replace the first row (inserting it when there is none)
    fn write_row(&mut self, row: &ProjectRow) -> Result<()>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredTable {
    #[serde(default)]
    rows: Vec<StoredRow>,
}

/// Settings table stored as a TOML file
#[derive(Debug, Clone)]
pub struct FileProjectTable {
    path: PathBuf,
}

impl FileProjectTable {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Table location for a project file: `<stem>.gdb/speckle_gis.toml` next to it
    pub fn for_project(project_file: impl AsRef<Path>) -> Self {
        let gdb = project_file.as_ref().with_extension("gdb");
        Self::new(gdb.join(format!("{}.toml", TABLE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<StoredTable> {
        let content = std::fs::read_to_string(&self.path)?;
        Ok(toml::from_str(&content)?)
    }

    fn save(&self, table: &StoredTable) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, toml::to_string(table)?)?;
        Ok(())
    }
}

impl ProjectTable for FileProjectTable {
    fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn create(&mut self) -> Result<()> {
        tracing::debug!(path = %self.path.display(), "Creating project table");
        self.save(&StoredTable {
            rows: vec![StoredRow::from(&ProjectRow::default())],
        })
    }

    fn read_row(&self) -> Result<Option<StoredRow>> {
        Ok(self.load()?.rows.into_iter().next())
    }

    fn write_row(&mut self, row: &ProjectRow) -> Result<()> {
        let mut table = if self.exists() {
            self.load()?
        } else {
            StoredTable::default()
        };
        let stored = StoredRow::from(row);
        match table.rows.first_mut() {
            Some(first) => *first = stored,
            None => table.rows.push(stored),
        }
        self.save(&table)
    }
}

/// Settings table kept in memory, for hosts that persist it themselves
#[derive(Debug, Clone, Default)]
pub struct MemoryProjectTable {
    created: bool,
    rows: Vec<StoredRow>,
}

impl MemoryProjectTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// A table that already exists with the given rows
    pub fn with_rows(rows: Vec<StoredRow>) -> Self {
        Self {
            created: true,
            rows,
        }
    }

    pub fn rows(&self) -> &[StoredRow] {
        &self.rows
    }
}

impl ProjectTable for MemoryProjectTable {
    fn exists(&self) -> bool {
        self.created
    }

    fn create(&mut self) -> Result<()> {
        self.created = true;
        self.rows = vec![StoredRow::from(&ProjectRow::default())];
        Ok(())
    }

    fn read_row(&self) -> Result<Option<StoredRow>> {
        Ok(self.rows.first().cloned())
    }

    fn write_row(&mut self, row: &ProjectRow) -> Result<()> {
        self.created = true;
        let stored = StoredRow::from(row);
        match self.rows.first_mut() {
            Some(first) => *first = stored,
            None => self.rows.push(stored),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_path_for_project() {
        let table = FileProjectTable::for_project("/work/site/Campus.aprx");
        assert_eq!(table.path(), Path::new("/work/site/Campus.gdb/speckle_gis.toml"));
    }

    #[test]
    fn test_file_table_create_and_write() {
        let dir = tempfile::tempdir().unwrap();
        let mut table = FileProjectTable::for_project(dir.path().join("Campus.aprx"));
        assert!(!table.exists());

        table.create().unwrap();
        assert!(table.exists());
        assert_eq!(
            table.read_row().unwrap().map(ProjectRow::from),
            Some(ProjectRow::default())
        );

        let row = ProjectRow {
            lat_lon: "51.5;-0.12".to_string(),
            ..Default::default()
        };
        table.write_row(&row).unwrap();
        assert_eq!(table.read_row().unwrap().map(ProjectRow::from), Some(row));
    }

    #[test]
    fn test_file_table_missing_columns_read_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("speckle_gis.toml");
        std::fs::write(&path, "[[rows]]\nproject_streams = \"\"\n").unwrap();

        let table = FileProjectTable::new(&path);
        let row = table.read_row().unwrap().unwrap();
        assert!(row.has_nulls());
        assert_eq!(row.lat_lon, None);
    }

    #[test]
    fn test_memory_table_write_inserts_first_row() {
        let mut table = MemoryProjectTable::with_rows(vec![]);
        assert_eq!(table.read_row().unwrap(), None);

        table.write_row(&ProjectRow::default()).unwrap();
        assert_eq!(table.rows().len(), 1);
    }
}
