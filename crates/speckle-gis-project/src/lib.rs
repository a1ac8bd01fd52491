//! Speckle GIS Project
//!
//! Per-project Speckle settings for GIS desktop projects:
//!
//! - saved stream URLs ([`StreamRef`]), most recent first;
//! - the layers selected for sending ([`LayerRef`]);
//! - the survey point and the custom CRS centred on it ([`SurveyPoint`]).
//!
//! Settings live in a one-row `speckle_gis` table. [`ProjectTable`] abstracts
//! where that table is stored; [`FileProjectTable`] keeps it next to the
//! project file.
//!
//! ```rust,no_run
//! use speckle_gis_core::TracingSink;
//! use speckle_gis_project::{FileProjectTable, ProjectSettings, StreamRef};
//!
//! let table = FileProjectTable::for_project("C:/projects/Campus.aprx");
//! let mut settings = ProjectSettings::open(table, &TracingSink)?;
//! settings.add_stream(StreamRef::parse("https://speckle.xyz/streams/3073b96e86")?)?;
//! let point = settings.set_survey_point("51.5", "-0.12")?;
//! println!("{}", point.custom_crs());
//! # Ok::<(), speckle_gis_project::ProjectError>(())
//! ```

pub mod error;
pub mod settings;
pub mod stream;
pub mod survey;
pub mod table;

pub use error::{ProjectError, Result};
pub use settings::{LayerRef, ProjectSettings};
pub use stream::{StreamQuery, StreamRef, StreamTarget};
pub use survey::SurveyPoint;
pub use table::{FileProjectTable, MemoryProjectTable, ProjectRow, ProjectTable, StoredRow};
