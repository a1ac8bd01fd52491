//! Integration tests for file-backed project settings
//!
//! Tests the settings lifecycle across re-opening the project:
//! - table creation next to the project file
//! - stream list persistence and ordering
//! - survey point persistence
//! - repair of rows written by older versions

use speckle_gis_core::{LogLevel, MemorySink};
use speckle_gis_project::{
    FileProjectTable, LayerRef, ProjectSettings, ProjectTable, StreamRef,
};

#[test]
fn test_settings_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let project = dir.path().join("Campus.aprx");
    let sink = MemorySink::new();

    {
        let table = FileProjectTable::for_project(&project);
        let mut settings = ProjectSettings::open(table, &sink).unwrap();
        settings
            .add_stream(StreamRef::parse("https://speckle.xyz/streams/aaa").unwrap())
            .unwrap();
        settings
            .add_stream(StreamRef::parse("https://speckle.xyz/streams/bbb/branches/main").unwrap())
            .unwrap();
        settings
            .set_layer_selection(&[LayerRef::new("Buildings", "C:/site.gdb/buildings")])
            .unwrap();
        settings.set_survey_point("51.5", "-0.12").unwrap();
    }

    assert!(dir.path().join("Campus.gdb").join("speckle_gis.toml").is_file());

    let settings = ProjectSettings::open(FileProjectTable::for_project(&project), &sink).unwrap();
    let ids: Vec<String> = settings.streams().into_iter().map(|s| s.stream_id).collect();
    assert_eq!(ids, vec!["bbb", "aaa"]);
    assert_eq!(settings.layer_sources(), vec!["C:/site.gdb/buildings"]);

    let point = settings.survey_point().unwrap();
    assert_eq!((point.lat, point.lon), (51.5, -0.12));
    assert!(sink.at_least(LogLevel::Warning).is_empty());
}

#[test]
fn test_older_table_is_repaired_on_open() {
    let dir = tempfile::tempdir().unwrap();
    let project = dir.path().join("Old.aprx");
    let table = FileProjectTable::for_project(&project);
    std::fs::create_dir_all(table.path().parent().unwrap()).unwrap();
    std::fs::write(
        table.path(),
        "[[rows]]\nproject_streams = \"https://speckle.xyz/streams/abc\"\n",
    )
    .unwrap();

    let sink = MemorySink::new();
    let settings = ProjectSettings::open(table, &sink).unwrap();
    assert_eq!(settings.streams().len(), 1);
    assert_eq!(settings.survey_point(), None);

    let row = settings.into_table().read_row().unwrap().unwrap();
    assert_eq!(row.lat_lon.as_deref(), Some(""));
    assert_eq!(
        row.project_streams.as_deref(),
        Some("https://speckle.xyz/streams/abc")
    );
}

#[test]
fn test_empty_table_gets_a_row() {
    let dir = tempfile::tempdir().unwrap();
    let table = FileProjectTable::new(dir.path().join("speckle_gis.toml"));
    std::fs::write(table.path(), "rows = []\n").unwrap();

    let sink = MemorySink::new();
    let settings = ProjectSettings::open(table, &sink).unwrap();
    assert!(settings.into_table().read_row().unwrap().is_some());
}
