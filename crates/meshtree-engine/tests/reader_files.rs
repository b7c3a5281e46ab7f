use std::path::PathBuf;

use meshtree_engine::{
    Association, Category, CompositeKind, DataObject, DocumentError, OutputShape, Partition,
    Reader, ReaderConfig, StructuralWarning,
};
use meshtree_testkit::{TempDir, temp_dir, write_description, write_raw};
use serde_json::json;

const TEMP: [f64; 6] = [1.5, 2.5, 3.5, 4.5, 5.5, 6.5];

/// Rectilinear `G1` whose point array lives in a raw side file.
fn rectilinear_fixture() -> (TempDir, PathBuf) {
    let dir = temp_dir();
    write_raw(dir.path(), "temp.bin", &TEMP);
    let path = write_description(
        dir.path(),
        "g1.json",
        &json!({
            "version": 1,
            "domain": {
                "grids": [{
                    "kind": "rectilinear",
                    "name": "G1",
                    "axes": [{ "values": [0, 1, 2] }, { "values": [0, 1] }],
                    "attributes": [{
                        "name": "temp",
                        "center": "node",
                        "values": { "raw": { "path": "temp.bin", "count": 6 } }
                    }]
                }]
            }
        }),
    );
    (dir, path)
}

/// One regular grid per file, growing from 2x2 to 4x4.
fn step_files() -> (TempDir, Vec<PathBuf>) {
    let dir = temp_dir();
    let paths = (2..=4)
        .map(|n| {
            write_description(
                dir.path(),
                &format!("step{n}.json"),
                &json!({
                    "domain": {
                        "grids": [{ "kind": "regular", "name": "g", "dimensions": [n, n] }]
                    }
                }),
            )
        })
        .collect();
    (dir, paths)
}

#[test]
fn single_file_round_trip() {
    let (_dir, path) = rectilinear_fixture();
    let mut reader = Reader::default();
    reader.discover(&[&path], false).unwrap();

    assert_eq!(reader.count(Category::PointArrays), 1);
    assert_eq!(reader.name_at(Category::PointArrays, 0), Some("temp"));
    assert!(reader.is_enabled(Category::PointArrays, "temp"));
    assert!(reader.time_values().is_empty());
    assert_eq!(reader.hierarchy().unwrap().vertex_count(), 3);

    let classification = reader.classify().unwrap().clone();
    assert_eq!(classification.shape, OutputShape::Rectilinear);
    let extent = classification.extent.unwrap();
    assert_eq!(extent.extent, [0, 2, 0, 1, 0, 0]);

    let out = reader.materialize(Partition::SERIAL, None, false).unwrap();
    assert_eq!(out.shape(), OutputShape::Rectilinear);
    let temp = out.data().unwrap().get(Association::Point, "temp").unwrap();
    assert_eq!(&temp.values[..], &TEMP);
}

#[test]
fn raw_arrays_are_read_once_while_in_use() {
    let (_dir, path) = rectilinear_fixture();
    let mut reader = Reader::default();
    reader.discover(&[&path], false).unwrap();

    reader.materialize(Partition::SERIAL, None, false).unwrap();
    reader.materialize(Partition::SERIAL, None, false).unwrap();
    let stats = reader.keeper().stats();
    assert_eq!(stats.bytes_read, 48);
    assert!(stats.hits > 0);
    assert_eq!(reader.stats().materializations, 2);
    assert_eq!(reader.stats().classifications, 1);
}

#[test]
fn disabled_arrays_stay_out_of_the_output() {
    let (_dir, path) = rectilinear_fixture();
    let mut reader = Reader::default();
    reader.discover(&[&path], false).unwrap();
    reader.set_enabled(Category::PointArrays, "temp", false);
    assert!(!reader.is_enabled(Category::PointArrays, "temp"));

    let out = reader.materialize(Partition::SERIAL, None, false).unwrap();
    assert!(out.data().unwrap().is_empty());
    assert_eq!(reader.keeper().stats().bytes_read, 0);
}

#[test]
fn repeated_discovery_is_a_no_op() {
    let (_dir, path) = rectilinear_fixture();
    let mut reader = Reader::default();
    reader.discover(&[&path], false).unwrap();
    reader.set_enabled(Category::PointArrays, "temp", false);
    reader.discover(&[&path], false).unwrap();

    assert_eq!(reader.stats().discoveries, 1);
    assert_eq!(reader.stats().hierarchy_stamp, 1);
    // Selections survive because nothing was rebuilt.
    assert!(!reader.is_enabled(Category::PointArrays, "temp"));
}

#[test]
fn failed_discovery_keeps_previous_state() {
    let (dir, path) = rectilinear_fixture();
    let mut reader = Reader::default();
    reader.discover(&[&path], false).unwrap();

    let missing = dir.path().join("missing.json");
    let err = reader.discover(&[&missing], false).unwrap_err();
    assert!(matches!(err, DocumentError::NotFound { .. }));
    assert!(reader.is_discovered());
    assert_eq!(reader.file_names(), &[path]);
    assert_eq!(reader.count(Category::PointArrays), 1);
}

#[test]
fn malformed_description_is_a_parse_error() {
    let dir = temp_dir();
    let path = write_description(dir.path(), "bad.json", &json!({ "domain": { "grids": [{ "kind": "regular" }] } }));
    let mut reader = Reader::default();
    let err = reader.discover(&[path], false).unwrap_err();
    assert!(matches!(err, DocumentError::Parse { .. }));
    assert!(!reader.is_discovered());
}

#[test]
fn unknown_grid_kind_becomes_a_warning() {
    let dir = temp_dir();
    let path = write_description(
        dir.path(),
        "mixed.json",
        &json!({
            "domain": {
                "collections": [{
                    "name": "run",
                    "grids": [
                        { "kind": "regular", "name": "a", "dimensions": [2, 2] },
                        { "kind": "polyhedral", "name": "odd" },
                        { "kind": "regular", "name": "b", "dimensions": [3, 3] }
                    ]
                }]
            }
        }),
    );
    let mut reader = Reader::default();
    reader.discover(&[path], false).unwrap();

    assert_eq!(reader.count(Category::Blocks), 2);
    assert_eq!(reader.name_at(Category::Blocks, 0), Some("a"));
    assert_eq!(reader.name_at(Category::Blocks, 1), Some("b"));
    assert_eq!(
        reader.warnings(),
        &[StructuralWarning::UnknownItemKind {
            name: "odd".to_string(),
            kind: "polyhedral".to_string(),
        }]
    );

    let out = reader.materialize(Partition::SERIAL, None, false).unwrap();
    assert_eq!(out.as_composite().unwrap().len(), 2);
    assert_eq!(out.number_of_points(), 4 + 9);
}

#[test]
fn truncated_raw_array_fails_the_request() {
    let dir = temp_dir();
    write_raw(dir.path(), "short.bin", &[1.0, 2.0]);
    let path = write_description(
        dir.path(),
        "short.json",
        &json!({
            "domain": {
                "grids": [{
                    "kind": "regular",
                    "name": "g",
                    "dimensions": [2, 2],
                    "attributes": [{
                        "name": "p",
                        "center": "node",
                        "values": { "raw": { "path": "short.bin", "count": 4 } }
                    }]
                }]
            }
        }),
    );
    let mut reader = Reader::default();
    reader.discover(&[path], false).unwrap();
    let err = reader.materialize(Partition::SERIAL, None, false).unwrap_err();
    assert!(matches!(err, DocumentError::Array(_)));
    assert!(reader.is_discovered());
}

#[test]
fn file_series_becomes_timesteps() {
    let (_dir, paths) = step_files();
    let mut reader = Reader::default();
    reader.discover(&paths, true).unwrap();
    assert_eq!(reader.time_values(), &[0.0, 1.0, 2.0]);

    let classification = reader.classify().unwrap();
    assert_eq!(classification.shape, OutputShape::Image);
    assert_eq!(classification.extent.unwrap().extent, [0, 1, 0, 1, 0, 0]);

    let points = |out: DataObject| {
        assert_eq!(out.shape(), OutputShape::Image);
        out.number_of_points()
    };
    assert_eq!(points(reader.materialize(Partition::SERIAL, Some(1.4), true).unwrap()), 9);
    assert_eq!(points(reader.materialize(Partition::SERIAL, Some(-5.0), true).unwrap()), 4);
    assert_eq!(points(reader.materialize(Partition::SERIAL, Some(99.0), true).unwrap()), 16);
}

#[test]
fn file_series_as_pieces() {
    let (_dir, paths) = step_files();
    let mut reader = Reader::new(ReaderConfig::default().with_file_series_as_time(false));
    reader.open(&paths).unwrap();
    assert!(reader.time_values().is_empty());
    assert_eq!(reader.classify().unwrap().shape, OutputShape::Composite);

    let out = reader.materialize(Partition::SERIAL, None, false).unwrap();
    let pieces = out.as_composite().unwrap();
    assert_eq!(pieces.kind, CompositeKind::MultiPiece);
    assert_eq!(pieces.len(), 3);
    assert_eq!(out.number_of_points(), 4 + 9 + 16);

    let out = reader.materialize(Partition::new(0, 2), None, false).unwrap();
    let slots: Vec<bool> = out
        .as_composite()
        .unwrap()
        .blocks()
        .iter()
        .map(Option::is_some)
        .collect();
    assert_eq!(slots, vec![true, false, false]);
}

#[test]
fn changing_file_names_drops_the_document() {
    let (_dir, path) = rectilinear_fixture();
    let mut reader = Reader::default();
    reader.discover(&[&path], false).unwrap();
    reader.materialize(Partition::SERIAL, None, false).unwrap();
    assert!(!reader.keeper().is_empty());

    reader.set_file_names(&[PathBuf::from("elsewhere.json")]);
    assert!(!reader.is_discovered());
    assert!(reader.keeper().is_empty());
    assert_eq!(reader.file_names(), &[PathBuf::from("elsewhere.json")]);
}
