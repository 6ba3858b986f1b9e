use std::fs;

use worldsim::{
    config::SimConfig,
    model::WorldModel,
    snapshot::{SnapshotWriter, WorldSnapshot},
};

fn model() -> WorldModel {
    let mut model = WorldModel::new(SimConfig {
        seed: Some(42),
        ..SimConfig::default()
    });
    model.start().unwrap();
    model
}

#[test]
fn writes_snapshots_on_interval() {
    let dir = tempfile::tempdir().unwrap();
    let writer = SnapshotWriter::new(dir.path().join("out"), 5);
    let mut model = model();

    let mut written = Vec::new();
    for _ in 0..12 {
        model.step();
        if let Some(path) = writer.maybe_write(&model.snapshot()).unwrap() {
            written.push(path);
        }
    }

    let names: Vec<_> = written
        .iter()
        .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["tick_000005.json", "tick_000010.json"]);

    let raw = fs::read_to_string(&written[0]).unwrap();
    let snapshot: WorldSnapshot = serde_json::from_str(&raw).unwrap();
    assert_eq!(snapshot.tick, 5);
    assert_eq!(snapshot.total_regions, 25);
}

#[test]
fn zero_interval_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let writer = SnapshotWriter::new(dir.path(), 0);
    let mut model = model();
    model.step();
    assert!(writer.maybe_write(&model.snapshot()).unwrap().is_none());
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}
