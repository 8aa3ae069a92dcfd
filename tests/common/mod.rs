#![allow(dead_code)]

use std::path::{Path, PathBuf};

use n5_label_merge::metadata::{LabelDataType, N5Compression};
use n5_label_merge::{LabeledVolume, N5Container, WriteOptions};
use tempfile::TempDir;

pub fn tempdir() -> TempDir {
    env_logger::builder().is_test(true).try_init().ok();
    tempfile::tempdir().expect("create temporary directory")
}

pub fn volume(shape: &[u64], values: &[u64]) -> LabeledVolume {
    LabeledVolume::new(shape.to_vec(), values.to_vec()).expect("valid volume")
}

pub fn options(data_type: LabelDataType, block_shape: &[u64]) -> WriteOptions {
    WriteOptions {
        data_type,
        block_shape: block_shape.to_vec(),
        compression: N5Compression::Raw,
    }
}

/// Create a container at `dir/name` holding `volume` at `dataset`.
pub fn container_with(
    dir: &Path,
    name: &str,
    dataset: &str,
    volume: &LabeledVolume,
    options: &WriteOptions,
) -> (PathBuf, N5Container) {
    let path = dir.join(name);
    let container = N5Container::create(&path).expect("create container");
    container
        .write_labels(dataset, volume, options)
        .expect("write labels");
    (path, container)
}

pub fn json_object(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected JSON object, got {other}"),
    }
}
