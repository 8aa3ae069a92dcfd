mod common;

use std::fs;
use std::path::{Path, PathBuf};

use common::{container_with, json_object, options, tempdir, volume};
use n5_label_merge::metadata::{LabelDataType, N5Compression};
use n5_label_merge::{Error, MergeJob, MergeStrategy, N5Container, WriteOptions};
use serde_json::json;

const SOURCE: &str = "/volumes/labels/clefts";
const TARGET: &str = "/volumes/labels/clefts_corrected";

/// Source `[[1, 1], [2, 2]]` with attributes, additional `[[0, 5], [5, 0]]` at `data`.
fn sample(dir: &Path) -> (PathBuf, PathBuf) {
    let source_opts = WriteOptions {
        data_type: LabelDataType::Uint64,
        block_shape: vec![1, 2],
        compression: N5Compression::Gzip { level: 5 },
    };
    let (source_path, source) = container_with(
        dir,
        "sample_C.n5",
        SOURCE,
        &volume(&[2, 2], &[1, 1, 2, 2]),
        &source_opts,
    );
    source
        .set_attributes(
            SOURCE,
            json_object(json!({"resolution": [40.0, 4.0, 4.0], "offset": [0, 0, 0]})),
        )
        .unwrap();

    let (additional_path, _) = container_with(
        dir,
        "sample_C_syngt.n5",
        "data",
        &volume(&[2, 2], &[0, 5, 5, 0]),
        &options(LabelDataType::Uint8, &[2, 2]),
    );
    (source_path, additional_path)
}

#[test]
fn overlay_writes_merged_volume_with_source_attributes() {
    let dir = tempdir();
    let (source_path, additional_path) = sample(dir.path());

    let report = MergeJob::new(&source_path, &additional_path, SOURCE, TARGET)
        .run()
        .unwrap();
    assert_eq!(report.strategy, MergeStrategy::Overlay);
    assert_eq!(report.background_label, 2);
    assert_eq!(report.num_components, 1);
    assert_eq!(report.num_replaced, 2);
    assert_eq!(report.mapping.get(&5), Some(&1));

    let container = N5Container::open(&source_path).unwrap();
    let (merged, data_type) = container.read_labels(TARGET).unwrap();
    assert_eq!(merged, volume(&[2, 2], &[1, 1, 1, 2]));
    assert_eq!(data_type, LabelDataType::Uint64);

    let target = container.dataset(TARGET).unwrap();
    assert_eq!(target.block_shape(), vec![1, 2]);
    assert_eq!(target.compression, N5Compression::Gzip { level: 5 });
    assert_eq!(
        container.attributes(TARGET).unwrap(),
        container.attributes(SOURCE).unwrap()
    );

    // inputs are untouched
    assert_eq!(
        container.read_labels(SOURCE).unwrap().0,
        volume(&[2, 2], &[1, 1, 2, 2])
    );
}

#[test]
fn offset_keeps_additional_labels_distinct() {
    let dir = tempdir();
    let (source_path, additional_path) = sample(dir.path());

    let mut job = MergeJob::new(&source_path, &additional_path, SOURCE, TARGET);
    job.strategy = MergeStrategy::Offset;
    let report = job.run().unwrap();
    assert_eq!(report.mapping.get(&5), Some(&3));

    let container = N5Container::open(&source_path).unwrap();
    assert_eq!(
        container.read_labels(TARGET).unwrap().0,
        volume(&[2, 2], &[1, 3, 3, 2])
    );
}

#[test]
fn layout_overrides_apply_to_output() {
    let dir = tempdir();
    let (source_path, additional_path) = sample(dir.path());

    let mut job = MergeJob::new(&source_path, &additional_path, SOURCE, TARGET);
    job.block_shape = Some(vec![2, 2]);
    job.compression = Some(N5Compression::Raw);
    job.run().unwrap();

    let target = N5Container::open(&source_path)
        .unwrap()
        .dataset(TARGET)
        .unwrap();
    assert_eq!(target.block_shape(), vec![2, 2]);
    assert_eq!(target.compression, N5Compression::Raw);
    assert_eq!(
        fs::read(source_path.join("volumes/labels/clefts_corrected/0/0")).unwrap()[..12],
        [0, 0, 0, 2, 0, 0, 0, 2, 0, 0, 0, 2]
    );
}

#[test]
fn rerunning_a_job_gives_the_same_output() {
    let dir = tempdir();
    let (source_path, additional_path) = sample(dir.path());
    let job = MergeJob::new(&source_path, &additional_path, SOURCE, TARGET);

    let first = job.run().unwrap();
    let container = N5Container::open(&source_path).unwrap();
    let before = container.read_labels(TARGET).unwrap();
    let attrs_before = container.attributes(TARGET).unwrap();

    let second = job.run().unwrap();
    assert_eq!(first, second);
    assert_eq!(container.read_labels(TARGET).unwrap(), before);
    assert_eq!(container.attributes(TARGET).unwrap(), attrs_before);
}

#[test]
fn shape_mismatch_writes_nothing() {
    let dir = tempdir();
    let (source_path, _) = sample(dir.path());
    let (other_path, _) = container_with(
        dir.path(),
        "other.n5",
        "data",
        &volume(&[2, 3], &[0, 1, 0, 0, 1, 0]),
        &options(LabelDataType::Uint8, &[2, 3]),
    );

    let res = MergeJob::new(&source_path, &other_path, SOURCE, TARGET).run();
    match res {
        Err(Error::ShapeMismatch {
            source_shape,
            additional_shape,
        }) => {
            assert_eq!(source_shape, vec![2, 2]);
            assert_eq!(additional_shape, vec![2, 3]);
        }
        other => panic!("expected a shape mismatch, got {other:?}"),
    }
    assert!(!N5Container::open(&source_path).unwrap().exists(TARGET).unwrap());
}

#[test]
fn overlapping_target_leaves_source_intact() {
    let dir = tempdir();
    let (source_path, additional_path) = sample(dir.path());
    let container = N5Container::open(&source_path).unwrap();
    let attrs = container.attributes(SOURCE).unwrap();

    for target in [SOURCE, "volumes/labels/clefts/", "/volumes", "/volumes/labels/clefts/merged"] {
        let res = MergeJob::new(&source_path, &additional_path, SOURCE, target).run();
        assert!(
            matches!(res, Err(Error::OverlappingDatasets { .. })),
            "{target}: {res:?}"
        );
        assert_eq!(
            container.read_labels(SOURCE).unwrap(),
            (volume(&[2, 2], &[1, 1, 2, 2]), LabelDataType::Uint64)
        );
        assert_eq!(container.attributes(SOURCE).unwrap(), attrs);
    }
    assert!(!container.exists("/volumes/labels/clefts/merged").unwrap());
}

#[test]
fn missing_additional_dataset_is_reported() {
    let dir = tempdir();
    let (source_path, additional_path) = sample(dir.path());

    let mut job = MergeJob::new(&source_path, &additional_path, SOURCE, TARGET);
    job.additional_dataset = "clefts".into();
    assert!(matches!(job.run(), Err(Error::NodeNotFound(p)) if p == "/clefts"));
}

#[test]
fn job_file_runs() {
    let dir = tempdir();
    let (source_path, additional_path) = sample(dir.path());
    let job_path = dir.path().join("job.json");
    fs::write(
        &job_path,
        serde_json::to_vec(&json!({
            "source_container": source_path,
            "additional_container": additional_path,
            "source_dataset": SOURCE,
            "target_dataset": TARGET,
            "strategy": "offset",
        }))
        .unwrap(),
    )
    .unwrap();

    MergeJob::from_json_file(&job_path).unwrap().run().unwrap();
    assert_eq!(
        N5Container::open(&source_path)
            .unwrap()
            .read_labels(TARGET)
            .unwrap()
            .0,
        volume(&[2, 2], &[1, 3, 3, 2])
    );
}
