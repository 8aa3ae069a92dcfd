use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::container::{N5Container, WriteOptions, node_path};
use crate::merge::{MergeReport, MergeStrategy, merge};
use crate::metadata::N5Compression;
use crate::{Error, Result};

fn default_additional_dataset() -> String {
    "data".to_owned()
}

/// A complete merge: where to read both volumes, how to merge them, and where to write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MergeJob {
    /// Container holding the source volume; the merged volume is written here too.
    pub source_container: PathBuf,
    /// Container holding the additional volume.
    pub additional_container: PathBuf,
    pub source_dataset: String,
    pub target_dataset: String,
    #[serde(default = "default_additional_dataset")]
    pub additional_dataset: String,
    #[serde(default)]
    pub strategy: MergeStrategy,
    /// C-order block shape of the output; inherited from the source dataset if absent.
    #[serde(default)]
    pub block_shape: Option<Vec<u64>>,
    /// Inherited from the source dataset if absent.
    #[serde(default)]
    pub compression: Option<N5Compression>,
}

impl MergeJob {
    pub fn new(
        source_container: impl Into<PathBuf>,
        additional_container: impl Into<PathBuf>,
        source_dataset: impl Into<String>,
        target_dataset: impl Into<String>,
    ) -> Self {
        Self {
            source_container: source_container.into(),
            additional_container: additional_container.into(),
            source_dataset: source_dataset.into(),
            target_dataset: target_dataset.into(),
            additional_dataset: default_additional_dataset(),
            strategy: MergeStrategy::default(),
            block_shape: None,
            compression: None,
        }
    }

    /// Load a job description from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }

    /// Fail if writing the target would replace or nest inside the source dataset.
    ///
    /// The target is written into the source container, so the same path, an
    /// ancestor group of the source, or a node below the source are all rejected.
    fn check_target(&self) -> Result<()> {
        let source = node_path(&self.source_dataset);
        let target = node_path(&self.target_dataset);
        let nested = |outer: &str, inner: &str| {
            outer.is_empty() || inner.strip_prefix(outer).is_some_and(|r| r.starts_with('/'))
        };
        if source == target || nested(&target, &source) || nested(&source, &target) {
            return Err(Error::OverlappingDatasets {
                source_dataset: format!("/{source}"),
                target_dataset: format!("/{target}"),
            });
        }
        Ok(())
    }

    /// Merge, write the result into the source container, then copy the source attributes onto it.
    pub fn run(&self) -> Result<MergeReport> {
        self.check_target()?;
        let source_container = N5Container::open(&self.source_container)?;
        let additional_container = N5Container::open(&self.additional_container)?;

        let source_meta = source_container.dataset(&self.source_dataset)?;
        let (source, _) = source_container.read_labels(&self.source_dataset)?;
        log::info!(
            "read source {}:{} with shape {:?}",
            self.source_container.display(),
            self.source_dataset,
            source.shape()
        );
        let (additional, _) = additional_container.read_labels(&self.additional_dataset)?;
        log::info!(
            "read additional {}:{} with shape {:?}, {} foreground elements",
            self.additional_container.display(),
            self.additional_dataset,
            additional.shape(),
            additional.count_foreground()
        );

        let merged = merge(&source, &additional, self.strategy)?;
        drop(source);
        drop(additional);

        let mut options = WriteOptions::like(&source_meta)?;
        if let Some(block_shape) = &self.block_shape {
            options.block_shape = block_shape.clone();
        }
        if let Some(compression) = self.compression {
            options.compression = compression;
        }
        source_container.write_labels(&self.target_dataset, &merged.volume, &options)?;
        source_container.copy_attributes(&self.source_dataset, &self.target_dataset)?;

        Ok(merged.report)
    }
}
