//! n5-label-merge CLI
//!
//! Relabel an additional label volume, merge it into a source volume,
//! and write the result next to the source with the source's attributes.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use n5_label_merge::metadata::N5Compression;
use n5_label_merge::{MergeJob, MergeStrategy};

fn parse_compression(s: &str) -> Result<N5Compression, String> {
    s.parse().map_err(|e: n5_label_merge::Error| e.to_string())
}

#[derive(Parser, Debug)]
#[command(name = "n5-label-merge")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Merge an additional label volume into a source label volume")]
#[command(long_about = "Merge an additional label volume into a source label volume\n\n\
    The additional volume's labels are renumbered to 1..=K (background stays 0)\n\
    and written over the source wherever the additional volume is foreground.\n\
    The merged volume is written into the source container at TARGET_DATASET,\n\
    then the source dataset's attributes are copied onto it.\n\n\
    Example:\n\
      n5-label-merge sample_C.n5 sample_C_syngt.n5 \\\n\
        /volumes/labels/clefts /volumes/labels/clefts_corrected")]
struct Cli {
    /// N5 container holding the source volume; the result is written here
    #[arg(required_unless_present = "job", value_name = "SOURCE_CONTAINER")]
    source_container: Option<PathBuf>,

    /// N5 container holding the additional volume
    #[arg(required_unless_present = "job", value_name = "ADDITIONAL_CONTAINER")]
    additional_container: Option<PathBuf>,

    /// Dataset of the source volume, e.g. /volumes/labels/clefts
    #[arg(required_unless_present = "job", value_name = "SOURCE_DATASET")]
    source_dataset: Option<String>,

    /// Dataset to write the merged volume to
    #[arg(required_unless_present = "job", value_name = "TARGET_DATASET")]
    target_dataset: Option<String>,

    /// Dataset of the additional volume
    #[arg(long, default_value = "data", value_name = "DATASET")]
    additional_dataset: String,

    /// How additional labels are placed relative to source labels
    #[arg(long, value_enum)]
    strategy: Option<MergeStrategy>,

    /// Output block shape, comma separated in C order [default: as source]
    #[arg(long, value_delimiter = ',', value_name = "N,N,...")]
    block_shape: Option<Vec<u64>>,

    /// Output compression: raw, gzip or bzip2 [default: as source]
    #[arg(long, value_parser = parse_compression)]
    compression: Option<N5Compression>,

    /// Read the job from a JSON file instead of positional arguments
    #[arg(long, value_name = "FILE", conflicts_with_all = [
        "source_container", "additional_container", "source_dataset", "target_dataset",
        "additional_dataset",
    ])]
    job: Option<PathBuf>,
}

impl Cli {
    fn into_job(self) -> n5_label_merge::Result<MergeJob> {
        let mut job = match (
            self.job,
            self.source_container,
            self.additional_container,
            self.source_dataset,
            self.target_dataset,
        ) {
            (Some(path), ..) => MergeJob::from_json_file(path)?,
            (None, Some(source), Some(additional), Some(source_ds), Some(target_ds)) => {
                let mut job = MergeJob::new(source, additional, source_ds, target_ds);
                job.additional_dataset = self.additional_dataset;
                job
            }
            _ => {
                return Err(n5_label_merge::Error::general(
                    "four positional arguments or --job are required",
                ));
            }
        };
        if let Some(strategy) = self.strategy {
            job.strategy = strategy;
        }
        if self.block_shape.is_some() {
            job.block_shape = self.block_shape;
        }
        if self.compression.is_some() {
            job.compression = self.compression;
        }
        Ok(job)
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let report = match cli.into_job().and_then(|job| job.run()) {
        Ok(report) => report,
        Err(e) => {
            log::error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    match serde_json::to_string_pretty(&report) {
        Ok(s) => println!("{s}"),
        Err(e) => log::warn!("could not serialize merge report: {e}"),
    }
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positional_invocation() {
        let cli = Cli::try_parse_from([
            "n5-label-merge",
            "a.n5",
            "b.n5",
            "/volumes/labels/clefts",
            "/volumes/labels/clefts_corrected",
            "--strategy",
            "offset",
            "--block-shape",
            "4,32,32",
            "--compression",
            "gzip",
        ])
        .unwrap();
        let job = cli.into_job().unwrap();
        assert_eq!(job.additional_dataset, "data");
        assert_eq!(job.strategy, MergeStrategy::Offset);
        assert_eq!(job.block_shape, Some(vec![4, 32, 32]));
        assert_eq!(job.compression, Some(N5Compression::Gzip { level: -1 }));
    }

    #[test]
    fn positional_arguments_required_without_job() {
        assert!(Cli::try_parse_from(["n5-label-merge", "a.n5"]).is_err());
    }

    #[test]
    fn job_conflicts_with_positionals() {
        assert!(Cli::try_parse_from(["n5-label-merge", "a.n5", "--job", "job.json"]).is_err());
    }

    #[test]
    fn unknown_compression_rejected() {
        assert!(
            Cli::try_parse_from([
                "n5-label-merge", "a", "b", "c", "d", "--compression", "lz4"
            ])
            .is_err()
        );
    }
}
