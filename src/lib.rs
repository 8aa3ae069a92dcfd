//! Merge labelled volumes stored in N5 containers.
//!
//! A second ("additional") label volume is relabelled to consecutive integers
//! and overlaid onto a source volume; the result is written back into the
//! source container alongside a copy of the source dataset's attributes.
//!
//! N5 datasets are read and written through [`zarrs`] using the N5 codec and
//! chunk key encoding plugins defined here.
pub mod chunk;
pub mod chunk_key_encoding;
pub mod codec;
pub mod container;
mod error;
pub mod job;
pub mod merge;
pub mod metadata;
pub mod relabel;
pub mod storage;
mod volume;

pub use zarrs;

pub use container::{N5Container, WriteOptions};
pub use error::{Error, Result};
pub use job::MergeJob;
pub use merge::{MergeReport, MergeStrategy, Merged, merge};
pub use volume::LabeledVolume;
