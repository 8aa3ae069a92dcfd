use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::relabel::{fill_background, relabel_consecutive};
use crate::{Error, LabeledVolume, Result};

/// How relabelled components of the additional volume are placed in the output.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum MergeStrategy {
    /// Additional components keep their consecutive labels `1..=K`
    /// and replace the source wherever the additional volume is foreground.
    /// These labels can coincide with existing source labels.
    #[default]
    Overlay,
    /// As `Overlay`, but additional components are shifted above the source's
    /// maximum label so that they never coincide with a source label.
    Offset,
}

/// Summary of a merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    pub strategy: MergeStrategy,
    /// Maximum label of the source volume.
    pub background_label: u64,
    /// Number of distinct components in the additional volume.
    pub num_components: usize,
    /// Number of elements taken from the additional volume.
    pub num_replaced: usize,
    /// Original additional label to the label it has in the output.
    pub mapping: BTreeMap<u64, u64>,
}

#[derive(Debug, Clone)]
pub struct Merged {
    pub volume: LabeledVolume,
    /// The additional volume relabelled to `1..=K` with its background filled
    /// with the background label, before any strategy offset.
    pub filled: LabeledVolume,
    pub report: MergeReport,
}

/// Merge `additional` into `source`.
///
/// The additional volume is relabelled to `1..=K` (zeros kept) and its background
/// is filled with the source's maximum label, giving [`Merged::filled`].
/// Wherever the additional volume was foreground, the filled value (shifted per
/// `strategy`) replaces the source value; elsewhere the source value is kept.
pub fn merge(
    source: &LabeledVolume,
    additional: &LabeledVolume,
    strategy: MergeStrategy,
) -> Result<Merged> {
    source.check_same_shape(additional)?;

    let background_label = source.max_label();
    let relabeling = relabel_consecutive(additional.values(), 1, true);
    let num_components = relabeling.num_labels();
    let mut filled = relabeling.values;
    fill_background(&mut filled, background_label);

    let offset = match strategy {
        MergeStrategy::Overlay => 0,
        MergeStrategy::Offset => background_label,
    };
    let shift = |label: u64| {
        label.checked_add(offset).ok_or(Error::LabelOverflow {
            value: label,
            data_type: "uint64".into(),
        })
    };

    let mut num_replaced = 0;
    let values = source
        .values()
        .iter()
        .zip(additional.values())
        .zip(&filled)
        .map(|((&src, &add), &label)| {
            if add == 0 {
                Ok(src)
            } else {
                num_replaced += 1;
                shift(label)
            }
        })
        .collect::<Result<Vec<_>>>()?;

    let mapping = relabeling
        .mapping
        .into_iter()
        .map(|(old, new)| Ok((old, shift(new)?)))
        .collect::<Result<_>>()?;

    log::info!(
        "merged {num_components} additional components into {num_replaced} elements \
         (background label {background_label}, {strategy:?})"
    );

    Ok(Merged {
        volume: LabeledVolume::new(source.shape().to_vec(), values)?,
        filled: LabeledVolume::new(source.shape().to_vec(), filled)?,
        report: MergeReport {
            strategy,
            background_label,
            num_components,
            num_replaced,
            mapping,
        },
    })
}
