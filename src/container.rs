use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use zarrs::{
    array::{Array, ArrayMetadata, ArrayMetadataV3},
    filesystem::FilesystemStore,
    storage::{
        ReadableListableStorage, ReadableStorageTraits, StoreKey, StorePrefix,
        WritableStorageTraits,
    },
};

use crate::metadata::{
    Attributes, LabelDataType, N5ArrayMetadata, N5Compression, N5GroupMetadata, N5Metadata,
    user_attributes,
};
use crate::storage::N5Store;
use crate::{Error, LabeledVolume, Result};

const ATTRIBUTES_JSON: &str = "attributes.json";

/// How a labelled volume is laid out on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOptions {
    pub data_type: LabelDataType,
    /// Block shape in C order; must have one entry per volume dimension.
    pub block_shape: Vec<u64>,
    pub compression: N5Compression,
}

impl WriteOptions {
    /// Lay out a volume the same way as an existing dataset.
    pub fn like(dataset: &N5ArrayMetadata) -> Result<Self> {
        Ok(Self {
            data_type: dataset.label_data_type()?,
            block_shape: dataset.block_shape(),
            compression: dataset.compression,
        })
    }
}

/// Normalise a node path to `a/b/c`, with the root as the empty string.
pub(crate) fn node_path(path: &str) -> String {
    path.split('/')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

fn attributes_key(node: &str) -> Result<StoreKey> {
    let key = if node.is_empty() {
        ATTRIBUTES_JSON.to_owned()
    } else {
        format!("{node}/{ATTRIBUTES_JSON}")
    };
    StoreKey::new(key).map_err(Error::wrap)
}

fn widen<T: Into<u64>>(values: Vec<T>) -> Vec<u64> {
    values.into_iter().map(Into::into).collect()
}

fn widen_signed<T: Into<i64>>(values: Vec<T>) -> Result<Vec<u64>> {
    values
        .into_iter()
        .map(|v| {
            let v: i64 = v.into();
            u64::try_from(v).map_err(|_| Error::NegativeLabel { value: v })
        })
        .collect()
}

fn narrow<T: TryFrom<u64>>(values: &[u64], data_type: LabelDataType) -> Result<Vec<T>> {
    values
        .iter()
        .map(|&v| {
            T::try_from(v).map_err(|_| Error::LabelOverflow {
                value: v,
                data_type: data_type.to_string(),
            })
        })
        .collect()
}

/// An N5 hierarchy on the local filesystem.
///
/// Store handles are owned by the container and released when it is dropped.
pub struct N5Container {
    root: PathBuf,
    reader: ReadableListableStorage,
    writer: Arc<FilesystemStore>,
}

impl N5Container {
    /// Open an existing hierarchy.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(Error::ContainerNotFound(root.display().to_string()));
        }
        let reader: ReadableListableStorage = Arc::new(N5Store::new(
            FilesystemStore::new(&root).map_err(Error::wrap)?,
        ));
        let writer = Arc::new(FilesystemStore::new(&root).map_err(Error::wrap)?);
        log::debug!("opened N5 container at {}", root.display());
        Ok(Self {
            root,
            reader,
            writer,
        })
    }

    /// Open a hierarchy, creating its directory and root metadata if necessary.
    pub fn create(root: impl AsRef<Path>) -> Result<Self> {
        std::fs::create_dir_all(root.as_ref())?;
        let container = Self::open(root)?;
        container.ensure_group("")?;
        Ok(container)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether a group or dataset exists at `path`.
    pub fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.raw_attributes(&node_path(path))?.is_some())
    }

    fn raw_attributes(&self, node: &str) -> Result<Option<Attributes>> {
        let Some(bytes) = self.writer.get(&attributes_key(node)?)? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    fn require_attributes(&self, node: &str) -> Result<Attributes> {
        self.raw_attributes(node)?
            .ok_or_else(|| Error::NodeNotFound(format!("/{node}")))
    }

    fn write_raw_attributes(&self, node: &str, attributes: &Attributes) -> Result<()> {
        let bytes = serde_json::to_vec(attributes)?;
        self.writer
            .set(&attributes_key(node)?, Bytes::from(bytes))?;
        Ok(())
    }

    /// Write group metadata at `node` and its ancestors where none exists.
    fn ensure_group(&self, node: &str) -> Result<()> {
        if self.raw_attributes("")?.is_none() {
            let serde_json::Value::Object(root) = serde_json::to_value(N5GroupMetadata::root())?
            else {
                return Err(Error::general("group metadata is not a JSON object"));
            };
            self.write_raw_attributes("", &root)?;
        }
        let mut ancestor = String::new();
        for part in node.split('/').filter(|s| !s.is_empty()) {
            if !ancestor.is_empty() {
                ancestor.push('/');
            }
            ancestor.push_str(part);
            if self.raw_attributes(&ancestor)?.is_none() {
                log::debug!("creating group /{ancestor}");
                self.write_raw_attributes(&ancestor, &Attributes::new())?;
            }
        }
        Ok(())
    }

    /// Metadata of the dataset at `path`.
    pub fn dataset(&self, path: &str) -> Result<N5ArrayMetadata> {
        let node = node_path(path);
        let raw = self.require_attributes(&node)?;
        match serde_json::from_value(serde_json::Value::Object(raw))? {
            N5Metadata::Array(meta) => Ok(meta),
            N5Metadata::Group(_) => Err(Error::NotADataset(format!("/{node}"))),
        }
    }

    /// User attributes of the node at `path`, without the N5 structural keys.
    pub fn attributes(&self, path: &str) -> Result<Attributes> {
        let raw = self.require_attributes(&node_path(path))?;
        Ok(user_attributes(raw))
    }

    /// Add `attributes` to the node at `path`, replacing same-named attributes.
    ///
    /// Structural keys in `attributes` are ignored.
    pub fn set_attributes(&self, path: &str, attributes: Attributes) -> Result<()> {
        let node = node_path(path);
        let mut raw = self.require_attributes(&node)?;
        raw.extend(user_attributes(attributes));
        self.write_raw_attributes(&node, &raw)
    }

    /// Copy every user attribute of `source_path` onto `target_path`.
    ///
    /// Attributes only present on the target are left alone.
    pub fn copy_attributes(&self, source_path: &str, target_path: &str) -> Result<usize> {
        let attributes = self.attributes(source_path)?;
        let count = attributes.len();
        self.set_attributes(target_path, attributes)?;
        log::info!("copied {count} attributes from {source_path} to {target_path}");
        Ok(count)
    }

    /// Read a whole labelled dataset into memory.
    pub fn read_labels(&self, path: &str) -> Result<(LabeledVolume, LabelDataType)> {
        let node = node_path(path);
        let data_type = self.dataset(&node)?.label_data_type()?;
        let array = Array::open(self.reader.clone(), &format!("/{node}")).map_err(Error::wrap)?;
        let subset = array.subset_all();
        let shape = array.shape().to_vec();
        log::debug!("reading /{node}: {shape:?} {data_type}");

        let values = match data_type {
            LabelDataType::Uint8 => widen(
                array
                    .retrieve_array_subset::<Vec<u8>>(&subset)
                    .map_err(Error::wrap)?,
            ),
            LabelDataType::Uint16 => widen(
                array
                    .retrieve_array_subset::<Vec<u16>>(&subset)
                    .map_err(Error::wrap)?,
            ),
            LabelDataType::Uint32 => widen(
                array
                    .retrieve_array_subset::<Vec<u32>>(&subset)
                    .map_err(Error::wrap)?,
            ),
            LabelDataType::Uint64 => array
                .retrieve_array_subset::<Vec<u64>>(&subset)
                .map_err(Error::wrap)?,
            LabelDataType::Int8 => widen_signed(
                array
                    .retrieve_array_subset::<Vec<i8>>(&subset)
                    .map_err(Error::wrap)?,
            )?,
            LabelDataType::Int16 => widen_signed(
                array
                    .retrieve_array_subset::<Vec<i16>>(&subset)
                    .map_err(Error::wrap)?,
            )?,
            LabelDataType::Int32 => widen_signed(
                array
                    .retrieve_array_subset::<Vec<i32>>(&subset)
                    .map_err(Error::wrap)?,
            )?,
            LabelDataType::Int64 => widen_signed(
                array
                    .retrieve_array_subset::<Vec<i64>>(&subset)
                    .map_err(Error::wrap)?,
            )?,
        };
        Ok((LabeledVolume::new(shape, values)?, data_type))
    }

    /// Write `volume` as a dataset at `path`, replacing anything already there.
    ///
    /// Missing parent groups are created.
    pub fn write_labels(
        &self,
        path: &str,
        volume: &LabeledVolume,
        options: &WriteOptions,
    ) -> Result<()> {
        let node = node_path(path);
        if node.is_empty() {
            return Err(Error::general("cannot write a dataset at the container root"));
        }
        if options.block_shape.len() != volume.shape().len() {
            return Err(Error::general(format!(
                "block shape {:?} does not match volume shape {:?}",
                options.block_shape,
                volume.shape()
            )));
        }
        let max_label = volume.max_label();
        if max_label > options.data_type.max_label() {
            return Err(Error::LabelOverflow {
                value: max_label,
                data_type: options.data_type.to_string(),
            });
        }

        if self.exists(&node)? {
            log::info!("replacing existing node /{node}");
            self.writer
                .erase_prefix(&StorePrefix::new(format!("{node}/")).map_err(Error::wrap)?)?;
        }
        if let Some((parent, _)) = node.rsplit_once('/') {
            self.ensure_group(parent)?;
        } else {
            self.ensure_group("")?;
        }

        let n5_meta = N5ArrayMetadata::new(
            volume.shape(),
            &options.block_shape,
            options.data_type,
            options.compression,
        );
        let zarr_meta: ArrayMetadataV3 = n5_meta.clone().try_into()?;
        let array = Array::new_with_metadata(
            self.writer.clone(),
            &format!("/{node}"),
            ArrayMetadata::V3(zarr_meta),
        )
        .map_err(Error::wrap)?;

        let serde_json::Value::Object(raw) = serde_json::to_value(&n5_meta)? else {
            return Err(Error::general("dataset metadata is not a JSON object"));
        };
        self.write_raw_attributes(&node, &raw)?;

        let subset = array.subset_all();
        let values = volume.values();
        let dt = options.data_type;
        match dt {
            LabelDataType::Uint8 => array.store_array_subset(&subset, &narrow::<u8>(values, dt)?),
            LabelDataType::Uint16 => {
                array.store_array_subset(&subset, &narrow::<u16>(values, dt)?)
            }
            LabelDataType::Uint32 => {
                array.store_array_subset(&subset, &narrow::<u32>(values, dt)?)
            }
            LabelDataType::Uint64 => array.store_array_subset(&subset, &values.to_vec()),
            LabelDataType::Int8 => array.store_array_subset(&subset, &narrow::<i8>(values, dt)?),
            LabelDataType::Int16 => {
                array.store_array_subset(&subset, &narrow::<i16>(values, dt)?)
            }
            LabelDataType::Int32 => {
                array.store_array_subset(&subset, &narrow::<i32>(values, dt)?)
            }
            LabelDataType::Int64 => {
                array.store_array_subset(&subset, &narrow::<i64>(values, dt)?)
            }
        }
        .map_err(Error::wrap)?;

        log::info!(
            "wrote /{node}: {:?} {} in blocks of {:?} ({:?})",
            volume.shape(),
            options.data_type,
            options.block_shape,
            options.compression
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_paths_are_normalised() {
        assert_eq!(node_path("/volumes/labels/clefts"), "volumes/labels/clefts");
        assert_eq!(node_path("volumes//labels/"), "volumes/labels");
        assert_eq!(node_path("/"), "");
    }

    #[test]
    fn signed_labels_must_be_non_negative() {
        assert_eq!(widen_signed(vec![0i16, 3]).unwrap(), vec![0, 3]);
        assert!(matches!(
            widen_signed(vec![1i32, -2]),
            Err(Error::NegativeLabel { value: -2 })
        ));
    }

    #[test]
    fn narrowing_reports_overflow() {
        assert_eq!(narrow::<u8>(&[1, 255], LabelDataType::Uint8).unwrap(), vec![1, 255]);
        assert!(matches!(
            narrow::<i8>(&[200], LabelDataType::Int8),
            Err(Error::LabelOverflow { value: 200, .. })
        ));
    }
}
