use bytes::{Buf, Bytes};
use zarrs::{
    metadata::v3::NodeMetadataV3,
    storage::{
        ListableStorageTraits, MaybeBytes, MaybeBytesIterator, ReadableStorageTraits, StorageError,
        StoreKey, StoreKeys, StoreKeysPrefixes, StorePrefix,
        byte_range::{ByteRange, ByteRangeIterator},
    },
};

use crate::metadata::N5Metadata;

const ZARR_JSON: &str = "zarr.json";
const ATTRIBUTES_JSON: &str = "attributes.json";

/// Read-only view of an N5 hierarchy which presents `attributes.json` to zarrs as `zarr.json`.
///
/// Block keys are passed through untouched;
/// the [`crate::chunk_key_encoding::N5ChunkKeyEncoding`] already produces N5 block paths.
pub struct N5Store<R> {
    inner: R,
}

impl<R> N5Store<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// The `attributes.json` key standing in for a requested `zarr.json` key.
    fn attributes_key(key: &StoreKey) -> Option<StoreKey> {
        let prefix = key.as_str().strip_suffix(ZARR_JSON)?;
        if !(prefix.is_empty() || prefix.ends_with('/')) {
            return None;
        }
        StoreKey::new(format!("{prefix}{ATTRIBUTES_JSON}")).ok()
    }

    /// Translate N5 node metadata into the equivalent Zarr V3 metadata.
    fn convert_metadata(key: &StoreKey, bytes: MaybeBytes) -> Result<MaybeBytes, StorageError> {
        let Some(b) = bytes else {
            return Ok(None);
        };
        let invalid = |msg: String| StorageError::InvalidMetadata(key.clone(), msg);
        let n5: N5Metadata = serde_json::from_reader(b.reader())
            .map_err(|e| invalid(format!("could not parse N5 metadata: {e}")))?;
        let zarr: NodeMetadataV3 = n5
            .try_into()
            .map_err(|e| invalid(format!("could not convert N5 metadata: {e}")))?;
        let v = serde_json::to_vec(&zarr)
            .map_err(|e| invalid(format!("could not serialize Zarr metadata: {e}")))?;
        Ok(Some(Bytes::from(v)))
    }
}

impl<R: ReadableStorageTraits> ReadableStorageTraits for N5Store<R> {
    fn size_key(&self, key: &StoreKey) -> Result<Option<u64>, StorageError> {
        match Self::attributes_key(key) {
            Some(k) => self.inner.size_key(&k),
            None => self.inner.size_key(key),
        }
    }

    fn supports_get_partial(&self) -> bool {
        false
    }

    fn get(&self, key: &StoreKey) -> Result<MaybeBytes, StorageError> {
        match Self::attributes_key(key) {
            Some(k) => Self::convert_metadata(&k, self.inner.get(&k)?),
            None => self.inner.get(key),
        }
    }

    fn get_partial_many<'a>(
        &'a self,
        _key: &StoreKey,
        _byte_ranges: ByteRangeIterator<'a>,
    ) -> Result<MaybeBytesIterator<'a>, StorageError> {
        Err(StorageError::Unsupported(
            "N5 blocks cannot be read partially".into(),
        ))
    }

    fn get_partial(
        &self,
        _key: &StoreKey,
        _byte_range: ByteRange,
    ) -> Result<MaybeBytes, StorageError> {
        Err(StorageError::Unsupported(
            "N5 blocks cannot be read partially".into(),
        ))
    }
}

impl<R: ListableStorageTraits> ListableStorageTraits for N5Store<R> {
    fn list(&self) -> Result<StoreKeys, StorageError> {
        self.inner.list()
    }

    fn list_prefix(&self, prefix: &StorePrefix) -> Result<StoreKeys, StorageError> {
        self.inner.list_prefix(prefix)
    }

    fn list_dir(&self, prefix: &StorePrefix) -> Result<StoreKeysPrefixes, StorageError> {
        self.inner.list_dir(prefix)
    }

    fn size_prefix(&self, prefix: &StorePrefix) -> Result<u64, StorageError> {
        self.inner.size_prefix(prefix)
    }

    fn size(&self) -> Result<u64, StorageError> {
        self.inner.size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> StoreKey {
        StoreKey::new(s).unwrap()
    }

    #[test]
    fn zarr_json_maps_to_attributes_json() {
        let k = N5Store::<()>::attributes_key(&key("volumes/labels/zarr.json")).unwrap();
        assert_eq!(k.as_str(), "volumes/labels/attributes.json");
        let root = N5Store::<()>::attributes_key(&key("zarr.json")).unwrap();
        assert_eq!(root.as_str(), "attributes.json");
    }

    #[test]
    fn other_keys_pass_through() {
        assert!(N5Store::<()>::attributes_key(&key("volumes/labels/0/0/1")).is_none());
        assert!(N5Store::<()>::attributes_key(&key("volumes/notzarr.json")).is_none());
    }
}
