use zarrs::{
    array::{
        ChunkKeyEncoding, ChunkKeyEncodingTraits,
        chunk_key_encoding::{self as cke, api::ChunkKeyEncodingPlugin},
    },
    plugin::PluginConfigurationInvalidError,
    storage::StoreKey,
};

/// Block paths as N5 lays them out: grid indices in reverse order, separated by `/`.
#[derive(Debug, Clone, Copy)]
pub struct N5ChunkKeyEncoding;

zarrs::plugin::impl_extension_aliases!(N5ChunkKeyEncoding, v3: "zarrs.n5", ["zarrs.n5", "n5"]);
inventory::submit! {
    ChunkKeyEncodingPlugin::new::<N5ChunkKeyEncoding>()
}

/// Relative block path for Zarr (C order) chunk grid indices.
pub fn n5_block_path(chunk_grid_indices: &[u64]) -> String {
    chunk_grid_indices
        .iter()
        .rev()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join("/")
}

impl ChunkKeyEncodingTraits for N5ChunkKeyEncoding {
    fn create(
        metadata: &zarrs::metadata::v3::MetadataV3,
    ) -> Result<cke::api::ChunkKeyEncoding, zarrs::plugin::PluginCreateError>
    where
        Self: Sized,
    {
        if !matches!(metadata.name(), "zarrs.n5" | "n5") {
            return Err(zarrs::plugin::PluginCreateError::NameInvalid {
                name: metadata.name().into(),
            });
        }
        if !metadata.configuration_is_none_or_empty() {
            return Err(zarrs::plugin::PluginCreateError::ConfigurationInvalid(
                PluginConfigurationInvalidError::new(
                    "N5 chunk key encoding takes no configuration".into(),
                ),
            ));
        }
        Ok(ChunkKeyEncoding::new(Self))
    }

    fn configuration(&self) -> zarrs::metadata::Configuration {
        Default::default()
    }

    fn encode(&self, chunk_grid_indices: &[u64]) -> StoreKey {
        StoreKey::new(n5_block_path(chunk_grid_indices)).expect("block path should be a valid key")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_path_reverses_indices() {
        assert_eq!(n5_block_path(&[3, 1, 0]), "0/1/3");
        assert_eq!(n5_block_path(&[7]), "7");
    }
}
