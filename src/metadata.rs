use std::{borrow::Cow, fmt, num::NonZeroU64, str::FromStr, sync::Arc};

use serde::{Deserialize, Serialize};
use zarrs::{
    array::{
        ArrayMetadataV3, DataType, FillValueMetadata,
        chunk_grid::{RegularBoundedChunkGrid, RegularBoundedChunkGridConfiguration},
        codec::{Bz2Codec, Bz2CompressionLevel, GzipCodec},
        data_type,
    },
    group::GroupMetadataV3,
    metadata::v3::{MetadataV3, NodeMetadataV3},
    plugin::ExtensionAliasesV3,
};

use crate::{
    chunk_key_encoding::N5ChunkKeyEncoding,
    codec::{N5Codec, N5CodecConfiguration},
};

/// Version written to the root of newly created hierarchies.
pub const N5_VERSION: &str = "4.0.0";

/// Keys of `attributes.json` which describe the node itself rather than its content.
pub const RESERVED_KEYS: [&str; 5] = ["n5", "dimensions", "blockSize", "dataType", "compression"];

/// Unstructured attributes of an N5 node.
pub type Attributes = serde_json::Map<String, serde_json::Value>;

/// Drop the structural keys from a raw `attributes.json` map.
pub fn user_attributes(mut raw: Attributes) -> Attributes {
    for key in RESERVED_KEYS {
        raw.remove(key);
    }
    raw
}

/// Representation of N5 metadata, either an array or a group.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum N5Metadata {
    Array(N5ArrayMetadata),
    Group(N5GroupMetadata),
}

/// Representation of N5 group metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct N5GroupMetadata {
    /// N5 version; present if this is a hierarchy root.
    #[serde(rename = "n5", default, skip_serializing_if = "Option::is_none")]
    pub n5_version: Option<String>,
    #[serde(flatten)]
    pub attributes: Attributes,
}

impl N5GroupMetadata {
    /// Metadata for the root of a new hierarchy.
    pub fn root() -> Self {
        Self {
            n5_version: Some(N5_VERSION.to_owned()),
            attributes: Attributes::new(),
        }
    }
}

/// Representation of N5 dataset metadata.
///
/// N5 lists dimensions fastest-varying first (F order), the reverse of the
/// C order used by [`crate::LabeledVolume`] and by Zarr;
/// use [`N5ArrayMetadata::shape`] and [`N5ArrayMetadata::block_shape`] for C order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct N5ArrayMetadata {
    /// N5 version; present if this is a hierarchy root.
    #[serde(rename = "n5", default, skip_serializing_if = "Option::is_none")]
    pub n5_version: Option<String>,
    pub dimensions: Vec<u64>,
    pub block_size: Vec<u64>,
    /// Data type as a string, e.g. `uint64`.
    pub data_type: String,
    #[serde(default)]
    pub compression: N5Compression,
    #[serde(flatten)]
    pub attributes: Attributes,
}

impl N5ArrayMetadata {
    /// Build dataset metadata from C-order shapes.
    pub fn new(
        shape: &[u64],
        block_shape: &[u64],
        data_type: LabelDataType,
        compression: N5Compression,
    ) -> Self {
        Self {
            n5_version: None,
            dimensions: shape.iter().rev().copied().collect(),
            block_size: block_shape.iter().rev().copied().collect(),
            data_type: data_type.to_string(),
            compression,
            attributes: Attributes::new(),
        }
    }

    /// Array shape in C order.
    pub fn shape(&self) -> Vec<u64> {
        self.dimensions.iter().rev().copied().collect()
    }

    /// Block shape in C order.
    pub fn block_shape(&self) -> Vec<u64> {
        self.block_size.iter().rev().copied().collect()
    }

    /// The data type, if it can hold labels.
    pub fn label_data_type(&self) -> crate::Result<LabelDataType> {
        self.data_type.parse()
    }
}

/// N5 block compression configuration.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Copy)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum N5Compression {
    /// Uncompressed.
    #[default]
    Raw,
    Bzip2 {
        /// Must be in the range 1..=9.
        #[serde(rename = "blockSize", default = "default_bzip2_block_size")]
        block_size: u8,
    },
    Gzip {
        /// -1 means "implementation default", which is 6.
        #[serde(default = "default_gzip_level")]
        level: i8,
    },
    Lz4 {
        #[serde(rename = "blockSize", default = "default_lz4_block_size")]
        block_size: u64,
    },
    Xz {
        #[serde(default = "default_xz_preset")]
        preset: u32,
    },
}

fn default_bzip2_block_size() -> u8 {
    9
}

fn default_gzip_level() -> i8 {
    -1
}

fn default_lz4_block_size() -> u64 {
    65536
}

fn default_xz_preset() -> u32 {
    6
}

impl N5Compression {
    /// Convert to a bytes-to-bytes codec; `None` for raw blocks.
    pub fn to_bytes_to_bytes_codec(
        &self,
    ) -> crate::Result<Option<Arc<dyn zarrs_codec::BytesToBytesCodecTraits>>> {
        match self {
            N5Compression::Raw => Ok(None),
            N5Compression::Bzip2 { block_size } => Ok(Some(Arc::new(Bz2Codec::new(
                Bz2CompressionLevel::new(u32::from(*block_size))
                    .map_err(|n| crate::Error::general(format!("invalid bz2 block size {n}")))?,
            )))),
            N5Compression::Gzip { level } => {
                let level = match *level {
                    -1 => 6,
                    n @ 0..=9 => n as u32,
                    n => {
                        return Err(crate::Error::general(format!(
                            "invalid gzip compression level {n}"
                        )));
                    }
                };
                Ok(Some(Arc::new(
                    GzipCodec::new(level).map_err(crate::Error::wrap)?,
                )))
            }
            c => Err(crate::Error::general(format!(
                "unsupported N5 compression: {c:?}"
            ))),
        }
    }
}

impl FromStr for N5Compression {
    type Err = crate::Error;

    /// Parse a compression name with its N5 defaults.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raw" => Ok(Self::Raw),
            "gzip" => Ok(Self::Gzip {
                level: default_gzip_level(),
            }),
            "bzip2" => Ok(Self::Bzip2 {
                block_size: default_bzip2_block_size(),
            }),
            s => Err(crate::Error::general(format!(
                "unsupported N5 compression: {s}"
            ))),
        }
    }
}

/// Integer data types which can hold labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelDataType {
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Int8,
    Int16,
    Int32,
    Int64,
}

impl LabelDataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uint8 => "uint8",
            Self::Uint16 => "uint16",
            Self::Uint32 => "uint32",
            Self::Uint64 => "uint64",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
        }
    }

    /// Largest label representable by this type.
    pub fn max_label(&self) -> u64 {
        match self {
            Self::Uint8 => u8::MAX.into(),
            Self::Uint16 => u16::MAX.into(),
            Self::Uint32 => u32::MAX.into(),
            Self::Uint64 => u64::MAX,
            Self::Int8 => i8::MAX as u64,
            Self::Int16 => i16::MAX as u64,
            Self::Int32 => i32::MAX as u64,
            Self::Int64 => i64::MAX as u64,
        }
    }

    pub fn to_zarr(&self) -> DataType {
        match self {
            Self::Uint8 => data_type::uint8(),
            Self::Uint16 => data_type::uint16(),
            Self::Uint32 => data_type::uint32(),
            Self::Uint64 => data_type::uint64(),
            Self::Int8 => data_type::int8(),
            Self::Int16 => data_type::int16(),
            Self::Int32 => data_type::int32(),
            Self::Int64 => data_type::int64(),
        }
    }
}

impl fmt::Display for LabelDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LabelDataType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let dt = match s {
            "uint8" => Self::Uint8,
            "uint16" => Self::Uint16,
            "uint32" => Self::Uint32,
            "uint64" => Self::Uint64,
            "int8" => Self::Int8,
            "int16" => Self::Int16,
            "int32" => Self::Int32,
            "int64" => Self::Int64,
            s => return Err(crate::Error::UnsupportedDataType(s.to_owned())),
        };
        Ok(dt)
    }
}

/// Reverses block_size and creates regular chunk grid
fn convert_chunk_grid(block_size: &[u64]) -> crate::Result<MetadataV3> {
    let chunk_shape: Vec<_> = block_size
        .iter()
        .rev()
        .map(|&n| NonZeroU64::new(n).ok_or_else(|| crate::Error::general("zero block size")))
        .collect::<crate::Result<_>>()?;
    let out = MetadataV3::new_with_serializable_configuration(
        RegularBoundedChunkGrid::aliases_v3()
            .default_name
            .clone()
            .to_string(),
        &RegularBoundedChunkGridConfiguration { chunk_shape },
    )?;
    Ok(out)
}

fn convert_data_type(data_type: LabelDataType) -> MetadataV3 {
    let data_type = data_type.to_zarr();
    let name = data_type
        .name_v3()
        .map_or_else(String::new, Cow::into_owned);
    let configuration = data_type.configuration_v3();
    if configuration.is_empty() {
        MetadataV3::new(name)
    } else {
        MetadataV3::new_with_configuration(name, configuration)
    }
}

fn convert_codec(compression: N5Compression) -> crate::Result<MetadataV3> {
    // fail early on compressions the codec cannot handle
    compression.to_bytes_to_bytes_codec()?;
    let out = MetadataV3::new_with_serializable_configuration(
        N5Codec::aliases_v3().default_name.clone().to_string(),
        &N5CodecConfiguration { compression },
    )?;
    Ok(out)
}

fn convert_chunk_key_encoding() -> MetadataV3 {
    MetadataV3::new(
        N5ChunkKeyEncoding::aliases_v3()
            .default_name
            .clone()
            .to_string(),
    )
}

impl From<N5GroupMetadata> for GroupMetadataV3 {
    fn from(value: N5GroupMetadata) -> Self {
        Self::default().with_attributes(value.attributes)
    }
}

impl TryFrom<N5ArrayMetadata> for ArrayMetadataV3 {
    type Error = crate::Error;

    fn try_from(value: N5ArrayMetadata) -> Result<Self, Self::Error> {
        if value.dimensions.len() != value.block_size.len() {
            return Err(crate::Error::general(format!(
                "{} dimensions but {} block sizes",
                value.dimensions.len(),
                value.block_size.len()
            )));
        }
        let shape = value.shape();
        let chunk_grid = convert_chunk_grid(&value.block_size)?;
        let data_type = convert_data_type(value.label_data_type()?);
        let fill_value = FillValueMetadata::Number(serde_json::Number::from(0));
        let codec = convert_codec(value.compression)?;
        let out = Self::new(shape, chunk_grid, data_type, fill_value, vec![codec])
            .with_chunk_key_encoding(convert_chunk_key_encoding())
            .with_attributes(value.attributes);
        Ok(out)
    }
}

impl TryFrom<N5Metadata> for NodeMetadataV3 {
    type Error = crate::Error;

    fn try_from(value: N5Metadata) -> Result<Self, Self::Error> {
        match value {
            N5Metadata::Array(m) => m.try_into().map(Self::Array),
            N5Metadata::Group(m) => Ok(Self::Group(m.into())),
        }
    }
}
