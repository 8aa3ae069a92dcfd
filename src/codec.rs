use std::borrow::Cow;
use std::num::NonZeroU64;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use zarrs::array::codec::BytesCodec;
use zarrs::array::{CodecChain, DataType, FillValue};
use zarrs::metadata::v3::MetadataV3;
use zarrs::plugin::PluginCreateError;
use zarrs_codec::{
    ArrayBytes, ArrayBytesRaw, ArrayCodecTraits, ArrayToBytesCodecTraits, BytesRepresentation,
    Codec, CodecError, CodecOptions, CodecPluginV3, CodecTraits, CodecTraitsV3,
};

use crate::chunk::{N5ChunkHeader, N5ChunkMode};
use crate::metadata::N5Compression;

zarrs::plugin::impl_extension_aliases!(N5Codec, v3: "zarrs.n5", ["zarrs.n5", "n5"]);
inventory::submit! {
    CodecPluginV3::new::<N5Codec>()
}

/// Array-to-bytes codec for whole N5 blocks: header, big-endian elements, optional compression.
#[derive(Debug, Clone)]
pub struct N5Codec {
    compression: N5Compression,
    /// Big-endian bytes codec followed by at most one compressor.
    codecs: CodecChain,
}

impl N5Codec {
    pub fn new(compression: N5Compression) -> crate::Result<Self> {
        let codecs = CodecChain::new(
            vec![],
            Arc::new(BytesCodec::big()),
            compression.to_bytes_to_bytes_codec()?.into_iter().collect(),
        );
        Ok(Self {
            compression,
            codecs,
        })
    }

    pub fn new_with_configuration(
        configuration: &N5CodecConfiguration,
    ) -> Result<Self, PluginCreateError> {
        Self::new(configuration.compression).map_err(|e| PluginCreateError::Other(e.to_string()))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Copy)]
pub struct N5CodecConfiguration {
    pub compression: N5Compression,
}

fn codec_error(e: crate::Error) -> CodecError {
    CodecError::Other(e.to_string())
}

impl CodecTraitsV3 for N5Codec {
    fn create(metadata: &MetadataV3) -> Result<Codec, PluginCreateError>
    where
        Self: Sized,
    {
        let configuration = metadata.to_typed_configuration()?;
        let codec = Arc::new(N5Codec::new_with_configuration(&configuration)?);
        Ok(Codec::ArrayToBytes(codec))
    }
}

impl CodecTraits for N5Codec {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn configuration(
        &self,
        _version: zarrs::plugin::ZarrVersion,
        _options: &zarrs_codec::CodecMetadataOptions,
    ) -> Option<zarrs::metadata::Configuration> {
        let config = N5CodecConfiguration {
            compression: self.compression,
        };
        match serde_json::to_value(config).ok()? {
            serde_json::Value::Object(map) => Some(map.into()),
            _ => None,
        }
    }

    fn partial_decoder_capability(&self) -> zarrs_codec::PartialDecoderCapability {
        zarrs_codec::PartialDecoderCapability {
            partial_read: false,
            partial_decode: false,
        }
    }

    fn partial_encoder_capability(&self) -> zarrs_codec::PartialEncoderCapability {
        zarrs_codec::PartialEncoderCapability {
            partial_encode: false,
        }
    }
}

impl ArrayCodecTraits for N5Codec {
    fn recommended_concurrency(
        &self,
        _shape: &[NonZeroU64],
        _data_type: &DataType,
    ) -> Result<zarrs_codec::RecommendedConcurrency, CodecError> {
        Ok(zarrs_codec::RecommendedConcurrency::new_maximum(1))
    }
}

impl ArrayToBytesCodecTraits for N5Codec {
    fn into_dyn(self: Arc<Self>) -> Arc<dyn ArrayToBytesCodecTraits> {
        self
    }

    fn encoded_representation(
        &self,
        shape: &[NonZeroU64],
        data_type: &DataType,
        _fill_value: &FillValue,
    ) -> Result<BytesRepresentation, CodecError> {
        let ret = match data_type.fixed_size() {
            Some(fs) if self.compression == N5Compression::Raw => {
                let numel: u64 = shape.iter().map(|n| n.get()).product();
                let header = (2 + 2 + 4 * shape.len()) as u64;
                BytesRepresentation::BoundedSize(header + numel * fs as u64)
            }
            _ => BytesRepresentation::UnboundedSize,
        };
        Ok(ret)
    }

    fn encode<'a>(
        &self,
        bytes: ArrayBytes<'a>,
        shape: &[NonZeroU64],
        data_type: &DataType,
        fill_value: &FillValue,
        options: &CodecOptions,
    ) -> Result<ArrayBytesRaw<'a>, CodecError> {
        let zarr_shape: Vec<u64> = shape.iter().map(|n| n.get()).collect();
        let header = N5ChunkHeader::for_zarr_shape(&zarr_shape).map_err(codec_error)?;
        let payload = self
            .codecs
            .encode(bytes, shape, data_type, fill_value, options)?;

        let mut out = header.to_bytes();
        out.extend_from_slice(&payload);
        Ok(Cow::Owned(out))
    }

    fn decode<'a>(
        &self,
        bytes: ArrayBytesRaw<'a>,
        shape: &[NonZeroU64],
        data_type: &DataType,
        fill_value: &FillValue,
        options: &CodecOptions,
    ) -> Result<ArrayBytes<'a>, CodecError> {
        let header = N5ChunkHeader::from_bytes(&bytes)
            .map_err(|e| CodecError::Other(format!("N5 block header could not be parsed: {e}")))?;

        if !matches!(header.mode, N5ChunkMode::Default) {
            return Err(CodecError::Other(format!(
                "unsupported N5 block mode: {:?}",
                header.mode
            )));
        }

        // the regular bounded chunk grid truncates edge chunks the same way N5 does
        let expected = N5ChunkHeader::for_zarr_shape(
            &shape.iter().map(|n| n.get()).collect::<Vec<_>>(),
        )
        .map_err(codec_error)?;
        if header.shape != expected.shape {
            return Err(CodecError::Other(format!(
                "N5 block header has shape {:?}, expected {:?}",
                header.shape, expected.shape,
            )));
        }

        let payload = match bytes {
            Cow::Borrowed(b) => Cow::Borrowed(&b[header.data_offset()..]),
            Cow::Owned(mut v) => {
                v.drain(..header.data_offset());
                Cow::Owned(v)
            }
        };
        self.codecs
            .decode(payload, shape, data_type, fill_value, options)
    }
}
