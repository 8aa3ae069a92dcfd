/// Header at the start of every N5 block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct N5ChunkHeader {
    pub(crate) mode: N5ChunkMode,
    /// N5 (F) order, i.e. the reverse of the Zarr chunk shape.
    pub(crate) shape: Vec<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum N5ChunkMode {
    Default,
    /// Varlength blocks carry an extra element count after the shape; not supported.
    VarLen,
    Object,
}

impl N5ChunkMode {
    fn discriminant(&self) -> u16 {
        match self {
            Self::Default => 0,
            Self::VarLen => 1,
            Self::Object => 2,
        }
    }
}

fn read_u16(bytes: &[u8], offset: usize) -> crate::Result<u16> {
    let raw = bytes
        .get(offset..offset + 2)
        .ok_or_else(|| crate::Error::general("truncated N5 block header"))?;
    Ok(u16::from_be_bytes(raw.try_into().map_err(crate::Error::wrap)?))
}

fn read_u32(bytes: &[u8], offset: usize) -> crate::Result<u32> {
    let raw = bytes
        .get(offset..offset + 4)
        .ok_or_else(|| crate::Error::general("truncated N5 block header"))?;
    Ok(u32::from_be_bytes(raw.try_into().map_err(crate::Error::wrap)?))
}

impl N5ChunkHeader {
    /// Header of a default-mode block with the given Zarr (C order) shape.
    pub(crate) fn for_zarr_shape(shape: &[u64]) -> crate::Result<Self> {
        let shape = shape
            .iter()
            .rev()
            .map(|&n| {
                u32::try_from(n)
                    .map_err(|_| crate::Error::general(format!("block extent {n} exceeds u32")))
            })
            .collect::<crate::Result<_>>()?;
        Ok(Self {
            mode: N5ChunkMode::Default,
            shape,
        })
    }

    pub(crate) fn from_bytes(bytes: &[u8]) -> crate::Result<Self> {
        let mode_num = read_u16(bytes, 0)?;
        let ndim = read_u16(bytes, 2)? as usize;
        let shape = (0..ndim)
            .map(|d| read_u32(bytes, 4 + d * 4))
            .collect::<crate::Result<Vec<_>>>()?;
        let mode = match mode_num {
            0 => N5ChunkMode::Default,
            1 => N5ChunkMode::VarLen,
            2 => N5ChunkMode::Object,
            n => return Err(crate::Error::general(format!("invalid N5 chunk mode {n}"))),
        };
        Ok(N5ChunkHeader { mode, shape })
    }

    pub(crate) fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.data_offset());
        out.extend_from_slice(&self.mode.discriminant().to_be_bytes());
        out.extend_from_slice(&(self.shape.len() as u16).to_be_bytes());
        for n in &self.shape {
            out.extend_from_slice(&n.to_be_bytes());
        }
        out
    }

    pub(crate) fn data_offset(&self) -> usize {
        size_of::<u16>()  // mode discriminator
            + size_of::<u16>() // ndim
            + self.shape.len() * size_of::<u32>() // shape
    }
}
