use zarrs::storage::StorageError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    General(String),
    #[error("volume shapes differ: source {source_shape:?}, additional {additional_shape:?}")]
    ShapeMismatch {
        source_shape: Vec<u64>,
        additional_shape: Vec<u64>,
    },
    #[error("volume with shape {shape:?} needs {expected} elements, got {actual}")]
    ElementCount {
        shape: Vec<u64>,
        expected: u64,
        actual: usize,
    },
    #[error("target dataset {target_dataset:?} overlaps source dataset {source_dataset:?}")]
    OverlappingDatasets {
        source_dataset: String,
        target_dataset: String,
    },
    #[error("no N5 container at {0}")]
    ContainerNotFound(String),
    #[error("no node at {0:?}")]
    NodeNotFound(String),
    #[error("node at {0:?} is a group, not a dataset")]
    NotADataset(String),
    #[error("unsupported label data type: {0}")]
    UnsupportedDataType(String),
    #[error("negative label {value} in signed dataset")]
    NegativeLabel { value: i64 },
    #[error("label {value} does not fit in {data_type}")]
    LabelOverflow { value: u64, data_type: String },
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Wrapped(Box<dyn std::error::Error>),
}

impl Error {
    pub fn general(message: impl Into<String>) -> Self {
        Self::General(message.into())
    }

    pub fn wrap(error: impl std::error::Error + 'static) -> Self {
        Self::Wrapped(Box::new(error))
    }
}
