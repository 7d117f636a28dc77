pub type Result<T> = std::result::Result<T, MosaicError>;

#[derive(thiserror::Error, Debug)]
pub enum MosaicError {
    #[cfg(feature = "gdal")]
    #[error(transparent)]
    GdalError(#[from] gdal::errors::GdalError),
    #[error(transparent)]
    NdarrayError(#[from] ndarray::ShapeError),
    #[error("There is no intersection between geometries")]
    NoIntersection,
    #[error("Pixel to world transform is not invertible")]
    NotInvertible,
    #[error("Virtual band needs at least one source entry")]
    EmptyVirtualBand,
    #[error("Expected geometry in crs {expected}, found {found}")]
    CrsMismatch { expected: String, found: String },
    #[error("Aggregate has no envelope")]
    NoEnvelope,
    #[error("Band {band} out of range for {count} bands")]
    BandOutOfRange { band: usize, count: usize },
    #[error("Sources do not share the same resolution")]
    ResolutionMismatch,
    #[error("Sources are not aligned on a common pixel grid")]
    Misaligned,
    #[error("Sources do not share the same band count ({0} <-> {1})")]
    BandCountMismatch(usize, usize),
    #[error("Buffer of {len} samples does not fit shape {shape:?}")]
    ShapeMismatch { len: usize, shape: [usize; 3] },
    #[error("Source unavailable: {0}")]
    Source(String),
}

impl MosaicError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }
}
