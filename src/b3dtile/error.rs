//! Error types for the tile kernel

/// Result type for tile operations
pub type TileResult<T> = Result<T, TileError>;

/// Errors raised while decoding a tile buffer
#[derive(thiserror::Error, Debug)]
pub enum TileError {
    /// A declared array or subtree extends past the end of the buffer
    #[error("tile buffer truncated in {section}: need {needed} bytes, have {len}")]
    Truncated {
        section: &'static str,
        needed: usize,
        len: usize,
    },
}
