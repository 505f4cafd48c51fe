use thiserror::Error;

/// Failures that abort decoding a located symbol or reject the input image
///
/// Region rejections during the search are not errors; the detector stages
/// return `None` and the scan moves on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Width, height or channel count is zero
    #[error("image has zero width, height or channels")]
    EmptyImage,

    /// Pixel buffer shorter than the stated dimensions require
    #[error("pixel buffer holds {actual} bytes, expected at least {expected}")]
    BufferSize {
        /// Bytes needed for the stated dimensions
        expected: usize,
        /// Bytes supplied
        actual: usize,
    },

    /// An interleaved block has more errors than its error words can repair
    #[error("Reed-Solomon block {block} is uncorrectable")]
    UncorrectableBlock {
        /// Zero-based interleave index
        block: usize,
    },

    /// A codeword has no meaning in the active encodation scheme
    #[error("invalid codeword {value} at position {position}")]
    InvalidCodeword {
        /// Offending codeword
        value: u8,
        /// Index into the data words
        position: usize,
    },

    /// Data words ran out mid-segment
    #[error("codeword stream ended inside an encodation segment")]
    TruncatedStream,

    /// Base256 length field points past the last data word
    #[error("Base256 segment length {length} overruns the data words")]
    Base256Overrun {
        /// Declared segment length
        length: usize,
    },
}
