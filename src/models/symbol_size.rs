//! ECC200 symbol size table (24 square sizes followed by 6 rectangular sizes)

/// Immutable description of one ECC200 symbol size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolSize {
    /// Position in [`SYMBOL_SIZES`]
    pub index: usize,
    /// Symbol rows including the finder and calibration border
    pub rows: usize,
    /// Symbol columns including the finder and calibration border
    pub cols: usize,
    /// Data rows per data region
    pub region_rows: usize,
    /// Data columns per data region
    pub region_cols: usize,
    /// Data regions across
    pub horiz_regions: usize,
    /// Data regions down
    pub vert_regions: usize,
    /// Number of interleaved Reed-Solomon blocks
    pub interleaved_blocks: usize,
    /// Error codewords per block
    pub block_error_words: usize,
    /// Maximum correctable errors per block
    pub block_max_correctable: usize,
    /// Total data codewords in the symbol
    pub data_words: usize,
}

#[allow(clippy::too_many_arguments)]
const fn size(
    index: usize,
    rows: usize,
    cols: usize,
    region_rows: usize,
    region_cols: usize,
    horiz_regions: usize,
    vert_regions: usize,
    interleaved_blocks: usize,
    block_error_words: usize,
    block_max_correctable: usize,
    data_words: usize,
) -> SymbolSize {
    SymbolSize {
        index,
        rows,
        cols,
        region_rows,
        region_cols,
        horiz_regions,
        vert_regions,
        interleaved_blocks,
        block_error_words,
        block_max_correctable,
        data_words,
    }
}

/// Number of square sizes at the start of [`SYMBOL_SIZES`]
pub const SQUARE_COUNT: usize = 24;
/// Number of rectangular sizes at the end of [`SYMBOL_SIZES`]
pub const RECT_COUNT: usize = 6;

/// All supported ECC200 sizes
pub static SYMBOL_SIZES: [SymbolSize; SQUARE_COUNT + RECT_COUNT] = [
    size(0, 10, 10, 8, 8, 1, 1, 1, 5, 2, 3),
    size(1, 12, 12, 10, 10, 1, 1, 1, 7, 3, 5),
    size(2, 14, 14, 12, 12, 1, 1, 1, 10, 5, 8),
    size(3, 16, 16, 14, 14, 1, 1, 1, 12, 6, 12),
    size(4, 18, 18, 16, 16, 1, 1, 1, 14, 7, 18),
    size(5, 20, 20, 18, 18, 1, 1, 1, 18, 9, 22),
    size(6, 22, 22, 20, 20, 1, 1, 1, 20, 10, 30),
    size(7, 24, 24, 22, 22, 1, 1, 1, 24, 12, 36),
    size(8, 26, 26, 24, 24, 1, 1, 1, 28, 14, 44),
    size(9, 32, 32, 14, 14, 2, 2, 1, 36, 18, 62),
    size(10, 36, 36, 16, 16, 2, 2, 1, 42, 21, 86),
    size(11, 40, 40, 18, 18, 2, 2, 1, 48, 24, 114),
    size(12, 44, 44, 20, 20, 2, 2, 1, 56, 28, 144),
    size(13, 48, 48, 22, 22, 2, 2, 1, 68, 34, 174),
    size(14, 52, 52, 24, 24, 2, 2, 2, 42, 21, 204),
    size(15, 64, 64, 14, 14, 4, 4, 2, 56, 28, 280),
    size(16, 72, 72, 16, 16, 4, 4, 4, 36, 18, 368),
    size(17, 80, 80, 18, 18, 4, 4, 4, 48, 24, 456),
    size(18, 88, 88, 20, 20, 4, 4, 4, 56, 28, 576),
    size(19, 96, 96, 22, 22, 4, 4, 4, 68, 34, 696),
    size(20, 104, 104, 24, 24, 4, 4, 6, 56, 28, 816),
    size(21, 120, 120, 18, 18, 6, 6, 6, 68, 34, 1050),
    size(22, 132, 132, 20, 20, 6, 6, 8, 62, 31, 1304),
    size(23, 144, 144, 22, 22, 6, 6, 10, 62, 31, 1558),
    size(24, 8, 18, 6, 16, 1, 1, 1, 7, 3, 5),
    size(25, 8, 32, 6, 14, 2, 1, 1, 11, 5, 10),
    size(26, 12, 26, 10, 24, 1, 1, 1, 14, 7, 16),
    size(27, 12, 36, 10, 16, 2, 1, 1, 18, 9, 22),
    size(28, 16, 36, 14, 16, 2, 1, 1, 24, 12, 32),
    size(29, 16, 48, 14, 22, 2, 1, 1, 28, 14, 49),
];

impl SymbolSize {
    /// Look up a size by its table index
    pub fn from_index(index: usize) -> Option<&'static SymbolSize> {
        SYMBOL_SIZES.get(index)
    }

    /// Look up a size by its symbol dimensions
    pub fn from_dimensions(rows: usize, cols: usize) -> Option<&'static SymbolSize> {
        SYMBOL_SIZES.iter().find(|s| s.rows == rows && s.cols == cols)
    }

    /// Smallest size of the given shape holding at least `data_len` codewords
    pub fn smallest_for(shape: SymbolShape, data_len: usize) -> Option<&'static SymbolSize> {
        shape
            .candidates()
            .iter()
            .find(|s| s.data_words >= data_len)
    }

    /// True for the 24 square sizes
    pub fn is_square(&self) -> bool {
        self.index < SQUARE_COUNT
    }

    /// Rows of the placement (mapping) matrix
    pub fn mapping_rows(&self) -> usize {
        self.region_rows * self.vert_regions
    }

    /// Columns of the placement (mapping) matrix
    pub fn mapping_cols(&self) -> usize {
        self.region_cols * self.horiz_regions
    }

    /// Total error codewords in the symbol
    pub fn error_words(&self) -> usize {
        self.block_error_words * self.interleaved_blocks
    }

    /// Data plus error codewords
    pub fn total_words(&self) -> usize {
        self.data_words + self.error_words()
    }

    /// Data codewords carried by one interleaved block
    ///
    /// 144x144 is the only size whose data words don't split evenly: its first
    /// eight blocks carry one extra word.
    pub fn block_data_words(&self, block: usize) -> usize {
        let count = self.data_words / self.interleaved_blocks;
        if self.index == SQUARE_COUNT - 1 && block < 8 {
            count + 1
        } else {
            count
        }
    }
}

/// Broad symbol shape used to restrict the size search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolShape {
    /// Square and rectangular sizes
    Any,
    /// Square sizes only
    Square,
    /// Rectangular sizes only
    Rectangle,
}

impl SymbolShape {
    /// Sizes of this shape in table order
    pub fn candidates(&self) -> &'static [SymbolSize] {
        match self {
            SymbolShape::Any => &SYMBOL_SIZES[..],
            SymbolShape::Square => &SYMBOL_SIZES[..SQUARE_COUNT],
            SymbolShape::Rectangle => &SYMBOL_SIZES[SQUARE_COUNT..],
        }
    }
}

/// Caller's hint about which sizes to try
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SizeRequest {
    /// Any square or rectangular size
    #[default]
    ShapeAuto,
    /// Any square size
    SquareAuto,
    /// Any rectangular size
    RectAuto,
    /// Exactly one size (index into [`SYMBOL_SIZES`])
    Fixed(usize),
}

impl SizeRequest {
    /// Shape family implied by the request
    pub fn shape(&self) -> SymbolShape {
        match self {
            SizeRequest::ShapeAuto => SymbolShape::Any,
            SizeRequest::SquareAuto => SymbolShape::Square,
            SizeRequest::RectAuto => SymbolShape::Rectangle,
            SizeRequest::Fixed(idx) if *idx < SQUARE_COUNT => SymbolShape::Square,
            SizeRequest::Fixed(_) => SymbolShape::Rectangle,
        }
    }

    /// Sizes to test during size determination
    pub fn candidates(&self) -> &'static [SymbolSize] {
        match self {
            SizeRequest::Fixed(idx) => SYMBOL_SIZES
                .get(*idx..*idx + 1)
                .unwrap_or(&[]),
            other => other.shape().candidates(),
        }
    }
}
