/// Decoded symbol record
pub mod datamatrix;
/// Point types
pub mod point;
/// ECC200 symbol size table
pub mod symbol_size;

pub use datamatrix::DataMatrix;
pub use point::{PixelLoc, Point};
pub use symbol_size::{SizeRequest, SymbolShape, SymbolSize, SYMBOL_SIZES};
