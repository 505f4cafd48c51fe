//! Per-symbol message buffers and the sampling → placement → RS → text pipeline

use crate::decoder::encodation::{DecodedText, decode_data_words};
use crate::decoder::modules::populate_array;
use crate::decoder::placement::extract_codewords;
use crate::decoder::reed_solomon::correct_symbol;
use crate::detector::region::Region;
use crate::error::DecodeError;
use crate::models::SymbolSize;
use crate::utils::image::LumaImage;

/// Buffers for one symbol once its size is known
#[derive(Debug, Clone)]
pub struct Message {
    /// Symbol size the region was fitted to
    pub size: &'static SymbolSize,
    /// Mapping matrix, one flag byte per module, row 0 at the top
    pub array: Vec<u8>,
    /// Data words followed by the interleaved error words
    pub code: Vec<u8>,
}

impl Message {
    /// Sample every data module of `region`
    pub fn sample(image: &LumaImage, region: &Region) -> Self {
        Self {
            size: region.size,
            array: populate_array(image, region),
            code: Vec::new(),
        }
    }

    /// Read the codewords out of the module array and repair them in place
    pub fn correct(&mut self) -> Result<(), DecodeError> {
        self.code = extract_codewords(self.size, &mut self.array);
        correct_symbol(self.size, &mut self.code)
    }

    /// Corrected data words, error words excluded
    pub fn data_words(&self) -> &[u8] {
        let end = self.size.data_words.min(self.code.len());
        &self.code[..end]
    }

    /// Decode the data words into output bytes
    pub fn decode_text(&self, fnc1: Option<u8>) -> Result<DecodedText, DecodeError> {
        decode_data_words(self.data_words(), fnc1)
    }
}

/// Run the whole message pipeline over a sized region
pub fn decode_region(
    image: &LumaImage,
    region: &Region,
    fnc1: Option<u8>,
) -> Result<DecodedText, DecodeError> {
    let mut message = Message::sample(image, region);
    message.correct()?;
    message.decode_text(fnc1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::placement::render_codewords;
    use crate::decoder::reed_solomon::encode_symbol;

    #[test]
    fn test_correct_repairs_damaged_codewords() {
        let size = SymbolSize::from_dimensions(12, 12).unwrap();
        let mut code = encode_symbol(size, &[66, 50, 129, 220, 115]);
        code[0] ^= 0xFF;
        code[7] ^= 0x5A;
        let array = render_codewords(size, &code);

        let mut message = Message {
            size,
            array,
            code: Vec::new(),
        };
        message.correct().unwrap();
        assert_eq!(message.data_words().len(), size.data_words);
        let text = message.decode_text(None).unwrap();
        assert_eq!(text.data, b"A1");
        assert_eq!(text.pad_count, 2);
    }

    #[test]
    fn test_uncorrectable_message() {
        let size = SymbolSize::from_dimensions(10, 10).unwrap();
        let mut message = Message {
            size,
            array: vec![0x10; size.mapping_rows() * size.mapping_cols()],
            code: Vec::new(),
        };
        // Inverting all modules of a valid symbol leaves far too many errors
        let code = encode_symbol(size, &[66, 50, 129]);
        let rendered = render_codewords(size, &code);
        for (m, r) in message.array.iter_mut().zip(rendered) {
            *m = (r ^ 0x07) | 0x10;
        }
        assert!(message.correct().is_err());
    }
}
