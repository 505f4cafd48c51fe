/// Codeword stream to text decoding for the six ECC200 encodation schemes
use crate::error::DecodeError;

const ASCII_PAD: u8 = 129;
const ASCII_UPPER_SHIFT: u8 = 235;
const ASCII_FNC1: u8 = 232;
const STRUCTURED_APPEND: u8 = 233;
const READER_PROGRAMMING: u8 = 234;
const MACRO_05: u8 = 236;
const MACRO_06: u8 = 237;
const ECI: u8 = 241;
const LATCH_C40: u8 = 230;
const LATCH_BASE256: u8 = 231;
const LATCH_X12: u8 = 238;
const LATCH_TEXT: u8 = 239;
const LATCH_EDIFACT: u8 = 240;
const CTX_UNLATCH: u8 = 254;
const EDIFACT_UNLATCH: u8 = 31;

/// Default GS byte emitted for FNC1 inside C40/Text
const GS: u8 = 0x1d;

const MACRO_05_HEADER: &[u8] = b"[)>\x1e05\x1d";
const MACRO_06_HEADER: &[u8] = b"[)>\x1e06\x1d";
const MACRO_TRAILER: &[u8] = b"\x1e\x04";

/// Encodation scheme selected by a latch codeword
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    /// Default scheme: one character or two digits per codeword
    Ascii,
    /// Three upper-case characters per codeword pair
    C40,
    /// Three lower-case characters per codeword pair
    Text,
    /// ANSI X12 EDI set, three values per pair
    X12,
    /// Four 6-bit values per three codewords
    Edifact,
    /// Length-prefixed bytes, each randomized by position
    Base256,
}

impl Scheme {
    fn from_latch(codeword: u8) -> Scheme {
        match codeword {
            LATCH_C40 => Scheme::C40,
            LATCH_TEXT => Scheme::Text,
            LATCH_X12 => Scheme::X12,
            LATCH_EDIFACT => Scheme::Edifact,
            LATCH_BASE256 => Scheme::Base256,
            _ => Scheme::Ascii,
        }
    }
}

/// Decoded payload of a symbol
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DecodedText {
    /// Decoded bytes
    pub data: Vec<u8>,
    /// Codewords left after the first pad codeword
    pub pad_count: usize,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum C40Shift {
    Basic,
    Shift1,
    Shift2,
    Shift3,
}

/// Stateful reader over the data codewords of one symbol
pub struct CodewordDecoder<'a> {
    words: &'a [u8],
    fnc1: Option<u8>,
    output: Vec<u8>,
    pad_count: usize,
}

impl<'a> CodewordDecoder<'a> {
    /// Reader over `words`; FNC1 becomes `fnc1` or is dropped
    pub fn new(words: &'a [u8], fnc1: Option<u8>) -> Self {
        Self {
            words,
            fnc1,
            output: Vec::with_capacity(words.len() * 10),
            pad_count: 0,
        }
    }

    /// Decode every data codeword
    pub fn decode(mut self) -> Result<DecodedText, DecodeError> {
        let words = self.words;
        let end = words.len();

        let macro_header = match words.first() {
            Some(&MACRO_05) => Some(MACRO_05_HEADER),
            Some(&MACRO_06) => Some(MACRO_06_HEADER),
            _ => None,
        };
        if let Some(header) = macro_header {
            self.output.extend_from_slice(header);
        }

        let mut pos = 0usize;
        while pos < end {
            let scheme = Scheme::from_latch(words[pos]);
            if scheme != Scheme::Ascii {
                pos += 1;
            }
            pos = match scheme {
                Scheme::Ascii => self.decode_ascii(pos)?,
                Scheme::C40 | Scheme::Text => self.decode_c40_text(pos, scheme),
                Scheme::X12 => self.decode_x12(pos),
                Scheme::Edifact => self.decode_edifact(pos),
                Scheme::Base256 => self.decode_base256(pos)?,
            };
        }

        if macro_header.is_some() {
            self.output.extend_from_slice(MACRO_TRAILER);
        }

        Ok(DecodedText {
            data: self.output,
            pad_count: self.pad_count,
        })
    }

    fn decode_ascii(&mut self, mut pos: usize) -> Result<usize, DecodeError> {
        let end = self.words.len();
        let mut upper_shift = false;

        while pos < end {
            let codeword = self.words[pos];
            if Scheme::from_latch(codeword) != Scheme::Ascii {
                return Ok(pos);
            }
            pos += 1;

            if upper_shift {
                self.output.push(codeword.wrapping_add(127));
                upper_shift = false;
                continue;
            }

            match codeword {
                0 | ASCII_PAD => {
                    self.pad_count = end - pos;
                    return Ok(end);
                }
                1..=128 => self.output.push(codeword - 1),
                130..=229 => {
                    let digits = codeword - 130;
                    self.output.push(b'0' + digits / 10);
                    self.output.push(b'0' + digits % 10);
                }
                ASCII_UPPER_SHIFT => upper_shift = true,
                ASCII_FNC1 => {
                    if let Some(fnc1) = self.fnc1 {
                        self.output.push(fnc1);
                    }
                }
                STRUCTURED_APPEND | READER_PROGRAMMING | MACRO_05 | MACRO_06 | ECI => {}
                _ => {
                    return Err(DecodeError::InvalidCodeword {
                        value: codeword,
                        position: pos - 1,
                    });
                }
            }
        }

        Ok(pos)
    }

    /// Split a codeword pair into three base-40 values
    fn unpack_triplet(&self, pos: usize) -> [u8; 3] {
        let packed = ((self.words[pos] as u16) << 8 | self.words[pos + 1] as u16).wrapping_sub(1);
        [
            (packed / 1600) as u8,
            ((packed / 40) % 40) as u8,
            (packed % 40) as u8,
        ]
    }

    fn decode_c40_text(&mut self, mut pos: usize, scheme: Scheme) -> usize {
        let end = self.words.len();
        let mut shift = C40Shift::Basic;
        let mut upper_shift = false;

        while end - pos >= 2 {
            if self.words[pos] == CTX_UNLATCH {
                return pos + 1;
            }
            let values = self.unpack_triplet(pos);
            pos += 2;

            for v in values {
                let literal = match shift {
                    C40Shift::Basic => match v {
                        0..=2 => {
                            shift = match v {
                                0 => C40Shift::Shift1,
                                1 => C40Shift::Shift2,
                                _ => C40Shift::Shift3,
                            };
                            None
                        }
                        3 => Some(b' '),
                        4..=13 => Some(v - 4 + b'0'),
                        _ if scheme == Scheme::C40 => Some(v - 14 + b'A'),
                        _ => Some(v - 14 + b'a'),
                    },
                    C40Shift::Shift1 => Some(v),
                    C40Shift::Shift2 => match v {
                        0..=14 => Some(v + 33),
                        15..=21 => Some(v + 43),
                        22..=26 => Some(v + 69),
                        27 => Some(self.fnc1.unwrap_or(GS)),
                        30 => {
                            upper_shift = true;
                            shift = C40Shift::Basic;
                            None
                        }
                        _ => {
                            shift = C40Shift::Basic;
                            None
                        }
                    },
                    C40Shift::Shift3 => match scheme {
                        Scheme::C40 => Some(v + 96),
                        _ => match v {
                            0 => Some(b'`'),
                            1..=26 => Some(v - 1 + b'A'),
                            _ => Some(v - 27 + b'{'),
                        },
                    },
                };

                if let Some(byte) = literal {
                    let byte = if upper_shift { byte.wrapping_add(128) } else { byte };
                    self.output.push(byte);
                    upper_shift = false;
                    shift = C40Shift::Basic;
                }
            }

            if pos < end && self.words[pos] == CTX_UNLATCH {
                return pos + 1;
            }
        }

        pos
    }

    fn decode_x12(&mut self, mut pos: usize) -> usize {
        let end = self.words.len();

        while end - pos >= 2 {
            if self.words[pos] == CTX_UNLATCH {
                return pos + 1;
            }
            let values = self.unpack_triplet(pos);
            pos += 2;

            for v in values {
                match v {
                    0 => self.output.push(b'\r'),
                    1 => self.output.push(b'*'),
                    2 => self.output.push(b'>'),
                    3 => self.output.push(b' '),
                    4..=13 => self.output.push(v + 44),
                    14..=39 => self.output.push(v + 51),
                    _ => {}
                }
            }

            if pos < end && self.words[pos] == CTX_UNLATCH {
                return pos + 1;
            }
        }

        pos
    }

    fn decode_edifact(&mut self, mut pos: usize) -> usize {
        let end = self.words.len();

        while end - pos >= 3 {
            let (b0, b1, b2) = (self.words[pos], self.words[pos + 1], self.words[pos + 2]);
            let unpacked = [
                b0 >> 2,
                (b0 & 0x03) << 4 | (b1 & 0xf0) >> 4,
                (b1 & 0x0f) << 2 | (b2 & 0xc0) >> 6,
                b2 & 0x3f,
            ];

            for (i, v) in unpacked.into_iter().enumerate() {
                // The fourth value comes from the already consumed third byte
                if i < 3 {
                    pos += 1;
                }
                if v == EDIFACT_UNLATCH {
                    return pos;
                }
                self.output.push(v ^ (((v & 0x20) ^ 0x20) << 1));
            }
        }

        pos
    }

    fn decode_base256(&mut self, mut pos: usize) -> Result<usize, DecodeError> {
        let end = self.words.len();
        let unrandomize = |words: &[u8], idx: usize| -> u8 {
            let pseudo_random = ((149 * (idx + 1)) % 255 + 1) as u8;
            words[idx].wrapping_sub(pseudo_random)
        };

        if pos >= end {
            return Err(DecodeError::TruncatedStream);
        }
        let d0 = unrandomize(self.words, pos) as usize;
        pos += 1;

        let length = match d0 {
            0 => end - pos,
            1..=249 => d0,
            _ => {
                if pos >= end {
                    return Err(DecodeError::TruncatedStream);
                }
                let d1 = unrandomize(self.words, pos) as usize;
                pos += 1;
                (d0 - 249) * 250 + d1
            }
        };

        if pos + length > end {
            return Err(DecodeError::Base256Overrun { length });
        }

        for idx in pos..pos + length {
            self.output.push(unrandomize(self.words, idx));
        }

        Ok(pos + length)
    }
}

/// Decode the data codewords of a corrected symbol
pub fn decode_data_words(words: &[u8], fnc1: Option<u8>) -> Result<DecodedText, DecodeError> {
    CodewordDecoder::new(words, fnc1).decode()
}
