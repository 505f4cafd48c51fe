/// Reed-Solomon error correction for ECC200 symbols
/// ECC200 uses RS over GF(256) with primitive polynomial x^8 + x^5 + x^3 + x^2 + 1 (301)
/// and generator roots alpha^1 .. alpha^n
use crate::error::DecodeError;
use crate::models::SymbolSize;

/// GF(256) field operations using log/exp tables
pub struct Gf256;

const PRIMITIVE_POLY: u16 = 301;

const fn build_tables() -> ([u8; 256], [u8; 255]) {
    let mut log = [0u8; 256];
    let mut exp = [0u8; 255];
    let mut value: u16 = 1;
    let mut i = 0;
    while i < 255 {
        exp[i] = value as u8;
        log[value as usize] = i as u8;
        value <<= 1;
        if value & 0x100 != 0 {
            value ^= PRIMITIVE_POLY;
        }
        i += 1;
    }
    (log, exp)
}

static TABLES: ([u8; 256], [u8; 255]) = build_tables();

impl Gf256 {
    #[inline]
    fn log(a: u8) -> usize {
        TABLES.0[a as usize] as usize
    }

    /// alpha^n
    #[inline]
    pub fn exp(n: usize) -> u8 {
        TABLES.1[n % 255]
    }

    /// Multiplication through the log tables
    pub fn mul(a: u8, b: u8) -> u8 {
        if a == 0 || b == 0 {
            return 0;
        }
        Self::exp(Self::log(a) + Self::log(b))
    }

    /// Division; `None` for a zero divisor
    pub fn div(a: u8, b: u8) -> Option<u8> {
        if b == 0 {
            return None;
        }
        if a == 0 {
            return Some(0);
        }
        Some(Self::exp(Self::log(a) + 255 - Self::log(b)))
    }

    /// a^n
    pub fn pow(a: u8, n: usize) -> u8 {
        if a == 0 {
            return if n == 0 { 1 } else { 0 };
        }
        Self::exp(Self::log(a) * (n % 255))
    }
}

/// Evaluate a polynomial with ascending coefficients at `x`
fn poly_eval(poly: &[u8], x: u8) -> u8 {
    poly.iter().rev().fold(0u8, |acc, &c| Gf256::mul(acc, x) ^ c)
}

/// Reed-Solomon decoder for one ECC200 block
///
/// Blocks are laid out data words first, then error words, with `block[0]`
/// the coefficient of the highest power.
pub struct ReedSolomonDecoder {
    num_ecc_codewords: usize,
    max_correctable: usize,
}

impl ReedSolomonDecoder {
    /// Decoder for blocks with `num_ecc_codewords` error words
    pub fn new(num_ecc_codewords: usize, max_correctable: usize) -> Self {
        Self {
            num_ecc_codewords,
            max_correctable,
        }
    }

    /// Correct `received` in place
    pub fn decode(&self, received: &mut [u8]) -> Result<(), &'static str> {
        if received.len() > 255 || received.len() <= self.num_ecc_codewords {
            return Err("Block length out of range");
        }

        let syndrome = self.calculate_syndrome(received);
        if syndrome.iter().all(|&s| s == 0) {
            return Ok(());
        }

        let sigma = self.find_error_locator(&syndrome)?;
        let error_positions = self.find_error_positions(&sigma, received.len())?;
        let error_values = self.find_error_values(&sigma, &syndrome, &error_positions, received.len())?;

        for (&pos, &value) in error_positions.iter().zip(&error_values) {
            received[pos] ^= value;
        }

        // Verify syndrome is now zero
        if self.calculate_syndrome(received).iter().any(|&s| s != 0) {
            return Err("Uncorrectable error");
        }

        Ok(())
    }

    /// S_i = r(alpha^i) for i in 1..=n, returned with S_1 at index 0
    fn calculate_syndrome(&self, received: &[u8]) -> Vec<u8> {
        (1..=self.num_ecc_codewords)
            .map(|i| {
                let x = Gf256::exp(i);
                received.iter().fold(0u8, |acc, &c| Gf256::mul(acc, x) ^ c)
            })
            .collect()
    }

    /// Berlekamp-Massey: ascending error-locator coefficients, sigma[0] = 1
    fn find_error_locator(&self, syndrome: &[u8]) -> Result<Vec<u8>, &'static str> {
        let mut sigma = vec![1u8];
        let mut prev = vec![1u8];
        let mut prev_delta: u8 = 1;
        let mut l = 0usize;
        let mut m = 1usize;

        for (i, &s) in syndrome.iter().enumerate() {
            // Once the register has produced L + t syndromes it is unique
            if i >= l + self.max_correctable {
                break;
            }

            let mut delta = s;
            for j in 1..=l.min(sigma.len() - 1) {
                delta ^= Gf256::mul(sigma[j], syndrome[i - j]);
            }

            if delta == 0 {
                m += 1;
                continue;
            }

            let d = Gf256::div(delta, prev_delta).ok_or("Zero discrepancy divisor")?;
            let snapshot = sigma.clone();
            if sigma.len() < prev.len() + m {
                sigma.resize(prev.len() + m, 0);
            }
            for (j, &b) in prev.iter().enumerate() {
                sigma[j + m] ^= Gf256::mul(d, b);
            }

            if 2 * l <= i {
                l = i + 1 - l;
                prev = snapshot;
                prev_delta = delta;
                m = 1;
            } else {
                m += 1;
            }
        }

        if l > self.max_correctable {
            return Err("Too many errors");
        }
        sigma.resize(l + 1, 0);
        Ok(sigma)
    }

    /// Chien search over all 255 nonzero field elements
    fn find_error_positions(&self, sigma: &[u8], n: usize) -> Result<Vec<usize>, &'static str> {
        let degree = sigma.len() - 1;
        let mut positions = Vec::with_capacity(degree);

        for i in 1..=255usize {
            if poly_eval(sigma, Gf256::exp(i)) != 0 {
                continue;
            }
            // Root alpha^i is X^-1 for error locator X = alpha^(255 - i)
            let power = (255 - i) % 255;
            if power >= n {
                return Err("Error located outside block");
            }
            positions.push(n - 1 - power);
        }

        if positions.len() != degree {
            return Err("Wrong number of error positions found");
        }

        Ok(positions)
    }

    /// Forney algorithm for generator roots starting at alpha^1
    fn find_error_values(
        &self,
        sigma: &[u8],
        syndrome: &[u8],
        error_positions: &[usize],
        n: usize,
    ) -> Result<Vec<u8>, &'static str> {
        // omega = S(x) * sigma(x) mod x^n, with S(x) = S_1 + S_2 x + ...
        let mut omega = vec![0u8; syndrome.len()];
        for (i, slot) in omega.iter_mut().enumerate() {
            for j in 0..=i.min(sigma.len() - 1) {
                *slot ^= Gf256::mul(sigma[j], syndrome[i - j]);
            }
        }

        error_positions
            .iter()
            .map(|&pos| {
                let power = n - 1 - pos;
                let x_inv = Gf256::exp(255 - power % 255);

                let omega_val = poly_eval(&omega, x_inv);

                // sigma'(x) = sum over odd i of sigma[i] * x^(i-1)
                let mut sigma_prime_val = 0u8;
                for (i, &coeff) in sigma.iter().enumerate().skip(1).step_by(2) {
                    sigma_prime_val ^= Gf256::mul(coeff, Gf256::pow(x_inv, i - 1));
                }

                Gf256::div(omega_val, sigma_prime_val).ok_or("Sigma derivative is zero")
            })
            .collect()
    }
}

/// Systematic Reed-Solomon encoder for one block
pub struct ReedSolomonEncoder {
    generator: Vec<u8>,
}

impl ReedSolomonEncoder {
    /// Generator prod_{i=1..n} (x + alpha^i), descending coefficients without the leading 1
    pub fn new(num_ecc_codewords: usize) -> Self {
        let mut gpoly = vec![1u8];
        for i in 1..=num_ecc_codewords {
            let root = Gf256::exp(i);
            let mut next = vec![0u8; gpoly.len() + 1];
            for (j, &c) in gpoly.iter().enumerate() {
                next[j] ^= c;
                next[j + 1] ^= Gf256::mul(c, root);
            }
            gpoly = next;
        }
        gpoly.remove(0);
        Self { generator: gpoly }
    }

    /// Error words for `data` (remainder of data * x^n / g)
    pub fn encode(&self, data: &[u8]) -> Vec<u8> {
        let n = self.generator.len();
        let mut remainder = vec![0u8; n];
        for &d in data {
            let factor = d ^ remainder[0];
            remainder.rotate_left(1);
            remainder[n - 1] = 0;
            for (r, &g) in remainder.iter_mut().zip(&self.generator) {
                *r ^= Gf256::mul(g, factor);
            }
        }
        remainder
    }
}

/// Gather interleaved block `block` (data then error words) from the symbol stream
fn gather_block(size: &SymbolSize, codewords: &[u8], block: usize) -> Vec<u8> {
    let step = size.interleaved_blocks;
    let mut out: Vec<u8> = codewords[..size.data_words]
        .iter()
        .skip(block)
        .step_by(step)
        .copied()
        .collect();
    out.extend(
        codewords[size.data_words..size.total_words()]
            .iter()
            .skip(block)
            .step_by(step),
    );
    out
}

fn scatter_block(size: &SymbolSize, codewords: &mut [u8], block: usize, words: &[u8]) {
    let step = size.interleaved_blocks;
    let data_len = size.block_data_words(block);
    let (data, ecc) = words.split_at(data_len);
    for (k, &w) in data.iter().enumerate() {
        codewords[block + k * step] = w;
    }
    for (k, &w) in ecc.iter().enumerate() {
        codewords[size.data_words + block + k * step] = w;
    }
}

/// Correct every interleaved block of a symbol's codewords in place
///
/// Any uncorrectable block fails the whole symbol.
pub fn correct_symbol(size: &SymbolSize, codewords: &mut [u8]) -> Result<(), DecodeError> {
    if codewords.len() < size.total_words() {
        return Err(DecodeError::TruncatedStream);
    }
    let decoder = ReedSolomonDecoder::new(size.block_error_words, size.block_max_correctable);
    for block in 0..size.interleaved_blocks {
        let mut words = gather_block(size, codewords, block);
        decoder.decode(&mut words).map_err(|reason| {
            tracing::debug!(block, reason, "reed-solomon block failed");
            DecodeError::UncorrectableBlock { block }
        })?;
        scatter_block(size, codewords, block, &words);
    }
    Ok(())
}

/// Append interleaved error words to `data` (which must hold exactly `size.data_words`)
pub fn encode_symbol(size: &SymbolSize, data: &[u8]) -> Vec<u8> {
    let mut codewords = vec![0u8; size.total_words()];
    codewords[..size.data_words].copy_from_slice(&data[..size.data_words]);
    let encoder = ReedSolomonEncoder::new(size.block_error_words);
    for block in 0..size.interleaved_blocks {
        let block_data: Vec<u8> = data[..size.data_words]
            .iter()
            .skip(block)
            .step_by(size.interleaved_blocks)
            .copied()
            .collect();
        let ecc = encoder.encode(&block_data);
        for (k, &w) in ecc.iter().enumerate() {
            codewords[size.data_words + block + k * size.interleaved_blocks] = w;
        }
    }
    codewords
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rs_encode(data: &[u8], num_ecc: usize) -> Vec<u8> {
        let mut codeword = data.to_vec();
        codeword.extend(ReedSolomonEncoder::new(num_ecc).encode(data));
        codeword
    }

    #[test]
    fn test_gf256_basic() {
        assert_eq!(Gf256::mul(0, 5), 0);
        assert_eq!(Gf256::mul(5, 0), 0);
        assert_eq!(Gf256::div(0, 5), Some(0));
        assert_eq!(Gf256::div(7, 7), Some(1));
        assert_eq!(Gf256::div(7, 0), None);
        // alpha^8 reduces through poly 301
        assert_eq!(Gf256::exp(8), (301 - 256) as u8);
        assert_eq!(Gf256::exp(255), 1);
        assert_eq!(Gf256::pow(2, 260), Gf256::exp(5));
    }

    #[test]
    fn test_known_ecc200_block() {
        // "123456" in a 10x10 symbol: ASCII digit pairs 142 164 186, EC 114 25 5 88 102
        let ecc = ReedSolomonEncoder::new(5).encode(&[142, 164, 186]);
        assert_eq!(ecc, vec![114, 25, 5, 88, 102]);
    }

    #[test]
    fn test_rs_encode_decode_no_errors() {
        let data = vec![0x10, 0x20, 0x30, 0x40, 0x50, 0x60];
        let mut codeword = rs_encode(&data, 10);
        let decoder = ReedSolomonDecoder::new(10, 5);
        assert!(decoder.decode(&mut codeword).is_ok());
        assert_eq!(&codeword[..data.len()], &data);
    }

    #[test]
    fn test_rs_correct_multiple_errors() {
        let data = vec![0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88];
        let mut codeword = rs_encode(&data, 10);

        codeword[0] ^= 0xFF;
        codeword[4] ^= 0x42;
        codeword[7] ^= 0x13;
        codeword[17] ^= 0x01;

        let decoder = ReedSolomonDecoder::new(10, 5);
        assert!(decoder.decode(&mut codeword).is_ok());
        assert_eq!(&codeword[..data.len()], &data);
    }

    #[test]
    fn test_rs_too_many_errors_fails() {
        let data = vec![1u8, 2, 3];
        let mut codeword = rs_encode(&data, 5);
        codeword[0] ^= 0x10;
        codeword[1] ^= 0x20;
        codeword[2] ^= 0x30;
        let decoder = ReedSolomonDecoder::new(5, 2);
        // Minimum distance is 6: three errors leave the block at least four
        // symbols from every other codeword, out of reach of two corrections
        assert!(decoder.decode(&mut codeword).is_err());
    }

    #[test]
    fn test_symbol_interleaving() {
        let size = SymbolSize::from_dimensions(52, 52).unwrap();
        assert_eq!(size.interleaved_blocks, 2);
        let data: Vec<u8> = (0..size.data_words).map(|i| (i * 7 % 256) as u8).collect();
        let mut codewords = encode_symbol(size, &data);
        codewords[0] ^= 0x55;
        codewords[1] ^= 0x66;
        codewords[size.data_words + 3] ^= 0x77;
        correct_symbol(size, &mut codewords).unwrap();
        assert_eq!(&codewords[..size.data_words], &data[..]);
    }

    #[test]
    fn test_uncorrectable_symbol() {
        let size = SymbolSize::from_dimensions(10, 10).unwrap();
        let mut codewords = encode_symbol(size, &[142, 164, 186]);
        for w in codewords.iter_mut().take(4) {
            *w ^= 0xA5;
        }
        match correct_symbol(size, &mut codewords) {
            Err(DecodeError::UncorrectableBlock { block: 0 }) => {}
            Ok(()) => assert_ne!(&codewords[..3], &[142, 164, 186]),
            Err(e) => panic!("unexpected error {e}"),
        }
    }

    proptest! {
        #[test]
        fn prop_corrects_up_to_capacity(
            index in 0usize..30,
            seed in any::<u64>(),
            errors in 0usize..=68,
        ) {
            let size = SymbolSize::from_index(index).unwrap();
            let data: Vec<u8> = (0..size.data_words)
                .map(|i| (seed.wrapping_mul(i as u64 + 1) >> 13) as u8)
                .collect();
            let original = encode_symbol(size, &data);
            let mut corrupted = original.clone();

            // Spread at most max_correctable errors into each block
            let per_block = errors.min(size.block_max_correctable);
            for block in 0..size.interleaved_blocks {
                for k in 0..per_block {
                    let idx = block + k * size.interleaved_blocks;
                    if idx < corrupted.len() {
                        corrupted[idx] ^= ((seed >> (k % 8)) as u8) | 1;
                    }
                }
            }

            prop_assert!(correct_symbol(size, &mut corrupted).is_ok());
            prop_assert_eq!(corrupted, original);
        }
    }
}
