use bitpacking::{BitPacker, BitPacker4x};
use enum_dispatch::enum_dispatch;

use crate::{options::EncodeOption, segment::COMPRESSION_BLOCK_SIZE};

pub use bitpack::{BitpackDecode, BitpackEncode};
pub use opt_pfor::{OptPforDecode, OptPforEncode};

mod bitpack;
mod opt_pfor;
pub mod simple16;

pub type Block = [u32; COMPRESSION_BLOCK_SIZE];

#[enum_dispatch]
pub trait BlockEncodeTrait {
    /// Encodes at most `COMPRESSION_BLOCK_SIZE` values. Missing values are
    /// encoded as zeros; the caller keeps the true length.
    fn encode(&mut self, values: &[u32]) -> &[u32];
}

#[enum_dispatch]
pub trait BlockDecodeTrait {
    /// Decodes one full block and returns the number of words consumed.
    fn decode(&mut self, data: &[u32], output: &mut Block) -> usize;
}

#[enum_dispatch(BlockEncodeTrait)]
pub enum BlockEncode {
    OptPforEncode,
    BitpackEncode,
}

#[enum_dispatch(BlockDecodeTrait)]
pub enum BlockDecode {
    OptPforDecode,
    BitpackDecode,
}

impl BlockEncode {
    pub fn new(option: EncodeOption) -> Self {
        match option {
            EncodeOption::OptPfor => OptPforEncode::new().into(),
            EncodeOption::Bitpack => BitpackEncode::new().into(),
        }
    }
}

impl BlockDecode {
    pub fn new(option: EncodeOption) -> Self {
        match option {
            EncodeOption::OptPfor => OptPforDecode::new().into(),
            EncodeOption::Bitpack => BitpackDecode::new().into(),
        }
    }
}

fn pad_block(values: &[u32], block: &mut Block) {
    assert!(
        values.len() <= COMPRESSION_BLOCK_SIZE,
        "block codec input of {} values exceeds block size",
        values.len()
    );
    block[..values.len()].copy_from_slice(values);
    block[values.len()..].fill(0);
}

fn num_bits(values: &[u32]) -> u8 {
    let max = values.iter().copied().max().unwrap_or(0);
    32 - max.leading_zeros() as u8
}

/// Words taken by a full block packed at `num_bits`.
pub fn packed_words(num_bits: u8) -> usize {
    num_bits as usize * COMPRESSION_BLOCK_SIZE / 32
}

fn pack(bitpacker: &BitPacker4x, block: &Block, num_bits: u8, output: &mut Vec<u32>) {
    let start = output.len();
    output.resize(start + packed_words(num_bits), 0);
    let written = bitpacker.compress(
        block,
        bytemuck::cast_slice_mut(&mut output[start..]),
        num_bits,
    );
    debug_assert_eq!(written, packed_words(num_bits) * 4);
}

fn unpack(bitpacker: &BitPacker4x, data: &[u32], num_bits: u8, output: &mut Block) -> usize {
    let words = packed_words(num_bits);
    assert!(data.len() >= words, "truncated packed block");
    bitpacker.decompress(bytemuck::cast_slice(&data[..words]), output, num_bits);
    words
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rand::{Rng, SeedableRng};

    use super::*;

    fn round_trip(option: EncodeOption, values: &[u32]) -> usize {
        let mut encoder = BlockEncode::new(option);
        let mut decoder = BlockDecode::new(option);
        let encoded = encoder.encode(values).to_vec();
        let mut output = [u32::MAX; COMPRESSION_BLOCK_SIZE];
        let consumed = decoder.decode(&encoded, &mut output);
        assert_eq!(consumed, encoded.len());
        assert_eq!(&output[..values.len()], values);
        assert!(output[values.len()..].iter().all(|&v| v == 0));
        encoded.len()
    }

    #[test]
    fn test_special_blocks() {
        for option in [EncodeOption::OptPfor, EncodeOption::Bitpack] {
            round_trip(option, &[0; COMPRESSION_BLOCK_SIZE]);
            round_trip(option, &[u32::MAX; COMPRESSION_BLOCK_SIZE]);
            round_trip(option, &[7; COMPRESSION_BLOCK_SIZE]);
            round_trip(option, &[]);
            round_trip(option, &[1, 2, 3]);
        }
    }

    #[test]
    fn test_opt_pfor_beats_bitpack_with_outliers() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let mut values: Vec<u32> = (0..COMPRESSION_BLOCK_SIZE)
            .map(|_| rng.gen_range(0..16))
            .collect();
        values[3] = 1 << 30;
        values[90] = 123_456_789;
        let pfor = round_trip(EncodeOption::OptPfor, &values);
        let bitpack = round_trip(EncodeOption::Bitpack, &values);
        assert!(pfor < bitpack, "pfor {} words, bitpack {} words", pfor, bitpack);
    }

    #[test]
    fn test_random_deltas() {
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let len = rng.gen_range(1..=COMPRESSION_BLOCK_SIZE);
            let bits = rng.gen_range(0..=32u32);
            let values: Vec<u32> = (0..len)
                .map(|_| if bits == 0 { 0 } else { rng.gen::<u32>() >> (32 - bits) })
                .collect();
            round_trip(EncodeOption::OptPfor, &values);
            round_trip(EncodeOption::Bitpack, &values);
        }
    }

    proptest! {
        #[test]
        fn prop_opt_pfor_round_trip(values in prop::collection::vec(any::<u32>(), 0..=COMPRESSION_BLOCK_SIZE)) {
            round_trip(EncodeOption::OptPfor, &values);
        }

        #[test]
        fn prop_opt_pfor_small_values_round_trip(values in prop::collection::vec(0u32..64, 0..=COMPRESSION_BLOCK_SIZE)) {
            round_trip(EncodeOption::OptPfor, &values);
        }
    }
}
