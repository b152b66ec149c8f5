use bitpacking::{BitPacker, BitPacker4x};

use super::{pack, pad_block, simple16, unpack, Block, BlockDecodeTrait, BlockEncodeTrait};
use crate::segment::COMPRESSION_BLOCK_SIZE;

// header word: bit width | exception count << 8 | raw exceptions flag
const EXCEPTION_COUNT_SHIFT: u32 = 8;
const RAW_EXCEPTIONS: u32 = 1 << 16;

/// Picks the bit width minimizing packed size plus exception cost.
fn optimal_bit_width(block: &Block) -> u8 {
    let mut bit_counts = [0usize; 33];
    for &v in block {
        bit_counts[(32 - v.leading_zeros()) as usize] += 1;
    }

    let mut best_bits = 32;
    let mut best_total = usize::MAX;
    let mut fitting = 0;
    for b in 0..=32u8 {
        fitting += bit_counts[b as usize];
        let exceptions = COMPRESSION_BLOCK_SIZE - fitting;
        let total = COMPRESSION_BLOCK_SIZE * b as usize + exceptions * (7 + (32 - b as usize));
        if total < best_total {
            best_total = total;
            best_bits = b;
        }
    }
    best_bits
}

pub struct OptPforEncode {
    bitpacker: BitPacker4x,
    block: Block,
    positions: Vec<u32>,
    highs: Vec<u32>,
    output: Vec<u32>,
}

impl OptPforEncode {
    pub fn new() -> Self {
        Self {
            bitpacker: BitPacker4x::new(),
            block: [0; COMPRESSION_BLOCK_SIZE],
            positions: Vec::new(),
            highs: Vec::new(),
            output: Vec::new(),
        }
    }
}

impl BlockEncodeTrait for OptPforEncode {
    fn encode(&mut self, values: &[u32]) -> &[u32] {
        pad_block(values, &mut self.block);
        let num_bits = optimal_bit_width(&self.block);

        self.positions.clear();
        self.highs.clear();
        if num_bits < 32 {
            let mut last = 0;
            for (i, v) in self.block.iter_mut().enumerate() {
                if *v >> num_bits != 0 {
                    self.positions.push(i as u32 - last);
                    last = i as u32;
                    self.highs.push(*v >> num_bits);
                    *v &= (1 << num_bits) - 1;
                }
            }
        }

        let raw = !simple16::fits(&self.highs);
        let mut header = num_bits as u32 | (self.positions.len() as u32) << EXCEPTION_COUNT_SHIFT;
        if raw {
            header |= RAW_EXCEPTIONS;
        }
        self.output.clear();
        self.output.push(header);
        pack(&self.bitpacker, &self.block, num_bits, &mut self.output);
        if !self.positions.is_empty() {
            simple16::encode(&self.positions, &mut self.output);
            if raw {
                self.output.extend_from_slice(&self.highs);
            } else {
                simple16::encode(&self.highs, &mut self.output);
            }
        }
        &self.output
    }
}

pub struct OptPforDecode {
    bitpacker: BitPacker4x,
    positions: [u32; COMPRESSION_BLOCK_SIZE],
    highs: [u32; COMPRESSION_BLOCK_SIZE],
}

impl OptPforDecode {
    pub fn new() -> Self {
        Self {
            bitpacker: BitPacker4x::new(),
            positions: [0; COMPRESSION_BLOCK_SIZE],
            highs: [0; COMPRESSION_BLOCK_SIZE],
        }
    }
}

impl BlockDecodeTrait for OptPforDecode {
    fn decode(&mut self, data: &[u32], output: &mut Block) -> usize {
        let header = data[0];
        let num_bits = (header & 0xff) as u8;
        let exceptions = ((header >> EXCEPTION_COUNT_SHIFT) & 0xff) as usize;
        assert!(
            num_bits <= 32 && exceptions <= COMPRESSION_BLOCK_SIZE,
            "corrupt opt-pfor header {:#x}",
            header
        );
        let mut consumed = 1;
        consumed += unpack(&self.bitpacker, &data[consumed..], num_bits, output);
        if exceptions == 0 {
            return consumed;
        }

        let positions = &mut self.positions[..exceptions];
        consumed += simple16::decode(&data[consumed..], positions);
        let highs = &mut self.highs[..exceptions];
        if header & RAW_EXCEPTIONS != 0 {
            highs.copy_from_slice(&data[consumed..consumed + exceptions]);
            consumed += exceptions;
        } else {
            consumed += simple16::decode(&data[consumed..], highs);
        }

        let mut pos = 0;
        for (&gap, &high) in positions.iter().zip(highs.iter()) {
            pos += gap as usize;
            output[pos] |= high << num_bits;
        }
        consumed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optimal_bit_width() {
        let mut block = [3u32; COMPRESSION_BLOCK_SIZE];
        assert_eq!(optimal_bit_width(&block), 2);
        block[10] = u32::MAX;
        assert_eq!(optimal_bit_width(&block), 2);
        let block = [0u32; COMPRESSION_BLOCK_SIZE];
        assert_eq!(optimal_bit_width(&block), 0);
        let block = [u32::MAX; COMPRESSION_BLOCK_SIZE];
        assert_eq!(optimal_bit_width(&block), 32);
    }

    #[test]
    fn test_raw_exceptions() {
        let mut values = vec![1u32; COMPRESSION_BLOCK_SIZE];
        values[0] = u32::MAX;
        values[127] = 1 << 31;
        let mut encoder = OptPforEncode::new();
        let encoded = encoder.encode(&values).to_vec();
        assert_ne!(encoded[0] & RAW_EXCEPTIONS, 0);
        let mut output = [0; COMPRESSION_BLOCK_SIZE];
        let consumed = OptPforDecode::new().decode(&encoded, &mut output);
        assert_eq!(consumed, encoded.len());
        assert_eq!(&output[..], &values[..]);
    }
}
