use bitpacking::{BitPacker, BitPacker4x};

use super::{num_bits, pack, pad_block, unpack, Block, BlockDecodeTrait, BlockEncodeTrait};
use crate::segment::COMPRESSION_BLOCK_SIZE;

/// Plain bit-packing at the widest value's bit width. One header word holds
/// the width.
pub struct BitpackEncode {
    bitpacker: BitPacker4x,
    block: Block,
    output: Vec<u32>,
}

impl BitpackEncode {
    pub fn new() -> Self {
        Self {
            bitpacker: BitPacker4x::new(),
            block: [0; COMPRESSION_BLOCK_SIZE],
            output: Vec::new(),
        }
    }
}

impl BlockEncodeTrait for BitpackEncode {
    fn encode(&mut self, values: &[u32]) -> &[u32] {
        pad_block(values, &mut self.block);
        let num_bits = num_bits(values);
        self.output.clear();
        self.output.push(num_bits as u32);
        pack(&self.bitpacker, &self.block, num_bits, &mut self.output);
        &self.output
    }
}

pub struct BitpackDecode {
    bitpacker: BitPacker4x,
}

impl BitpackDecode {
    pub fn new() -> Self {
        Self {
            bitpacker: BitPacker4x::new(),
        }
    }
}

impl BlockDecodeTrait for BitpackDecode {
    fn decode(&mut self, data: &[u32], output: &mut Block) -> usize {
        let num_bits = data[0];
        assert!(num_bits <= 32, "corrupt bitpack header {}", num_bits);
        1 + unpack(&self.bitpacker, &data[1..], num_bits as u8, output)
    }
}
