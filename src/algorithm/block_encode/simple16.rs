//! Simple16 word packing: each output word holds a 4-bit selector and 28
//! payload bits split into fixed-width slots.

/// Largest value Simple16 can store.
pub const MAX_VALUE: u32 = (1 << 28) - 1;

const SELECTOR_COUNT: [usize; 16] = [28, 21, 21, 21, 14, 9, 8, 7, 6, 6, 5, 5, 4, 3, 2, 1];

const SELECTOR_BITS: [&[u32]; 16] = [
    &[1; 28],
    &[
        2, 2, 2, 2, 2, 2, 2, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    ],
    &[
        1, 1, 1, 1, 1, 1, 1, 2, 2, 2, 2, 2, 2, 2, 1, 1, 1, 1, 1, 1, 1,
    ],
    &[
        1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 2, 2, 2, 2, 2, 2, 2,
    ],
    &[2; 14],
    &[4, 3, 3, 3, 3, 3, 3, 3, 3],
    &[3, 4, 4, 4, 4, 3, 3, 3],
    &[4; 7],
    &[5, 5, 5, 5, 4, 4],
    &[4, 4, 5, 5, 5, 5],
    &[6, 6, 6, 5, 5],
    &[5, 5, 6, 6, 6],
    &[7; 4],
    &[10, 9, 9],
    &[14; 2],
    &[28],
];

/// Whether every value fits in a Simple16 slot.
pub fn fits(values: &[u32]) -> bool {
    values.iter().all(|&v| v <= MAX_VALUE)
}

/// Appends the packed form of `values` to `output`.
///
/// Panics if a value exceeds [`MAX_VALUE`]; check with [`fits`] first.
pub fn encode(values: &[u32], output: &mut Vec<u32>) {
    let mut rest = values;
    while !rest.is_empty() {
        let (selector, taken) = (0..16)
            .find_map(|selector| {
                let bits = SELECTOR_BITS[selector];
                let taken = SELECTOR_COUNT[selector].min(rest.len());
                rest[..taken]
                    .iter()
                    .zip(bits)
                    .all(|(&v, &b)| v >> b == 0)
                    .then_some((selector, taken))
            })
            .unwrap_or_else(|| panic!("value {} does not fit in simple16", rest[0]));
        let mut word = (selector as u32) << 28;
        let mut shift = 0;
        for (&v, &b) in rest[..taken].iter().zip(SELECTOR_BITS[selector]) {
            word |= v << shift;
            shift += b;
        }
        output.push(word);
        rest = &rest[taken..];
    }
}

/// Decodes `output.len()` values and returns the number of words consumed.
pub fn decode(data: &[u32], output: &mut [u32]) -> usize {
    let mut produced = 0;
    let mut consumed = 0;
    while produced < output.len() {
        let word = data[consumed];
        consumed += 1;
        let selector = (word >> 28) as usize;
        let mut shift = 0;
        for &b in SELECTOR_BITS[selector] {
            if produced == output.len() {
                break;
            }
            output[produced] = (word >> shift) & ((1 << b) - 1);
            produced += 1;
            shift += b;
        }
    }
    consumed
}
