use crate::error::invalid_data;

const STOP_BIT: u8 = 128;

pub fn encode_vint32(val: u32, mut w: impl std::io::Write) -> std::io::Result<()> {
    const START_2: u64 = 1 << 7;
    const START_3: u64 = 1 << 14;
    const START_4: u64 = 1 << 21;
    const START_5: u64 = 1 << 28;

    const MASK_1: u64 = 127;
    const MASK_2: u64 = MASK_1 << 7;
    const MASK_3: u64 = MASK_2 << 7;
    const MASK_4: u64 = MASK_3 << 7;
    const MASK_5: u64 = MASK_4 << 7;

    let val = u64::from(val);
    const STOP_BIT: u64 = 128u64;
    let (res, num_bytes) = if val < START_2 {
        (val | STOP_BIT, 1)
    } else if val < START_3 {
        (
            (val & MASK_1) | ((val & MASK_2) << 1) | (STOP_BIT << (8)),
            2,
        )
    } else if val < START_4 {
        (
            (val & MASK_1) | ((val & MASK_2) << 1) | ((val & MASK_3) << 2) | (STOP_BIT << (8 * 2)),
            3,
        )
    } else if val < START_5 {
        (
            (val & MASK_1)
                | ((val & MASK_2) << 1)
                | ((val & MASK_3) << 2)
                | ((val & MASK_4) << 3)
                | (STOP_BIT << (8 * 3)),
            4,
        )
    } else {
        (
            (val & MASK_1)
                | ((val & MASK_2) << 1)
                | ((val & MASK_3) << 2)
                | ((val & MASK_4) << 3)
                | ((val & MASK_5) << 4)
                | (STOP_BIT << (8 * 4)),
            5,
        )
    };
    w.write_all(&res.to_le_bytes()[..num_bytes])
}

/// Decodes one value and advances `data` past it. Truncated or overlong input
/// is an `InvalidData` error.
pub fn decode_vint32(data: &mut &[u8]) -> std::io::Result<u32> {
    let vlen = vint32_len(data).ok_or_else(|| invalid_data("corrupted vint32"))?;
    let mut result = 0u32;
    let mut shift = 0u32;
    for &b in &data[..vlen] {
        result |= u32::from(b & 127u8) << shift;
        shift += 7;
    }
    *data = &data[vlen..];
    Ok(result)
}

fn vint32_len(data: &[u8]) -> Option<usize> {
    data.iter()
        .take(5)
        .position(|&val| val >= STOP_BIT)
        .map(|i| i + 1)
}

/// Appends `values` as gaps to their predecessor, the first one absolute.
/// `values` must be ascending.
pub fn encode_sorted(values: &[u32], out: &mut Vec<u8>) -> std::io::Result<()> {
    let mut last = 0;
    for &v in values {
        encode_vint32(v - last, &mut *out)?;
        last = v;
    }
    Ok(())
}

pub fn decode_sorted(data: &mut &[u8], count: usize, out: &mut Vec<u32>) -> std::io::Result<()> {
    let mut last = 0u32;
    for _ in 0..count {
        let gap = decode_vint32(data)?;
        last = last
            .checked_add(gap)
            .ok_or_else(|| invalid_data("sorted vint32 sequence overflows"))?;
        out.push(last);
    }
    Ok(())
}
