/// Location of a block inside the segment pool: segment index in the high
/// 32 bits, word offset in the low 32 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pointer(u64);

/// Segment bit of pointers into a query's short-list pool. Index segments
/// stay below it.
pub const SHORT_LIST_SEGMENT: u32 = 1 << 31;

impl Pointer {
    pub const UNDEFINED: Pointer = Pointer(u64::MAX);

    pub fn new(segment: u32, offset: u32) -> Self {
        Self((segment as u64) << 32 | offset as u64)
    }

    pub fn segment(self) -> u32 {
        (self.0 >> 32) as u32
    }

    pub fn offset(self) -> u32 {
        self.0 as u32
    }

    pub fn is_defined(self) -> bool {
        self != Self::UNDEFINED
    }

    pub fn is_short_list(self) -> bool {
        self.is_defined() && self.segment() & SHORT_LIST_SEGMENT != 0
    }

    /// Tags a pointer into a short-list pool. Undefined stays undefined.
    pub fn to_short_list(self) -> Self {
        if !self.is_defined() {
            return self;
        }
        Self::new(self.segment() | SHORT_LIST_SEGMENT, self.offset())
    }

    pub fn from_short_list(self) -> Self {
        Self::new(self.segment() & !SHORT_LIST_SEGMENT, self.offset())
    }

    pub fn to_raw(self) -> u64 {
        self.0
    }

    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl Default for Pointer {
    fn default() -> Self {
        Self::UNDEFINED
    }
}
