use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::{error::Result, segment::COMPRESSION_BLOCK_SIZE};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Validate)]
#[validate(schema(function = "IndexOptions::validate_cutoff"))]
#[serde(deny_unknown_fields)]
pub struct IndexOptions {
    #[serde(default = "IndexOptions::default_kind")]
    pub kind: IndexKind,
    #[serde(default = "IndexOptions::default_encode")]
    pub encode: EncodeOption,
    /// Words per segment.
    #[serde(default = "IndexOptions::default_segment_size")]
    #[validate(range(min = 1024))]
    pub segment_size: u32,
    /// Segment budget; segment indices must stay clear of the short-list bit.
    #[serde(default = "IndexOptions::default_max_segments")]
    #[validate(range(min = 1, max = 0x7fff_ffff))]
    pub max_segments: u32,
    #[serde(default = "IndexOptions::default_vocab_size")]
    #[validate(range(min = 1))]
    pub vocab_size: u32,
    /// Terms with at most this many documents stay uncompressed in their
    /// buffer, even across `flush`, and are read from there by queries.
    #[serde(default = "IndexOptions::default_df_cutoff")]
    pub df_cutoff: u32,
    #[serde(default)]
    pub reverse: bool,
    #[serde(default)]
    #[validate(nested)]
    pub bloom: BloomOption,
}

impl IndexOptions {
    fn default_kind() -> IndexKind {
        IndexKind::TfOnly
    }

    fn default_encode() -> EncodeOption {
        EncodeOption::OptPfor
    }

    fn default_segment_size() -> u32 {
        1 << 20
    }

    fn default_max_segments() -> u32 {
        4096
    }

    fn default_vocab_size() -> u32 {
        1 << 20
    }

    fn default_df_cutoff() -> u32 {
        9
    }

    fn validate_cutoff(&self) -> std::result::Result<(), ValidationError> {
        if self.df_cutoff as usize >= COMPRESSION_BLOCK_SIZE {
            return Err(ValidationError::new(
                "df_cutoff must be smaller than the compression block size",
            ));
        }
        Ok(())
    }

    pub fn from_toml(s: &str) -> Result<Self> {
        let options: IndexOptions = toml::from_str(s)?;
        options.validate()?;
        Ok(options)
    }

    pub fn order(&self) -> DocOrder {
        DocOrder::from_reverse(self.reverse)
    }
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            kind: Self::default_kind(),
            encode: Self::default_encode(),
            segment_size: Self::default_segment_size(),
            max_segments: Self::default_max_segments(),
            vocab_size: Self::default_vocab_size(),
            df_cutoff: Self::default_df_cutoff(),
            reverse: false,
            bloom: BloomOption::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct BloomOption {
    #[serde(default = "BloomOption::default_enabled")]
    pub enabled: bool,
    #[serde(default = "BloomOption::default_nb_hash")]
    #[validate(range(min = 1, max = 16))]
    pub nb_hash: u32,
    #[serde(default = "BloomOption::default_bits_per_element")]
    #[validate(range(min = 1, max = 64))]
    pub bits_per_element: u32,
}

impl BloomOption {
    fn default_enabled() -> bool {
        true
    }

    fn default_nb_hash() -> u32 {
        3
    }

    fn default_bits_per_element() -> u32 {
        8
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }
}

impl Default for BloomOption {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            nb_hash: Self::default_nb_hash(),
            bits_per_element: Self::default_bits_per_element(),
        }
    }
}

/// Which payloads each posting carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    NonPositional,
    TfOnly,
    Positional,
    /// Per-posting attribute scores supplied at insertion, stored in the tf slot.
    AttrScore,
}

impl IndexKind {
    pub fn has_tf(self) -> bool {
        matches!(self, IndexKind::TfOnly | IndexKind::Positional)
    }

    pub fn has_positions(self) -> bool {
        matches!(self, IndexKind::Positional)
    }

    pub fn has_scores(self) -> bool {
        matches!(self, IndexKind::AttrScore)
    }

    /// Whether blocks carry a second per-document array after the doc ids.
    pub fn has_payload(self) -> bool {
        self.has_tf() || self.has_scores()
    }

    pub(crate) fn to_u32(self) -> u32 {
        match self {
            IndexKind::NonPositional => 0,
            IndexKind::TfOnly => 1,
            IndexKind::Positional => 2,
            IndexKind::AttrScore => 3,
        }
    }

    pub(crate) fn from_u32(v: u32) -> Option<Self> {
        match v {
            0 => Some(IndexKind::NonPositional),
            1 => Some(IndexKind::TfOnly),
            2 => Some(IndexKind::Positional),
            3 => Some(IndexKind::AttrScore),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncodeOption {
    OptPfor,
    Bitpack,
}

impl EncodeOption {
    pub(crate) fn to_u32(self) -> u32 {
        match self {
            EncodeOption::OptPfor => 0,
            EncodeOption::Bitpack => 1,
        }
    }

    pub(crate) fn from_u32(v: u32) -> Option<Self> {
        match v {
            0 => Some(EncodeOption::OptPfor),
            1 => Some(EncodeOption::Bitpack),
            _ => None,
        }
    }
}

/// Traversal order of doc ids inside a postings chain.
///
/// Every comparison the query algorithms make goes through this type, so the
/// same code serves forward (ascending) and reverse (descending) indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocOrder {
    Forward,
    Reverse,
}

impl DocOrder {
    pub fn from_reverse(reverse: bool) -> Self {
        if reverse {
            DocOrder::Reverse
        } else {
            DocOrder::Forward
        }
    }

    pub fn is_reverse(self) -> bool {
        self == DocOrder::Reverse
    }

    #[inline]
    pub fn less(self, a: u32, b: u32) -> bool {
        match self {
            DocOrder::Forward => a < b,
            DocOrder::Reverse => a > b,
        }
    }

    #[inline]
    pub fn greater(self, a: u32, b: u32) -> bool {
        self.less(b, a)
    }

    #[inline]
    pub fn less_eq(self, a: u32, b: u32) -> bool {
        !self.greater(a, b)
    }

    #[inline]
    pub fn greater_eq(self, a: u32, b: u32) -> bool {
        !self.less(a, b)
    }

    pub fn cmp(self, a: u32, b: u32) -> std::cmp::Ordering {
        match self {
            DocOrder::Forward => a.cmp(&b),
            DocOrder::Reverse => b.cmp(&a),
        }
    }
}
