#![allow(clippy::len_without_is_empty)]

pub mod algorithm;
pub mod dictionary;
pub mod error;
pub mod filter;
pub mod index;
pub mod options;
pub mod pointer;
pub mod pointers;
pub mod segment;
pub mod utils;
pub mod weight;

#[cfg(not(all(target_endian = "little", target_pointer_width = "64")))]
compile_error!("Target is not supported.");

pub use algorithm::{Algorithm, SearchResult};
pub use error::{Result, ZambeziError};
pub use filter::{BitVector, DocFilter};
pub use index::InvertedIndex;
pub use options::{BloomOption, EncodeOption, IndexKind, IndexOptions};
pub use pointer::Pointer;
