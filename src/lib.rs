//! Byte-oriented Huffman compression.
//!
//! A compressed file is a short text header (tag, original file name and the
//! byte frequency table) followed by the bit-packed codes:
//!
//! ```
//! use huffman_tool::{compress_bytes, decompress_bytes};
//!
//! let packed = compress_bytes(b"abracadabra", b"spell.txt")?;
//! assert!(packed.starts_with(b"HUFF;spell.txt;a:5,b:2,c:1,d:1,r:2;"));
//! assert_eq!(decompress_bytes(&packed)?, b"abracadabra");
//! # Ok::<(), huffman_tool::HuffmanError>(())
//! ```

pub mod bitio;
pub mod codec;
pub mod container;
pub mod error;
pub mod heap;
pub mod huffman;

pub use codec::{
    CompressStats, DecompressStats, compress, compress_bytes, compress_file, decompress,
    decompress_bytes, decompress_file,
};
pub use container::Header;
pub use error::{HuffmanError, Result};
pub use huffman::{
    CodeTable, FreqTable, Node, build_code_table, build_huffman_tree, entropy_from_freq,
};
