use std::fmt;
use std::io::Read;

use log::{debug, trace};

use crate::bitio::BitReader;
use crate::error::Result;
use crate::heap::{MinHeap, Weighted};

/// Occurrence count for each of the 256 byte values. Zero means absent.
#[derive(Clone, PartialEq, Eq)]
pub struct FreqTable {
    counts: [u64; 256],
}

impl FreqTable {
    pub fn new() -> Self {
        FreqTable { counts: [0; 256] }
    }

    pub fn from_bytes(data: &[u8]) -> Self {
        let mut freq = FreqTable::new();
        for &b in data {
            freq.record(b);
        }
        freq
    }

    /// Counts every remaining byte of `reader`.
    pub fn count<R: Read>(reader: &mut BitReader<R>) -> Result<Self> {
        let mut freq = FreqTable::new();
        while let Some(b) = reader.next_byte()? {
            freq.record(b);
        }
        Ok(freq)
    }

    pub fn record(&mut self, byte: u8) {
        self.counts[byte as usize] += 1;
    }

    pub(crate) fn set(&mut self, byte: u8, count: u64) {
        self.counts[byte as usize] = count;
    }

    pub fn get(&self, byte: u8) -> u64 {
        self.counts[byte as usize]
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn distinct(&self) -> usize {
        self.counts.iter().filter(|&&c| c > 0).count()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.iter().all(|&c| c == 0)
    }

    /// Non-zero entries in ascending byte order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, u64)> + '_ {
        self.counts
            .iter()
            .enumerate()
            .filter(|(_, c)| **c > 0)
            .map(|(b, c)| (b as u8, *c))
    }
}

impl Default for FreqTable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FreqTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

#[derive(Debug, Eq, PartialEq)]
pub enum Node {
    Leaf {
        byte: u8,
        freq: u64,
    },
    Internal {
        freq: u64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    pub fn freq(&self) -> u64 {
        match self {
            Node::Leaf { freq, .. } => *freq,
            Node::Internal { freq, .. } => *freq,
        }
    }
}

impl Weighted for Node {
    fn weight(&self) -> u64 {
        self.freq()
    }
}

pub type HuffmanTree = Node;

/// A root-to-leaf path: `false` for a left turn, `true` for a right turn.
pub type Code = Vec<bool>;

pub fn code_to_string(code: &[bool]) -> String {
    code.iter().map(|&b| if b { '1' } else { '0' }).collect()
}

/// Byte value to code, holding entries only for bytes present in the tree.
pub struct CodeTable {
    codes: Vec<Option<Code>>,
}

impl CodeTable {
    fn empty() -> Self {
        CodeTable {
            codes: vec![None; 256],
        }
    }

    pub fn get(&self, byte: u8) -> Option<&[bool]> {
        self.codes[byte as usize].as_deref()
    }

    pub fn len(&self) -> usize {
        self.codes.iter().filter(|c| c.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, &[bool])> + '_ {
        self.codes
            .iter()
            .enumerate()
            .filter_map(|(b, c)| c.as_deref().map(|code| (b as u8, code)))
    }
}

pub fn entropy_from_freq(freq: &FreqTable) -> f64 {
    let total = freq.total();
    if total == 0 {
        return 0.0;
    }
    let total_f = total as f64;

    let entropy: f64 = freq
        .iter()
        .map(|(_, count)| {
            let p = count as f64 / total_f;
            -p * p.log2()
        })
        .sum();

    debug!(
        "Calculated entropy: {:.4} bits/symbol (total samples: {})",
        entropy, total
    );
    entropy
}

/// Builds the tree for `frequencies`, or `None` when every count is zero.
///
/// Leaves enter the heap in ascending byte order and each merged node takes
/// the first popped node as its left child, so equal tables always yield
/// the same tree.
pub fn build_huffman_tree(frequencies: &FreqTable) -> Result<Option<Box<HuffmanTree>>> {
    debug!(
        "Building Huffman tree from {} unique symbols",
        frequencies.distinct()
    );

    let mut heap = MinHeap::new();
    for (byte, freq) in frequencies.iter() {
        heap.push(Box::new(Node::Leaf { byte, freq }))?;
    }
    if heap.is_empty() {
        return Ok(None);
    }

    while heap.len() > 1 {
        let left = heap.pop()?;
        let right = heap.pop()?;
        let freq = left.freq() + right.freq();
        heap.push(Box::new(Node::Internal { freq, left, right }))?;
    }

    let root = heap.pop()?;
    debug!("Tree construction complete, root weight {}", root.freq());
    Ok(Some(root))
}

pub fn build_code_table(root: &Node) -> CodeTable {
    let mut table = CodeTable::empty();
    let mut path = Vec::new();
    assign_codes(root, &mut path, &mut table);
    table
}

fn assign_codes(node: &Node, path: &mut Code, table: &mut CodeTable) {
    match node {
        Node::Leaf { byte, .. } => {
            trace!(
                "Assigning code to byte {:#04x} ('{}'): '{}'",
                byte,
                (*byte as char).escape_default(),
                code_to_string(path)
            );
            table.codes[*byte as usize] = Some(path.clone());
        }
        Node::Internal { left, right, .. } => {
            path.push(false);
            assign_codes(left, path, table);
            path.pop();
            path.push(true);
            assign_codes(right, path, table);
            path.pop();
        }
    }
}
