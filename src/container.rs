//! Container framing: a textual header followed by the raw bit-packed payload.
//!
//! ```text
//! HUFF;<name>;<b>:<freq>,<b>:<freq>,...;<payload>
//! ```
//!
//! `<b>` is the symbol as one raw byte, so delimiter bytes are valid symbols.
//! `<freq>` is decimal without sign or leading zeros, and only non-zero
//! entries appear, in ascending byte order. The payload has no length
//! prefix: the decoder stops after `Σ freq` symbols.

use std::io::{Read, Write};

use log::{debug, trace, warn};

use crate::bitio::{BitReader, BitWriter};
use crate::error::{HuffmanError, Result};
use crate::huffman::FreqTable;

pub const MAGIC: &[u8] = b"HUFF";
pub const FIELD_SEP: u8 = b';';
pub const ENTRY_SEP: u8 = b',';
pub const PAIR_SEP: u8 = b':';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Original file name. Diagnostic only; never used to rebuild data.
    pub name: Vec<u8>,
    pub freq: FreqTable,
}

impl Header {
    /// Builds a header, replacing any `;` in the name so the tag stays parseable.
    pub fn new(name: &[u8], freq: FreqTable) -> Self {
        let mut name = name.to_vec();
        if name.contains(&FIELD_SEP) {
            warn!(
                "File name '{}' contains '{}', replacing with '_'",
                String::from_utf8_lossy(&name),
                FIELD_SEP as char
            );
            for b in name.iter_mut().filter(|b| **b == FIELD_SEP) {
                *b = b'_';
            }
        }
        Header { name, freq }
    }

    pub fn name_lossy(&self) -> String {
        String::from_utf8_lossy(&self.name).into_owned()
    }

    /// Total number of symbols the payload encodes.
    pub fn symbol_count(&self) -> u64 {
        self.freq.total()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(MAGIC.len() + self.name.len() + 3);
        bytes.extend_from_slice(MAGIC);
        bytes.push(FIELD_SEP);
        bytes.extend_from_slice(&self.name);
        bytes.push(FIELD_SEP);

        for (i, (byte, count)) in self.freq.iter().enumerate() {
            if i > 0 {
                bytes.push(ENTRY_SEP);
            }
            bytes.push(byte);
            bytes.push(PAIR_SEP);
            bytes.extend_from_slice(count.to_string().as_bytes());
        }
        bytes.push(FIELD_SEP);
        bytes
    }

    pub fn write_to<W: Write>(&self, writer: &mut BitWriter<W>) -> Result<usize> {
        let bytes = self.to_bytes();
        writer.write_bytes(&bytes)?;
        debug!(
            "Header written: {} bytes, {} table entries",
            bytes.len(),
            self.freq.distinct()
        );
        Ok(bytes.len())
    }

    pub fn read_from<R: Read>(reader: &mut BitReader<R>) -> Result<Self> {
        for &expected in MAGIC.iter().chain(std::iter::once(&FIELD_SEP)) {
            match reader.next_byte()? {
                Some(b) if b == expected => {}
                _ => return Err(HuffmanError::format("missing HUFF tag")),
            }
        }

        let mut name = Vec::new();
        loop {
            match reader.next_byte()? {
                Some(FIELD_SEP) => break,
                Some(b) => name.push(b),
                None => return Err(HuffmanError::format("unterminated file name")),
            }
        }
        trace!("Parsed file name tag '{}'", String::from_utf8_lossy(&name));

        let freq = read_table(reader)?;
        debug!(
            "Header parsed: {} bytes, {} unique symbols, {} total",
            reader.bytes_consumed(),
            freq.distinct(),
            freq.total()
        );
        Ok(Header { name, freq })
    }
}

fn read_table<R: Read>(reader: &mut BitReader<R>) -> Result<FreqTable> {
    let mut freq = FreqTable::new();
    let mut total: u64 = 0;

    let mut symbol = match reader.next_byte()? {
        Some(b) => b,
        None => return Err(HuffmanError::format("unterminated frequency table")),
    };
    // An empty table is a lone ';'. A ';' symbol is always followed by ':'.
    if symbol == FIELD_SEP && reader.peek_byte()? != Some(PAIR_SEP) {
        return Ok(freq);
    }

    loop {
        if reader.next_byte()? != Some(PAIR_SEP) {
            return Err(HuffmanError::format(format!(
                "expected ':' after symbol {:#04x}",
                symbol
            )));
        }
        let (count, terminator) = read_decimal(reader)?;
        if freq.get(symbol) != 0 {
            return Err(HuffmanError::format(format!(
                "duplicate entry for symbol {:#04x}",
                symbol
            )));
        }
        total = total
            .checked_add(count)
            .ok_or_else(|| HuffmanError::format("total frequency overflows"))?;
        freq.set(symbol, count);
        trace!("Parsed entry {:#04x} -> {}", symbol, count);

        match terminator {
            FIELD_SEP => return Ok(freq),
            ENTRY_SEP => {}
            other => {
                return Err(HuffmanError::format(format!(
                    "unexpected byte {:#04x} after frequency",
                    other
                )));
            }
        }

        symbol = reader
            .next_byte()?
            .ok_or_else(|| HuffmanError::format("unterminated frequency table"))?;
    }
}

/// Reads a positive decimal, returning it with the byte that ended it.
fn read_decimal<R: Read>(reader: &mut BitReader<R>) -> Result<(u64, u8)> {
    let mut value: u64 = 0;
    let mut digits = 0usize;
    loop {
        let b = reader
            .next_byte()?
            .ok_or_else(|| HuffmanError::format("unterminated frequency"))?;
        if !b.is_ascii_digit() {
            if digits == 0 {
                return Err(HuffmanError::format("missing frequency digits"));
            }
            return Ok((value, b));
        }
        if digits == 0 && b == b'0' {
            return Err(HuffmanError::format("frequency is zero or has a leading zero"));
        }
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add(u64::from(b - b'0')))
            .ok_or_else(|| HuffmanError::format("frequency overflows"))?;
        digits += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse(bytes: &[u8]) -> Result<Header> {
        Header::read_from(&mut BitReader::new(Cursor::new(bytes.to_vec())))
    }

    #[test]
    fn serializes_in_ascending_byte_order() {
        let header = Header::new(b"notes.txt", FreqTable::from_bytes(b"cabbca"));
        assert_eq!(header.to_bytes(), b"HUFF;notes.txt;a:2,b:2,c:2;".to_vec());
    }

    #[test]
    fn single_symbol_table() {
        let header = Header::new(b"x", FreqTable::from_bytes(b"aaaa"));
        assert_eq!(header.to_bytes(), b"HUFF;x;a:4;".to_vec());
    }

    #[test]
    fn empty_table_parses() {
        let header = parse(b"HUFF;empty.bin;;").unwrap();
        assert_eq!(header.name, b"empty.bin".to_vec());
        assert!(header.freq.is_empty());
        assert_eq!(header.symbol_count(), 0);
    }

    #[test]
    fn delimiter_symbols_parse() {
        let freq = FreqTable::from_bytes(b";;,,::");
        let header = Header::new(b"d", freq.clone());
        let bytes = header.to_bytes();
        assert_eq!(bytes, b"HUFF;d;,:2,::2,;:2;".to_vec());
        assert_eq!(parse(&bytes).unwrap().freq, freq);
    }

    #[test]
    fn lone_semicolon_symbol_is_not_an_empty_table() {
        let header = parse(b"HUFF;n;;:3;").unwrap();
        assert_eq!(header.freq.get(b';'), 3);
        assert_eq!(header.symbol_count(), 3);
    }

    #[test]
    fn parsing_stops_at_payload() {
        let mut reader = BitReader::new(Cursor::new(b"HUFF;n;a:1,b:1;\x80".to_vec()));
        let header = Header::read_from(&mut reader).unwrap();
        assert_eq!(header.symbol_count(), 2);
        assert_eq!(reader.next_byte().unwrap(), Some(0x80));
    }

    #[test]
    fn name_separator_is_replaced() {
        let header = Header::new(b"a;b", FreqTable::new());
        assert_eq!(header.name, b"a_b".to_vec());
        assert_eq!(parse(&header.to_bytes()).unwrap(), header);
    }

    #[test]
    fn rejects_malformed_headers() {
        let cases: &[&[u8]] = &[
            b"",
            b"HUF",
            b"PUFF;n;a:1;",
            b"HUFF;unterminated",
            b"HUFF;n;a:1",
            b"HUFF;n;a1;",
            b"HUFF;n;a:;",
            b"HUFF;n;a:01;",
            b"HUFF;n;a:0;",
            b"HUFF;n;a:-1;",
            b"HUFF;n;a:1,a:2;",
            b"HUFF;n;a:1.b:2;",
            b"HUFF;n;a:99999999999999999999;",
            b"HUFF;n;a:18446744073709551615,b:1;",
        ];
        for case in cases {
            match parse(case) {
                Err(HuffmanError::InvalidFormat(_)) => {}
                other => panic!(
                    "{:?} should be rejected, got {:?}",
                    String::from_utf8_lossy(case),
                    other
                ),
            }
        }
    }
}
