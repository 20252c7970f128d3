use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Cursor, Read, Seek, Write};
use std::path::Path;
use std::time::Instant;

use log::{debug, info, warn};

use crate::bitio::{BitReader, BitWriter};
use crate::container::Header;
use crate::error::{HuffmanError, Result};
use crate::huffman::{FreqTable, Node, build_code_table, build_huffman_tree, entropy_from_freq};

#[derive(Debug, Clone, PartialEq)]
pub struct CompressStats {
    pub original_len: u64,
    pub compressed_len: u64,
    pub header_len: u64,
    /// Payload bits before padding to a whole byte.
    pub payload_bits: u64,
    pub distinct_symbols: usize,
    pub entropy: f64,
}

impl CompressStats {
    /// Space saved, in percent of the original size.
    pub fn ratio(&self) -> f64 {
        if self.original_len == 0 {
            return 0.0;
        }
        100.0 * (1.0 - self.compressed_len as f64 / self.original_len as f64)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecompressStats {
    pub compressed_len: u64,
    pub decoded_len: u64,
    pub name: String,
}

/// Compresses all of `source` into `sink`, tagging the container with `name`.
///
/// The source is read twice from its current position: once to count bytes,
/// then, after seeking back, to emit their codes.
pub fn compress<R, W>(source: R, name: &[u8], sink: W) -> Result<CompressStats>
where
    R: Read + Seek,
    W: Write,
{
    let start_time = Instant::now();
    let mut reader = BitReader::rewindable(source)?;

    let freq = FreqTable::count(&mut reader)?;
    let original_len = freq.total();
    debug!(
        "Counted {} bytes, {} unique symbols",
        original_len,
        freq.distinct()
    );

    let header = Header::new(name, freq);
    let mut writer = BitWriter::new(BufWriter::new(sink));
    let header_len = header.write_to(&mut writer)? as u64;

    if let Some(tree) = build_huffman_tree(&header.freq)? {
        let table = build_code_table(&tree);
        debug!("Code table built with {} entries", table.len());

        reader.reset()?;
        let mut encoded = 0u64;
        while let Some(b) = reader.next_byte()? {
            let code = table.get(b).ok_or(HuffmanError::MissingSymbol(b))?;
            writer.write_bits(code)?;
            encoded += 1;
        }
        if encoded != original_len {
            return Err(HuffmanError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!(
                    "source yielded {} bytes on the second pass, expected {}",
                    encoded, original_len
                ),
            )));
        }
    }

    let payload_bits = writer.bits_written();
    let compressed_len = {
        let written = writer.bytes_written();
        let padded = if writer.is_aligned() { 0 } else { 1 };
        writer.finish()?;
        written + padded
    };

    let stats = CompressStats {
        original_len,
        compressed_len,
        header_len,
        payload_bits,
        distinct_symbols: header.freq.distinct(),
        entropy: entropy_from_freq(&header.freq),
    };
    debug!(
        "Compression finished in {:.2?}: {} payload bits",
        start_time.elapsed(),
        payload_bits
    );
    Ok(stats)
}

/// Decodes a container from `source` and writes the original bytes to `sink`.
pub fn decompress<R, W>(source: R, sink: W) -> Result<DecompressStats>
where
    R: Read,
    W: Write,
{
    let start_time = Instant::now();
    let mut reader = BitReader::new(source);
    let header = Header::read_from(&mut reader)?;
    let total = header.symbol_count();

    let mut out = BufWriter::new(sink);
    if let Some(root) = build_huffman_tree(&header.freq)? {
        decode_symbols(&root, total, &mut reader, &mut out)?;
    }
    out.flush()?;

    // The last payload byte may be partly consumed; the rest of it is padding.
    if !reader.is_aligned() {
        reader.next_byte()?;
    }
    if reader.peek_byte()?.is_some() {
        warn!("Ignoring trailing bytes after the payload");
    }

    debug!("Decoded {} symbols in {:.2?}", total, start_time.elapsed());
    Ok(DecompressStats {
        compressed_len: reader.bytes_consumed(),
        decoded_len: total,
        name: header.name_lossy(),
    })
}

fn decode_symbols<R: Read, W: Write>(
    root: &Node,
    total: u64,
    reader: &mut BitReader<R>,
    out: &mut W,
) -> Result<()> {
    // A lone leaf has an empty code: nothing to read, just repeat it.
    if let Node::Leaf { byte, .. } = root {
        let chunk = [*byte; 4096];
        let mut remaining = total;
        while remaining > 0 {
            let n = remaining.min(chunk.len() as u64) as usize;
            out.write_all(&chunk[..n])?;
            remaining -= n as u64;
        }
        return Ok(());
    }

    for _ in 0..total {
        let mut node = root;
        loop {
            match node {
                Node::Leaf { byte, .. } => {
                    out.write_all(&[*byte])?;
                    break;
                }
                Node::Internal { left, right, .. } => {
                    let bit = reader.next_bit()?.ok_or_else(|| {
                        HuffmanError::format("payload ends before all symbols were decoded")
                    })?;
                    node = if bit { &**right } else { &**left };
                }
            }
        }
    }
    Ok(())
}

pub fn compress_bytes(data: &[u8], name: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    compress(Cursor::new(data), name, &mut out)?;
    Ok(out)
}

pub fn decompress_bytes(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    decompress(Cursor::new(data), &mut out)?;
    Ok(out)
}

/// Compresses the file at `input` into `output`. The name tag is the
/// input's final path component.
pub fn compress_file(input: &Path, output: &Path) -> Result<CompressStats> {
    info!("Compressing {} into {}", input.display(), output.display());
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let source = BufReader::new(File::open(input)?);
    write_output(output, |sink| compress(source, name.as_bytes(), sink))
}

pub fn decompress_file(input: &Path, output: &Path) -> Result<DecompressStats> {
    info!("Decompressing {} into {}", input.display(), output.display());
    let source = BufReader::new(File::open(input)?);
    write_output(output, |sink| decompress(source, sink))
}

/// Runs `op` against a sibling `.part` file and renames it over `output`
/// only on success, so a failed run never leaves a partial `output`.
fn write_output<T>(output: &Path, op: impl FnOnce(&mut File) -> Result<T>) -> Result<T> {
    let mut part_name = output.file_name().unwrap_or_default().to_os_string();
    part_name.push(".part");
    let part = output.with_file_name(part_name);

    let result = File::create(&part)
        .map_err(HuffmanError::from)
        .and_then(|mut file| {
            let value = op(&mut file)?;
            file.sync_all()?;
            Ok(value)
        });

    match result {
        Ok(value) => {
            fs::rename(&part, output)?;
            Ok(value)
        }
        Err(e) => {
            if let Err(cleanup) = fs::remove_file(&part) {
                debug!("Could not remove {}: {}", part.display(), cleanup);
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_account_for_header_and_payload() {
        let mut out = Vec::new();
        let stats = compress(Cursor::new(b"abcabcabc".to_vec()), b"abc.txt", &mut out).unwrap();

        assert_eq!(stats.original_len, 9);
        assert_eq!(stats.distinct_symbols, 3);
        assert_eq!(stats.header_len, b"HUFF;abc.txt;a:3,b:3,c:3;".len() as u64);
        // Codes are 2, 2 and 1 bits long, three occurrences each.
        assert_eq!(stats.payload_bits, 15);
        assert_eq!(stats.compressed_len, stats.header_len + 2);
        assert_eq!(stats.compressed_len, out.len() as u64);
    }

    #[test]
    fn decompress_reports_name_and_length() {
        let packed = compress_bytes(b"hello world", b"greeting").unwrap();
        let mut out = Vec::new();
        let stats = decompress(Cursor::new(packed.clone()), &mut out).unwrap();
        assert_eq!(out, b"hello world".to_vec());
        assert_eq!(stats.name, "greeting");
        assert_eq!(stats.decoded_len, 11);
        assert_eq!(stats.compressed_len, packed.len() as u64);
    }

    #[test]
    fn truncated_payload_is_rejected() {
        let mut packed = compress_bytes(b"mississippi river", b"m").unwrap();
        packed.pop();
        match decompress_bytes(&packed) {
            Err(HuffmanError::InvalidFormat(_)) => {}
            other => panic!("expected format error, got {:?}", other),
        }
    }

    #[test]
    fn empty_ratio_is_zero() {
        let mut out = Vec::new();
        let stats = compress(Cursor::new(Vec::new()), b"e", &mut out).unwrap();
        assert_eq!(stats.ratio(), 0.0);
        assert_eq!(stats.payload_bits, 0);
        assert_eq!(out, b"HUFF;e;;".to_vec());
    }

    fn scratch_dir(test: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "huffman-tool-{}-{}",
            test,
            std::process::id()
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    struct BrokenSink;

    impl Write for BrokenSink {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("disk full"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Err(std::io::Error::other("disk full"))
        }
    }

    struct BrokenSource;

    impl Read for BrokenSource {
        fn read(&mut self, _: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("device unplugged"))
        }
    }

    impl Seek for BrokenSource {
        fn seek(&mut self, _: std::io::SeekFrom) -> std::io::Result<u64> {
            Ok(0)
        }
    }

    /// Serves `passes[n]` after the n-th rewind to the start.
    struct ShiftingSource {
        passes: Vec<Vec<u8>>,
        pass: usize,
        offset: usize,
    }

    impl ShiftingSource {
        fn new(first: &[u8], second: &[u8]) -> Self {
            ShiftingSource {
                passes: vec![first.to_vec(), second.to_vec()],
                pass: 0,
                offset: 0,
            }
        }
    }

    impl Read for ShiftingSource {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let data = &self.passes[self.pass][self.offset..];
            let n = data.len().min(buf.len());
            buf[..n].copy_from_slice(&data[..n]);
            self.offset += n;
            Ok(n)
        }
    }

    impl Seek for ShiftingSource {
        fn seek(&mut self, pos: std::io::SeekFrom) -> std::io::Result<u64> {
            if pos == std::io::SeekFrom::Start(0) {
                self.pass += 1;
                self.offset = 0;
            }
            Ok(self.offset as u64)
        }
    }

    #[test]
    fn compresses_from_the_current_position() {
        let mut source = Cursor::new(b"XXXXabcabc".to_vec());
        source.set_position(4);
        let mut out = Vec::new();
        let stats = compress(source, b"n", &mut out).unwrap();

        assert_eq!(stats.original_len, 6);
        assert!(out.starts_with(b"HUFF;n;a:2,b:2,c:2;"));
        assert_eq!(decompress_bytes(&out).unwrap(), b"abcabc".to_vec());
    }

    #[test]
    fn write_failures_surface_as_io_errors() {
        let err = compress(Cursor::new(b"some text".to_vec()), b"n", BrokenSink).unwrap_err();
        assert!(matches!(err, HuffmanError::Io(_)), "{:?}", err);

        let packed = compress_bytes(b"some text", b"n").unwrap();
        let err = decompress(Cursor::new(packed), BrokenSink).unwrap_err();
        assert!(matches!(err, HuffmanError::Io(_)), "{:?}", err);
    }

    #[test]
    fn read_failures_surface_as_io_errors() {
        let err = compress(BrokenSource, b"n", Vec::new()).unwrap_err();
        assert!(matches!(err, HuffmanError::Io(_)), "{:?}", err);

        let err = decompress(BrokenSource, Vec::new()).unwrap_err();
        assert!(matches!(err, HuffmanError::Io(_)), "{:?}", err);
    }

    #[test]
    fn source_gaining_a_byte_between_passes() {
        let source = ShiftingSource::new(b"aaaa", b"aaba");
        let err = compress(source, b"n", Vec::new()).unwrap_err();
        assert!(matches!(err, HuffmanError::MissingSymbol(b'b')), "{:?}", err);
    }

    #[test]
    fn source_shrinking_between_passes() {
        let source = ShiftingSource::new(b"abab", b"ab");
        match compress(source, b"n", Vec::new()) {
            Err(HuffmanError::Io(e)) => {
                assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof)
            }
            other => panic!("expected short second pass, got {:?}", other),
        }
    }

    #[test]
    fn failed_decode_leaves_no_output_file() {
        let dir = scratch_dir("failed-decode");
        let input = dir.join("river.huff");
        let output = dir.join("river.txt");
        let _ = fs::remove_file(&output);

        let mut packed =
            compress_bytes(b"mississippi river banks and more text here", b"river.txt").unwrap();
        packed.pop();
        fs::write(&input, &packed).unwrap();

        assert!(decompress_file(&input, &output).is_err());
        assert!(!output.exists());
        assert!(!dir.join("river.txt.part").exists());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn file_roundtrip() {
        let dir = scratch_dir("file-roundtrip");
        let original = dir.join("notes.txt");
        let packed = dir.join("notes.txt.huff");
        let restored = dir.join("restored.txt");
        fs::write(&original, b"file based round trip; with: delimiters, too").unwrap();

        let stats = compress_file(&original, &packed).unwrap();
        assert_eq!(stats.compressed_len, fs::metadata(&packed).unwrap().len());

        let stats = decompress_file(&packed, &restored).unwrap();
        assert_eq!(stats.name, "notes.txt");
        assert_eq!(fs::read(&restored).unwrap(), fs::read(&original).unwrap());
        assert!(!dir.join("restored.txt.part").exists());
        fs::remove_dir_all(&dir).unwrap();
    }
}
