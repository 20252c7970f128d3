//! Bit-granularity access layered over byte sources and sinks.
//!
//! Both sides work most-significant bit first: the first bit written to or
//! read from a byte is bit 7.

use std::io::{self, ErrorKind, Read, Seek, SeekFrom, Write};

const READ_BUF_SIZE: usize = 8 * 1024;

/// Buffered reader that hands out either whole bytes or single bits.
///
/// End of stream is reported as `None`, never as a byte value.
pub struct BitReader<R> {
    inner: R,
    buf: Box<[u8]>,
    pos: usize,
    len: usize,
    cursor: u8,
    consumed: u64,
    origin: u64,
}

impl<R: Read> BitReader<R> {
    pub fn new(inner: R) -> Self {
        BitReader {
            inner,
            buf: vec![0; READ_BUF_SIZE].into_boxed_slice(),
            pos: 0,
            len: 0,
            cursor: 7,
            consumed: 0,
            origin: 0,
        }
    }

    /// Makes sure `buf[pos]` is valid. Returns `false` at end of stream.
    fn fill(&mut self) -> io::Result<bool> {
        if self.pos < self.len {
            return Ok(true);
        }
        loop {
            match self.inner.read(&mut self.buf) {
                Ok(0) => {
                    self.pos = 0;
                    self.len = 0;
                    return Ok(false);
                }
                Ok(n) => {
                    self.pos = 0;
                    self.len = n;
                    return Ok(true);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// The byte holding the cursor, without consuming it.
    pub fn peek_byte(&mut self) -> io::Result<Option<u8>> {
        if !self.fill()? {
            return Ok(None);
        }
        Ok(Some(self.buf[self.pos]))
    }

    /// Consumes the byte holding the cursor, including any bits of it not
    /// yet read, and realigns the cursor to bit 7 of the following byte.
    pub fn next_byte(&mut self) -> io::Result<Option<u8>> {
        let byte = self.peek_byte()?;
        if byte.is_some() {
            self.advance_byte();
        }
        Ok(byte)
    }

    pub fn peek_bit(&mut self) -> io::Result<Option<bool>> {
        let cursor = self.cursor;
        Ok(self.peek_byte()?.map(|b| (b >> cursor) & 1 == 1))
    }

    pub fn next_bit(&mut self) -> io::Result<Option<bool>> {
        let bit = self.peek_bit()?;
        if bit.is_some() {
            if self.cursor == 0 {
                self.advance_byte();
            } else {
                self.cursor -= 1;
            }
        }
        Ok(bit)
    }

    fn advance_byte(&mut self) {
        self.pos += 1;
        self.cursor = 7;
        self.consumed += 1;
    }

    /// Whole bytes consumed since construction or the last reset.
    pub fn bytes_consumed(&self) -> u64 {
        self.consumed
    }

    /// True when the cursor sits on bit 7, i.e. no bit of the current byte has been read.
    pub fn is_aligned(&self) -> bool {
        self.cursor == 7
    }
}

impl<R: Read + Seek> BitReader<R> {
    /// Wraps `inner` so that [`BitReader::reset`] returns to its current position.
    pub fn rewindable(mut inner: R) -> io::Result<Self> {
        let origin = inner.stream_position()?;
        let mut reader = BitReader::new(inner);
        reader.origin = origin;
        Ok(reader)
    }

    /// Rewinds to the position the source had when the reader was created.
    pub fn reset(&mut self) -> io::Result<()> {
        self.inner.seek(SeekFrom::Start(self.origin))?;
        self.pos = 0;
        self.len = 0;
        self.cursor = 7;
        self.consumed = 0;
        Ok(())
    }
}

/// Accumulates bits into bytes and writes each byte as soon as it is full.
///
/// A trailing partial byte stays in the accumulator until [`BitWriter::finish`].
pub struct BitWriter<W: Write> {
    inner: W,
    acc: u8,
    cursor: u8,
    bits_written: u64,
    bytes_written: u64,
}

impl<W: Write> BitWriter<W> {
    pub fn new(inner: W) -> Self {
        BitWriter {
            inner,
            acc: 0,
            cursor: 7,
            bits_written: 0,
            bytes_written: 0,
        }
    }

    pub fn write_bit(&mut self, bit: bool) -> io::Result<()> {
        if bit {
            self.acc |= 1 << self.cursor;
        } else {
            self.acc &= !(1 << self.cursor);
        }
        self.bits_written += 1;

        if self.cursor == 0 {
            let byte = self.acc;
            self.inner.write_all(&[byte])?;
            self.bytes_written += 1;
            self.acc = 0;
            self.cursor = 7;
        } else {
            self.cursor -= 1;
        }
        Ok(())
    }

    pub fn write_bits(&mut self, bits: &[bool]) -> io::Result<()> {
        for &bit in bits {
            self.write_bit(bit)?;
        }
        Ok(())
    }

    pub fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        self.write_bytes(&[byte])
    }

    /// Writes raw bytes straight to the sink. Fails if a partial byte is pending.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        if !self.is_aligned() {
            return Err(io::Error::new(
                ErrorKind::InvalidInput,
                "byte write while a partial byte is pending",
            ));
        }
        self.inner.write_all(bytes)?;
        self.bytes_written += bytes.len() as u64;
        Ok(())
    }

    pub fn is_aligned(&self) -> bool {
        self.cursor == 7
    }

    /// Bits passed to `write_bit`, excluding any padding.
    pub fn bits_written(&self) -> u64 {
        self.bits_written
    }

    /// Bytes handed to the sink so far, header bytes included.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Pads a pending partial byte with zero bits, writes it, flushes the
    /// sink and returns it.
    pub fn finish(mut self) -> io::Result<W> {
        if !self.is_aligned() {
            let byte = self.acc;
            self.inner.write_all(&[byte])?;
            self.bytes_written += 1;
            self.acc = 0;
            self.cursor = 7;
        }
        self.inner.flush()?;
        Ok(self.inner)
    }
}
