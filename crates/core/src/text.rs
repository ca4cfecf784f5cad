//! Charset-aware text decoding over byte streams.

use std::io::{self, BufRead, BufReader, Read};

use serde::{Deserialize, Serialize};

/// Text decoding mode applied by text-returning operations.
///
/// Decoding never fails: malformed input decodes to U+FFFD.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Charset {
    /// UTF-8, the platform default.
    #[default]
    Utf8,
    /// ISO-8859-1, every byte mapping to the code point of the same value.
    Latin1,
    /// 7-bit ASCII.
    Ascii,
}

impl Charset {
    /// Decode a complete byte slice.
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            Charset::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Charset::Latin1 => bytes.iter().map(|&b| char::from(b)).collect(),
            Charset::Ascii => bytes
                .iter()
                .map(|&b| if b < 0x80 { char::from(b) } else { '\u{FFFD}' })
                .collect(),
        }
    }
}

const REPLACEMENT: &str = "\u{FFFD}";
const CHUNK: usize = 8 * 1024;

/// Streaming decoder yielding the UTF-8 encoding of the decoded text.
///
/// Multi-byte sequences split across reads of the underlying stream are
/// carried over and decoded once complete.
pub struct TextReader<R> {
    inner: R,
    charset: Charset,
    carry: Vec<u8>,
    pending: Vec<u8>,
    pending_pos: usize,
    eof: bool,
}

impl<R: Read> TextReader<R> {
    /// Decode `inner` with the given charset.
    pub fn new(inner: R, charset: Charset) -> Self {
        Self {
            inner,
            charset,
            carry: Vec::new(),
            pending: Vec::new(),
            pending_pos: 0,
            eof: false,
        }
    }

    /// The charset this reader decodes with.
    pub fn charset(&self) -> Charset {
        self.charset
    }

    /// Decode the remaining input to a string.
    pub fn read_to_string(mut self) -> io::Result<String> {
        let mut output = String::new();
        Read::read_to_string(&mut self, &mut output)?;
        Ok(output)
    }

    /// Iterate over decoded lines.
    pub fn lines(self) -> io::Lines<BufReader<Self>> {
        BufReader::new(self).lines()
    }

    fn fill_pending(&mut self) -> io::Result<()> {
        let mut buf = [0u8; CHUNK];
        let read = self.inner.read(&mut buf)?;
        if read == 0 {
            self.eof = true;
            if !self.carry.is_empty() {
                // The stream ended inside a multi-byte sequence.
                let tail = String::from_utf8_lossy(&self.carry).into_owned();
                self.pending.extend_from_slice(tail.as_bytes());
                self.carry.clear();
            }
            return Ok(());
        }

        match self.charset {
            Charset::Utf8 => self.decode_utf8(&buf[..read]),
            Charset::Latin1 | Charset::Ascii => {
                let decoded = self.charset.decode(&buf[..read]);
                self.pending.extend_from_slice(decoded.as_bytes());
            }
        }
        Ok(())
    }

    fn decode_utf8(&mut self, chunk: &[u8]) {
        let mut data = std::mem::take(&mut self.carry);
        data.extend_from_slice(chunk);

        let mut rest: &[u8] = &data;
        while !rest.is_empty() {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    self.pending.extend_from_slice(valid.as_bytes());
                    break;
                }
                Err(err) => {
                    let valid_len = err.valid_up_to();
                    self.pending.extend_from_slice(&rest[..valid_len]);
                    match err.error_len() {
                        Some(bad) => {
                            self.pending.extend_from_slice(REPLACEMENT.as_bytes());
                            rest = &rest[valid_len + bad..];
                        }
                        None => {
                            // Incomplete sequence at the end of the chunk;
                            // keep it for the next read.
                            self.carry = rest[valid_len..].to_vec();
                            break;
                        }
                    }
                }
            }
        }
    }
}

impl<R: Read> Read for TextReader<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if out.is_empty() {
            return Ok(0);
        }
        while self.pending_pos >= self.pending.len() && !self.eof {
            self.pending.clear();
            self.pending_pos = 0;
            self.fill_pending()?;
        }

        let available = &self.pending[self.pending_pos..];
        if available.is_empty() {
            return Ok(0);
        }
        let count = available.len().min(out.len());
        out[..count].copy_from_slice(&available[..count]);
        self.pending_pos += count;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use super::*;

    /// Reader that trickles one byte per call, forcing split sequences.
    struct OneByte<'a>(&'a [u8]);

    impl Read for OneByte<'_> {
        fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
            match self.0.split_first() {
                Some((&first, rest)) if !out.is_empty() => {
                    out[0] = first;
                    self.0 = rest;
                    Ok(1)
                }
                _ => Ok(0),
            }
        }
    }

    #[test]
    fn utf8_passes_through() -> Result<()> {
        let reader = TextReader::new("héllo wörld".as_bytes(), Charset::Utf8);
        assert_eq!(reader.read_to_string()?, "héllo wörld");
        Ok(())
    }

    #[test]
    fn malformed_utf8_decodes_to_replacement() -> Result<()> {
        let reader = TextReader::new(&b"ok \xE9 end"[..], Charset::Utf8);
        assert_eq!(reader.read_to_string()?, "ok \u{FFFD} end");
        Ok(())
    }

    #[test]
    fn split_sequences_survive_chunked_reads() -> Result<()> {
        let text = "aé漢z";
        let reader = TextReader::new(OneByte(text.as_bytes()), Charset::Utf8);
        assert_eq!(reader.read_to_string()?, text);
        Ok(())
    }

    #[test]
    fn truncated_trailing_sequence_becomes_replacement() -> Result<()> {
        // The first two bytes of a three-byte sequence, then EOF.
        let reader = TextReader::new(&"漢".as_bytes()[..2], Charset::Utf8);
        assert_eq!(reader.read_to_string()?, "\u{FFFD}");
        Ok(())
    }

    #[test]
    fn latin1_maps_bytes_to_code_points() -> Result<()> {
        let reader = TextReader::new(&b"caf\xE9"[..], Charset::Latin1);
        assert_eq!(reader.read_to_string()?, "café");
        Ok(())
    }

    #[test]
    fn ascii_replaces_high_bytes() -> Result<()> {
        let reader = TextReader::new(&b"a\xFFb"[..], Charset::Ascii);
        assert_eq!(reader.read_to_string()?, "a\u{FFFD}b");
        Ok(())
    }

    #[test]
    fn lines_iterates_decoded_text() -> Result<()> {
        let reader = TextReader::new(&b"first\nsecond\n"[..], Charset::Utf8);
        let lines: Vec<String> = reader.lines().collect::<io::Result<_>>()?;
        assert_eq!(lines, ["first", "second"]);
        Ok(())
    }
}
