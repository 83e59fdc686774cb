//! Decoding raw bytes into text storage
//!
//! # Strategy
//!
//! 1. **BOM Detection**: a complete BOM at the start decides the encoding and
//!    is dropped from the decoded chars, but stays in the checksum.
//! 2. **Declared Encoding**: used when there is no BOM.
//! 3. **Fallback**: with nothing declared, input decodes as UTF-8 until the
//!    first malformed sequence, then everything is decoded again with the
//!    configured default encoding. The bytes seen so far are recovered from
//!    the chars already decoded, so the input is never buffered whole.
//!
//! Input is consumed in blocks. Every consumed byte goes through the checksum
//! hasher, and decoded chars are pushed into fixed-capacity chunks, so no step
//! needs one allocation proportional to the whole input.

use crate::config::DecodeOptions;
use crate::error::{Result, TextError};
use crate::model::checksum::{Checksum, ChecksumHasher};
use crate::model::chunked_text::ChunkBuilder;
use crate::model::encoding::{detect_bom, BinaryScan, Encoding, UTF8_BOM};
use crate::model::span::TextSpan;
use crate::model::storage::{Storage, TextRead};
use encoding_rs::{CoderResult, DecoderResult};
use std::io::{self, ErrorKind, Read};

/// The result of a successful decode
#[derive(Debug)]
pub(crate) struct Decoded {
    pub storage: Storage,
    pub encoding: Encoding,
    pub checksum: Checksum,
}

/// Decode an in-memory byte sequence
pub(crate) fn decode_bytes(bytes: &[u8], options: &DecodeOptions) -> Result<Decoded> {
    decode_stream(bytes, options)
}

/// Decode everything `reader` yields
pub(crate) fn decode_reader<R: Read>(reader: R, options: &DecodeOptions) -> Result<Decoded> {
    decode_stream(reader, options)
}

fn decode_stream<R: Read>(mut reader: R, options: &DecodeOptions) -> Result<Decoded> {
    let mut block = vec![0u8; options.read_block_size.max(UTF8_BOM.len())];
    let mut hasher = ChecksumHasher::new(options.checksum_algorithm);

    // Make sure the first block holds a complete BOM if there is one
    let mut filled = 0;
    while filled < UTF8_BOM.len() {
        let read = read_some(&mut reader, &mut block[filled..])?;
        if read == 0 {
            break;
        }
        filled += read;
    }
    hasher.update(&block[..filled]);

    let (mut target, bom_len) = match (detect_bom(&block[..filled]), options.encoding) {
        (Some((encoding, bom_len)), _) => {
            (Target::Decode(DecodeSink::new(encoding, bom_len, options)), bom_len)
        }
        (None, Some(encoding)) => (Target::Decode(DecodeSink::new(encoding, 0, options)), 0),
        (None, None) => (Target::Utf8(Utf8Check::new(options)), 0),
    };
    target.feed(&block[bom_len..filled], false)?;
    let mut total_bytes = filled;
    loop {
        let read = read_some(&mut reader, &mut block)?;
        if read == 0 {
            break;
        }
        total_bytes += read;
        hasher.update(&block[..read]);
        target.feed(&block[..read], false)?;
    }
    target.feed(&[], true)?;

    let (storage, encoding) = target.finish();
    tracing::debug!(
        encoding = %encoding,
        bytes = total_bytes,
        chars = storage.len(),
        storage = storage.kind(),
        "decoded text"
    );
    Ok(Decoded {
        storage,
        encoding,
        checksum: hasher.finish(),
    })
}

fn read_some<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match reader.read(buf) {
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}

/// Where decoded bytes go
enum Target {
    /// The encoding is known
    Decode(DecodeSink),
    /// Nothing declared and no BOM: UTF-8 until proven otherwise
    Utf8(Utf8Check),
}

impl Target {
    fn feed(&mut self, bytes: &[u8], last: bool) -> Result<()> {
        match self {
            Target::Decode(sink) => sink.feed(bytes, last),
            Target::Utf8(check) => {
                if let Some(rest) = check.feed(bytes, last)? {
                    let sink = check.fall_back(&rest, last)?;
                    *self = Target::Decode(sink);
                }
                Ok(())
            }
        }
    }

    fn finish(self) -> (Storage, Encoding) {
        match self {
            Target::Decode(sink) => (sink.out.builder.finish(), sink.encoding),
            Target::Utf8(check) => (check.out.builder.finish(), Encoding::Utf8),
        }
    }
}

/// Decoded chars on their way into chunks
struct Output {
    throw_if_binary: bool,
    builder: ChunkBuilder,
    binary: BinaryScan,
}

impl Output {
    fn new(options: &DecodeOptions) -> Self {
        Output {
            throw_if_binary: options.throw_if_binary,
            builder: ChunkBuilder::new(options.chunk_capacity),
            binary: BinaryScan::default(),
        }
    }

    fn push(&mut self, text: &str) -> Result<()> {
        self.binary.feed(text);
        if self.throw_if_binary && self.binary.is_binary() {
            return Err(TextError::InvalidContent);
        }
        self.builder.push_str(text);
        Ok(())
    }
}

/// Validates input as UTF-8 while decoding it.
///
/// Holds back at most the bytes of one incomplete sequence between blocks.
struct Utf8Check {
    options: DecodeOptions,
    pending: Vec<u8>,
    out: Output,
}

impl Utf8Check {
    fn new(options: &DecodeOptions) -> Self {
        Utf8Check {
            options: options.clone(),
            pending: Vec::new(),
            out: Output::new(options),
        }
    }

    /// Decode `bytes`, or return every byte not yet decoded once the input
    /// turns out not to be UTF-8
    fn feed(&mut self, bytes: &[u8], last: bool) -> Result<Option<Vec<u8>>> {
        self.pending.extend_from_slice(bytes);
        match std::str::from_utf8(&self.pending) {
            Ok(text) => {
                self.out.push(text)?;
                self.pending.clear();
            }
            Err(e) if e.error_len().is_none() && !last => {
                let valid = e.valid_up_to();
                if let Ok(text) = std::str::from_utf8(&self.pending[..valid]) {
                    self.out.push(text)?;
                }
                self.pending.drain(..valid);
            }
            Err(_) => return Ok(Some(std::mem::take(&mut self.pending))),
        }
        Ok(None)
    }

    /// Re-decode everything seen so far with the default encoding.
    ///
    /// The chars decoded so far are valid UTF-8, so re-encoding them gives
    /// back exactly the bytes they came from; `rest` follows them.
    fn fall_back(&mut self, rest: &[u8], last: bool) -> Result<DecodeSink> {
        let encoding = self.options.default_encoding;
        let decoded = std::mem::replace(&mut self.out, Output::new(&self.options))
            .builder
            .finish();
        tracing::debug!(
            %encoding,
            offset = decoded.len(),
            "input is not UTF-8, decoding with the default encoding"
        );

        let mut sink = DecodeSink::new(encoding, 0, &self.options);
        let mut replay = Ok(());
        let mut chars = String::new();
        decoded.visit_runs(TextSpan::new(0, decoded.len()), &mut |run| {
            if replay.is_err() {
                return;
            }
            chars.clear();
            chars.extend(run);
            replay = sink.feed(chars.as_bytes(), false);
        });
        replay?;
        sink.feed(rest, last)?;
        Ok(sink)
    }
}

struct DecodeSink {
    decoder: encoding_rs::Decoder,
    encoding: Encoding,
    strict: bool,
    scratch: String,
    out: Output,
    /// Raw bytes handed to the decoder so far, BOM included
    consumed: usize,
}

impl DecodeSink {
    fn new(encoding: Encoding, bom_len: usize, options: &DecodeOptions) -> Self {
        DecodeSink {
            decoder: encoding.to_encoding_rs().new_decoder_without_bom_handling(),
            encoding,
            strict: options.strict,
            scratch: String::new(),
            out: Output::new(options),
            consumed: bom_len,
        }
    }

    fn feed(&mut self, mut bytes: &[u8], last: bool) -> Result<()> {
        loop {
            self.scratch.clear();
            let room = bytes.len().saturating_mul(3).saturating_add(16);
            self.scratch.reserve(room);

            let done = if self.strict {
                let (result, read) =
                    self.decoder
                        .decode_to_string_without_replacement(bytes, &mut self.scratch, last);
                if let DecoderResult::Malformed(bad, after) = result {
                    let offset = self.consumed + read - (bad as usize + after as usize).min(read);
                    return Err(TextError::UnrepresentableSequence {
                        encoding: self.encoding.display_name(),
                        offset,
                    });
                }
                self.consumed += read;
                bytes = &bytes[read..];
                result == DecoderResult::InputEmpty
            } else {
                let (result, read, _had_errors) =
                    self.decoder.decode_to_string(bytes, &mut self.scratch, last);
                self.consumed += read;
                bytes = &bytes[read..];
                result == CoderResult::InputEmpty
            };

            self.out.push(&self.scratch)?;
            if done {
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::checksum::ChecksumAlgorithm;

    fn text_of(decoded: &Decoded) -> String {
        decoded
            .storage
            .to_string_span(TextSpan::new(0, decoded.storage.len()))
            .unwrap()
    }

    /// A reader that hands out at most `step` bytes per call
    struct Trickle<'a> {
        data: &'a [u8],
        step: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.step.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    #[test]
    fn test_utf8_bom_is_stripped_but_hashed() {
        let bytes = [0xEF, 0xBB, 0xBF, b'H', b'i'];
        let decoded = decode_bytes(&bytes, &DecodeOptions::default()).unwrap();
        assert_eq!(decoded.encoding, Encoding::Utf8Bom);
        assert_eq!(text_of(&decoded), "Hi");
        assert_eq!(
            decoded.checksum,
            Checksum::compute(ChecksumAlgorithm::Sha1, &bytes)
        );
    }

    #[test]
    fn test_bom_overrides_declared_encoding() {
        let bytes = [0xFF, 0xFE, b'H', 0x00, b'i', 0x00];
        let options = DecodeOptions::default().with_encoding(Encoding::Windows1252);
        let decoded = decode_bytes(&bytes, &options).unwrap();
        assert_eq!(decoded.encoding, Encoding::Utf16Le);
        assert_eq!(text_of(&decoded), "Hi");
    }

    #[test]
    fn test_short_partial_bom_is_content() {
        let bytes = [0xEF, 0xBB];
        let options = DecodeOptions::default().with_encoding(Encoding::Windows1252);
        let decoded = decode_bytes(&bytes, &options).unwrap();
        assert_eq!(decoded.encoding, Encoding::Windows1252);
        assert_eq!(decoded.storage.len(), 2);
    }

    #[test]
    fn test_fallback_to_default_encoding() {
        let bytes = [b'c', b'a', b'f', 0xE9];
        let decoded = decode_bytes(&bytes, &DecodeOptions::default()).unwrap();
        assert_eq!(decoded.encoding, Encoding::Windows1252);
        assert_eq!(text_of(&decoded), "café");

        let decoded = decode_bytes("café".as_bytes(), &DecodeOptions::default()).unwrap();
        assert_eq!(decoded.encoding, Encoding::Utf8);
        assert_eq!(text_of(&decoded), "café");
    }

    #[test]
    fn test_invalid_utf8_replaced_unless_strict() {
        let bytes = [b'a', 0xFF, b'b'];
        let options = DecodeOptions::default().with_encoding(Encoding::Utf8);
        let decoded = decode_bytes(&bytes, &options).unwrap();
        assert_eq!(text_of(&decoded), "a\u{FFFD}b");

        let err = decode_bytes(&bytes, &options.with_strict(true)).unwrap_err();
        match err {
            TextError::UnrepresentableSequence { offset, .. } => assert_eq!(offset, 1),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_strict_rejects_truncated_sequence() {
        let bytes = [b'a', 0xE4, 0xB8];
        let options = DecodeOptions::default()
            .with_encoding(Encoding::Utf8)
            .with_strict(true);
        assert!(matches!(
            decode_bytes(&bytes, &options),
            Err(TextError::UnrepresentableSequence { .. })
        ));
    }

    #[test]
    fn test_binary_detection() {
        let options = DecodeOptions::default().with_throw_if_binary(true);
        assert!(decode_bytes(b"\0abc", &options).is_ok());
        assert!(matches!(
            decode_bytes(b"ab\0\0c", &options),
            Err(TextError::InvalidContent)
        ));
        // without the flag binary content decodes fine
        assert!(decode_bytes(b"ab\0\0c", &DecodeOptions::default()).is_ok());
    }

    #[test]
    fn test_stream_in_tiny_reads_matches_bytes() {
        let source = "line one\r\nzwei – drei\u{2028}四\n".repeat(50);
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(source.as_bytes());

        let options = DecodeOptions::default()
            .with_encoding(Encoding::Utf8)
            .with_read_block_size(7)
            .with_chunk_capacity(64);
        let streamed = decode_reader(
            Trickle {
                data: &bytes,
                step: 1,
            },
            &options,
        )
        .unwrap();
        let whole = decode_bytes(&bytes, &DecodeOptions::default()).unwrap();

        assert_eq!(streamed.encoding, Encoding::Utf8Bom);
        assert_eq!(text_of(&streamed), source);
        assert_eq!(text_of(&whole), source);
        assert_eq!(streamed.checksum, whole.checksum);
        assert!(matches!(streamed.storage, Storage::Chunked(_)));
    }

    #[test]
    fn test_undeclared_stream_stays_utf8_across_split_sequences() {
        let source = "zwei – drei 四 😀\n".repeat(30);
        let options = DecodeOptions::default()
            .with_read_block_size(5)
            .with_chunk_capacity(16);
        let streamed = decode_reader(
            Trickle {
                data: source.as_bytes(),
                step: 3,
            },
            &options,
        )
        .unwrap();
        assert_eq!(streamed.encoding, Encoding::Utf8);
        assert_eq!(text_of(&streamed), source);
        assert_eq!(
            streamed.checksum,
            Checksum::compute(ChecksumAlgorithm::Sha1, source.as_bytes())
        );
    }

    #[test]
    fn test_undeclared_stream_falls_back_after_valid_prefix() {
        let mut bytes = "héllo wörld\n".repeat(40).into_bytes();
        bytes.push(0xE9);
        bytes.extend_from_slice(b" end");
        let options = DecodeOptions::default()
            .with_read_block_size(5)
            .with_chunk_capacity(16);
        let streamed = decode_reader(
            Trickle {
                data: &bytes,
                step: 3,
            },
            &options,
        )
        .unwrap();

        let (expected, _) = encoding_rs::WINDOWS_1252.decode_without_bom_handling(&bytes);
        assert_eq!(streamed.encoding, Encoding::Windows1252);
        assert_eq!(text_of(&streamed), expected);
        assert!(text_of(&streamed).ends_with("\u{e9} end"));
        assert_eq!(
            streamed.checksum,
            Checksum::compute(ChecksumAlgorithm::Sha1, &bytes)
        );
    }

    #[test]
    fn test_truncated_utf8_at_end_falls_back() {
        let bytes = [b'a', b'b', 0xE4, 0xB8];
        let decoded = decode_reader(&bytes[..], &DecodeOptions::default()).unwrap();
        assert_eq!(decoded.encoding, Encoding::Windows1252);
        assert_eq!(decoded.storage.len(), 4);
    }

    #[test]
    fn test_utf16_be_with_surrogates() {
        let text = "a😀b";
        let mut bytes = vec![0xFE, 0xFF];
        for unit in text.encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        let decoded = decode_reader(&bytes[..], &DecodeOptions::default()).unwrap();
        assert_eq!(decoded.encoding, Encoding::Utf16Be);
        assert_eq!(text_of(&decoded), text);
        assert_eq!(decoded.storage.len(), 3);
    }

    #[test]
    fn test_empty_input() {
        let decoded = decode_bytes(&[], &DecodeOptions::default()).unwrap();
        assert_eq!(decoded.storage.len(), 0);
        assert_eq!(decoded.encoding, Encoding::Utf8);
        assert_eq!(
            decoded.checksum.to_hex(),
            "da39a3ee5e6b4b0d3255bfef95601890afd80709"
        );
    }
}
