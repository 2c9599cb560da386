//! Capability seams this crate consumes but does not own the implementation
//! of: obtaining the raw Workbook stream bytes, and decoding code-page bytes
//! into `String`s for BIFF5/7 records.
//!
//! Opening an OLE2/CFB container and resolving arbitrary code pages are both
//! out of scope for the core parser. `StreamSource` and `Encoder` are the
//! traits a caller implements (or picks a provided default for) to supply
//! those two things; everything downstream of them works purely on byte
//! slices.

use crate::error::XlsResult;

/// Supplies the raw bytes of the `Workbook` (BIFF8) or `Book` (BIFF5/7)
/// stream, however the caller obtained the container it lives in.
///
/// A caller opening an OLE2/CFB compound file stream library supplies an
/// implementation that locates the right stream by name; a caller already
/// holding a bare `.xls` payload (pre-extracted, or never compound in the
/// first place) can implement this as a no-op over an owned buffer.
pub trait StreamSource {
    /// Return the complete Workbook/Book stream bytes.
    fn read_workbook_stream(&mut self) -> XlsResult<Vec<u8>>;
}

/// An in-memory byte buffer as a `StreamSource`. The common case when the
/// caller has already done whatever container extraction is needed.
pub struct BufferSource(pub Vec<u8>);

impl StreamSource for BufferSource {
    fn read_workbook_stream(&mut self) -> XlsResult<Vec<u8>> {
        Ok(self.0.clone())
    }
}

/// Decodes BIFF5/7 byte strings, which carry no per-string encoding tag of
/// their own — the code page comes from the workbook's CODEPAGE record and
/// is fixed for the whole stream.
pub trait Encoder {
    fn decode(&self, bytes: &[u8]) -> XlsResult<String>;
}

/// Windows-1252 decoding. The common default for BIFF5/7 workbooks written
/// by Western-locale Excel, and the fallback this crate uses when a
/// CODEPAGE record names a page with no dedicated `Encoder`.
pub struct Cp1252Encoder;

impl Encoder for Cp1252Encoder {
    fn decode(&self, bytes: &[u8]) -> XlsResult<String> {
        Ok(bytes.iter().map(|&b| cp1252_to_char(b)).collect())
    }
}

/// Maps a CP1252 byte to its Unicode scalar value. Bytes 0x00-0x7F and
/// 0xA0-0xFF agree with Latin-1; 0x80-0x9F hold CP1252's own assignments
/// (curly quotes, em-dash, etc.) where Latin-1 has C1 control codes.
fn cp1252_to_char(b: u8) -> char {
    match b {
        0x80 => '\u{20AC}',
        0x82 => '\u{201A}',
        0x83 => '\u{0192}',
        0x84 => '\u{201E}',
        0x85 => '\u{2026}',
        0x86 => '\u{2020}',
        0x87 => '\u{2021}',
        0x88 => '\u{02C6}',
        0x89 => '\u{2030}',
        0x8A => '\u{0160}',
        0x8B => '\u{2039}',
        0x8C => '\u{0152}',
        0x8E => '\u{017D}',
        0x91 => '\u{2018}',
        0x92 => '\u{2019}',
        0x93 => '\u{201C}',
        0x94 => '\u{201D}',
        0x95 => '\u{2022}',
        0x96 => '\u{2013}',
        0x97 => '\u{2014}',
        0x98 => '\u{02DC}',
        0x99 => '\u{2122}',
        0x9A => '\u{0161}',
        0x9B => '\u{203A}',
        0x9C => '\u{0153}',
        0x9E => '\u{017E}',
        0x9F => '\u{0178}',
        other => other as char,
    }
}

/// Plain UTF-8 passthrough, provided for BIFF5/7 streams a caller already
/// knows were re-encoded (or for testing).
pub struct Utf8Encoder;

impl Encoder for Utf8Encoder {
    fn decode(&self, bytes: &[u8]) -> XlsResult<String> {
        String::from_utf8(bytes.to_vec())
            .map_err(|e| crate::error::XlsError::Parse(format!("invalid UTF-8 byte string: {e}")))
    }
}

/// Resolve a Windows code-page identifier (as carried by the CODEPAGE
/// record) to an `Encoder`. Only the handful of encodings this crate ships
/// concretely are recognized; anything else is the caller's responsibility
/// to supply.
pub fn encoder_for_code_page(code_page: u16) -> Option<Box<dyn Encoder>> {
    match code_page {
        1252 => Some(Box::new(Cp1252Encoder)),
        1200 | 65001 => Some(Box::new(Utf8Encoder)),
        _ => None,
    }
}

#[cfg(feature = "cfb")]
pub mod cfb_source {
    //! OLE2/CFB-backed `StreamSource`, gated behind the `cfb` feature. The
    //! only concrete container implementation this crate ships; anything
    //! else (a custom virtual filesystem, a network-backed container) is
    //! the caller's own `StreamSource` impl.
    use super::StreamSource;
    use crate::error::{XlsError, XlsResult};
    use std::io::Read;

    pub struct CfbStreamSource<F> {
        cfb: ::cfb::CompoundFile<F>,
    }

    impl<F: Read + std::io::Seek> CfbStreamSource<F> {
        pub fn open(inner: F) -> XlsResult<Self> {
            let cfb = ::cfb::CompoundFile::open(inner)
                .map_err(|e| XlsError::InvalidFormat(format!("not a valid CFB container: {e}")))?;
            Ok(CfbStreamSource { cfb })
        }
    }

    impl<F: Read + std::io::Seek> StreamSource for CfbStreamSource<F> {
        fn read_workbook_stream(&mut self) -> XlsResult<Vec<u8>> {
            let name = if self.cfb.exists("Workbook") {
                "Workbook"
            } else if self.cfb.exists("Book") {
                "Book"
            } else {
                return Err(XlsError::InvalidFormat(
                    "no Workbook or Book stream in CFB container".into(),
                ));
            };
            let mut stream = self
                .cfb
                .open_stream(name)
                .map_err(|e| XlsError::Io(std::io::Error::other(e)))?;
            let mut buf = Vec::new();
            stream.read_to_end(&mut buf).map_err(XlsError::Io)?;
            Ok(buf)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_source_returns_its_bytes() {
        let mut src = BufferSource(vec![1, 2, 3]);
        assert_eq!(src.read_workbook_stream().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn cp1252_decodes_smart_quotes() {
        let enc = Cp1252Encoder;
        let s = enc.decode(&[0x93, b'h', b'i', 0x94]).unwrap();
        assert_eq!(s, "\u{201C}hi\u{201D}");
    }

    #[test]
    fn cp1252_decodes_ascii_and_latin1_tail_identically() {
        let enc = Cp1252Encoder;
        assert_eq!(enc.decode(b"abc").unwrap(), "abc");
        assert_eq!(enc.decode(&[0xE9]).unwrap(), "\u{E9}");
    }

    #[test]
    fn utf8_encoder_round_trips() {
        let enc = Utf8Encoder;
        assert_eq!(enc.decode("héllo".as_bytes()).unwrap(), "héllo");
    }

    #[test]
    fn encoder_for_code_page_known_and_unknown() {
        assert!(encoder_for_code_page(1252).is_some());
        assert!(encoder_for_code_page(1200).is_some());
        assert!(encoder_for_code_page(874).is_none());
    }
}
