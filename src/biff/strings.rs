//! String decoding primitives shared by both BIFF dialects.
//!
//! BIFF8 Unicode strings:
//! - Header: char_count (2 bytes) + flags (1 byte)
//! - Flags bit 0 (`fHighByte`): 0 = compressed Latin-1, 1 = uncompressed UTF-16LE
//! - Flags bit 2 (`fExtSt`): extended (Asian phonetic) data follows
//! - Flags bit 3 (`fRichSt`): rich-text run array follows
//! - If fRichSt: 2-byte run count follows the flags
//! - If fExtSt: 4-byte extended data size follows
//! - Then the character data, then the rich-text runs (4 bytes each) if
//!   present, then the extended data if present.
//!
//! `read_unicode_string` here is for strings that are guaranteed to be
//! wholly within one record body (LABEL, RSTRING, FORMAT, BOUNDSHEET's
//! 1-byte-length sibling `read_short_string`). SST entries, which can
//! straddle CONTINUE records, go through [`crate::sst::assemble_sst`]
//! instead.

use super::parser::{read_u16, read_u32, read_u8};
use crate::error::{XlsError, XlsResult};
use crate::source::Encoder;

/// Read a BIFF "short" string (1-byte length prefix, used in BOUNDSHEET,
/// FONT names, sheet names).
pub fn read_short_string(data: &[u8], offset: &mut usize) -> XlsResult<String> {
    let char_count = read_u8(data, offset)? as u16;
    let flags = read_u8(data, offset)?;
    read_character_data(data, offset, char_count, flags)
}

/// Read a BIFF8 Unicode string with a 2-byte length prefix (LABEL, SST
/// entries not spanning CONTINUE, FORMAT, RSTRING's text portion).
pub fn read_unicode_string(data: &[u8], offset: &mut usize) -> XlsResult<String> {
    let char_count = read_u16(data, offset)?;
    let flags = read_u8(data, offset)?;
    read_unicode_string_body(data, offset, char_count, flags)
}

/// Read the remainder of a Unicode string once `char_count` and the flags
/// byte have already been consumed by the caller. Used directly by
/// `read_unicode_string` and by the SST assembler, which reads its own
/// header framing (total/unique counts) before getting to each entry.
pub fn read_unicode_string_body(
    data: &[u8],
    offset: &mut usize,
    char_count: u16,
    flags: u8,
) -> XlsResult<String> {
    let is_rich = (flags & 0x08) != 0;
    let has_ext = (flags & 0x04) != 0;

    let run_count = if is_rich { read_u16(data, offset)? } else { 0 };
    let ext_size = if has_ext { read_u32(data, offset)? } else { 0 };

    let text = read_character_data(data, offset, char_count, flags)?;

    // Rich-text runs and phonetic extension data are skipped over, never
    // parsed or retained.
    if is_rich {
        *offset += run_count as usize * 4;
    }
    if has_ext {
        *offset += ext_size as usize;
    }

    Ok(text)
}

/// Read character data (no header) given a char count and flags byte.
/// Flag bit 0 selects compressed Latin-1 (1 byte/char) vs. UTF-16LE (2
/// bytes/char).
pub(crate) fn read_character_data(
    data: &[u8],
    offset: &mut usize,
    char_count: u16,
    flags: u8,
) -> XlsResult<String> {
    let is_wide = (flags & 0x01) != 0;
    let count = char_count as usize;

    if is_wide {
        let byte_len = count * 2;
        if *offset + byte_len > data.len() {
            return Err(XlsError::Parse(format!(
                "string data too short: need {} bytes at offset {}, have {}",
                byte_len,
                *offset,
                data.len().saturating_sub(*offset)
            )));
        }
        let mut chars = Vec::with_capacity(count);
        for i in 0..count {
            let lo = data[*offset + i * 2];
            let hi = data[*offset + i * 2 + 1];
            chars.push(u16::from_le_bytes([lo, hi]));
        }
        *offset += byte_len;
        String::from_utf16(&chars)
            .map_err(|e| XlsError::Parse(format!("invalid UTF-16 string: {e}")))
    } else {
        // Compressed: codepoints 0-255 map identically onto Latin-1, which
        // is what BIFF8's compressed form actually stores.
        if *offset + count > data.len() {
            return Err(XlsError::Parse(format!(
                "string data too short: need {} bytes at offset {}, have {}",
                count,
                *offset,
                data.len().saturating_sub(*offset)
            )));
        }
        let s: String = data[*offset..*offset + count]
            .iter()
            .map(|&b| b as char)
            .collect();
        *offset += count;
        Ok(s)
    }
}

/// Read a BIFF5/7 byte string: a length-prefixed run of bytes decoded
/// through the active code-page `Encoder`. `len` is read by the caller
/// since BIFF5/7 records vary between 1-byte and 2-byte length prefixes
/// depending on record type.
pub fn decode_byte_string(
    data: &[u8],
    offset: &mut usize,
    len: usize,
    encoder: &dyn Encoder,
) -> XlsResult<String> {
    if *offset + len > data.len() {
        return Err(XlsError::Parse(format!(
            "byte string too short: need {} bytes at offset {}, have {}",
            len,
            *offset,
            data.len().saturating_sub(*offset)
        )));
    }
    let bytes = &data[*offset..*offset + len];
    *offset += len;
    encoder.decode(bytes)
}

/// Read a BIFF5/7 byte string with a 1-byte length prefix.
pub fn read_byte_string_u8(
    data: &[u8],
    offset: &mut usize,
    encoder: &dyn Encoder,
) -> XlsResult<String> {
    let len = read_u8(data, offset)? as usize;
    decode_byte_string(data, offset, len, encoder)
}
