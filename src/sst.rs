//! Shared String Table assembly across CONTINUE record boundaries.
//!
//! The SST record holds every unique string used in the workbook, but it's
//! routinely larger than the 8224-byte record limit and spills into one or
//! more CONTINUE records. A naive reader that concatenates CONTINUE bodies
//! into one buffer before decoding strings gets this wrong: when a string's
//! character array itself straddles the boundary, the CONTINUE body doesn't
//! resume with raw character bytes — it starts with a fresh 1-byte
//! compression flag for the *remaining* characters, which may differ from
//! the flag the string started with. Treating that flag byte as character
//! data corrupts the string and desyncs every string after it.
//!
//! `SstAssembler` reads directly off the `ChunkCursor`, pulling the next
//! CONTINUE chunk on demand and re-reading the compression flag exactly
//! when a character array is what's being split.

use crate::biff::cursor::ChunkCursor;
use crate::biff::parser::{read_u16, read_u32};
use crate::biff::records::CONTINUE;
use crate::biff::strings::read_unicode_string_body;
use crate::error::{XlsError, XlsResult};
use crate::model::Sst;
use crate::warnings::{Warning, WarningSink};

/// Reads scalar fields and character runs across a chain of record bodies
/// (the SST record plus however many CONTINUE records follow it), pulling
/// the next body from the cursor exactly when the current one is exhausted.
struct ChainReader<'a, 'c> {
    cursor: &'a mut ChunkCursor<'c>,
    body: &'c [u8],
    pos: usize,
}

impl<'a, 'c> ChainReader<'a, 'c> {
    fn new(cursor: &'a mut ChunkCursor<'c>, first_body: &'c [u8]) -> Self {
        ChainReader {
            cursor,
            body: first_body,
            pos: 0,
        }
    }

    /// Pull the next CONTINUE record's body when the current one is spent.
    /// Returns `Ok(false)` if the stream simply ran out (the SST was the
    /// last thing in the globals substream and some trailing data was
    /// expected but never truncates mid-string in practice).
    fn advance_body(&mut self) -> XlsResult<bool> {
        match self.cursor.next_chunk() {
            Some(chunk) if chunk.opcode == CONTINUE => {
                self.body = chunk.body;
                self.pos = 0;
                Ok(true)
            }
            Some(chunk) => {
                // Not a CONTINUE: put it back by reseeking before it so the
                // caller (the globals pass) can still see this record.
                self.cursor.set_position(chunk.offset);
                Ok(false)
            }
            None => Ok(false),
        }
    }

    fn remaining_in_body(&self) -> usize {
        self.body.len() - self.pos
    }

    fn read_u16(&mut self) -> XlsResult<u16> {
        while self.remaining_in_body() < 2 {
            if !self.advance_body()? {
                return Err(XlsError::Parse("truncated SST: expected u16".into()));
            }
        }
        read_u16(self.body, &mut self.pos)
    }

    fn read_u32(&mut self) -> XlsResult<u32> {
        while self.remaining_in_body() < 4 {
            if !self.advance_body()? {
                return Err(XlsError::Parse("truncated SST: expected u32".into()));
            }
        }
        read_u32(self.body, &mut self.pos)
    }

    fn read_u8(&mut self) -> XlsResult<u8> {
        while self.remaining_in_body() < 1 {
            if !self.advance_body()? {
                return Err(XlsError::Parse("truncated SST: expected u8".into()));
            }
        }
        let v = self.body[self.pos];
        self.pos += 1;
        Ok(v)
    }

    fn skip(&mut self, mut n: usize) -> XlsResult<()> {
        while n > 0 {
            let avail = self.remaining_in_body();
            if avail == 0 {
                if !self.advance_body()? {
                    return Err(XlsError::Parse("truncated SST: expected skip bytes".into()));
                }
                continue;
            }
            let take = avail.min(n);
            self.pos += take;
            n -= take;
        }
        Ok(())
    }

    /// Read `char_count` characters whose compression width is initially
    /// `flags & 0x01`. If the character array runs past the end of the
    /// current body, pulls a CONTINUE record and reads its leading flags
    /// byte as the compression width for the *remaining* characters —
    /// this is the boundary rule a pre-merged-buffer reader gets wrong.
    fn read_chars(&mut self, char_count: u16, flags: u8) -> XlsResult<String> {
        let mut remaining = char_count as usize;
        let mut wide = (flags & 0x01) != 0;
        let mut out = String::with_capacity(remaining);

        while remaining > 0 {
            if self.remaining_in_body() == 0 {
                if !self.advance_body()? {
                    return Err(XlsError::Parse(
                        "truncated SST: string ends before CONTINUE".into(),
                    ));
                }
                let cont_flags = self.read_u8()?;
                wide = (cont_flags & 0x01) != 0;
                continue;
            }

            let bytes_per_char = if wide { 2 } else { 1 };
            let available_chars = self.remaining_in_body() / bytes_per_char;
            if available_chars == 0 {
                // A wide char is split across the boundary by one byte;
                // force pulling the next body rather than reading garbage.
                if !self.advance_body()? {
                    return Err(XlsError::Parse(
                        "truncated SST: character split across CONTINUE boundary".into(),
                    ));
                }
                continue;
            }

            let take = remaining.min(available_chars);
            if wide {
                for i in 0..take {
                    let lo = self.body[self.pos + i * 2];
                    let hi = self.body[self.pos + i * 2 + 1];
                    out.push(
                        char::from_u32(u16::from_le_bytes([lo, hi]) as u32)
                            .unwrap_or(char::REPLACEMENT_CHARACTER),
                    );
                }
            } else {
                for i in 0..take {
                    out.push(self.body[self.pos + i] as char);
                }
            }
            self.pos += take * bytes_per_char;
            remaining -= take;
        }

        Ok(out)
    }
}

/// Parse the SST record (and any CONTINUE records it spills into) starting
/// right after the `total`/`unique` header has already been located at
/// `sst_body`. `cursor` must be positioned immediately after the SST chunk
/// so the assembler can pull CONTINUE chunks as it needs them.
pub fn assemble_sst(
    cursor: &mut ChunkCursor<'_>,
    sst_body: &[u8],
    warnings: &mut dyn WarningSink,
) -> XlsResult<Sst> {
    let mut reader = ChainReader::new(cursor, sst_body);
    let _total = reader.read_u32()?;
    let unique = reader.read_u32()?;

    let mut strings = Vec::with_capacity(unique as usize);
    for _ in 0..unique {
        let char_count = reader.read_u16()?;
        let flags = reader.read_u8()?;
        let is_rich = (flags & 0x08) != 0;
        let has_ext = (flags & 0x04) != 0;

        let run_count = if is_rich { reader.read_u16()? } else { 0 };
        let ext_size = if has_ext { reader.read_u32()? } else { 0 };

        let text = match reader.read_chars(char_count, flags) {
            Ok(t) => t,
            Err(e) => {
                warnings.warn(Warning::MalformedRecord {
                    opcode: crate::biff::records::SST,
                    offset: cursor.position(),
                });
                return Err(e);
            }
        };

        if is_rich {
            reader.skip(run_count as usize * 4)?;
        }
        if has_ext {
            reader.skip(ext_size as usize)?;
        }

        strings.push(text);
    }

    Ok(Sst::new(strings))
}

/// Decode a single unicode string that is guaranteed not to straddle a
/// CONTINUE boundary (used for LABELSST string lookups that were already
/// fully captured during the globals pass — trivial wrapper kept for
/// symmetry with `assemble_sst`'s per-entry logic).
pub fn read_single_entry(data: &[u8], offset: &mut usize) -> XlsResult<String> {
    let char_count = read_u16(data, offset)?;
    let flags = data[*offset];
    *offset += 1;
    read_unicode_string_body(data, offset, char_count, flags)
}
