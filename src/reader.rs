//! Orchestrates the full read: the workbook-globals pass, the sheet
//! directory pass, a per-sheet worksheet pass that indexes row blocks
//! without decoding cells, and lazy per-row cell materialization.
//!
//! [`WorkbookReader`] owns the workbook stream buffer for its lifetime and
//! reseeks a fresh [`ChunkCursor`] against it whenever a pass needs to
//! re-enter the stream — there's no persistent cursor field, so the reader
//! itself carries no lifetime parameter tied to the buffer.

use std::collections::BTreeMap;

use crate::biff::cursor::ChunkCursor;
use crate::biff::opcode::{parse_bof, symbolic, Dialect, RecordKind};
use crate::biff::parser::{read_f64, read_rk, read_u16, read_u32, RkValue};
use crate::biff::records;
use crate::biff::strings::{decode_byte_string, read_byte_string_u8, read_short_string, read_unicode_string};
use crate::error::{XlsError, XlsResult};
use crate::model::{
    BoundsheetSummary, CellError, CellValue, ColumnInfo, DateBase, Dimensions, FormulaCell,
    FormulaResult, MergedRange, NumberFormat, ReaderOptions, Row, RowAddress, SheetVisibility,
    Sst, Workbook, Worksheet,
};
use crate::source::{encoder_for_code_page, Encoder, StreamSource};
use crate::sst::assemble_sst;
use crate::styles::StyleContext;
use crate::warnings::{Warning, WarningSink};

/// Opcodes that keep a row block open. Anything else closes a block that
/// was in progress.
fn is_row_block_opcode(kind: RecordKind) -> bool {
    matches!(
        kind,
        RecordKind::Blank
            | RecordKind::BoolErr
            | RecordKind::DbCell
            | RecordKind::Formula
            | RecordKind::Label
            | RecordKind::LabelSst
            | RecordKind::MulBlank
            | RecordKind::MulRk
            | RecordKind::Number
            | RecordKind::Rk
            | RecordKind::Row
            | RecordKind::RString
    )
}

/// The fully-loaded workbook plus enough of the original stream to
/// materialize rows on demand.
pub struct WorkbookReader {
    buffer: Vec<u8>,
    pub workbook: Workbook,
    dialect: Dialect,
    /// Single-row cache: decoding one row of a multi-row block re-decodes
    /// the whole block, but only the most recently requested row is kept.
    row_cache: Option<((usize, u32), Row)>,
}

impl WorkbookReader {
    /// Read a complete workbook from a `StreamSource`.
    pub fn read(
        source: &mut dyn StreamSource,
        options: ReaderOptions,
        warnings: &mut dyn WarningSink,
    ) -> XlsResult<WorkbookReader> {
        let buffer = source.read_workbook_stream()?;
        let (mut workbook, dialect) = read_globals_and_directory(&buffer, options, warnings)?;
        for ws in &mut workbook.worksheets {
            worksheet_pass(&buffer, ws, warnings)?;
        }
        Ok(WorkbookReader {
            buffer,
            workbook,
            dialect,
            row_cache: None,
        })
    }

    /// Materialize a row. Returns an empty `Row` if `row_index` has no
    /// entry in the sheet's row index: absent rows yield an empty row, not
    /// an error.
    pub fn row(
        &mut self,
        sheet_index: usize,
        row_index: u32,
        warnings: &mut dyn WarningSink,
    ) -> XlsResult<Row> {
        if let Some(((s, r), cached)) = &self.row_cache {
            if *s == sheet_index && *r == row_index {
                return Ok(cached.clone());
            }
        }

        let sheet = self
            .workbook
            .worksheets
            .get(sheet_index)
            .ok_or_else(|| XlsError::InvalidFormat(format!("no worksheet at index {sheet_index}")))?;

        let Some(addr) = sheet.row_index.get(&row_index).copied() else {
            return Ok(Row::default());
        };

        let encoder = self.resolve_encoder()?;
        let block = materialize_block(
            &self.buffer,
            addr.row_block_start,
            addr.row_block_length,
            self.dialect,
            encoder.as_deref(),
            warnings,
        )?;
        let row = block.get(&row_index).cloned().unwrap_or_default();
        self.row_cache = Some(((sheet_index, row_index), row.clone()));
        Ok(row)
    }

    /// BIFF8 cell/sheet strings are self-describing Unicode; only BIFF5/7
    /// byte strings ever need the code-page `Encoder`.
    fn resolve_encoder(&self) -> XlsResult<Option<Box<dyn Encoder>>> {
        if self.dialect == Dialect::Biff8 {
            return Ok(None);
        }
        encoder_for_code_page(self.workbook.code_page)
            .map(Some)
            .ok_or(XlsError::UnknownCodePage(self.workbook.code_page))
    }

    /// Push every already-indexed record through a [`WorkbookSink`], one
    /// materialized row at a time. For callers that want push-style
    /// consumption instead of driving `row()` themselves.
    pub fn drain_into<S: crate::sink::WorkbookSink>(
        &mut self,
        sink: &mut S,
        warnings: &mut dyn WarningSink,
    ) -> XlsResult<()> {
        sink.set_date_base(self.workbook.date_base);
        sink.set_encoding(self.workbook.code_page);
        sink.set_boundsheets(self.workbook.boundsheets);
        for font in self.workbook.fonts.clone() {
            sink.add_font(font);
        }
        for format in self.workbook.formats.clone() {
            sink.add_format(format);
        }

        for sheet_index in 0..self.workbook.worksheets.len() {
            let ws = &self.workbook.worksheets[sheet_index];
            let name = ws.name.clone();
            let visibility = ws.visibility;
            let dimensions = ws.dimensions;
            let column_info = ws.column_info.clone();
            let merged_ranges = ws.merged_ranges.clone();
            let row_addrs: Vec<RowAddress> = ws.row_index.values().copied().collect();

            // `rows` are materialized first since each `self.row()` call
            // mutably borrows `self`, independent of `sink`.
            let mut rows = Vec::with_capacity(row_addrs.len());
            for addr in &row_addrs {
                rows.push((*addr, self.row(sheet_index, addr.index, warnings)?));
            }

            let worksheet_sink = sink.add_worksheet(&name, visibility);
            worksheet_sink.set_dimensions(dimensions);
            for info in column_info {
                worksheet_sink.add_column_info(info);
            }
            for range in merged_ranges {
                worksheet_sink.add_merged_range(range);
            }
            for (addr, row) in rows {
                worksheet_sink.set_row(addr.index, row, addr.height_twips, addr.hidden);
            }
        }
        Ok(())
    }
}

/// The workbook-globals pass (records BOF through the first EOF) plus the
/// sheet-directory pass that resolves each sheet's `(offset, length)` range.
fn read_globals_and_directory(
    buffer: &[u8],
    options: ReaderOptions,
    warnings: &mut dyn WarningSink,
) -> XlsResult<(Workbook, Dialect)> {
    let mut cursor = ChunkCursor::new(buffer);

    let first = cursor
        .next_chunk()
        .ok_or_else(|| XlsError::InvalidFormat("empty or truncated stream: no BOF found".into()))?;
    if symbolic(first.opcode) != RecordKind::Bof {
        return Err(XlsError::InvalidFormat(
            "stream does not start with a BOF record".into(),
        ));
    }
    let (version, dt) =
        parse_bof(first.body).ok_or_else(|| XlsError::InvalidFormat("BOF record too short".into()))?;
    if dt != records::BOF_WORKBOOK_GLOBALS {
        return Err(XlsError::InvalidFormat(format!(
            "expected workbook-globals BOF (substream type 0x{:04X}), got 0x{dt:04X}",
            records::BOF_WORKBOOK_GLOBALS
        )));
    }

    let dialect = match Dialect::from_version(version) {
        Some(d) => d,
        None if options.strict_version => {
            return Err(XlsError::UnsupportedVersion(format!("0x{version:04X}")))
        }
        // Degrade rather than abort: fall back to the more common modern
        // dialect and keep reading version-agnostic records.
        None => Dialect::Biff8,
    };

    let mut code_page: u16 = 1252;
    let mut date_base = DateBase::Dec1899;
    let mut style_ctx = StyleContext::new();
    let mut sst = Sst::default();
    let mut boundsheet_entries: Vec<(u32, SheetVisibility, u8, String)> = Vec::new();
    let mut boundsheets_summary = BoundsheetSummary::default();
    let mut saw_eof = false;

    loop {
        let Some(chunk) = cursor.next_chunk() else {
            break;
        };

        match symbolic(chunk.opcode) {
            RecordKind::Bof => warnings.warn(Warning::UnexpectedBof {
                offset: chunk.offset,
            }),
            RecordKind::Eof => {
                saw_eof = true;
                break;
            }
            RecordKind::DateMode => {
                if chunk.body.len() >= 2 {
                    let mode = u16::from_le_bytes([chunk.body[0], chunk.body[1]]);
                    date_base = if mode == 1 {
                        DateBase::Jan1904
                    } else {
                        DateBase::Dec1899
                    };
                }
            }
            RecordKind::CodePage => {
                if chunk.body.len() >= 2 {
                    code_page = u16::from_le_bytes([chunk.body[0], chunk.body[1]]);
                }
            }
            RecordKind::Boundsheet => match decode_boundsheet(chunk.body, dialect, code_page) {
                Ok(entry) => {
                    boundsheets_summary.count += 1;
                    if boundsheet_entries.is_empty() {
                        boundsheets_summary.first_offset = entry.0;
                    }
                    boundsheets_summary.total_length += chunk.record_len;
                    boundsheet_entries.push(entry);
                }
                Err(_) => warnings.warn(Warning::MalformedRecord {
                    opcode: chunk.opcode,
                    offset: chunk.offset,
                }),
            },
            RecordKind::Font => match crate::styles::parse_font(chunk.body) {
                Ok(font) => style_ctx.push_font(font),
                Err(_) => warnings.warn(Warning::MalformedRecord {
                    opcode: chunk.opcode,
                    offset: chunk.offset,
                }),
            },
            RecordKind::FormatRec => match crate::styles::parse_format(chunk.body) {
                Ok((ifmt, s)) => style_ctx.push_format_string(ifmt, s),
                Err(_) => warnings.warn(Warning::MalformedRecord {
                    opcode: chunk.opcode,
                    offset: chunk.offset,
                }),
            },
            RecordKind::Xf => {
                if style_ctx.push_xf(chunk.body).is_err() {
                    warnings.warn(Warning::MalformedRecord {
                        opcode: chunk.opcode,
                        offset: chunk.offset,
                    });
                }
            }
            RecordKind::Palette => {
                let _ = crate::styles::apply_palette(chunk.body, &mut style_ctx.palette);
            }
            RecordKind::Sst => match assemble_sst(&mut cursor, chunk.body, warnings) {
                Ok(table) => sst = table,
                Err(e) => return Err(e),
            },
            RecordKind::Continue => warnings.warn(Warning::UnexpectedContinue {
                offset: chunk.offset,
            }),
            _ => {}
        }
    }

    if !saw_eof {
        return Err(XlsError::InvalidFormat(
            "truncated stream: workbook globals EOF never seen".into(),
        ));
    }

    let number_format_strings = style_ctx.number_format_strings();
    let mut formats = style_ctx.build_format_table();
    for format in &mut formats {
        if let NumberFormat::BuiltIn(id) = format.number_format {
            if let Some(custom) = number_format_strings.get(&id) {
                format.number_format = NumberFormat::Custom(custom.clone());
            }
        }
    }
    let fonts = style_ctx.fonts();
    let palette = style_ctx.palette;

    let mut worksheets: Vec<Worksheet> = boundsheet_entries
        .iter()
        .map(|(offset, visibility, _sheet_type, name)| Worksheet {
            name: name.clone(),
            visibility: *visibility,
            bof_offset: *offset,
            range: (*offset, 0),
            dimensions: Dimensions::default(),
            row_index: BTreeMap::new(),
            column_info: Vec::new(),
            merged_ranges: Vec::new(),
        })
        .collect();

    let mut sorted_offsets: Vec<u32> = boundsheet_entries.iter().map(|e| e.0).collect();
    sorted_offsets.sort_unstable();
    for ws in &mut worksheets {
        let pos = sorted_offsets
            .iter()
            .position(|&o| o == ws.bof_offset)
            .unwrap_or(0);
        let end = if pos + 1 < sorted_offsets.len() {
            sorted_offsets[pos + 1]
        } else {
            buffer.len() as u32
        };
        ws.range = (ws.bof_offset, end.saturating_sub(ws.bof_offset));
    }

    let workbook = Workbook {
        biff_version: version,
        date_base,
        code_page,
        worksheets,
        formats,
        fonts,
        number_format_strings,
        sst,
        boundsheets: boundsheets_summary,
        palette,
    };

    Ok((workbook, dialect))
}

/// `BOUNDSHEET`: `offset: u32`, `visibility: u8`, `sheet_type: u8`, then the
/// sheet name (BIFF8: a short unicode string; BIFF5/7: a byte string
/// decoded through the code-page encoder).
fn decode_boundsheet(
    data: &[u8],
    dialect: Dialect,
    code_page: u16,
) -> XlsResult<(u32, SheetVisibility, u8, String)> {
    let mut off = 0;
    let offset = read_u32(data, &mut off)?;
    let visibility = SheetVisibility::from(*data.get(off).ok_or_else(|| {
        XlsError::Parse("BOUNDSHEET record too short for visibility byte".into())
    })?);
    off += 1;
    let sheet_type = *data
        .get(off)
        .ok_or_else(|| XlsError::Parse("BOUNDSHEET record too short for type byte".into()))?;
    off += 1;

    let name = match dialect {
        Dialect::Biff8 => read_short_string(data, &mut off)?,
        Dialect::Biff5Or7 => {
            let encoder = encoder_for_code_page(code_page).ok_or(XlsError::UnknownCodePage(code_page))?;
            read_byte_string_u8(data, &mut off, encoder.as_ref())?
        }
    };

    Ok((offset, visibility, sheet_type, name))
}

/// For one worksheet: seek to its BOF, then index DIMENSIONS, ROW (with row
/// block boundaries), COLINFO, and MERGECELLS without decoding any cells.
fn worksheet_pass(
    buffer: &[u8],
    ws: &mut Worksheet,
    warnings: &mut dyn WarningSink,
) -> XlsResult<()> {
    let mut cursor = ChunkCursor::new(buffer);
    cursor.set_position(ws.bof_offset as u64);

    let bof_chunk = cursor
        .next_chunk()
        .ok_or_else(|| XlsError::InvalidFormat(format!("sheet '{}': missing BOF", ws.name)))?;
    if symbolic(bof_chunk.opcode) != RecordKind::Bof {
        return Err(XlsError::InvalidFormat(format!(
            "sheet '{}': expected BOF at offset {}",
            ws.name, bof_chunk.offset
        )));
    }

    let mut block_start: Option<u64> = None;
    let mut pending_rows: Vec<u32> = Vec::new();
    let mut saw_eof = false;

    loop {
        let Some(chunk) = cursor.next_chunk() else {
            break;
        };
        let kind = symbolic(chunk.opcode);

        if is_row_block_opcode(kind) {
            if block_start.is_none() {
                block_start = Some(chunk.offset);
            }
            if kind == RecordKind::Row {
                match decode_row_header(chunk.body) {
                    Ok((index, first_col, last_col, height_twips, hidden)) => {
                        ws.row_index.insert(
                            index,
                            RowAddress {
                                index,
                                first_used_col: first_col,
                                first_unused_col: last_col,
                                row_block_start: block_start.unwrap(),
                                row_block_length: 0,
                                height_twips,
                                hidden,
                            },
                        );
                        pending_rows.push(index);
                    }
                    Err(_) => warnings.warn(Warning::MalformedRecord {
                        opcode: chunk.opcode,
                        offset: chunk.offset,
                    }),
                }
            }
            continue;
        }

        if let Some(start) = block_start.take() {
            let length = chunk.offset - start;
            for idx in pending_rows.drain(..) {
                if let Some(addr) = ws.row_index.get_mut(&idx) {
                    addr.row_block_length = length;
                }
            }
        }

        match kind {
            RecordKind::Dimension => match decode_dimensions(chunk.body) {
                Ok(dims) => ws.dimensions = dims,
                Err(_) => warnings.warn(Warning::MalformedRecord {
                    opcode: chunk.opcode,
                    offset: chunk.offset,
                }),
            },
            RecordKind::ColInfo => {
                if let Ok(info) = decode_colinfo(chunk.body) {
                    ws.column_info.push(info);
                }
            }
            RecordKind::MergeCells => decode_mergecells(chunk.body, &mut ws.merged_ranges),
            RecordKind::Eof => {
                saw_eof = true;
                break;
            }
            RecordKind::Continue => warnings.warn(Warning::UnexpectedContinue {
                offset: chunk.offset,
            }),
            _ => {}
        }
    }

    if !saw_eof {
        return Err(XlsError::InvalidFormat(format!(
            "sheet '{}': truncated stream, no EOF seen",
            ws.name
        )));
    }

    Ok(())
}

/// `ROW`: `row_index: u16`, `first_col: u16`, `last_col_plus1: u16`,
/// `height: u16` (bit 15 reserved, low 15 bits are twips), then a reserved
/// block and a `grbit` word whose bit 5 marks the row hidden.
fn decode_row_header(data: &[u8]) -> XlsResult<(u32, u16, u16, u16, bool)> {
    if data.len() < 8 {
        return Err(XlsError::Parse("ROW record too short".into()));
    }
    let mut off = 0;
    let row_index = read_u16(data, &mut off)? as u32;
    let first_col = read_u16(data, &mut off)?;
    let last_col = read_u16(data, &mut off)?;
    let raw_height = read_u16(data, &mut off)?;
    let height_twips = raw_height & 0x7FFF;

    let hidden = if data.len() >= 16 {
        let mut grbit_off = 12;
        let grbit = read_u32(data, &mut grbit_off).unwrap_or(0);
        (grbit & 0x20) != 0
    } else {
        false
    };

    Ok((row_index, first_col, last_col, height_twips, hidden))
}

/// `DIMENSION`: `first_row: u32`, `last_row_plus1: u32`, `first_col: u16`,
/// `last_col_plus1: u16`, reserved.
fn decode_dimensions(data: &[u8]) -> XlsResult<Dimensions> {
    if data.len() < 12 {
        return Err(XlsError::Parse("DIMENSION record too short".into()));
    }
    let mut off = 0;
    let first_row = read_u32(data, &mut off)?;
    let last_row = read_u32(data, &mut off)?;
    let first_col = read_u16(data, &mut off)?;
    let last_col = read_u16(data, &mut off)?;
    Ok(Dimensions {
        first_row,
        last_row,
        first_col,
        last_col,
    })
}

/// `COLINFO`: `first_col: u16`, `last_col: u16`, `width: u16`, `xf: u16`,
/// `options: u16` (bit 0 = hidden), reserved.
fn decode_colinfo(data: &[u8]) -> XlsResult<ColumnInfo> {
    if data.len() < 10 {
        return Err(XlsError::Parse("COLINFO record too short".into()));
    }
    let mut off = 0;
    let first_col = read_u16(data, &mut off)?;
    let last_col = read_u16(data, &mut off)?;
    let width = read_u16(data, &mut off)?;
    let xf_index = read_u16(data, &mut off)?;
    let options = read_u16(data, &mut off)?;
    Ok(ColumnInfo {
        first_col,
        last_col,
        width,
        hidden: (options & 0x0001) != 0,
        xf_index,
    })
}

/// `MERGECELLS`: `count: u16`, then `count` × `(first_row, last_row,
/// first_col, last_col)` u16 quadruples.
fn decode_mergecells(data: &[u8], out: &mut Vec<MergedRange>) {
    let mut off = 0;
    let Ok(count) = read_u16(data, &mut off) else {
        return;
    };
    for _ in 0..count {
        if off + 8 > data.len() {
            break;
        }
        let first_row = read_u16(data, &mut off).unwrap() as u32;
        let last_row = read_u16(data, &mut off).unwrap() as u32;
        let first_col = read_u16(data, &mut off).unwrap();
        let last_col = read_u16(data, &mut off).unwrap();
        out.push(MergedRange {
            first_row,
            last_row,
            first_col,
            last_col,
        });
    }
}

/// Decode every cell record in `[block_start, block_start + block_length)`,
/// building one `Row` per row index encountered. A block can hold more than
/// one row's records back to back, so materializing any single row in it
/// means decoding the whole block; the caller's single-row cache is what
/// keeps repeated access to the same row cheap.
fn materialize_block(
    buffer: &[u8],
    block_start: u64,
    block_length: u64,
    dialect: Dialect,
    encoder: Option<&dyn Encoder>,
    warnings: &mut dyn WarningSink,
) -> XlsResult<BTreeMap<u32, Row>> {
    let mut cursor = ChunkCursor::new(buffer);
    cursor.set_position(block_start);
    let block_end = block_start + block_length;

    let mut rows: BTreeMap<u32, Row> = BTreeMap::new();

    loop {
        if block_length > 0 && cursor.position() >= block_end {
            break;
        }
        let Some(chunk) = cursor.next_chunk() else {
            break;
        };

        match symbolic(chunk.opcode) {
            RecordKind::Eof | RecordKind::DbCell => break,
            RecordKind::Row => continue,
            RecordKind::Blank => {
                if let Ok((row, col, xf)) = decode_row_col_xf(chunk.body) {
                    rows.entry(row).or_default().set(col, CellValue::Empty, xf);
                }
            }
            RecordKind::BoolErr => {
                if let Ok((row, col, xf, value)) = decode_boolerr(chunk.body) {
                    rows.entry(row).or_default().set(col, value, xf);
                }
            }
            RecordKind::Label => {
                if let Ok((row, col, xf, text)) = decode_label(chunk.body, dialect, encoder) {
                    rows.entry(row)
                        .or_default()
                        .set(col, CellValue::InlineString(text), xf);
                }
            }
            RecordKind::RString => {
                if let Ok((row, col, xf, text)) = decode_rstring(chunk.body) {
                    rows.entry(row)
                        .or_default()
                        .set(col, CellValue::InlineString(text), xf);
                }
            }
            RecordKind::LabelSst => {
                if let Ok((row, col, xf, idx)) = decode_labelsst(chunk.body) {
                    rows.entry(row)
                        .or_default()
                        .set(col, CellValue::SharedString(idx), xf);
                }
            }
            RecordKind::Number => {
                if let Ok((row, col, xf, value)) = decode_number(chunk.body) {
                    rows.entry(row)
                        .or_default()
                        .set(col, CellValue::Double(value), xf);
                }
            }
            RecordKind::Rk => {
                if let Ok((row, col, xf, value)) = decode_rk_cell(chunk.body) {
                    rows.entry(row).or_default().set(col, rk_to_cell(value), xf);
                }
            }
            RecordKind::MulRk => {
                if let Ok(cells) = decode_mulrk(chunk.body) {
                    for (row, col, xf, value) in cells {
                        rows.entry(row).or_default().set(col, rk_to_cell(value), xf);
                    }
                }
            }
            RecordKind::MulBlank => {
                if let Ok(cells) = decode_mulblank(chunk.body) {
                    for (row, col, xf) in cells {
                        rows.entry(row).or_default().set(col, CellValue::Empty, xf);
                    }
                }
            }
            RecordKind::Formula => {
                if let Ok((row, col, xf, cell)) =
                    decode_formula(chunk.body, chunk.offset, &mut cursor, warnings)
                {
                    rows.entry(row)
                        .or_default()
                        .set(col, CellValue::Formula(cell), xf);
                }
            }
            RecordKind::Continue => warnings.warn(Warning::UnexpectedContinue {
                offset: chunk.offset,
            }),
            _ => {}
        }
    }

    Ok(rows)
}

fn decode_row_col_xf(data: &[u8]) -> XlsResult<(u32, u16, u16)> {
    if data.len() < 6 {
        return Err(XlsError::Parse("cell record too short".into()));
    }
    let mut off = 0;
    let row = read_u16(data, &mut off)? as u32;
    let col = read_u16(data, &mut off)?;
    let xf = read_u16(data, &mut off)?;
    Ok((row, col, xf))
}

fn decode_boolerr(data: &[u8]) -> XlsResult<(u32, u16, u16, CellValue)> {
    let (row, col, xf) = decode_row_col_xf(data)?;
    let value = *data.get(6).ok_or_else(|| XlsError::Parse("BOOLERR too short".into()))?;
    let is_error = *data.get(7).ok_or_else(|| XlsError::Parse("BOOLERR too short".into()))?;
    let cell = if is_error != 0 {
        CellValue::Error(CellError::from(value))
    } else {
        CellValue::Boolean(value != 0)
    };
    Ok((row, col, xf, cell))
}

fn decode_label(
    data: &[u8],
    dialect: Dialect,
    encoder: Option<&dyn Encoder>,
) -> XlsResult<(u32, u16, u16, String)> {
    let mut off = 0;
    let row = read_u16(data, &mut off)? as u32;
    let col = read_u16(data, &mut off)?;
    let xf = read_u16(data, &mut off)?;
    let text = match dialect {
        Dialect::Biff8 => read_unicode_string(data, &mut off)?,
        Dialect::Biff5Or7 => {
            let len = read_u16(data, &mut off)? as usize;
            let encoder = encoder
                .ok_or_else(|| XlsError::Parse("missing encoder for BIFF5/7 LABEL string".into()))?;
            decode_byte_string(data, &mut off, len, encoder)?
        }
    };
    Ok((row, col, xf, text))
}

/// RSTRING: identical header to LABEL, followed by a unicode string and a
/// rich-text run count/list this crate captures only far enough to skip.
fn decode_rstring(data: &[u8]) -> XlsResult<(u32, u16, u16, String)> {
    let mut off = 0;
    let row = read_u16(data, &mut off)? as u32;
    let col = read_u16(data, &mut off)?;
    let xf = read_u16(data, &mut off)?;
    let text = read_unicode_string(data, &mut off)?;
    Ok((row, col, xf, text))
}

fn decode_labelsst(data: &[u8]) -> XlsResult<(u32, u16, u16, u32)> {
    let mut off = 0;
    let row = read_u16(data, &mut off)? as u32;
    let col = read_u16(data, &mut off)?;
    let xf = read_u16(data, &mut off)?;
    let idx = read_u32(data, &mut off)?;
    Ok((row, col, xf, idx))
}

fn decode_number(data: &[u8]) -> XlsResult<(u32, u16, u16, f64)> {
    let mut off = 0;
    let row = read_u16(data, &mut off)? as u32;
    let col = read_u16(data, &mut off)?;
    let xf = read_u16(data, &mut off)?;
    let value = read_f64(data, &mut off)?;
    Ok((row, col, xf, value))
}

fn decode_rk_cell(data: &[u8]) -> XlsResult<(u32, u16, u16, RkValue)> {
    let mut off = 0;
    let row = read_u16(data, &mut off)? as u32;
    let col = read_u16(data, &mut off)?;
    let xf = read_u16(data, &mut off)?;
    let value = read_rk(data, &mut off)?;
    Ok((row, col, xf, value))
}

fn rk_to_cell(value: RkValue) -> CellValue {
    match value {
        RkValue::Integer(i) => CellValue::Integer(i),
        RkValue::Double(d) => CellValue::Double(d),
    }
}

/// MULRK: `row: u16`, `first_col: u16`, then `(xf: u16, rk: u32)` pairs,
/// with a trailing `last_col: u16` discarded once the range is known.
fn decode_mulrk(data: &[u8]) -> XlsResult<Vec<(u32, u16, u16, RkValue)>> {
    if data.len() < 6 {
        return Err(XlsError::Parse("MULRK record too short".into()));
    }
    let mut off = 0;
    let row = read_u16(data, &mut off)? as u32;
    let first_col = read_u16(data, &mut off)?;
    let last_col = u16::from_le_bytes([data[data.len() - 2], data[data.len() - 1]]);
    let data_end = data.len() - 2;

    let mut out = Vec::new();
    let mut col = first_col;
    while off + 6 <= data_end && col <= last_col {
        let xf = read_u16(data, &mut off)?;
        let value = read_rk(data, &mut off)?;
        out.push((row, col, xf, value));
        col += 1;
    }
    Ok(out)
}

/// MULBLANK: `row: u16`, `first_col: u16`, then `xf: u16` per column, with a
/// trailing `last_col: u16`.
fn decode_mulblank(data: &[u8]) -> XlsResult<Vec<(u32, u16, u16)>> {
    if data.len() < 6 {
        return Err(XlsError::Parse("MULBLANK record too short".into()));
    }
    let mut off = 0;
    let row = read_u16(data, &mut off)? as u32;
    let first_col = read_u16(data, &mut off)?;
    let last_col = u16::from_le_bytes([data[data.len() - 2], data[data.len() - 1]]);
    let data_end = data.len() - 2;

    let mut out = Vec::new();
    let mut col = first_col;
    while off + 2 <= data_end && col <= last_col {
        let xf = read_u16(data, &mut off)?;
        out.push((row, col, xf));
        col += 1;
    }
    Ok(out)
}

/// FORMULA: 20-byte fixed header (`row`, `col`, `xf`, 8-byte result slot,
/// `options`, 4 reserved bytes) then the raw token bytes. The result slot is
/// either an IEEE double, or — when bytes 6-7 read `0xFFFF` — a tagged
/// result keyed by the type byte: `0` string-sentinel, `1` boolean, `2`
/// error, `3` empty, and anything else still a double (the `0xFFFF` bytes
/// just happen to fall where they do in that double's bit pattern).
fn decode_formula(
    data: &[u8],
    record_offset: u64,
    cursor: &mut ChunkCursor<'_>,
    warnings: &mut dyn WarningSink,
) -> XlsResult<(u32, u16, u16, FormulaCell)> {
    if data.len() < 20 {
        return Err(XlsError::Parse("FORMULA record too short".into()));
    }

    let mut off = 0;
    let row = read_u16(data, &mut off)? as u32;
    let col = read_u16(data, &mut off)?;
    let xf = read_u16(data, &mut off)?;
    let result_bytes = &data[off..off + 8];
    off += 8;
    let options = read_u16(data, &mut off)?;
    off += 4; // reserved (chn)
    let shared = (options & 0x0008) != 0;
    let rpn = data[off..].to_vec();

    let result = if result_bytes[6] == 0xFF && result_bytes[7] == 0xFF {
        match result_bytes[0] {
            0x00 => match cursor.next_chunk() {
                Some(next) if symbolic(next.opcode) == RecordKind::StringRec => {
                    let mut soff = 0;
                    FormulaResult::Text(read_unicode_string(next.body, &mut soff)?)
                }
                Some(next) => {
                    warnings.warn(Warning::StringExpectedAfterFormula {
                        offset: next.offset,
                        found_opcode: next.opcode,
                    });
                    cursor.set_position(next.offset);
                    FormulaResult::Error(CellError::from(0x2A))
                }
                None => {
                    warnings.warn(Warning::MissingFollowUpString {
                        offset: record_offset,
                    });
                    FormulaResult::Error(CellError::from(0x2A))
                }
            },
            0x01 => FormulaResult::Boolean(result_bytes[2] != 0),
            0x02 => FormulaResult::Error(CellError::from(result_bytes[2])),
            0x03 => FormulaResult::Empty,
            _ => FormulaResult::Number(f64::from_le_bytes(result_bytes.try_into().unwrap())),
        }
    } else {
        let bytes: [u8; 8] = result_bytes.try_into().unwrap();
        FormulaResult::Number(f64::from_le_bytes(bytes))
    };

    Ok((
        row,
        col,
        xf,
        FormulaCell {
            shared,
            rpn,
            result,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::BufferSource;
    use crate::warnings::{NullWarningSink, VecWarningSink};

    fn header(opcode: u16, body: &[u8]) -> Vec<u8> {
        let mut v = Vec::new();
        v.extend_from_slice(&opcode.to_le_bytes());
        v.extend_from_slice(&(body.len() as u16).to_le_bytes());
        v.extend_from_slice(body);
        v
    }

    fn bof(version: u16, dt: u16) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&version.to_le_bytes());
        body.extend_from_slice(&dt.to_le_bytes());
        body.extend_from_slice(&[0u8; 12]);
        header(records::BOF, &body)
    }

    fn boundsheet(offset: u32, name: &str) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&offset.to_le_bytes());
        body.push(0); // visible
        body.push(0); // worksheet
        body.push(name.len() as u8);
        body.push(0x00); // compressed
        body.extend_from_slice(name.as_bytes());
        header(records::BOUNDSHEET, &body)
    }

    fn row_record(index: u16, first_col: u16, last_col: u16) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&index.to_le_bytes());
        body.extend_from_slice(&first_col.to_le_bytes());
        body.extend_from_slice(&last_col.to_le_bytes());
        body.extend_from_slice(&255u16.to_le_bytes()); // height
        body.extend_from_slice(&[0u8; 8]); // reserved + grbit, all zero (not hidden)
        header(records::ROW, &body)
    }

    fn number_cell(row: u16, col: u16, xf: u16, value: f64) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&row.to_le_bytes());
        body.extend_from_slice(&col.to_le_bytes());
        body.extend_from_slice(&xf.to_le_bytes());
        body.extend_from_slice(&value.to_le_bytes());
        header(records::NUMBER, &body)
    }

    /// Builds a minimal one-sheet workbook stream: globals BOF, BOUNDSHEET
    /// pointing at the worksheet substream, globals EOF, then the
    /// worksheet's own BOF, a ROW + NUMBER cell, and EOF.
    fn build_minimal_workbook() -> Vec<u8> {
        let mut globals = Vec::new();
        globals.extend(bof(records::BIFF8_VERSION, records::BOF_WORKBOOK_GLOBALS));

        let boundsheet_marker = globals.len();
        globals.extend(boundsheet(0, "Sheet1"));
        globals.extend(header(records::EOF, &[]));

        let mut sheet = Vec::new();
        sheet.extend(bof(records::BIFF8_VERSION, records::BOF_WORKSHEET));
        sheet.extend(row_record(0, 0, 1));
        sheet.extend(number_cell(0, 0, 0, 42.0));
        sheet.extend(header(records::EOF, &[]));

        let sheet_offset = globals.len() as u32;
        let mut buf = globals;
        let patch_at = boundsheet_marker + 4;
        buf[patch_at..patch_at + 4].copy_from_slice(&sheet_offset.to_le_bytes());
        buf.extend(sheet);
        buf
    }

    #[test]
    fn reads_minimal_single_sheet_workbook() {
        let buf = build_minimal_workbook();
        let mut source = BufferSource(buf);
        let mut sink = NullWarningSink;
        let mut reader =
            WorkbookReader::read(&mut source, ReaderOptions::default(), &mut sink).unwrap();

        assert_eq!(reader.workbook.worksheets.len(), 1);
        assert_eq!(reader.workbook.worksheets[0].name, "Sheet1");

        let row = reader.row(0, 0, &mut sink).unwrap();
        assert_eq!(row.value(0), Some(&CellValue::Double(42.0)));
    }

    #[test]
    fn absent_row_index_yields_empty_row() {
        let buf = build_minimal_workbook();
        let mut source = BufferSource(buf);
        let mut sink = NullWarningSink;
        let mut reader =
            WorkbookReader::read(&mut source, ReaderOptions::default(), &mut sink).unwrap();

        let row = reader.row(0, 999, &mut sink).unwrap();
        assert!(row.is_empty());
    }

    #[test]
    fn row_cache_returns_equal_rows_on_repeat_access() {
        let buf = build_minimal_workbook();
        let mut source = BufferSource(buf);
        let mut sink = NullWarningSink;
        let mut reader =
            WorkbookReader::read(&mut source, ReaderOptions::default(), &mut sink).unwrap();

        let first = reader.row(0, 0, &mut sink).unwrap();
        let second = reader.row(0, 0, &mut sink).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn scenario_s3_labelsst_resolves_shared_string_and_format() {
        let mut globals = Vec::new();
        globals.extend(bof(records::BIFF8_VERSION, records::BOF_WORKBOOK_GLOBALS));
        let boundsheet_marker = globals.len();
        globals.extend(boundsheet(0, "Sheet1"));

        let mut sst_body = Vec::new();
        sst_body.extend_from_slice(&3u32.to_le_bytes());
        sst_body.extend_from_slice(&3u32.to_le_bytes());
        for s in ["alpha", "beta", "\u{03B3}"] {
            sst_body.extend_from_slice(&(s.chars().count() as u16).to_le_bytes());
            sst_body.push(0x01); // wide, covers gamma's non-Latin1 codepoint too
            for c in s.chars() {
                sst_body.extend_from_slice(&(c as u16).to_le_bytes());
            }
        }
        globals.extend(header(records::SST, &sst_body));

        for _ in 0..16 {
            let mut xf = [0u8; 20];
            xf[4] = 0x04;
            globals.extend(header(records::XF, &xf));
        }
        globals.extend(header(records::EOF, &[]));

        let mut sheet = Vec::new();
        sheet.extend(bof(records::BIFF8_VERSION, records::BOF_WORKSHEET));
        sheet.extend(row_record(4, 0, 2));
        let mut labelsst = Vec::new();
        labelsst.extend_from_slice(&4u16.to_le_bytes());
        labelsst.extend_from_slice(&1u16.to_le_bytes());
        labelsst.extend_from_slice(&15u16.to_le_bytes());
        labelsst.extend_from_slice(&2u32.to_le_bytes());
        sheet.extend(header(records::LABELSST, &labelsst));
        sheet.extend(header(records::EOF, &[]));

        let sheet_offset = globals.len() as u32;
        let mut buf = globals;
        let patch_at = boundsheet_marker + 4;
        buf[patch_at..patch_at + 4].copy_from_slice(&sheet_offset.to_le_bytes());
        buf.extend(sheet);

        let mut source = BufferSource(buf);
        let mut sink = NullWarningSink;
        let mut reader =
            WorkbookReader::read(&mut source, ReaderOptions::default(), &mut sink).unwrap();

        assert_eq!(reader.workbook.sst.get(2), Some("\u{03B3}"));
        let row = reader.row(0, 4, &mut sink).unwrap();
        assert_eq!(row.value(1), Some(&CellValue::SharedString(2)));
        assert_eq!(row.format_index(1), Some(15));
    }

    #[test]
    fn scenario_s4_mulrk_run_populates_exact_column_range() {
        let mut body = Vec::new();
        body.extend_from_slice(&3u16.to_le_bytes()); // row
        body.extend_from_slice(&1u16.to_le_bytes()); // first_col

        body.extend_from_slice(&0u16.to_le_bytes());
        body.extend_from_slice(&((10u32 << 2) | 0x03).to_le_bytes()); // 0.1
        body.extend_from_slice(&0u16.to_le_bytes());
        body.extend_from_slice(&((2u32 << 2) | 0x02).to_le_bytes()); // 2
        body.extend_from_slice(&0u16.to_le_bytes());
        body.extend_from_slice(&((314u32 << 2) | 0x03).to_le_bytes()); // 3.14

        body.extend_from_slice(&3u16.to_le_bytes()); // last_col

        let cells = decode_mulrk(&body).unwrap();
        assert_eq!(cells.len(), 3);
        assert_eq!(cells[0].1, 1);
        assert_eq!(cells[1].1, 2);
        assert_eq!(cells[2].1, 3);
        match cells[1].3 {
            RkValue::Integer(2) => {}
            other => panic!("expected Integer(2), got {other:?}"),
        }
    }

    #[test]
    fn scenario_s5_formula_string_sentinel_pairs_with_string_record() {
        let mut buf = Vec::new();
        let mut formula_body = vec![0u8; 20];
        formula_body[6] = 0x00; // type byte: string sentinel
        formula_body[12] = 0xFF;
        formula_body[13] = 0xFF;
        buf.extend(header(records::FORMULA, &formula_body));

        let mut string_body = Vec::new();
        string_body.extend_from_slice(&3u16.to_le_bytes());
        string_body.push(0x00);
        string_body.extend_from_slice(b"yes");
        buf.extend(header(records::STRING, &string_body));

        let mut cursor = ChunkCursor::new(&buf);
        let formula_chunk = cursor.next_chunk().unwrap();
        let formula_offset = formula_chunk.offset;
        let mut sink = VecWarningSink::default();
        let (_, _, _, cell) =
            decode_formula(formula_chunk.body, formula_offset, &mut cursor, &mut sink).unwrap();
        assert_eq!(cell.result, FormulaResult::Text("yes".into()));
        assert!(sink.0.is_empty());
        assert!(cursor.next_chunk().is_none());
    }

    #[test]
    fn scenario_s6_formula_expects_string_but_finds_row_restores_cursor() {
        let mut buf = Vec::new();
        let mut formula_body = vec![0u8; 20];
        formula_body[6] = 0x00;
        formula_body[12] = 0xFF;
        formula_body[13] = 0xFF;
        buf.extend(header(records::FORMULA, &formula_body));
        buf.extend(row_record(7, 0, 0));

        let mut cursor = ChunkCursor::new(&buf);
        let formula_chunk = cursor.next_chunk().unwrap();
        let formula_offset = formula_chunk.offset;
        let mut sink = VecWarningSink::default();
        let (_, _, _, cell) =
            decode_formula(formula_chunk.body, formula_offset, &mut cursor, &mut sink).unwrap();
        assert_eq!(cell.result, FormulaResult::Error(CellError::from(0x2A)));
        assert_eq!(sink.0.len(), 1);

        let next = cursor.next_chunk().unwrap();
        assert_eq!(next.opcode, records::ROW);
    }
}
