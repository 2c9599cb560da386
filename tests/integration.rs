//! End-to-end coverage driving the full read pipeline through the public
//! API. No binary `.xls` fixtures ship in this repository, so these tests
//! build synthetic BIFF8 byte streams in memory, record by record, and
//! read them back through an in-memory `StreamSource`.

use biff_legacy_reader::model::{CellValue, SheetVisibility};
use biff_legacy_reader::sink::CollectingSink;
use biff_legacy_reader::{BufferSource, NullWarningSink, ReaderOptions, WorkbookReader};
use pretty_assertions::assert_eq;

const BOF: u16 = 0x0809;
const EOF: u16 = 0x000A;
const BOUNDSHEET: u16 = 0x0085;
const SST: u16 = 0x00FC;
const XF: u16 = 0x00E0;
const ROW: u16 = 0x0208;
const LABELSST: u16 = 0x00FD;
const NUMBER: u16 = 0x0203;
const RK: u16 = 0x027E;

fn header(opcode: u16, body: &[u8]) -> Vec<u8> {
    let mut v = Vec::new();
    v.extend_from_slice(&opcode.to_le_bytes());
    v.extend_from_slice(&(body.len() as u16).to_le_bytes());
    v.extend_from_slice(body);
    v
}

fn bof(dt: u16) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&0x0600u16.to_le_bytes());
    body.extend_from_slice(&dt.to_le_bytes());
    body.extend_from_slice(&[0u8; 12]);
    header(BOF, &body)
}

fn boundsheet(offset: u32, name: &str, visibility: u8) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&offset.to_le_bytes());
    body.push(visibility);
    body.push(0); // worksheet
    body.push(name.len() as u8);
    body.push(0x00);
    body.extend_from_slice(name.as_bytes());
    header(BOUNDSHEET, &body)
}

fn row_record(index: u16, first_col: u16, last_col: u16) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&index.to_le_bytes());
    body.extend_from_slice(&first_col.to_le_bytes());
    body.extend_from_slice(&last_col.to_le_bytes());
    body.extend_from_slice(&255u16.to_le_bytes());
    body.extend_from_slice(&[0u8; 8]);
    header(ROW, &body)
}

fn labelsst(row: u16, col: u16, xf: u16, sst_index: u32) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&row.to_le_bytes());
    body.extend_from_slice(&col.to_le_bytes());
    body.extend_from_slice(&xf.to_le_bytes());
    body.extend_from_slice(&sst_index.to_le_bytes());
    header(LABELSST, &body)
}

fn number_cell(row: u16, col: u16, xf: u16, value: f64) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&row.to_le_bytes());
    body.extend_from_slice(&col.to_le_bytes());
    body.extend_from_slice(&xf.to_le_bytes());
    body.extend_from_slice(&value.to_le_bytes());
    header(NUMBER, &body)
}

fn rk_cell(row: u16, col: u16, xf: u16, rk: u32) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&row.to_le_bytes());
    body.extend_from_slice(&col.to_le_bytes());
    body.extend_from_slice(&xf.to_le_bytes());
    body.extend_from_slice(&rk.to_le_bytes());
    header(RK, &body)
}

fn xf_record() -> Vec<u8> {
    header(XF, &[0u8; 20])
}

/// Two sheets: "Data" (two rows of mixed cell types) and "Hidden" (an empty
/// sheet marked hidden, exercising BOUNDSHEET visibility).
fn build_two_sheet_workbook() -> Vec<u8> {
    let mut globals = bof(0x0005);

    let data_marker = globals.len();
    globals.extend(boundsheet(0, "Data", 0));
    let hidden_marker = globals.len();
    globals.extend(boundsheet(0, "Hidden", 1));

    let mut sst_body = Vec::new();
    sst_body.extend_from_slice(&1u32.to_le_bytes());
    sst_body.extend_from_slice(&1u32.to_le_bytes());
    sst_body.extend_from_slice(&5u16.to_le_bytes());
    sst_body.push(0x00);
    sst_body.extend_from_slice(b"hello");
    globals.extend(header(SST, &sst_body));

    globals.extend(xf_record());
    globals.extend(header(EOF, &[]));

    let mut data_sheet = Vec::new();
    data_sheet.extend(bof(0x0010));
    data_sheet.extend(row_record(0, 0, 2));
    data_sheet.extend(labelsst(0, 0, 0, 0));
    data_sheet.extend(number_cell(0, 1, 0, 3.5));
    data_sheet.extend(row_record(1, 0, 1));
    data_sheet.extend(rk_cell(1, 0, 0, (10u32 << 2) | 0x02));
    data_sheet.extend(header(EOF, &[]));

    let mut hidden_sheet = Vec::new();
    hidden_sheet.extend(bof(0x0010));
    hidden_sheet.extend(header(EOF, &[]));

    let data_offset = globals.len() as u32;
    let mut buf = globals;
    buf[data_marker + 4..data_marker + 8].copy_from_slice(&data_offset.to_le_bytes());
    buf.extend(&data_sheet);

    let hidden_offset = buf.len() as u32;
    buf[hidden_marker + 4..hidden_marker + 8].copy_from_slice(&hidden_offset.to_le_bytes());
    buf.extend(&hidden_sheet);

    buf
}

#[test]
fn reads_multi_sheet_workbook_with_mixed_cell_types() {
    let buf = build_two_sheet_workbook();
    let mut source = BufferSource(buf);
    let mut sink = NullWarningSink;
    let mut reader =
        WorkbookReader::read(&mut source, ReaderOptions::default(), &mut sink).expect("read");

    assert_eq!(reader.workbook.worksheets.len(), 2);
    assert_eq!(reader.workbook.worksheets[0].name, "Data");
    assert_eq!(reader.workbook.worksheets[1].name, "Hidden");
    assert_eq!(reader.workbook.worksheets[1].visibility, SheetVisibility::Hidden);

    let row0 = reader.row(0, 0, &mut sink).expect("row 0");
    assert_eq!(row0.value(0), Some(&CellValue::SharedString(0)));
    assert_eq!(row0.value(1), Some(&CellValue::Double(3.5)));

    let row1 = reader.row(0, 1, &mut sink).expect("row 1");
    assert_eq!(row1.value(0), Some(&CellValue::Integer(10)));

    let missing = reader.row(0, 99, &mut sink).expect("missing row");
    assert!(missing.is_empty());
}

#[test]
fn drain_into_pushes_every_sheet_and_row_through_the_sink() {
    let buf = build_two_sheet_workbook();
    let mut source = BufferSource(buf);
    let mut sink = NullWarningSink;
    let mut reader =
        WorkbookReader::read(&mut source, ReaderOptions::default(), &mut sink).expect("read");

    let mut collector = CollectingSink::default();
    reader
        .drain_into(&mut collector, &mut sink)
        .expect("drain");

    assert_eq!(collector.worksheets.len(), 2);
    assert_eq!(collector.worksheets[0].name, "Data");
    assert_eq!(collector.worksheets[0].rows.len(), 2);
    assert!(collector.worksheets[1].rows.is_empty());
}
