//! Push-style consumption of an already-read workbook.
//!
//! [`WorkbookReader`](crate::reader::WorkbookReader) is pull-style: callers
//! ask for `worksheet.row(i)` on demand, matching the single-row cache and
//! lazy materialization the reader is built around. Some callers — a
//! format converter populating its own document model, for instance —
//! would rather be handed records as they're produced than hold a
//! `WorkbookReader` and drive it themselves. [`WorkbookSink`] is that
//! seam: [`crate::reader::WorkbookReader::drain_into`] walks everything
//! already indexed by the two passes and a materialized row at a time,
//! feeding it to a sink, so the push-style caller never needs its own
//! concept of row blocks or a row cache.

use crate::model::{
    BoundsheetSummary, ColumnInfo, DateBase, Dimensions, Font, Format, MergedRange, Row,
    SheetVisibility,
};

/// Receives the records of one worksheet, in row-index order.
pub trait WorksheetSink {
    fn set_dimensions(&mut self, dimensions: Dimensions);
    fn add_column_info(&mut self, info: ColumnInfo);
    fn add_merged_range(&mut self, range: MergedRange);
    /// `row` is empty for indices with no `RowAddress` entry — callers that
    /// only want non-empty rows should check `row.is_empty()` themselves.
    fn set_row(&mut self, row_index: u32, row: Row, height_twips: u16, hidden: bool);
}

/// Receives the workbook-globals records and one [`WorksheetSink`] per
/// sheet, in BOUNDSHEET order.
pub trait WorkbookSink {
    type Worksheet: WorksheetSink;

    fn set_date_base(&mut self, date_base: DateBase);
    fn set_encoding(&mut self, code_page: u16);
    fn set_boundsheets(&mut self, summary: BoundsheetSummary);
    fn add_font(&mut self, font: Font);
    fn add_format(&mut self, format: Format);
    fn add_worksheet(&mut self, name: &str, visibility: SheetVisibility) -> &mut Self::Worksheet;
}

/// A [`WorkbookSink`] that rebuilds a plain [`crate::model::Workbook`] from
/// the pushed records. Exists mainly to exercise and document the trait;
/// most consumers implementing their own document model will write their
/// own sink instead.
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub date_base: DateBase,
    pub code_page: u16,
    pub boundsheets: BoundsheetSummary,
    pub fonts: Vec<Font>,
    pub formats: Vec<Format>,
    pub worksheets: Vec<CollectingWorksheet>,
}

#[derive(Debug, Default)]
pub struct CollectingWorksheet {
    pub name: String,
    pub visibility: SheetVisibility,
    pub dimensions: Dimensions,
    pub column_info: Vec<ColumnInfo>,
    pub merged_ranges: Vec<MergedRange>,
    pub rows: std::collections::BTreeMap<u32, Row>,
}

impl WorksheetSink for CollectingWorksheet {
    fn set_dimensions(&mut self, dimensions: Dimensions) {
        self.dimensions = dimensions;
    }

    fn add_column_info(&mut self, info: ColumnInfo) {
        self.column_info.push(info);
    }

    fn add_merged_range(&mut self, range: MergedRange) {
        self.merged_ranges.push(range);
    }

    fn set_row(&mut self, row_index: u32, row: Row, _height_twips: u16, _hidden: bool) {
        if !row.is_empty() {
            self.rows.insert(row_index, row);
        }
    }
}

impl WorkbookSink for CollectingSink {
    type Worksheet = CollectingWorksheet;

    fn set_date_base(&mut self, date_base: DateBase) {
        self.date_base = date_base;
    }

    fn set_encoding(&mut self, code_page: u16) {
        self.code_page = code_page;
    }

    fn set_boundsheets(&mut self, summary: BoundsheetSummary) {
        self.boundsheets = summary;
    }

    fn add_font(&mut self, font: Font) {
        self.fonts.push(font);
    }

    fn add_format(&mut self, format: Format) {
        self.formats.push(format);
    }

    fn add_worksheet(&mut self, name: &str, visibility: SheetVisibility) -> &mut CollectingWorksheet {
        self.worksheets.push(CollectingWorksheet {
            name: name.to_string(),
            visibility,
            ..Default::default()
        });
        self.worksheets.last_mut().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CellValue;

    #[test]
    fn collecting_sink_gathers_pushed_records() {
        let mut sink = CollectingSink::default();
        sink.set_date_base(DateBase::Jan1904);
        sink.set_encoding(1252);
        sink.add_font(Font::default());

        let ws = sink.add_worksheet("Sheet1", SheetVisibility::Visible);
        let mut row = Row::default();
        row.set(0, CellValue::Integer(7), 0);
        ws.set_row(3, row, 255, false);
        ws.set_row(4, Row::default(), 255, false);

        assert_eq!(sink.date_base, DateBase::Jan1904);
        assert_eq!(sink.fonts.len(), 1);
        assert_eq!(sink.worksheets.len(), 1);
        assert_eq!(sink.worksheets[0].rows.len(), 1);
        assert!(sink.worksheets[0].rows.contains_key(&3));
    }
}
