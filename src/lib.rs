//! # biff-legacy-reader
//!
//! A record-stream reader for legacy Excel BIFF5/7/8 binary workbooks
//! (`.xls`). Given the bytes of a workbook's "Book"/"Workbook" OLE2
//! compound-file stream, [`reader::WorkbookReader`] walks the
//! workbook-globals pass, a per-sheet directory pass, and a per-sheet
//! worksheet pass that indexes row blocks without decoding cells, then
//! materializes rows lazily and one at a time as [`reader::WorkbookReader::row`]
//! is called.
//!
//! This crate only reads. There is no writer, no formula evaluator, and no
//! OLE2/CFB container logic in the required path — [`source::StreamSource`]
//! is the seam a caller supplies bytes through, with an opt-in `cfb`-feature
//! adapter provided purely as a convenience.

pub mod biff;
pub mod error;
pub mod model;
pub mod reader;
pub mod sink;
pub mod source;
pub mod sst;
pub mod styles;
pub mod warnings;

pub use error::{XlsError, XlsResult};
pub use model::{CellValue, ReaderOptions, Row, Workbook, Worksheet};
pub use reader::WorkbookReader;
pub use source::{BufferSource, StreamSource};
pub use warnings::{NullWarningSink, VecWarningSink, Warning, WarningSink};
