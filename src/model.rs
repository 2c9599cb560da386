//! The in-memory workbook model this crate materializes.
//!
//! Everything here is a plain data holder; no entry point parses records by
//! calling into this module directly (that lives in [`crate::reader`]).

use std::collections::BTreeMap;

/// One of Excel's packed error codes, carried on `CellValue::Error` and on
/// the cached result of a failed formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellError {
    Null,
    Div0,
    Value,
    Ref,
    Name,
    Num,
    Na,
    /// A byte value outside the known BIFF error codes (0x00, 0x07, 0x0F,
    /// 0x17, 0x1D, 0x24, 0x2A). Observed on exotic/corrupt files; kept
    /// rather than coerced to `Value` so round-tripping the byte is
    /// possible.
    Other(u8),
}

impl CellError {
    /// Excel's one-byte error code (inverse of `From<u8>`).
    pub fn code(self) -> u8 {
        match self {
            CellError::Null => 0x00,
            CellError::Div0 => 0x07,
            CellError::Value => 0x0F,
            CellError::Ref => 0x17,
            CellError::Name => 0x1D,
            CellError::Num => 0x24,
            CellError::Na => 0x2A,
            CellError::Other(b) => b,
        }
    }
}

impl From<u8> for CellError {
    fn from(b: u8) -> Self {
        match b {
            0x00 => CellError::Null,
            0x07 => CellError::Div0,
            0x0F => CellError::Value,
            0x17 => CellError::Ref,
            0x1D => CellError::Name,
            0x24 => CellError::Num,
            0x2A => CellError::Na,
            other => CellError::Other(other),
        }
    }
}

/// The cached result a FORMULA record carries. Never recomputed — formula
/// token trees are captured as opaque bytes and never evaluated by this
/// crate.
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaResult {
    Number(f64),
    Text(String),
    Boolean(bool),
    Error(CellError),
    Empty,
}

/// A FORMULA cell: raw RPN token bytes plus the cached result Excel last
/// computed. `shared` marks a formula that is part of a shared-formula
/// group (option bit 3) — the token bytes for those are relative to the
/// group's anchor cell, which this crate does not resolve.
#[derive(Debug, Clone, PartialEq)]
pub struct FormulaCell {
    pub shared: bool,
    pub rpn: Vec<u8>,
    pub result: FormulaResult,
}

/// A decoded cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Boolean(bool),
    Error(CellError),
    /// An RK value decoded as an unscaled integer (RK bit1 set, bit0 clear).
    Integer(i32),
    /// NUMBER, or an RK value that decoded to a float (either because it
    /// natively encoded a double, or because the ×1/100 scaling flag was
    /// set on an integer payload).
    Double(f64),
    /// LABELSST: an index into the workbook's shared string table.
    SharedString(u32),
    /// LABEL/RSTRING: a string carried inline in the cell record itself,
    /// not deduplicated through the SST.
    InlineString(String),
    Formula(FormulaCell),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }
}

/// A resolved number-format: either Excel's built-in General format, a
/// built-in numbered format (1-49, meaning is locale/version-defined and
/// left to the consumer), or a custom format string from a FORMAT record.
#[derive(Debug, Clone, PartialEq)]
pub enum NumberFormat {
    General,
    BuiltIn(u16),
    Custom(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HorizontalAlign {
    General,
    Left,
    Center,
    Right,
    Fill,
    Justify,
    CenterContinuous,
    Distributed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalAlign {
    Top,
    Center,
    Bottom,
    Justify,
    Distributed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadingOrder {
    ContextDependent,
    LeftToRight,
    RightToLeft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alignment {
    pub horizontal: HorizontalAlign,
    pub vertical: VerticalAlign,
    pub wrap_text: bool,
    pub shrink_to_fit: bool,
    pub indent: u8,
    /// -90..=90 degrees, or 255 for Excel's "stacked vertical text" marker.
    pub rotation: i16,
    pub reading_order: ReadingOrder,
}

impl Default for Alignment {
    fn default() -> Self {
        Alignment {
            horizontal: HorizontalAlign::General,
            vertical: VerticalAlign::Bottom,
            wrap_text: false,
            shrink_to_fit: false,
            indent: 0,
            rotation: 0,
            reading_order: ReadingOrder::ContextDependent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorderLineStyle {
    None,
    Thin,
    Medium,
    Dashed,
    Dotted,
    Thick,
    Double,
    Hair,
    MediumDashed,
    DashDot,
    MediumDashDot,
    DashDotDot,
    MediumDashDotDot,
    SlantDashDot,
}

/// One border edge: a line style plus the *raw palette index* of its
/// color. Palette resolution (index -> RGB) is the consumer's
/// responsibility; this crate never performs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BorderEdge {
    pub style: BorderLineStyle,
    pub color_index: u16,
}

impl BorderEdge {
    pub const NONE: BorderEdge = BorderEdge {
        style: BorderLineStyle::None,
        color_index: 0,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagonalDirection {
    None,
    Down,
    Up,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Border {
    pub left: BorderEdge,
    pub right: BorderEdge,
    pub top: BorderEdge,
    pub bottom: BorderEdge,
    pub diagonal: BorderEdge,
    pub diagonal_direction: DiagonalDirection,
}

impl Default for Border {
    fn default() -> Self {
        Border {
            left: BorderEdge::NONE,
            right: BorderEdge::NONE,
            top: BorderEdge::NONE,
            bottom: BorderEdge::NONE,
            diagonal: BorderEdge::NONE,
            diagonal_direction: DiagonalDirection::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillPattern {
    None,
    Solid,
    MediumGray,
    DarkGray,
    LightGray,
    DarkHorizontal,
    DarkVertical,
    DarkDown,
    DarkUp,
    DarkGrid,
    DarkTrellis,
    LightHorizontal,
    LightVertical,
    LightDown,
    LightUp,
    LightGrid,
    LightTrellis,
    Gray125,
    Gray0625,
}

/// A fill: a pattern plus the raw foreground/background palette indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fill {
    pub pattern: FillPattern,
    pub foreground_color_index: u16,
    pub background_color_index: u16,
}

impl Default for Fill {
    fn default() -> Self {
        Fill {
            pattern: FillPattern::None,
            foreground_color_index: 0,
            background_color_index: 0,
        }
    }
}

/// A cell's complete formatting record — font index, number format,
/// protection, alignment, border, and fill — captured verbatim from its
/// XF record.
#[derive(Debug, Clone, PartialEq)]
pub struct Format {
    pub font_index: u16,
    pub number_format: NumberFormat,
    pub locked: bool,
    pub hidden: bool,
    pub is_style_xf: bool,
    pub alignment: Alignment,
    pub border: Border,
    pub fill: Fill,
}

impl Default for Format {
    fn default() -> Self {
        Format {
            font_index: 0,
            number_format: NumberFormat::General,
            locked: true,
            hidden: false,
            is_style_xf: false,
            alignment: Alignment::default(),
            border: Border::default(),
            fill: Fill::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Underline {
    None,
    Single,
    Double,
    SingleAccounting,
    DoubleAccounting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalScript {
    Baseline,
    Superscript,
    Subscript,
}

/// A FONT record, decoded verbatim. Color is a raw palette index, same
/// deferred-resolution rule as `BorderEdge`/`Fill`.
#[derive(Debug, Clone, PartialEq)]
pub struct Font {
    pub name: String,
    /// Points, derived from the record's twips (1/20 pt) height.
    pub size_pt: f64,
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub outline: bool,
    pub shadow: bool,
    pub underline: Underline,
    pub escapement: VerticalScript,
    pub color_index: u16,
    pub family: u8,
    pub charset: u8,
}

impl Default for Font {
    fn default() -> Self {
        Font {
            name: "Arial".to_string(),
            size_pt: 10.0,
            bold: false,
            italic: false,
            strikethrough: false,
            outline: false,
            shadow: false,
            underline: Underline::None,
            escapement: VerticalScript::Baseline,
            color_index: 0x7FFF,
            family: 0,
            charset: 0,
        }
    }
}

/// The deduplicated Shared String Table, indexed by the 32-bit ids
/// LABELSST records reference.
#[derive(Debug, Clone, Default)]
pub struct Sst {
    strings: Vec<String>,
}

impl Sst {
    pub fn new(strings: Vec<String>) -> Self {
        Sst { strings }
    }

    pub fn get(&self, index: u32) -> Option<&str> {
        self.strings.get(index as usize).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

/// Which epoch a workbook's serial date numbers are relative to, set by
/// the DATEMODE record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateBase {
    /// December 31, 1899 (the common "1900 date system").
    Dec1899,
    /// January 1, 1904 (the "1904 date system", used by old Mac Excel).
    Jan1904,
}

impl Default for DateBase {
    fn default() -> Self {
        DateBase::Dec1899
    }
}

impl DateBase {
    /// Convert a cell's serial day number to a calendar date. `None` if the
    /// computed date falls outside `chrono`'s representable range.
    ///
    /// The 1900 system carries Lotus 1-2-3's fictitious February 29, 1900
    /// forward for backward compatibility: serial 60 has no real date and
    /// returns `None`, and serials from 61 onward are one day ahead of the
    /// true proleptic Gregorian date, corrected here the way every reader
    /// of this format has to.
    pub fn serial_to_date(self, serial: f64) -> Option<chrono::NaiveDate> {
        let mut days = serial.trunc() as i64;
        let epoch = match self {
            DateBase::Dec1899 => {
                if days == 60 {
                    return None;
                }
                if days >= 61 {
                    days -= 1;
                }
                chrono::NaiveDate::from_ymd_opt(1899, 12, 31)?
            }
            DateBase::Jan1904 => chrono::NaiveDate::from_ymd_opt(1904, 1, 1)?,
        };
        epoch.checked_add_signed(chrono::Duration::days(days))
    }
}

/// The `(count, first_offset, total_length)` triple accumulated while
/// streaming BOUNDSHEET records during the globals pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoundsheetSummary {
    pub count: u32,
    pub first_offset: u32,
    pub total_length: u32,
}

/// Sheet visibility, from BOUNDSHEET's visibility byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetVisibility {
    Visible,
    Hidden,
    VeryHidden,
}

impl Default for SheetVisibility {
    fn default() -> Self {
        SheetVisibility::Visible
    }
}

impl From<u8> for SheetVisibility {
    fn from(b: u8) -> Self {
        match b {
            1 => SheetVisibility::Hidden,
            2 => SheetVisibility::VeryHidden,
            _ => SheetVisibility::Visible,
        }
    }
}

/// The first/last row and column bounds from a sheet's DIMENSIONS record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Dimensions {
    pub first_row: u32,
    /// Exclusive.
    pub last_row: u32,
    pub first_col: u16,
    /// Exclusive.
    pub last_col: u16,
}

/// Where one row's records live in the workbook stream. Every cell record
/// for this row lies within `[row_block_start, row_block_start +
/// row_block_length)` — rows in the same contiguous block share that
/// range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowAddress {
    pub index: u32,
    pub first_used_col: u16,
    pub first_unused_col: u16,
    pub row_block_start: u64,
    pub row_block_length: u64,
    pub height_twips: u16,
    pub hidden: bool,
}

/// A COLINFO range: width and visibility for columns `first_col..=last_col`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnInfo {
    pub first_col: u16,
    pub last_col: u16,
    /// Width in 1/256ths of a character, as stored on disk.
    pub width: u16,
    pub hidden: bool,
    pub xf_index: u16,
}

/// A MERGECELLS entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergedRange {
    pub first_row: u32,
    pub last_row: u32,
    pub first_col: u16,
    pub last_col: u16,
}

/// A materialized row: sparse column -> value, with a parallel column ->
/// format-index map. Column order follows stream order, not sorted order
/// of discovery, but both maps are keyed so lookups don't care.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: BTreeMap<u16, CellValue>,
    formats: BTreeMap<u16, u16>,
}

impl Row {
    pub fn set(&mut self, col: u16, value: CellValue, xf_index: u16) {
        self.values.insert(col, value);
        self.formats.insert(col, xf_index);
    }

    pub fn value(&self, col: u16) -> Option<&CellValue> {
        self.values.get(&col)
    }

    pub fn format_index(&self, col: u16) -> Option<u16> {
        self.formats.get(&col).copied()
    }

    pub fn columns(&self) -> impl Iterator<Item = u16> + '_ {
        self.values.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u16, &CellValue)> {
        self.values.iter().map(|(c, v)| (*c, v))
    }
}

/// A worksheet's static metadata, populated by the worksheet pass (§4.F).
/// Row contents are *not* held here — they're materialized lazily through
/// [`crate::reader::WorkbookReader::row`].
#[derive(Debug, Clone)]
pub struct Worksheet {
    pub name: String,
    pub visibility: SheetVisibility,
    /// Absolute offset of this sheet's BOF in the workbook stream.
    pub bof_offset: u32,
    /// This sheet's `(offset, length)` range, resolved by the sheet
    /// directory pass (§4.E).
    pub range: (u32, u32),
    pub dimensions: Dimensions,
    pub row_index: BTreeMap<u32, RowAddress>,
    pub column_info: Vec<ColumnInfo>,
    pub merged_ranges: Vec<MergedRange>,
}

impl Worksheet {
    pub fn row_count(&self) -> usize {
        self.row_index.len()
    }
}

/// The root aggregate: everything this crate materializes from one
/// workbook stream.
#[derive(Debug, Clone)]
pub struct Workbook {
    pub biff_version: u16,
    pub date_base: DateBase,
    pub code_page: u16,
    pub worksheets: Vec<Worksheet>,
    pub formats: Vec<Format>,
    pub fonts: Vec<Font>,
    pub number_format_strings: BTreeMap<u16, String>,
    pub sst: Sst,
    pub boundsheets: BoundsheetSummary,
    /// The 56-entry BIFF8 color palette (possibly overridden by a PALETTE
    /// record). Indices 8-63 map to entries 0-55 here; resolving a
    /// `color_index` from a `Format`/`Font` into RGB is left to callers.
    pub palette: [(u8, u8, u8); 56],
}

impl Workbook {
    /// Look up a cell's resolved `Format`, falling back to the default
    /// format for index 0 or an out-of-range index.
    pub fn format(&self, xf_index: u16) -> &Format {
        self.formats
            .get(xf_index as usize)
            .unwrap_or(&DEFAULT_FORMAT)
    }
}

static DEFAULT_FORMAT: Format = Format {
    font_index: 0,
    number_format: NumberFormat::General,
    locked: true,
    hidden: false,
    is_style_xf: false,
    alignment: Alignment {
        horizontal: HorizontalAlign::General,
        vertical: VerticalAlign::Bottom,
        wrap_text: false,
        shrink_to_fit: false,
        indent: 0,
        rotation: 0,
        reading_order: ReadingOrder::ContextDependent,
    },
    border: Border {
        left: BorderEdge::NONE,
        right: BorderEdge::NONE,
        top: BorderEdge::NONE,
        bottom: BorderEdge::NONE,
        diagonal: BorderEdge::NONE,
        diagonal_direction: DiagonalDirection::None,
    },
    fill: Fill {
        pattern: FillPattern::None,
        foreground_color_index: 0,
        background_color_index: 0,
    },
};

/// Behavior knobs for [`crate::reader::WorkbookReader::read`].
#[derive(Debug, Clone, Copy)]
pub struct ReaderOptions {
    /// If true, `UnsupportedVersion` aborts the read with an `Err` instead
    /// of degrading to version-agnostic record handling. Defaults to
    /// `false`.
    pub strict_version: bool,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        ReaderOptions {
            strict_version: false,
        }
    }
}
