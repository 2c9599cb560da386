//! Opcode dictionary and BIFF version dispatch.
//!
//! The legacy "mixin overlay per BIFF version" design becomes, in Rust, a
//! static exhaustive match from raw opcode to a symbolic [`RecordKind`]
//! plus a two-variant [`Dialect`] enum selected once from the BOF version
//! word. No trait objects, no inheritance: every record handler and every
//! primitive decoder that differs between BIFF5/7 and BIFF8 takes the
//! `Dialect` and matches on it directly.

use super::records::*;

/// A raw BIFF opcode mapped to the record kind this crate understands.
/// Opcodes with no symbolic kind here fall into `Unknown` and are skipped
/// (their length bytes are still consumed by the cursor).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Bof,
    Eof,
    Continue,
    Boundsheet,
    Sst,
    ExtSst,
    DateMode,
    CodePage,
    Palette,
    Font,
    FormatRec,
    Xf,
    Style,
    Dimension,
    LabelSst,
    Label,
    Number,
    Rk,
    MulRk,
    Blank,
    MulBlank,
    BoolErr,
    Formula,
    StringRec,
    RString,
    Array,
    Row,
    DbCell,
    ColInfo,
    MergeCells,
    /// BIFF2 INTEGER cell record — recognized so the row-block scanner
    /// doesn't misclassify it as a structural boundary, but not decoded.
    IntegerBiff2,
    Unknown(u16),
}

/// Map a raw opcode to its symbolic kind. `BOF` is special-cased: all four
/// version-tagged forms (BIFF2 `0x0009` through BIFF5/7/8 `0x0809`) map to
/// the same symbolic `Bof` kind.
pub fn symbolic(opcode: u16) -> RecordKind {
    match opcode {
        BOF | BOF_BIFF2 | BOF_BIFF3 | BOF_BIFF4 => RecordKind::Bof,
        EOF => RecordKind::Eof,
        CONTINUE => RecordKind::Continue,
        BOUNDSHEET => RecordKind::Boundsheet,
        SST => RecordKind::Sst,
        EXTSST => RecordKind::ExtSst,
        DATEMODE => RecordKind::DateMode,
        CODEPAGE => RecordKind::CodePage,
        PALETTE => RecordKind::Palette,
        FONT => RecordKind::Font,
        FORMAT => RecordKind::FormatRec,
        XF => RecordKind::Xf,
        STYLE => RecordKind::Style,
        DIMENSION => RecordKind::Dimension,
        LABELSST => RecordKind::LabelSst,
        LABEL => RecordKind::Label,
        NUMBER => RecordKind::Number,
        RK => RecordKind::Rk,
        MULRK => RecordKind::MulRk,
        BLANK => RecordKind::Blank,
        MULBLANK => RecordKind::MulBlank,
        BOOLERR => RecordKind::BoolErr,
        FORMULA => RecordKind::Formula,
        STRING => RecordKind::StringRec,
        RSTRING => RecordKind::RString,
        ARRAY => RecordKind::Array,
        ROW => RecordKind::Row,
        DBCELL => RecordKind::DbCell,
        COLINFO => RecordKind::ColInfo,
        MERGECELLS => RecordKind::MergeCells,
        INTEGER_BIFF2 => RecordKind::IntegerBiff2,
        other => RecordKind::Unknown(other),
    }
}

/// Which version-specific primitive decoders/record handlers apply,
/// selected once from the workbook-globals BOF's version word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// BIFF5/BIFF7 (Excel 5.0/95): byte strings decoded through the active
    /// code-page `Encoder`, no SST/LABELSST.
    Biff5Or7,
    /// BIFF8 (Excel 97+): Unicode strings with compression/rich/ext
    /// headers, SST + LABELSST, CONTINUE chaining for SST.
    Biff8,
}

impl Dialect {
    /// Select a dialect from a BOF version word. Versions this crate
    /// doesn't recognize default to `Biff8` (the more common modern case)
    /// — callers that want a hard failure instead should check
    /// `ReaderOptions::strict_version` before calling this.
    pub fn from_version(version: u16) -> Option<Dialect> {
        match version {
            BIFF5_VERSION => Some(Dialect::Biff5Or7),
            BIFF8_VERSION => Some(Dialect::Biff8),
            _ => None,
        }
    }

    pub fn supports_sst(self) -> bool {
        matches!(self, Dialect::Biff8)
    }
}

/// Extract `(version, substream_type)` from a BOF record body.
/// `substream_type`: 0x0005 = workbook globals, 0x0010 = worksheet, 0x0020
/// = chart, 0x0040 = macro sheet.
pub fn parse_bof(data: &[u8]) -> Option<(u16, u16)> {
    if data.len() < 4 {
        return None;
    }
    let version = u16::from_le_bytes([data[0], data[1]]);
    let dt = u16::from_le_bytes([data[2], data[3]]);
    Some((version, dt))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_bof_version_tags_map_to_bof() {
        for opcode in [BOF_BIFF2, BOF_BIFF3, BOF_BIFF4, BOF] {
            assert_eq!(symbolic(opcode), RecordKind::Bof);
        }
    }

    #[test]
    fn unknown_opcode_is_unknown_not_a_panic() {
        assert_eq!(symbolic(0xDEAD), RecordKind::Unknown(0xDEAD));
    }

    #[test]
    fn dialect_selection() {
        assert_eq!(Dialect::from_version(0x0600), Some(Dialect::Biff8));
        assert_eq!(Dialect::from_version(0x0500), Some(Dialect::Biff5Or7));
        assert_eq!(Dialect::from_version(0x0001), None);
    }

    #[test]
    fn biff8_supports_sst_biff5_does_not() {
        assert!(Dialect::Biff8.supports_sst());
        assert!(!Dialect::Biff5Or7.supports_sst());
    }
}
