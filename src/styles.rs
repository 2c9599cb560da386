//! FONT, FORMAT, XF, and PALETTE record decoding.
//!
//! Every color field these records carry stays a raw palette index in the
//! output model — this module never resolves a `color_index` to RGB.
//! `DEFAULT_PALETTE` and `apply_palette` are still provided so a caller that
//! wants to do that resolution has the table to do it with.

use std::collections::BTreeMap;

use crate::biff::parser::{read_u16, read_u32};
use crate::biff::strings::{read_short_string, read_unicode_string};
use crate::error::{XlsError, XlsResult};
use crate::model::{
    Alignment, Border, BorderEdge, BorderLineStyle, DiagonalDirection, Fill, FillPattern, Font,
    Format, HorizontalAlign, NumberFormat, ReadingOrder, Underline, VerticalAlign, VerticalScript,
};

/// The standard BIFF8 color palette (56 entries, palette indices 8-63).
/// A PALETTE record can override individual entries.
pub(crate) const DEFAULT_PALETTE: [(u8, u8, u8); 56] = [
    (0, 0, 0),
    (255, 255, 255),
    (255, 0, 0),
    (0, 255, 0),
    (0, 0, 255),
    (255, 255, 0),
    (255, 0, 255),
    (0, 255, 255),
    (128, 0, 0),
    (0, 128, 0),
    (0, 0, 128),
    (128, 128, 0),
    (128, 0, 128),
    (0, 128, 128),
    (192, 192, 192),
    (128, 128, 128),
    (153, 153, 255),
    (153, 51, 102),
    (255, 255, 204),
    (204, 255, 255),
    (102, 0, 102),
    (255, 128, 128),
    (0, 102, 204),
    (204, 204, 255),
    (0, 0, 128),
    (255, 0, 255),
    (255, 255, 0),
    (0, 255, 255),
    (128, 0, 128),
    (128, 0, 0),
    (0, 128, 128),
    (0, 0, 255),
    (0, 204, 255),
    (204, 255, 255),
    (204, 255, 204),
    (255, 255, 153),
    (153, 204, 255),
    (255, 153, 204),
    (204, 153, 255),
    (255, 204, 153),
    (51, 102, 255),
    (51, 204, 204),
    (153, 204, 0),
    (255, 204, 0),
    (255, 153, 0),
    (255, 102, 0),
    (102, 102, 153),
    (150, 150, 150),
    (0, 51, 102),
    (51, 153, 102),
    (0, 51, 0),
    (51, 51, 0),
    (153, 51, 0),
    (153, 51, 51),
    (51, 51, 153),
    (51, 51, 51),
];

/// Raw fields of an XF record before font/format-index resolution to a
/// `Format`; kept distinct from `model::Format` since the border/alignment
/// bit layout decoding is most naturally done here.
struct RawXf {
    font_index: u16,
    format_index: u16,
    locked: bool,
    hidden: bool,
    is_style_xf: bool,
    hor_align: u8,
    vert_align: u8,
    wrap_text: bool,
    shrink_to_fit: bool,
    indent: u8,
    rotation: u8,
    reading_order: u8,
    border_left: u8,
    border_right: u8,
    border_top: u8,
    border_bottom: u8,
    border_diag: u8,
    icv_left: u16,
    icv_right: u16,
    icv_top: u16,
    icv_bottom: u16,
    icv_diag: u16,
    diagonal_dir: u8,
    fill_pattern: u8,
    icv_fore: u16,
    icv_back: u16,
}

/// Style data accumulated while streaming the workbook globals substream.
pub(crate) struct StyleContext {
    fonts: Vec<Font>,
    formats: BTreeMap<u16, String>,
    xfs: Vec<RawXf>,
    pub palette: [(u8, u8, u8); 56],
}

impl StyleContext {
    pub fn new() -> Self {
        StyleContext {
            fonts: Vec::new(),
            formats: BTreeMap::new(),
            xfs: Vec::new(),
            palette: DEFAULT_PALETTE,
        }
    }

    pub fn push_font(&mut self, font: Font) {
        self.fonts.push(font);
    }

    pub fn push_format_string(&mut self, ifmt: u16, s: String) {
        self.formats.insert(ifmt, s);
    }

    pub fn push_xf(&mut self, data: &[u8]) -> XlsResult<()> {
        self.xfs.push(parse_raw_xf(data)?);
        Ok(())
    }

    pub fn number_format_strings(&self) -> BTreeMap<u16, String> {
        self.formats.clone()
    }

    pub fn fonts(&self) -> Vec<Font> {
        self.fonts.clone()
    }

    /// Build one `Format` per accumulated XF record. Font indices follow
    /// BIFF8's skip-index-4 quirk: the font table has no entry 4 on disk
    /// (the slot is reserved), so XF font index 5 refers to the 5th font
    /// actually stored.
    pub fn build_format_table(&self) -> Vec<Format> {
        self.xfs.iter().map(Self::resolve_xf).collect()
    }

    fn resolve_xf(xf: &RawXf) -> Format {
        Format {
            font_index: resolve_font_index(xf.font_index),
            // Whether `format_index` names a built-in or a custom FORMAT
            // string can't be decided here — it depends on the full
            // number_format_strings map, which the reader assembles only
            // after every FORMAT record has streamed past. `reader.rs`
            // replaces this placeholder once that map is complete.
            number_format: if xf.format_index == 0 {
                NumberFormat::General
            } else {
                NumberFormat::BuiltIn(xf.format_index)
            },
            locked: xf.locked,
            hidden: xf.hidden,
            is_style_xf: xf.is_style_xf,
            alignment: resolve_alignment(xf),
            border: resolve_border(xf),
            fill: resolve_fill(xf),
        }
    }
}

/// BIFF8 font index 4 is never stored; indices 5+ shift down by one.
fn resolve_font_index(font_index: u16) -> u16 {
    if font_index >= 5 {
        font_index - 1
    } else {
        font_index
    }
}

fn resolve_fill(xf: &RawXf) -> Fill {
    Fill {
        pattern: pattern_from_biff(xf.fill_pattern),
        foreground_color_index: xf.icv_fore,
        background_color_index: xf.icv_back,
    }
}

fn resolve_border(xf: &RawXf) -> Border {
    let edge = |code: u8, icv: u16| -> BorderEdge {
        BorderEdge {
            style: border_line_from_biff(code),
            color_index: icv,
        }
    };

    Border {
        left: edge(xf.border_left, xf.icv_left),
        right: edge(xf.border_right, xf.icv_right),
        top: edge(xf.border_top, xf.icv_top),
        bottom: edge(xf.border_bottom, xf.icv_bottom),
        diagonal: edge(xf.border_diag, xf.icv_diag),
        diagonal_direction: match xf.diagonal_dir {
            1 => DiagonalDirection::Down,
            2 => DiagonalDirection::Up,
            3 => DiagonalDirection::Both,
            _ => DiagonalDirection::None,
        },
    }
}

fn resolve_alignment(xf: &RawXf) -> Alignment {
    let horizontal = match xf.hor_align {
        1 => HorizontalAlign::Left,
        2 => HorizontalAlign::Center,
        3 => HorizontalAlign::Right,
        4 => HorizontalAlign::Fill,
        5 => HorizontalAlign::Justify,
        6 => HorizontalAlign::CenterContinuous,
        7 => HorizontalAlign::Distributed,
        _ => HorizontalAlign::General,
    };

    let vertical = match xf.vert_align {
        0 => VerticalAlign::Top,
        1 => VerticalAlign::Center,
        2 => VerticalAlign::Bottom,
        3 => VerticalAlign::Justify,
        4 => VerticalAlign::Distributed,
        _ => VerticalAlign::Bottom,
    };

    // 0 = none, 1-90 = CCW degrees, 91-180 = CW as -(val-90), 255 = stacked vertical.
    let rotation = match xf.rotation {
        0 => 0i16,
        r @ 1..=90 => r as i16,
        r @ 91..=180 => -((r as i16) - 90),
        255 => 255,
        _ => 0,
    };

    let reading_order = match xf.reading_order {
        1 => ReadingOrder::LeftToRight,
        2 => ReadingOrder::RightToLeft,
        _ => ReadingOrder::ContextDependent,
    };

    Alignment {
        horizontal,
        vertical,
        wrap_text: xf.wrap_text,
        shrink_to_fit: xf.shrink_to_fit,
        indent: xf.indent,
        rotation,
        reading_order,
    }
}

/// Parse a FONT record (0x0031).
///
/// Layout: dyHeight(u16) grbit(u16) icv(u16) bls(u16) sss(u16) uls(u8)
/// bFamily(u8) bCharSet(u8) reserved(u8) then a short string font name.
pub(crate) fn parse_font(data: &[u8]) -> XlsResult<Font> {
    if data.len() < 15 {
        return Err(XlsError::Parse("FONT record too short".into()));
    }

    let mut off = 0;
    let height = read_u16(data, &mut off)?;
    let grbit = read_u16(data, &mut off)?;
    let icv = read_u16(data, &mut off)?;
    let bls = read_u16(data, &mut off)?;
    let sss = read_u16(data, &mut off)?;
    let uls = data[off];
    off += 1;
    let family = data[off];
    off += 1;
    let charset = data[off];
    off += 1;
    off += 1; // reserved

    let name = if off < data.len() {
        read_short_string(data, &mut off).unwrap_or_default()
    } else {
        String::new()
    };

    Ok(Font {
        name,
        size_pt: height as f64 / 20.0,
        bold: bls >= 700,
        italic: (grbit & 0x0002) != 0,
        strikethrough: (grbit & 0x0008) != 0,
        outline: (grbit & 0x0010) != 0,
        shadow: (grbit & 0x0020) != 0,
        underline: match uls {
            0x01 => Underline::Single,
            0x02 => Underline::Double,
            0x21 => Underline::SingleAccounting,
            0x22 => Underline::DoubleAccounting,
            _ => Underline::None,
        },
        escapement: match sss {
            1 => VerticalScript::Superscript,
            2 => VerticalScript::Subscript,
            _ => VerticalScript::Baseline,
        },
        color_index: icv,
        family,
        charset,
    })
}

/// Parse a FORMAT record (0x041E): ifmt(u16) then a unicode format string.
pub(crate) fn parse_format(data: &[u8]) -> XlsResult<(u16, String)> {
    let mut off = 0;
    let ifmt = read_u16(data, &mut off)?;
    let s = read_unicode_string(data, &mut off)?;
    Ok((ifmt, s))
}

/// Parse an XF record (0x00E0, always 20 bytes in BIFF8).
fn parse_raw_xf(data: &[u8]) -> XlsResult<RawXf> {
    if data.len() < 20 {
        return Err(XlsError::Parse(format!(
            "XF record too short: {} bytes (expected 20)",
            data.len()
        )));
    }

    let mut off = 0;
    let ifnt = read_u16(data, &mut off)?;
    let ifmt = read_u16(data, &mut off)?;
    let type_prot = read_u16(data, &mut off)?;

    let locked = (type_prot & 0x0001) != 0;
    let hidden = (type_prot & 0x0002) != 0;
    let is_style_xf = (type_prot & 0x0004) != 0;

    let align1 = data[off];
    off += 1;
    let hor_align = align1 & 0x07;
    let wrap_text = (align1 & 0x08) != 0;
    let vert_align = (align1 >> 4) & 0x07;

    let rotation = data[off];
    off += 1;

    let align2 = data[off];
    off += 1;
    let indent = align2 & 0x0F;
    let shrink_to_fit = (align2 & 0x10) != 0;
    let reading_order = (align2 >> 6) & 0x03;

    off += 1; // used-attributes byte, not represented in the model

    let border1 = read_u32(data, &mut off)?;
    let border_left = (border1 & 0x0F) as u8;
    let border_right = ((border1 >> 4) & 0x0F) as u8;
    let border_top = ((border1 >> 8) & 0x0F) as u8;
    let border_bottom = ((border1 >> 12) & 0x0F) as u8;
    let icv_left = ((border1 >> 16) & 0x7F) as u16;
    let icv_right = ((border1 >> 23) & 0x7F) as u16;
    let diagonal_dir = ((border1 >> 30) & 0x03) as u8;

    let border2 = read_u32(data, &mut off)?;
    let icv_top = (border2 & 0x7F) as u16;
    let icv_bottom = ((border2 >> 7) & 0x7F) as u16;
    let icv_diag = ((border2 >> 14) & 0x7F) as u16;
    let border_diag = ((border2 >> 21) & 0x0F) as u8;
    let fill_pattern = ((border2 >> 26) & 0x3F) as u8;

    let fill_colors = read_u16(data, &mut off)?;
    let icv_fore = fill_colors & 0x7F;
    let icv_back = (fill_colors >> 7) & 0x7F;

    Ok(RawXf {
        font_index: ifnt,
        format_index: ifmt,
        locked,
        hidden,
        is_style_xf,
        hor_align,
        vert_align,
        wrap_text,
        shrink_to_fit,
        indent,
        rotation,
        reading_order,
        border_left,
        border_right,
        border_top,
        border_bottom,
        border_diag,
        icv_left,
        icv_right,
        icv_top,
        icv_bottom,
        icv_diag,
        diagonal_dir,
        fill_pattern,
        icv_fore,
        icv_back,
    })
}

/// Apply a PALETTE record: ccv(u16) count, then ccv × 4-byte (R,G,B,0) entries.
pub(crate) fn apply_palette(data: &[u8], palette: &mut [(u8, u8, u8); 56]) -> XlsResult<()> {
    if data.len() < 2 {
        return Err(XlsError::Parse("PALETTE record too short".into()));
    }

    let mut off = 0;
    let count = read_u16(data, &mut off)? as usize;
    let max = count.min(56);

    for entry in palette.iter_mut().take(max) {
        if off + 4 > data.len() {
            break;
        }
        *entry = (data[off], data[off + 1], data[off + 2]);
        off += 4;
    }

    Ok(())
}

fn border_line_from_biff(code: u8) -> BorderLineStyle {
    match code {
        0 => BorderLineStyle::None,
        1 => BorderLineStyle::Thin,
        2 => BorderLineStyle::Medium,
        3 => BorderLineStyle::Dashed,
        4 => BorderLineStyle::Dotted,
        5 => BorderLineStyle::Thick,
        6 => BorderLineStyle::Double,
        7 => BorderLineStyle::Hair,
        8 => BorderLineStyle::MediumDashed,
        9 => BorderLineStyle::DashDot,
        10 => BorderLineStyle::MediumDashDot,
        11 => BorderLineStyle::DashDotDot,
        12 => BorderLineStyle::MediumDashDotDot,
        13 => BorderLineStyle::SlantDashDot,
        _ => BorderLineStyle::None,
    }
}

fn pattern_from_biff(code: u8) -> FillPattern {
    match code {
        0 => FillPattern::None,
        1 => FillPattern::Solid,
        2 => FillPattern::MediumGray,
        3 => FillPattern::DarkGray,
        4 => FillPattern::LightGray,
        5 => FillPattern::DarkHorizontal,
        6 => FillPattern::DarkVertical,
        7 => FillPattern::DarkDown,
        8 => FillPattern::DarkUp,
        9 => FillPattern::DarkGrid,
        10 => FillPattern::DarkTrellis,
        11 => FillPattern::LightHorizontal,
        12 => FillPattern::LightVertical,
        13 => FillPattern::LightDown,
        14 => FillPattern::LightUp,
        15 => FillPattern::LightGrid,
        16 => FillPattern::LightTrellis,
        17 => FillPattern::Gray125,
        18 => FillPattern::Gray0625,
        _ => FillPattern::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_font_basic() {
        let mut data = Vec::new();
        data.extend_from_slice(&220u16.to_le_bytes());
        data.extend_from_slice(&0u16.to_le_bytes());
        data.extend_from_slice(&0x7FFFu16.to_le_bytes());
        data.extend_from_slice(&400u16.to_le_bytes());
        data.extend_from_slice(&0u16.to_le_bytes());
        data.push(0x00);
        data.push(0);
        data.push(0);
        data.push(0);
        data.push(5);
        data.push(0x00);
        data.extend_from_slice(b"Arial");

        let font = parse_font(&data).unwrap();
        assert_eq!(font.size_pt, 11.0);
        assert!(!font.bold);
        assert!(!font.italic);
        assert_eq!(font.color_index, 0x7FFF);
        assert_eq!(font.name, "Arial");
    }

    #[test]
    fn parse_font_bold_italic_superscript() {
        let mut data = Vec::new();
        data.extend_from_slice(&240u16.to_le_bytes());
        data.extend_from_slice(&0x0002u16.to_le_bytes());
        data.extend_from_slice(&10u16.to_le_bytes());
        data.extend_from_slice(&700u16.to_le_bytes());
        data.extend_from_slice(&1u16.to_le_bytes());
        data.push(0x01);
        data.push(0);
        data.push(0);
        data.push(0);
        data.push(0);
        data.push(0x00);

        let font = parse_font(&data).unwrap();
        assert!(font.bold);
        assert!(font.italic);
        assert_eq!(font.underline, Underline::Single);
        assert_eq!(font.escapement, VerticalScript::Superscript);
        assert_eq!(font.color_index, 10);
    }

    #[test]
    fn xf_colors_stay_as_raw_indices() {
        let mut ctx = StyleContext::new();
        let mut data = [0u8; 20];
        data[4] = 0x04; // style xf, unlocked
        // fill pattern solid (1) in border2 bits 26-31, fore color 10 in fill_colors
        data[14..18].copy_from_slice(&(1u32 << 26).to_le_bytes());
        data[18..20].copy_from_slice(&10u16.to_le_bytes());

        ctx.push_xf(&data).unwrap();
        let formats = ctx.build_format_table();
        assert_eq!(formats[0].fill.pattern, FillPattern::Solid);
        assert_eq!(formats[0].fill.foreground_color_index, 10);
    }

    #[test]
    fn font_index_4_is_skipped() {
        assert_eq!(resolve_font_index(0), 0);
        assert_eq!(resolve_font_index(3), 3);
        assert_eq!(resolve_font_index(5), 4);
        assert_eq!(resolve_font_index(6), 5);
    }

    #[test]
    fn rotation_mapping() {
        let make_xf = |rot: u8| RawXf {
            font_index: 0,
            format_index: 0,
            locked: false,
            hidden: false,
            is_style_xf: false,
            hor_align: 0,
            vert_align: 0,
            wrap_text: false,
            shrink_to_fit: false,
            indent: 0,
            rotation: rot,
            reading_order: 0,
            border_left: 0,
            border_right: 0,
            border_top: 0,
            border_bottom: 0,
            border_diag: 0,
            icv_left: 0,
            icv_right: 0,
            icv_top: 0,
            icv_bottom: 0,
            icv_diag: 0,
            diagonal_dir: 0,
            fill_pattern: 0,
            icv_fore: 0,
            icv_back: 0,
        };

        assert_eq!(resolve_alignment(&make_xf(0)).rotation, 0);
        assert_eq!(resolve_alignment(&make_xf(45)).rotation, 45);
        assert_eq!(resolve_alignment(&make_xf(91)).rotation, -1);
        assert_eq!(resolve_alignment(&make_xf(180)).rotation, -90);
        assert_eq!(resolve_alignment(&make_xf(255)).rotation, 255);
    }

    #[test]
    fn apply_palette_overrides_entries() {
        let mut palette = DEFAULT_PALETTE;
        let mut data = Vec::new();
        data.extend_from_slice(&2u16.to_le_bytes());
        data.extend_from_slice(&[0xAA, 0xBB, 0xCC, 0x00]);
        data.extend_from_slice(&[0x11, 0x22, 0x33, 0x00]);

        apply_palette(&data, &mut palette).unwrap();
        assert_eq!(palette[0], (0xAA, 0xBB, 0xCC));
        assert_eq!(palette[1], (0x11, 0x22, 0x33));
        assert_eq!(palette[2], DEFAULT_PALETTE[2]);
    }

    #[test]
    fn border_line_and_pattern_mapping_cover_known_and_unknown_codes() {
        assert_eq!(border_line_from_biff(1), BorderLineStyle::Thin);
        assert_eq!(border_line_from_biff(13), BorderLineStyle::SlantDashDot);
        assert_eq!(border_line_from_biff(99), BorderLineStyle::None);
        assert_eq!(pattern_from_biff(17), FillPattern::Gray125);
        assert_eq!(pattern_from_biff(255), FillPattern::None);
    }
}
