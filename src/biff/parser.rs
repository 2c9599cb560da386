//! Low-level binary parsing helpers for BIFF records.
//!
//! All multi-byte integers in BIFF are little-endian, decoded here with
//! fixed-width byte arrays rather than any host-endianness-dependent path.

use crate::error::{XlsError, XlsResult};

/// Read a `u8` from a byte slice at `offset`, advancing `offset`.
#[inline]
pub fn read_u8(data: &[u8], offset: &mut usize) -> XlsResult<u8> {
    if *offset >= data.len() {
        return Err(XlsError::Parse(format!(
            "unexpected end of data at offset {}, need 1 byte",
            *offset
        )));
    }
    let v = data[*offset];
    *offset += 1;
    Ok(v)
}

/// Read a `u16` (little-endian) from a byte slice at `offset`, advancing `offset`.
#[inline]
pub fn read_u16(data: &[u8], offset: &mut usize) -> XlsResult<u16> {
    if *offset + 2 > data.len() {
        return Err(XlsError::Parse(format!(
            "unexpected end of data at offset {}, need 2 bytes",
            *offset
        )));
    }
    let v = u16::from_le_bytes([data[*offset], data[*offset + 1]]);
    *offset += 2;
    Ok(v)
}

/// Read a `u32` (little-endian) from a byte slice at `offset`, advancing `offset`.
#[inline]
pub fn read_u32(data: &[u8], offset: &mut usize) -> XlsResult<u32> {
    if *offset + 4 > data.len() {
        return Err(XlsError::Parse(format!(
            "unexpected end of data at offset {}, need 4 bytes",
            *offset
        )));
    }
    let v = u32::from_le_bytes([
        data[*offset],
        data[*offset + 1],
        data[*offset + 2],
        data[*offset + 3],
    ]);
    *offset += 4;
    Ok(v)
}

/// Read an `f64` (IEEE 754 binary64, little-endian) from a byte slice.
#[inline]
pub fn read_f64(data: &[u8], offset: &mut usize) -> XlsResult<f64> {
    if *offset + 8 > data.len() {
        return Err(XlsError::Parse(format!(
            "unexpected end of data at offset {}, need 8 bytes",
            *offset
        )));
    }
    let bytes: [u8; 8] = data[*offset..*offset + 8].try_into().unwrap();
    *offset += 8;
    Ok(f64::from_le_bytes(bytes))
}

/// The two shapes a decoded RK cell value can take. RK's bit 1 selects
/// integer vs. floating; bit 0 (×1/100 scaling) always promotes the result
/// to a float if it's set, even starting from the integer path — so an
/// unscaled RK integer is the only case that stays `Integer`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RkValue {
    Integer(i32),
    Double(f64),
}

impl RkValue {
    pub fn as_f64(self) -> f64 {
        match self {
            RkValue::Integer(i) => i as f64,
            RkValue::Double(d) => d,
        }
    }
}

/// Decode a 4-byte RK-encoded number.
///
/// - Bit 0: if 1, the decoded number is divided by 100.
/// - Bit 1: if 1, bits 2..31 hold a signed 30-bit integer; if 0, bits 2..31
///   are the *upper* 30 bits of an IEEE 754 double whose lower 34 bits are
///   zero.
#[inline]
pub fn decode_rk(rk: u32) -> RkValue {
    let div100 = (rk & 0x01) != 0;
    let is_integer = (rk & 0x02) != 0;

    if is_integer {
        // Arithmetic right shift on a signed i32 sign-extends for us.
        let raw = (rk as i32) >> 2;
        if div100 {
            RkValue::Double(raw as f64 / 100.0)
        } else {
            RkValue::Integer(raw)
        }
    } else {
        let upper = (rk & 0xFFFF_FFFC) as u64;
        let bits = upper << 32;
        let value = f64::from_bits(bits);
        if div100 {
            RkValue::Double(value / 100.0)
        } else {
            RkValue::Double(value)
        }
    }
}

/// Read an RK value from 4 bytes at `offset`.
#[inline]
pub fn read_rk(data: &[u8], offset: &mut usize) -> XlsResult<RkValue> {
    let raw = read_u32(data, offset)?;
    Ok(decode_rk(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_rk_integer_unscaled_stays_integer() {
        // 42: bits 2..31 = 42, bit 1 = 1 (integer), bit 0 = 0 (no /100)
        let rk = (42u32 << 2) | 0x02;
        assert_eq!(decode_rk(rk), RkValue::Integer(42));
    }

    #[test]
    fn decode_rk_integer_negative() {
        let rk = ((-5i32 << 2) as u32) | 0x02;
        assert_eq!(decode_rk(rk), RkValue::Integer(-5));
    }

    #[test]
    fn decode_rk_integer_div100_promotes_to_double() {
        let rk = (4200u32 << 2) | 0x03;
        assert_eq!(decode_rk(rk), RkValue::Double(42.0));
    }

    #[test]
    fn decode_rk_float_unscaled() {
        let bits = 42.0_f64.to_bits();
        let upper = ((bits >> 32) as u32) & 0xFFFF_FFFC;
        assert_eq!(decode_rk(upper), RkValue::Double(42.0));
    }

    #[test]
    fn rk_integer_scaled_word() {
        let value = decode_rk(0x000A_0003).as_f64();
        assert!((value - 1638.4).abs() < 1e-9);
    }

    #[test]
    fn rk_float_unscaled_word() {
        assert_eq!(decode_rk(0x3FF0_0000), RkValue::Double(1.0));
    }

    #[test]
    fn decode_rk_real_values_from_mulrk_output() {
        assert_eq!(decode_rk(0x000000AA), RkValue::Integer(42));
        match decode_rk(0x000004EB) {
            RkValue::Double(v) => assert!((v - 3.14).abs() < f64::EPSILON),
            other => panic!("expected Double, got {other:?}"),
        }
        assert_eq!(decode_rk(0xFFFFFE72), RkValue::Integer(-100));
        assert_eq!(decode_rk(0x00000002), RkValue::Integer(0));
    }

    #[test]
    fn read_u16_advances_offset() {
        let data = [0x34, 0x12];
        let mut off = 0;
        assert_eq!(read_u16(&data, &mut off).unwrap(), 0x1234);
        assert_eq!(off, 2);
    }

    #[test]
    fn read_f64_round_trips() {
        let val = 3.14_f64;
        let bytes = val.to_le_bytes();
        let mut off = 0;
        let result = read_f64(&bytes, &mut off).unwrap();
        assert!((result - val).abs() < f64::EPSILON);
    }

    #[test]
    fn short_reads_error_instead_of_panicking() {
        let data = [0x01];
        let mut off = 0;
        assert!(read_u16(&data, &mut off).is_err());
        let mut off = 0;
        assert!(read_u32(&data, &mut off).is_err());
        let mut off = 0;
        assert!(read_f64(&data, &mut off).is_err());
    }
}
