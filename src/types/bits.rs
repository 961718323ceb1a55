//! Numeric literal parsing and bit-size range checks.

/// Exact value of a numeric literal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumericLiteral {
    Signed(i64),
    Unsigned(u64),
    Float(f64),
}

impl NumericLiteral {
    /// Canonical literal text, used as the raw text of folded constants.
    pub fn to_literal(self) -> String {
        match self {
            NumericLiteral::Signed(v) => v.to_string(),
            NumericLiteral::Unsigned(v) => v.to_string(),
            NumericLiteral::Float(v) => {
                let text = v.to_string();
                if text.contains(['.', 'e', 'E', 'i', 'N']) {
                    text
                } else {
                    format!("{text}.0")
                }
            }
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            NumericLiteral::Signed(v) => v as f64,
            NumericLiteral::Unsigned(v) => v as f64,
            NumericLiteral::Float(v) => v,
        }
    }
}

/// Parse an integer literal: decimal, `0x`, `0b`, `0o` or leading-zero octal.
///
/// Values that fit `i64` are signed; larger values up to `u64::MAX` are
/// unsigned. Returns `None` for malformed or out-of-range text.
pub fn parse_int_literal(text: &str) -> Option<NumericLiteral> {
    let clean: String = text.chars().filter(|&c| c != '_').collect();
    let (digits, radix) = if let Some(rest) = clean.strip_prefix("0x").or(clean.strip_prefix("0X")) {
        (rest, 16)
    } else if let Some(rest) = clean.strip_prefix("0b").or(clean.strip_prefix("0B")) {
        (rest, 2)
    } else if let Some(rest) = clean.strip_prefix("0o").or(clean.strip_prefix("0O")) {
        (rest, 8)
    } else if clean.len() > 1 && clean.starts_with('0') {
        (&clean[1..], 8)
    } else {
        (clean.as_str(), 10)
    };
    if digits.is_empty() {
        return None;
    }
    let value = u64::from_str_radix(digits, radix).ok()?;
    if value <= i64::MAX as u64 {
        Some(NumericLiteral::Signed(value as i64))
    } else {
        Some(NumericLiteral::Unsigned(value))
    }
}

/// Parse a floating point literal.
pub fn parse_float_literal(text: &str) -> Option<NumericLiteral> {
    let clean: String = text.chars().filter(|&c| c != '_').collect();
    let value: f64 = clean.parse().ok()?;
    value.is_finite().then_some(NumericLiteral::Float(value))
}

/// Whether `value` is representable by a float of `bits` without overflow.
pub fn float_fits_bits(value: f64, bits: u32) -> bool {
    if !value.is_finite() {
        return false;
    }
    match bits {
        32 => value.abs() <= f32::MAX as f64,
        _ => true,
    }
}

/// Bytes of a string literal token: `"..."` with escapes, or a raw
/// backquoted string taken verbatim.
pub fn parse_str_literal(text: &str) -> Option<Vec<u8>> {
    if let Some(raw) = text.strip_prefix('`') {
        return raw.strip_suffix('`').map(|body| body.as_bytes().to_vec());
    }
    let body = text.strip_prefix('"')?.strip_suffix('"')?;
    let bytes = body.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        i += 1;
        if b != b'\\' {
            out.push(b);
            continue;
        }
        let esc = *bytes.get(i)?;
        i += 1;
        match esc {
            b'n' => out.push(b'\n'),
            b't' => out.push(b'\t'),
            b'r' => out.push(b'\r'),
            b'a' => out.push(0x07),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0c),
            b'v' => out.push(0x0b),
            b'\\' | b'"' | b'\'' => out.push(esc),
            b'x' => {
                out.push(u8::from_str_radix(body.get(i..i + 2)?, 16).ok()?);
                i += 2;
            }
            b'u' | b'U' => {
                let n = if esc == b'u' { 4 } else { 8 };
                let code = u32::from_str_radix(body.get(i..i + n)?, 16).ok()?;
                let ch = char::from_u32(code)?;
                out.extend_from_slice(ch.encode_utf8(&mut [0; 4]).as_bytes());
                i += n;
            }
            b'0'..=b'7' => {
                let start = i - 1;
                while i < bytes.len() && i - start < 3 && (b'0'..=b'7').contains(&bytes[i]) {
                    i += 1;
                }
                out.push(u8::from_str_radix(&body[start..i], 8).ok()?);
            }
            _ => return None,
        }
    }
    Some(out)
}
