//! The cell-value domain and the numeric/text encodings used on disk.

/// Day zero of the workbook's date-time representation: 30 December 1899.
/// The specification pins this interpretation and explicitly defers time
/// zone handling to the consumer.
pub const EPOCH_DAYS_OFFSET: &str = "1899-12-30";

/// A decoded cell value. `Absent` is itself a value (the `#N/A` error
/// sentinel on disk), distinct from a worksheet position simply never
/// having been written.
#[derive(Clone, Debug, PartialEq)]
pub enum CellValue {
    Absent,
    Bool(bool),
    Int(i64),
    /// Always finite when written; on the way out `NaN`/`±Infinity` are
    /// routed to error-cell sentinels (`#NUM!`, `#DIV/0!`), and every error
    /// sentinel other than `#N/A` reads back as `Float(NAN)` regardless of
    /// which one it was.
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    /// Days since [`EPOCH_DAYS_OFFSET`], including a fractional part for
    /// time-of-day.
    DateTime(f64),
}

impl CellValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Int(i) => Some(*i as f64),
            CellValue::Float(f) => Some(*f),
            CellValue::DateTime(d) => Some(*d),
            _ => None,
        }
    }
}

/// Formats a float the way the source's string interpolation of a Python
/// float does: always with a decimal point (or exponent), so the written
/// text itself carries the int/float distinction independent of styling.
pub fn format_float(v: f64) -> String {
    if v.is_nan() || v.is_infinite() {
        // Never reached by the writer directly — NaN/±Inf are routed to
        // the error-cell sentinels before formatting — but kept total.
        return format!("{v}");
    }
    let s = format!("{v}");
    if s.contains('.') || s.contains('e') || s.contains('E') {
        s
    } else {
        format!("{s}.0")
    }
}

/// Encodes a byte sequence as the uppercase hex-pair text the writer
/// stores in the shared-string pool for `CellValue::Bytes`.
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}

/// Decodes the hex-pair text back into bytes. Malformed input (odd length,
/// non-hex digits) decodes byte-for-byte best-effort, since by the time a
/// cell carries the "bytes" number-format tag the writer is the only
/// producer we need to round-trip.
pub fn hex_to_bytes(hex: &str) -> Vec<u8> {
    let chars: Vec<char> = hex.chars().collect();
    chars
        .chunks(2)
        .filter_map(|pair| {
            let s: String = pair.iter().collect();
            u8::from_str_radix(&s, 16).ok()
        })
        .collect()
}
