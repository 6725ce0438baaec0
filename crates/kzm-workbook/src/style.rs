//! Minimal cell-style model: just enough of the styles part to carry a
//! number format per cell, which is all the reader's int/float/date-time
//! heuristic and the bytes tag depend on.

/// A cell's resolved style, as seen by the per-cell styler callback
/// passed to [`crate::write`]. Reset to its default before each invocation.
#[derive(Clone, Debug, Default)]
pub struct Style {
    pub number_format: Option<String>,
}

/// The literal substring the writer embeds in a byte-sequence cell's number
/// format so the reader can recognise and reverse the hex encoding.
pub const BYTES_FORMAT_CODE: &str = "\"bytes\"@";

/// The number format the writer assigns to [`crate::CellValue::DateTime`]
/// cells.
pub const DATE_TIME_FORMAT_CODE: &str = "yyyy\\-mm\\-dd\\ hh:mm:ss";

/// The number format the writer assigns to [`crate::CellValue::Int`] cells
/// so that, absent an overriding styler, integers round-trip as integers.
pub const INTEGER_FORMAT_CODE: &str = "0";

/// A handful of the OOXML built-in number-format codes (ids below 164 are
/// reserved and never spelled out in the file); only the ones this reader
/// actually needs to recognise are listed.
pub fn builtin_format_code(id: u32) -> Option<&'static str> {
    match id {
        0 => Some("General"),
        1 => Some("0"),
        2 => Some("0.00"),
        3 => Some("#,##0"),
        4 => Some("#,##0.00"),
        9 => Some("0%"),
        10 => Some("0.00%"),
        14 => Some("mm-dd-yy"),
        15 => Some("d-mmm-yy"),
        16 => Some("d-mmm"),
        17 => Some("mmm-yy"),
        18 => Some("h:mm AM/PM"),
        19 => Some("h:mm:ss AM/PM"),
        20 => Some("h:mm"),
        21 => Some("h:mm:ss"),
        22 => Some("m/d/yy h:mm"),
        45 => Some("mm:ss"),
        46 => Some("[h]:mm:ss"),
        47 => Some("mmss.0"),
        _ => None,
    }
}

/// The inverse of [`builtin_format_code`]: the builtin id for a format code,
/// if it happens to match one exactly.
pub fn builtin_format_code_id(code: &str) -> Option<u32> {
    (0..=47).find(|&id| builtin_format_code(id) == Some(code))
}

/// Strips quoted literal segments (`"..."`) from a number format code, the
/// way Excel format strings embed literal text that shouldn't be mistaken
/// for format tokens.
fn strip_quoted_literals(code: &str) -> String {
    let mut out = String::with_capacity(code.len());
    let mut in_quote = false;
    for c in code.chars() {
        match c {
            '"' => in_quote = !in_quote,
            _ if in_quote => {}
            _ => out.push(c),
        }
    }
    out
}

/// `true` when `code` is recognisably a date/time format: it contains one
/// of the date/time token letters outside of quoted literal text.
pub fn is_date_time_format(code: &str) -> bool {
    let stripped = strip_quoted_literals(code);
    stripped.chars().any(|c| matches!(c.to_ascii_lowercase(), 'y' | 'm' | 'd' | 'h' | 's'))
}

/// `true` when `code` forbids a decimal point: a non-general format with
/// no literal `.` token outside quoted text.
pub fn forbids_decimal_point(code: &str) -> bool {
    let stripped = strip_quoted_literals(code);
    let trimmed = stripped.trim();
    !trimmed.is_empty() && trimmed != "General" && !trimmed.contains('.')
}

/// `true` when `code` carries the byte-sequence tag.
pub fn is_bytes_format(code: &str) -> bool {
    code.contains("bytes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_date_formats() {
        assert!(is_date_time_format(DATE_TIME_FORMAT_CODE));
        assert!(is_date_time_format("mm-dd-yy"));
        assert!(!is_date_time_format("General"));
        assert!(!is_date_time_format("0.00"));
    }

    #[test]
    fn recognises_integer_formats() {
        assert!(forbids_decimal_point(INTEGER_FORMAT_CODE));
        assert!(!forbids_decimal_point("0.00"));
        assert!(!forbids_decimal_point("General"));
    }

    #[test]
    fn recognises_bytes_tag() {
        assert!(is_bytes_format(BYTES_FORMAT_CODE));
        assert!(!is_bytes_format("General"));
    }
}
