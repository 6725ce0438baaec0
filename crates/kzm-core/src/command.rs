//! Signature-driven, lenient command-argument parsing.
//!
//! A plugin registers each command handler with an ordered list of typed
//! parameter descriptors (see [`ParamKind`]); the parser consumes the text
//! following the command name and fills them in, tolerating the usual mess
//! of human-typed arguments.

use std::collections::HashMap;

/// The type a command parameter is matched against. Mirrors the "explicit
/// descriptor list" design: the registration records `(name, kind,
/// optional)` rather than reflecting on handler type annotations.
#[derive(Clone, Debug)]
pub enum ParamKind {
    /// Decimal, `0x`/`0o`/`0b`-prefixed, optionally signed integer.
    Integer,
    /// As [`ParamKind::Integer`] plus decimal point and hex-float form.
    Floating,
    /// A whitespace-delimited token.
    Str,
    /// Like [`ParamKind::Str`], but also absorbs any otherwise-unmatched
    /// trailing text once every parameter has been processed.
    LastString,
    /// Never matches; useful for commands whose only purpose is to show
    /// their documentation on a failed parse (e.g. `.help`).
    Never,
    /// Marks one alternative inside [`ParamKind::Alt`] as "absent"; when
    /// tried, the parameter defaults to [`ArgValue::None`] without
    /// consuming input, and later alternatives may still match.
    NoneOption,
    /// Tries each alternative in order; the first to match wins.
    Alt(Vec<ParamKind>),
}

/// One parameter a command handler expects to have parsed out of the
/// command text (ambient parameters — `context`, `sender`, `text`,
/// `message_id` — are bound from the event and never appear here).
#[derive(Clone, Debug)]
pub struct ParamDescriptor {
    pub name: String,
    pub kind: ParamKind,
    pub optional: bool,
}

impl ParamDescriptor {
    pub fn new(name: impl Into<String>, kind: ParamKind, optional: bool) -> Self {
        ParamDescriptor { name: name.into(), kind, optional }
    }
}

/// A successfully parsed argument value.
#[derive(Clone, Debug, PartialEq)]
pub enum ArgValue {
    Integer(i64),
    Floating(f64),
    Str(String),
    None,
}

/// Raised when command text cannot be matched against a handler's
/// parameter descriptors. An empty message means "show the handler's
/// documentation instead", per §4.F / §7's error-handling policy.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct CommandSyntaxError(pub String);

impl CommandSyntaxError {
    fn bare() -> Self {
        CommandSyntaxError(String::new())
    }

    fn missing(name: &str) -> Self {
        CommandSyntaxError(format!("解析命令时找不到参数 {name}。"))
    }

    fn leftover(text: &str) -> Self {
        CommandSyntaxError(format!("残留未成功解析的参数“{text}”。"))
    }

    /// `true` when this error carries no message of its own, meaning the
    /// dispatcher should fall back to the handler's documentation.
    pub fn is_bare(&self) -> bool {
        self.0.is_empty()
    }
}

/// Parses `text` against `parameters` in declaration order, returning a
/// name-to-value map on success.
pub fn parse_command(
    parameters: &[ParamDescriptor],
    text: &str,
) -> Result<HashMap<String, ArgValue>, CommandSyntaxError> {
    let mut kwargs = HashMap::new();
    let mut matched_any = false;
    let mut last_string_name: Option<String> = None;
    let mut remaining = text.to_string();

    for desc in parameters {
        remaining = remaining.trim().to_string();
        let mut optional = desc.optional;

        let alternatives: Vec<&ParamKind> = match &desc.kind {
            ParamKind::Alt(list) => list.iter().collect(),
            other => vec![other],
        };

        let mut matched = false;
        for kind in alternatives {
            let found = match kind {
                ParamKind::Never | ParamKind::Alt(_) => None,
                ParamKind::NoneOption => {
                    kwargs.insert(desc.name.clone(), ArgValue::None);
                    optional = true;
                    None
                }
                ParamKind::Integer => match_start_or_end(INTEGER_PATTERN, &remaining),
                ParamKind::Floating => match_start_or_end(FLOATING_PATTERN, &remaining),
                ParamKind::Str | ParamKind::LastString => {
                    last_string_name = Some(desc.name.clone());
                    match_str_prefix(&remaining)
                }
            };

            if let Some((start, end)) = found {
                let matched_text = &remaining[start..end];
                let value = match kind {
                    ParamKind::Integer => ArgValue::Integer(parse_int_literal(matched_text)),
                    ParamKind::Floating => ArgValue::Floating(parse_float_literal(matched_text)),
                    ParamKind::Str | ParamKind::LastString => ArgValue::Str(matched_text.to_string()),
                    _ => unreachable!("only the numeric/string branches produce a match"),
                };
                kwargs.insert(desc.name.clone(), value);
                remaining = format!("{}{}", &remaining[..start], &remaining[end..]);
                matched_any = true;
                matched = true;
                break;
            }
        }

        if !matched {
            if optional {
                // Either a NoneOption already filled in ArgValue::None above,
                // or the parameter was declared optional with nothing to fall
                // back to; either way, leave it unset and move on.
            } else if !matched_any {
                return Err(CommandSyntaxError::bare());
            } else {
                return Err(CommandSyntaxError::missing(&desc.name));
            }
        }
    }

    // Keep the leading separator here (only the trailing whitespace is
    // trimmed) so that gluing this onto the last string parameter below
    // doesn't run its last word into the leftover's first one.
    let leftover = remaining.trim_end();
    if !leftover.trim_start().is_empty() {
        match &last_string_name {
            Some(name) => {
                if let Some(ArgValue::Str(s)) = kwargs.get_mut(name) {
                    s.push_str(leftover);
                }
            }
            None => return Err(CommandSyntaxError::leftover(leftover.trim_start())),
        }
    }

    Ok(kwargs)
}

const INTEGER_PATTERN: &str = r"(?i)[+-]?(\d+|0x[0-9a-f]+|0o[0-7]+|0b[01]+)";
const FLOATING_PATTERN: &str = r"(?i)[+-]?(\d*\.\d*|0x[0-9a-f]*\.[0-9a-f]*p\d+|\d+)";

/// Matches `pattern` anchored at the start of `text`; failing that, anchored
/// at its end. Mirrors `re.match(...) or re.search(rf"(?:{pattern})\Z", ...)`
/// from the source: a prefix match at the front, or else a suffix match
/// reaching exactly to the end of the remaining text.
fn match_start_or_end(pattern: &str, text: &str) -> Option<(usize, usize)> {
    let start_re = regex::Regex::new(&format!("^(?:{pattern})")).unwrap();
    if let Some(m) = start_re.find(text) {
        return Some((m.start(), m.end()));
    }
    let end_re = regex::Regex::new(&format!("(?:{pattern})$")).unwrap();
    end_re.find(text).map(|m| (m.start(), m.end()))
}

fn match_str_prefix(text: &str) -> Option<(usize, usize)> {
    let mut end = 0;
    for c in text.chars() {
        if c.is_whitespace() {
            break;
        }
        end += c.len_utf8();
    }
    (end > 0).then_some((0, end))
}

fn parse_int_literal(raw: &str) -> i64 {
    let (sign, rest) = strip_sign(raw);
    let lower = rest.to_ascii_lowercase();
    let magnitude = if let Some(hex) = lower.strip_prefix("0x") {
        i64::from_str_radix(hex, 16).unwrap_or(0)
    } else if let Some(oct) = lower.strip_prefix("0o") {
        i64::from_str_radix(oct, 8).unwrap_or(0)
    } else if let Some(bin) = lower.strip_prefix("0b") {
        i64::from_str_radix(bin, 2).unwrap_or(0)
    } else {
        lower.parse::<i64>().unwrap_or(0)
    };
    sign as i64 * magnitude
}

fn parse_float_literal(raw: &str) -> f64 {
    let (sign, rest) = strip_sign(raw);
    let lower = rest.to_ascii_lowercase();
    let magnitude = if let Some(hex) = lower.strip_prefix("0x") {
        let (mantissa, exponent) = hex.split_once('p').unwrap_or((hex, "0"));
        let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
        let int_val = if int_part.is_empty() { 0 } else { u64::from_str_radix(int_part, 16).unwrap_or(0) };
        let frac_val = if frac_part.is_empty() {
            0.0
        } else {
            u64::from_str_radix(frac_part, 16).unwrap_or(0) as f64 / 16f64.powi(frac_part.len() as i32)
        };
        let exp: i32 = exponent.parse().unwrap_or(0);
        (int_val as f64 + frac_val) * 2f64.powi(exp)
    } else {
        lower.parse::<f64>().unwrap_or(0.0)
    };
    sign * magnitude
}

fn strip_sign(s: &str) -> (f64, &str) {
    if let Some(rest) = s.strip_prefix('-') {
        (-1.0, rest)
    } else if let Some(rest) = s.strip_prefix('+') {
        (1.0, rest)
    } else {
        (1.0, s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get<'a>(kwargs: &'a HashMap<String, ArgValue>, name: &str) -> &'a ArgValue {
        kwargs.get(name).unwrap_or_else(|| panic!("missing {name}"))
    }

    #[test]
    fn parses_a_single_integer() {
        let params = vec![ParamDescriptor::new("n", ParamKind::Integer, false)];
        let kwargs = parse_command(&params, "42").unwrap();
        assert_eq!(get(&kwargs, "n"), &ArgValue::Integer(42));
    }

    #[test]
    fn parses_hex_octal_and_binary_integers() {
        let params = vec![ParamDescriptor::new("n", ParamKind::Integer, false)];
        assert_eq!(get(&parse_command(&params, "0x1F").unwrap(), "n"), &ArgValue::Integer(31));
        assert_eq!(get(&parse_command(&params, "0o17").unwrap(), "n"), &ArgValue::Integer(15));
        assert_eq!(get(&parse_command(&params, "0b101").unwrap(), "n"), &ArgValue::Integer(5));
        assert_eq!(get(&parse_command(&params, "-5").unwrap(), "n"), &ArgValue::Integer(-5));
    }

    #[test]
    fn last_string_parameter_absorbs_trailing_text() {
        let params = vec![
            ParamDescriptor::new("n", ParamKind::Integer, false),
            ParamDescriptor::new("rest", ParamKind::LastString, false),
        ];
        let kwargs = parse_command(&params, "5 hello world").unwrap();
        assert_eq!(get(&kwargs, "n"), &ArgValue::Integer(5));
        assert_eq!(get(&kwargs, "rest"), &ArgValue::Str("hello world".to_string()));
    }

    #[test]
    fn a_sole_last_string_parameter_keeps_internal_spacing() {
        let params = vec![ParamDescriptor::new("body", ParamKind::LastString, true)];
        let kwargs = parse_command(&params, "5 喝水").unwrap();
        assert_eq!(get(&kwargs, "body"), &ArgValue::Str("5 喝水".to_string()));
    }

    #[test]
    fn missing_required_parameter_is_bare_when_nothing_matched_yet() {
        let params = vec![ParamDescriptor::new("n", ParamKind::Integer, false)];
        let err = parse_command(&params, "not a number").unwrap_err();
        assert!(err.is_bare());
    }

    #[test]
    fn missing_required_parameter_after_a_match_carries_a_message() {
        let params = vec![
            ParamDescriptor::new("n", ParamKind::Integer, false),
            ParamDescriptor::new("m", ParamKind::Integer, false),
        ];
        let err = parse_command(&params, "5 abc").unwrap_err();
        assert!(!err.is_bare());
    }

    #[test]
    fn optional_union_with_none_alternative_defaults_to_absent() {
        let params = vec![ParamDescriptor::new(
            "n",
            ParamKind::Alt(vec![ParamKind::Integer, ParamKind::NoneOption]),
            false,
        )];
        let kwargs = parse_command(&params, "").unwrap();
        assert_eq!(get(&kwargs, "n"), &ArgValue::None);
    }

    #[test]
    fn leftover_unmatched_text_without_a_last_string_param_fails() {
        let params = vec![ParamDescriptor::new("n", ParamKind::Integer, false)];
        let err = parse_command(&params, "5 extra").unwrap_err();
        assert!(!err.is_bare());
    }

    #[test]
    fn never_type_always_fails() {
        let params = vec![ParamDescriptor::new("n", ParamKind::Never, false)];
        let err = parse_command(&params, "anything").unwrap_err();
        assert!(err.is_bare());
    }
}
