//! Human-facing text transforms: the command-name canonicaliser, its
//! tokeniser, and a duration formatter used by diagnostic plugins.

use caseless::default_case_fold_str;
use unicode_general_category::{get_general_category, GeneralCategory};
use unicode_normalization::UnicodeNormalization;

/// The characters that mark a message as a command attempt.
pub const COMMAND_PREFIXES: [char; 4] = ['.', '。', '!', '！'];

/// `true` when `text`'s first character marks it as a command attempt.
pub fn is_command_attempt(text: &str) -> bool {
    text.chars().next().is_some_and(|c| COMMAND_PREFIXES.contains(&c))
}

/// Aggressively canonicalises a command token to a stable form: trims,
/// decomposes, case-folds, and collapses separator runs, in the exact order
/// the runtime's command-name matching depends on.
///
/// `"! Ｆｏｏ  BÄR114514 "` → `"foo_bar114514"` (after the leading `!` and
/// trailing characters beyond the dispatch cutoff are stripped by the
/// caller; `normalize` itself only trims whitespace).
pub fn normalize(text: &str) -> String {
    let step1: String = text.trim().nfd().collect();
    let step2 = default_case_fold_str(&step1);
    let step3: String = step2.nfkd().collect();
    let step4 = default_case_fold_str(&step3);
    let step5: String = step4.nfkd().collect();

    let without_combining: String = step5
        .chars()
        .filter(|c| get_general_category(*c) != GeneralCategory::NonspacingMark
            && get_general_category(*c) != GeneralCategory::SpacingMark
            && get_general_category(*c) != GeneralCategory::EnclosingMark)
        .collect();

    collapse_separators(&without_combining)
}

fn collapse_separators(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_run = false;
    for c in s.chars() {
        if c.is_whitespace() || c == '_' {
            if !in_run {
                out.push('_');
                in_run = true;
            }
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out
}

/// Upper bound on how much of a command attempt is canonicalised before
/// tokenisation, keeping pathological inputs cheap to process.
const COMMAND_NAME_CUTOFF: usize = 110;

/// Splits a command attempt into tokens grouped by Unicode general
/// category, e.g. digits separate from letters separate from the
/// underscore-collapsed separator. Returns an empty list when `text` is not
/// a command attempt.
pub fn tokenize_command_name(text: &str) -> Vec<String> {
    if !is_command_attempt(text) {
        return Vec::new();
    }
    let body: String = text.chars().skip(1).take(COMMAND_NAME_CUTOFF).collect();
    let normalized = normalize(&body);

    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut current_category: Option<GeneralCategory> = None;
    for c in normalized.chars() {
        let category = get_general_category(c);
        match current_category {
            Some(cat) if cat == category => current.push(c),
            _ => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                current.push(c);
                current_category = Some(category);
            }
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Finds where a matched command name ends in the *original*
/// (un-normalised) message text, returning the trimmed remainder.
///
/// Binary-searches prefix lengths of `text[1..]` for the shortest prefix
/// whose normalised form equals `name`; monotonicity of the normalised
/// prefix order over original prefix length (a property of [`normalize`])
/// makes the search valid.
pub fn command_body_after_name(text: &str, name: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let hi_len = COMMAND_NAME_CUTOFF.min(chars.len()).max(1);

    let mut lo = 1usize;
    let mut hi = hi_len;
    while lo < hi {
        let mid = (lo + hi) / 2;
        let candidate: String = chars[1..mid].iter().collect();
        if normalize(&candidate).as_str() < name {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }

    chars[lo..].iter().collect::<String>().trim().to_string()
}

/// Formats a duration as whole days/hours/minutes/seconds, dropping leading
/// zero units (seconds is always shown).
pub fn format_timespan(seconds: u64) -> String {
    let mut parts = Vec::new();
    let mut remaining = seconds;

    if remaining >= 86400 {
        parts.push(format!("{}天", remaining / 86400));
    }
    remaining %= 86400;
    if remaining >= 3600 {
        parts.push(format!("{}小时", remaining / 3600));
    }
    remaining %= 3600;
    if remaining >= 60 {
        parts.push(format!("{}分", remaining / 60));
    }
    remaining %= 60;
    parts.push(format!("{}秒", remaining));

    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_form_matches_documented_example() {
        assert_eq!(
            tokenize_command_name("! Ｆｏｏ  BÄR114514 "),
            vec!["foo", "_", "bar", "114514"]
        );
    }

    #[test]
    fn non_command_attempt_tokenizes_to_empty() {
        assert_eq!(tokenize_command_name("hello"), Vec::<String>::new());
    }

    #[test]
    fn bare_prefix_tokenizes_to_empty() {
        assert_eq!(tokenize_command_name("."), Vec::<String>::new());
    }

    #[test]
    fn command_body_after_name_finds_the_split_point() {
        assert_eq!(command_body_after_name(".debug p", "debug"), "p");
        assert_eq!(command_body_after_name(".猜数字", "猜数字"), "");
    }

    #[test]
    fn format_timespan_drops_leading_zero_units() {
        assert_eq!(format_timespan(5), "5秒");
        assert_eq!(format_timespan(65), "1分 5秒");
        assert_eq!(format_timespan(90061), "1天 1小时 1分 1秒");
    }
}
