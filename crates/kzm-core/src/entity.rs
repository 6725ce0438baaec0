//! Bidirectional transform between the gateway's bracketed control-sequence
//! message format and an internal control-character-delimited form.
//!
//! The bracketed form, `[CQ:name,k=v,...]`, collides with ordinary
//! punctuation and needs careful escaping wherever it travels through
//! regular-expression-based plugin code. The internal form swaps the
//! offending characters for three code points that essentially never occur
//! in real chat text, so plugins can scan messages with plain string and
//! regex operations without fear of corrupting an entity.

use std::sync::LazyLock;

/// Marks the start of an entity in the internal form.
pub const ESC_OPEN: char = '\u{9d}';
/// Marks the end of an entity in the internal form.
pub const ESC_CLOSE: char = '\u{9c}';
/// Separates an entity's name and key=value pairs in the internal form.
pub const NUL: char = '\u{0}';

/// For these entity names, `decode` moves the listed keys to the front, in
/// this order, so plugins can match an entity with a regex anchored on a
/// known key prefix instead of an unordered attribute bag.
fn known_key_order(name: &str) -> &'static [&'static str] {
    match name {
        "face" => &["id"],
        "image" => &["url", "type", "subType"],
        "record" => &["url", "magic"],
        "at" => &["qq"],
        "share" => &["url", "title", "content", "image"],
        "reply" => &["id", "seq"],
        "poke" => &["qq"],
        "forward" => &["id"],
        "xml" => &["resid", "data"],
        "json" => &["resid", "data"],
        _ => &[],
    }
}

static CQ_PATTERN: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::RegexBuilder::new(r"\[CQ:(.*?)\]").dot_matches_new_line(true).build().unwrap());

/// Converts gateway-form text (as delivered in `raw_message`) into the
/// internal form used everywhere inside the runtime.
pub fn decode(raw_message: &str) -> String {
    let with_entities = CQ_PATTERN.replace_all(raw_message, |caps: &regex::Captures| {
        let body = &caps[1];
        let (name, args_str) = match body.split_once(',') {
            Some((n, rest)) => (n, rest),
            None => (body, ""),
        };

        let mut pairs: Vec<(String, String)> = if args_str.is_empty() {
            Vec::new()
        } else {
            args_str
                .split(',')
                .map(|kv| match kv.split_once('=') {
                    Some((k, v)) => (k.to_string(), v.to_string()),
                    None => (kv.to_string(), String::new()),
                })
                .collect()
        };

        let mut ret = vec![name.to_string()];
        for key in known_key_order(name) {
            let idx = pairs.iter().position(|(k, _)| k == key);
            let value = match idx {
                Some(i) => pairs.remove(i).1,
                None => String::new(),
            };
            ret.push(format!("{key}={value}"));
        }
        for (k, v) in pairs {
            ret.push(format!("{k}={v}"));
        }

        format!("{ESC_OPEN}{}{ESC_CLOSE}", ret.join(&NUL.to_string()))
    });

    with_entities
        .replace("&#91;", "[")
        .replace("&#93;", "]")
        .replace("&#44;", ",")
        .replace("&amp;", "&")
}

/// Converts internal-form text back into gateway-form text, the inverse of
/// [`decode`]. A comma inside an entity's body is a value, not a field
/// separator, so it's escaped to `&#44;` the way [`decode`] expects to find
/// it; the entity's own `&`/`[`/`]` characters are escaped the same as any
/// other text's.
pub fn encode(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_entity = false;
    for c in text.chars() {
        match c {
            ESC_OPEN => {
                in_entity = true;
                out.push_str("[CQ:");
            }
            ESC_CLOSE => {
                in_entity = false;
                out.push(']');
            }
            NUL => out.push(','),
            ',' if in_entity => out.push_str("&#44;"),
            '&' => out.push_str("&amp;"),
            '[' => out.push_str("&#91;"),
            ']' => out.push_str("&#93;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_reorders_known_keys() {
        let decoded = decode("[CQ:image,subType=1,url=http://a,extra=z,type=0]");
        assert_eq!(
            decoded,
            format!("{ESC_OPEN}image{NUL}url=http://a{NUL}type=0{NUL}subType=1{NUL}extra=z{ESC_CLOSE}")
        );
    }

    #[test]
    fn decode_unescapes_ampersand_forms() {
        assert_eq!(decode("a&#91;b&#93;c&#44;d&amp;e"), "a[b]c,d&e");
    }

    #[test]
    fn decode_unknown_entity_keeps_insertion_order() {
        let decoded = decode("[CQ:weird,b=2,a=1]");
        assert_eq!(decoded, format!("{ESC_OPEN}weird{NUL}b=2{NUL}a=1{ESC_CLOSE}"));
    }

    #[test]
    fn encode_is_inverse_of_decode_for_plain_text() {
        let raw = "hello, world & [brackets]";
        assert_eq!(encode(&decode(raw)), raw);
    }

    #[test]
    fn encode_reconstructs_cq_form() {
        let raw = "[CQ:face,id=178]";
        assert_eq!(encode(&decode(raw)), raw);
    }

    #[test]
    fn encode_escapes_literal_commas_inside_entity_values() {
        let raw = "[CQ:share,url=http://a,title=x,content=a\\,b,image=i]";
        let decoded = decode(raw);
        let back = encode(&decoded);
        assert_eq!(decode(&back), decoded);
    }

    #[test]
    fn a_comma_escaped_in_the_raw_form_round_trips_without_growing_an_amp() {
        let raw = "[CQ:share,url=http://a,title=x,content=a&#44;b,image=i]";
        let decoded = decode(raw);
        let back = encode(&decoded);
        assert_eq!(back, raw);
        assert_eq!(decode(&back), decoded);
    }

    proptest::proptest! {
        #[test]
        fn decode_is_idempotent_from_decoded_side(s in "\\PC{0,80}") {
            let once = decode(&s);
            let twice = decode(&encode(&once));
            proptest::prop_assert_eq!(once, twice);
        }
    }
}
