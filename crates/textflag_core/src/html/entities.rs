//! Character-reference decoding that keeps a map back to source bytes.

use quick_xml::escape::resolve_html5_entity;

/// Longest reference we try to resolve (`&CounterClockwiseContourIntegral;`).
const MAX_REFERENCE_LEN: usize = 40;

/// Decode entity and numeric character references in a raw text run.
///
/// # Returns
/// The decoded text plus one source byte offset per decoded `char` and a
/// final entry for the end of the run. Chars produced by the same reference
/// all map to the reference's first byte.
pub(crate) fn decode_text(raw: &str, raw_start: usize) -> (String, Vec<usize>) {
    let mut text = String::with_capacity(raw.len());
    let mut boundaries = Vec::with_capacity(raw.len() + 1);
    let mut pos = 0;

    while let Some(ch) = raw[pos..].chars().next() {
        if ch == '&' {
            if let Some((decoded, consumed)) = decode_reference(&raw[pos..]) {
                for decoded_ch in decoded.chars() {
                    text.push(decoded_ch);
                    boundaries.push(raw_start + pos);
                }
                pos += consumed;
                continue;
            }
        }
        text.push(ch);
        boundaries.push(raw_start + pos);
        pos += ch.len_utf8();
    }

    boundaries.push(raw_start + raw.len());
    (text, boundaries)
}

/// Named references a browser resolves in text even without the trailing `;`.
const LEGACY_ENTITIES: [&str; 106] = [
    "AElig", "AMP", "Aacute", "Acirc", "Agrave", "Aring", "Atilde", "Auml", "COPY", "Ccedil",
    "ETH", "Eacute", "Ecirc", "Egrave", "Euml", "GT", "Iacute", "Icirc", "Igrave", "Iuml", "LT",
    "Ntilde", "Oacute", "Ocirc", "Ograve", "Oslash", "Otilde", "Ouml", "QUOT", "REG", "THORN",
    "Uacute", "Ucirc", "Ugrave", "Uuml", "Yacute", "aacute", "acirc", "acute", "aelig", "agrave",
    "amp", "aring", "atilde", "auml", "brvbar", "ccedil", "cedil", "cent", "copy", "curren",
    "deg", "divide", "eacute", "ecirc", "egrave", "eth", "euml", "frac12", "frac14", "frac34",
    "gt", "iacute", "icirc", "iexcl", "igrave", "iquest", "iuml", "laquo", "lt", "macr", "micro",
    "middot", "nbsp", "not", "ntilde", "oacute", "ocirc", "ograve", "ordf", "ordm", "oslash",
    "otilde", "ouml", "para", "plusmn", "pound", "quot", "raquo", "reg", "sect", "shy", "sup1",
    "sup2", "sup3", "szlig", "thorn", "times", "uacute", "ucirc", "ugrave", "uml", "uuml",
    "yacute", "yen", "yuml",
];

fn decode_reference(rest: &str) -> Option<(String, usize)> {
    let body = &rest[1..];
    match body.strip_prefix('#') {
        Some(number) => decode_numeric(number).map(|(ch, len)| (ch.to_string(), 2 + len)),
        None => decode_named(body).map(|(decoded, len)| (decoded.to_string(), 1 + len)),
    }
}

/// Decode the digits after `&#`, with or without the closing `;`.
///
/// Out-of-range, surrogate and NUL code points become U+FFFD.
fn decode_numeric(number: &str) -> Option<(char, usize)> {
    let (radix, prefix_len) = match number.as_bytes().first() {
        Some(b'x' | b'X') => (16, 1),
        _ => (10, 0),
    };
    let digits = &number[prefix_len..];
    let digit_len = digits
        .bytes()
        .take_while(|byte| (*byte as char).is_digit(radix))
        .count();
    if digit_len == 0 {
        return None;
    }
    let decoded = u32::from_str_radix(&digits[..digit_len], radix)
        .ok()
        .filter(|code| *code != 0)
        .and_then(char::from_u32)
        .unwrap_or(char::REPLACEMENT_CHARACTER);
    let terminated = digits[digit_len..].starts_with(';');
    Some((decoded, prefix_len + digit_len + usize::from(terminated)))
}

/// Decode a named reference, preferring the `;`-terminated form and falling
/// back to the longest legacy name that prefixes `body`.
fn decode_named(body: &str) -> Option<(&'static str, usize)> {
    let terminated = body
        .bytes()
        .take(MAX_REFERENCE_LEN)
        .position(|byte| byte == b';')
        .filter(|&semi| semi > 0)
        .and_then(|semi| resolve_html5_entity(&body[..semi]).map(|decoded| (decoded, semi + 1)));
    if terminated.is_some() {
        return terminated;
    }

    LEGACY_ENTITIES
        .iter()
        .filter(|name| body.starts_with(**name))
        .max_by_key(|name| name.len())
        .and_then(|name| resolve_html5_entity(name).map(|decoded| (decoded, name.len())))
}
