//! Utilities for escaping and unescaping JSON strings.

use core::fmt::Write;

use crate::buffer::OutputBuffer;
use crate::error::{Error, Result};

/// A fragment of an escaped string
#[derive(Debug, PartialEq)]
pub(crate) enum EscapedStringFragment<'a> {
    /// A series of characters which weren't escaped in the input.
    NotEscaped(&'a str),
    /// A character which was escaped in the input.
    Escaped(char),
}

/// Writes `s` as a quoted JSON string.
///
/// Only `"`, `\` and code points below U+0020 are escaped; everything else,
/// non-ASCII text included, is copied as is.
pub(crate) fn escape_into(buf: &mut OutputBuffer, s: &str) {
    buf.push('"');

    let mut start = 0;
    for (i, byte) in s.bytes().enumerate() {
        let escape = match byte {
            b'"' => "\\\"",
            b'\\' => "\\\\",
            b'\x08' => "\\b",
            b'\x0C' => "\\f",
            b'\n' => "\\n",
            b'\r' => "\\r",
            b'\t' => "\\t",
            0x00..=0x1F => "",
            _ => continue,
        };

        if start < i {
            buf.push_str(&s[start..i]);
        }
        if escape.is_empty() {
            // "\u001f"
            let mut hex: heapless::String<6> = heapless::String::new();
            // six bytes always fit
            let _ = write!(hex, "\\u{:04x}", byte);
            buf.push_str(&hex);
        } else {
            buf.push_str(escape);
        }
        start = i + 1;
    }

    if start < s.len() {
        buf.push_str(&s[start..]);
    }
    buf.push('"');
}

fn split_hex4(s: &str) -> Result<(u32, &str)> {
    let digits = s.get(..4).ok_or(Error::InvalidEscape)?;
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(Error::InvalidEscape);
    }
    let code = u32::from_str_radix(digits, 16).map_err(|_| Error::InvalidEscape)?;
    Ok((code, &s[4..]))
}

fn unescape_unicode(rest: &str) -> Result<(char, &str)> {
    let (code, rest) = split_hex4(rest)?;
    match code {
        0xD800..=0xDBFF => {
            let rest = rest
                .strip_prefix("\\u")
                .ok_or(Error::InvalidUnicodeCodePoint)?;
            let (low, rest) = split_hex4(rest)?;
            if !(0xDC00..=0xDFFF).contains(&low) {
                return Err(Error::InvalidUnicodeCodePoint);
            }
            let combined = 0x10000 + ((code - 0xD800) << 10) + (low - 0xDC00);
            let c = char::from_u32(combined).ok_or(Error::InvalidUnicodeCodePoint)?;
            Ok((c, rest))
        }
        0xDC00..=0xDFFF => Err(Error::InvalidUnicodeCodePoint),
        _ => {
            let c = char::from_u32(code).ok_or(Error::InvalidUnicodeCodePoint)?;
            Ok((c, rest))
        }
    }
}

fn unescape_next_fragment(escaped_string: &str) -> Result<(EscapedStringFragment<'_>, &str)> {
    Ok(if let Some(rest) = escaped_string.strip_prefix('\\') {
        let mut escaped_string_chars = rest.chars();

        let unescaped_char = match escaped_string_chars.next() {
            Some('"') => '"',
            Some('\\') => '\\',
            Some('/') => '/',
            Some('b') => '\x08',
            Some('f') => '\x0C',
            Some('n') => '\n',
            Some('r') => '\r',
            Some('t') => '\t',
            Some('u') => {
                let (c, remaining) = unescape_unicode(escaped_string_chars.as_str())?;
                escaped_string_chars = remaining.chars();
                c
            }
            _ => return Err(Error::InvalidEscape),
        };

        (
            EscapedStringFragment::Escaped(unescaped_char),
            escaped_string_chars.as_str(),
        )
    } else {
        let (fragment, rest) =
            escaped_string.split_at(escaped_string.find('\\').unwrap_or(escaped_string.len()));

        (EscapedStringFragment::NotEscaped(fragment), rest)
    })
}

/// An iterator over the `EscapedStringFragment`s of the body of a JSON string.
pub(crate) struct EscapedStringFragmentIter<'a>(&'a str);

impl<'a> EscapedStringFragmentIter<'a> {
    pub(crate) fn new(escaped: &'a str) -> Self {
        EscapedStringFragmentIter(escaped)
    }
}

impl<'a> Iterator for EscapedStringFragmentIter<'a> {
    type Item = Result<EscapedStringFragment<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.0.is_empty() {
            return None;
        }

        Some(unescape_next_fragment(self.0).map(|(fragment, rest)| {
            self.0 = rest;

            fragment
        }))
    }
}

/// Decodes the body of a JSON string (without the quotes) into `out`.
pub(crate) fn unescape_into(escaped: &str, out: &mut String) -> Result<()> {
    for fragment in EscapedStringFragmentIter::new(escaped) {
        match fragment? {
            EscapedStringFragment::NotEscaped(s) => out.push_str(s),
            EscapedStringFragment::Escaped(c) => out.push(c),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn escaped(s: &str) -> String {
        let mut buf = OutputBuffer::with_capacity(8);
        escape_into(&mut buf, s);
        buf.into_string()
    }

    fn unescaped(s: &str) -> Result<String> {
        let mut out = String::new();
        unescape_into(s, &mut out)?;
        Ok(out)
    }

    #[test]
    fn escape_table() {
        assert_eq!(
            escaped("\"\\\t\n\r\x08\x0C\u{1}"),
            r#""\"\\\t\n\r\b\f\u0001""#
        );
        assert_eq!(escaped("\u{1f}"), r#""\u001f""#);
        assert_eq!(escaped("plain"), r#""plain""#);
        assert_eq!(escaped(""), r#""""#);
    }

    #[test]
    fn non_ascii_passes_through() {
        assert_eq!(escaped("héllo ☀ \u{7f}"), "\"héllo ☀ \u{7f}\"");
        assert_eq!(escaped("a/b"), r#""a/b""#);
    }

    #[test]
    fn fragments() {
        let mut iter = EscapedStringFragmentIter::new(r"ab\ncd");
        assert_eq!(
            iter.next().unwrap().unwrap(),
            EscapedStringFragment::NotEscaped("ab")
        );
        assert_eq!(
            iter.next().unwrap().unwrap(),
            EscapedStringFragment::Escaped('\n')
        );
        assert_eq!(
            iter.next().unwrap().unwrap(),
            EscapedStringFragment::NotEscaped("cd")
        );
        assert!(iter.next().is_none());
    }

    #[test]
    fn unescape() {
        assert_eq!(unescaped(r#"\"\\\/\b\f\n\r\t"#).unwrap(), "\"\\/\x08\x0C\n\r\t");
        assert_eq!(unescaped(r"\u0021 \u2600").unwrap(), "! ☀");
        assert_eq!(unescaped(r"\uD83D\uDE00").unwrap(), "😀");
        assert_eq!(unescaped(r"caf\u00E9").unwrap(), "café");
    }

    #[test]
    fn unescape_errors() {
        assert_eq!(unescaped(r"\q"), Err(Error::InvalidEscape));
        assert_eq!(unescaped(r"\u12"), Err(Error::InvalidEscape));
        assert_eq!(unescaped(r"\u+123"), Err(Error::InvalidEscape));
        assert_eq!(unescaped(r"\uD83D"), Err(Error::InvalidUnicodeCodePoint));
        assert_eq!(unescaped(r"\uDE00"), Err(Error::InvalidUnicodeCodePoint));
        assert_eq!(unescaped("\\"), Err(Error::InvalidEscape));
    }
}
