//! Line-oriented `key=value` text format
//!
//! The format used to persist [`Configuration`](crate::Configuration) entries:
//! - `#` or `!` starts a comment line
//! - a key ends at the first unescaped `=`, `:` or whitespace
//! - a trailing odd run of backslashes continues the line
//! - `\t`, `\n`, `\r`, `\f` and `\uXXXX` escapes are decoded
//!
//! Readers and writers are borrowed: nothing here closes a stream.

use std::io::{Read, Write};

use crate::error::{ConfigError, Result};

const FORMAT_ID: &str = "properties";

fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\x0c')
}

/// Read every entry from `reader`, in file order
///
/// Later duplicates of a key appear after earlier ones; callers inserting into
/// a map get last-wins behavior.
pub fn read_entries<R: Read + ?Sized>(reader: &mut R) -> Result<Vec<(String, String)>> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;

    logical_lines(&text)
        .iter()
        .map(|line| split_key_value(line))
        .collect()
}

/// Write an optional comment header followed by `entries`, then flush
pub fn write_entries<W, K, V, I>(writer: &mut W, comment: Option<&str>, entries: I) -> Result<()>
where
    W: Write + ?Sized,
    K: AsRef<str>,
    V: AsRef<str>,
    I: IntoIterator<Item = (K, V)>,
{
    if let Some(comment) = comment {
        write_comment(writer, comment)?;
    }

    for (key, value) in entries {
        let line = format!(
            "{}={}\n",
            escape(key.as_ref(), true),
            escape(value.as_ref(), false)
        );
        writer.write_all(line.as_bytes())?;
    }

    writer.flush()?;
    Ok(())
}

fn write_comment<W: Write + ?Sized>(writer: &mut W, comment: &str) -> Result<()> {
    if comment.is_empty() {
        writer.write_all(b"#\n")?;
        return Ok(());
    }

    // \r alone ends a line for readers, so it must end a comment line too
    let normalized = comment.replace("\r\n", "\n").replace('\r', "\n");
    for line in normalized.split('\n') {
        if line.starts_with('#') || line.starts_with('!') {
            writer.write_all(format!("{}\n", line).as_bytes())?;
        } else {
            writer.write_all(format!("#{}\n", line).as_bytes())?;
        }
    }
    Ok(())
}

fn ends_with_odd_backslashes(s: &str) -> bool {
    s.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

/// Join physical lines into logical lines, dropping blanks and comments
fn logical_lines(text: &str) -> Vec<String> {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");

    let mut lines = Vec::new();
    let mut current = String::new();
    let mut continuing = false;

    for raw in normalized.split('\n') {
        let segment = raw.trim_start_matches(is_whitespace);

        if !continuing {
            if segment.is_empty() || segment.starts_with('#') || segment.starts_with('!') {
                continue;
            }
        }
        current.push_str(segment);

        if ends_with_odd_backslashes(&current) {
            current.pop();
            continuing = true;
        } else {
            lines.push(std::mem::take(&mut current));
            continuing = false;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn split_key_value(line: &str) -> Result<(String, String)> {
    let chars: Vec<char> = line.chars().collect();
    let len = chars.len();

    let mut key_end = len;
    let mut escaped = false;
    for (i, c) in chars.iter().enumerate() {
        if escaped {
            escaped = false;
        } else if *c == '\\' {
            escaped = true;
        } else if *c == '=' || *c == ':' || is_whitespace(*c) {
            key_end = i;
            break;
        }
    }

    let mut value_start = key_end;
    let mut has_separator = false;
    if value_start < len && (chars[value_start] == '=' || chars[value_start] == ':') {
        value_start += 1;
        has_separator = true;
    }
    while value_start < len && is_whitespace(chars[value_start]) {
        value_start += 1;
    }
    if !has_separator && value_start < len && (chars[value_start] == '=' || chars[value_start] == ':') {
        value_start += 1;
        while value_start < len && is_whitespace(chars[value_start]) {
            value_start += 1;
        }
    }

    let key = unescape(&chars[..key_end])?;
    let value = unescape(&chars[value_start..])?;
    Ok((key, value))
}

fn unescape(chars: &[char]) -> Result<String> {
    let mut units: Vec<u16> = Vec::with_capacity(chars.len());
    let mut buf = [0u16; 2];
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        i += 1;

        if c != '\\' {
            units.extend_from_slice(c.encode_utf16(&mut buf));
            continue;
        }

        let Some(&next) = chars.get(i) else {
            break;
        };
        i += 1;

        let decoded = match next {
            't' => '\t',
            'n' => '\n',
            'r' => '\r',
            'f' => '\x0c',
            'u' => {
                let hex: String = chars.iter().skip(i).take(4).collect();
                if hex.chars().count() != 4 {
                    return Err(ConfigError::format(FORMAT_ID, hex, "malformed \\uxxxx escape"));
                }
                let unit = u16::from_str_radix(&hex, 16)
                    .map_err(|e| ConfigError::format(FORMAT_ID, hex.clone(), e))?;
                units.push(unit);
                i += 4;
                continue;
            }
            other => other,
        };
        units.extend_from_slice(decoded.encode_utf16(&mut buf));
    }

    Ok(String::from_utf16_lossy(&units))
}

fn escape(s: &str, is_key: bool) -> String {
    let mut out = String::with_capacity(s.len());

    for (i, c) in s.chars().enumerate() {
        match c {
            ' ' if is_key || i == 0 => out.push_str("\\ "),
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\x0c' => out.push_str("\\f"),
            '=' | ':' | '#' | '!' => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || c == '\u{7f}' => {
                out.push_str(&format!("\\u{:04X}", c as u32));
            }
            c => out.push(c),
        }
    }
    out
}
