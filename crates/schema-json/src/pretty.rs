//! Pretty encoding and object helpers

use crate::{Error, JObject, Result};
use serde::Serialize;
use serde_json::Value;
use serde_json::ser::{Formatter, PrettyFormatter, Serializer};
use std::io;

/// Encode `value` with four-space indentation and sorted keys.
///
/// Key order comes from `serde_json::Map`, which is sorted as long as the
/// `preserve_order` feature stays disabled.
pub fn to_pretty_string(value: &Value) -> Result<String> {
    let mut buf = Vec::new();
    let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    value
        .serialize(&mut ser)
        .map_err(|e| Error::Encode(e.to_string()))?;
    String::from_utf8(buf).map_err(|e| Error::Encode(e.to_string()))
}

/// Single-line formatter separating items with `", "` and keys with `": "`
struct InlineFormatter;

impl Formatter for InlineFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

/// Encode `value` on one line with spaced separators and sorted keys, the
/// form used when quoting values in diagnostics.
pub fn to_inline_string(value: &Value) -> Result<String> {
    let mut buf = Vec::new();
    let mut ser = Serializer::with_formatter(&mut buf, InlineFormatter);
    value
        .serialize(&mut ser)
        .map_err(|e| Error::Encode(e.to_string()))?;
    String::from_utf8(buf).map_err(|e| Error::Encode(e.to_string()))
}

/// Insert `value` under `key` unless it is absent or null.
pub fn put_non_null(obj: &mut JObject, key: impl Into<String>, value: Option<Value>) {
    match value {
        None | Some(Value::Null) => {}
        Some(v) => {
            obj.insert(key.into(), v);
        }
    }
}
