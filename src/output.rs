//! Rendering of values and the line-oriented output sink.

use std::io::Write;

use crate::error::PipeError;
use crate::value::Value;

/// Text form of a value: strings verbatim, numbers as JavaScript prints
/// them, arrays and objects as compact JSON.
pub fn render_text(value: &Value) -> String {
    value.render()
}

/// JSON document for a value. `undefined` and functions become `null`.
pub fn render_json(value: &Value, pretty: bool) -> String {
    let json = value.to_json();
    if pretty {
        format!("{json:#}")
    } else {
        json.to_string()
    }
}

/// Writes one rendered value per line, skipping `undefined`.
pub struct TextSink<W: Write> {
    writer: W,
    written: usize,
}

impl<W: Write> TextSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    pub fn write_value(&mut self, value: &Value) -> Result<(), PipeError> {
        if matches!(value, Value::Undefined) {
            return Ok(());
        }
        writeln!(self.writer, "{}", render_text(value))?;
        self.written += 1;
        Ok(())
    }

    /// Number of lines written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn flush(&mut self) -> Result<(), PipeError> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_render_text() {
        assert_eq!(render_text(&Value::from("a b")), "a b");
        assert_eq!(render_text(&Value::from(4.0)), "4");
        assert_eq!(render_text(&Value::from(2.5)), "2.5");
        assert_eq!(render_text(&Value::Number(f64::NAN)), "NaN");
        assert_eq!(render_text(&Value::Bool(true)), "true");
        assert_eq!(
            render_text(&Value::Array(vec![Value::from("x"), Value::from(1.0)])),
            r#"["x",1]"#
        );
    }

    #[test]
    fn test_render_json() {
        let mut fields = BTreeMap::new();
        fields.insert("n".to_string(), Value::from(1.0));
        let object = Value::Object(fields);
        assert_eq!(render_json(&object, false), r#"{"n":1}"#);
        assert_eq!(render_json(&object, true), "{\n  \"n\": 1\n}");
        assert_eq!(render_json(&Value::from("a"), false), r#""a""#);
        assert_eq!(render_json(&Value::Undefined, false), "null");
    }

    #[test]
    fn test_sink_skips_undefined() {
        let mut sink = TextSink::new(Vec::new());
        sink.write_value(&Value::from("a")).unwrap();
        sink.write_value(&Value::Undefined).unwrap();
        sink.write_value(&Value::Null).unwrap();
        assert_eq!(sink.written(), 2);
        assert_eq!(String::from_utf8(sink.into_inner()).unwrap(), "a\nnull\n");
    }
}
