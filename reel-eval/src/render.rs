use crate::{
    error::{EvalError, EvalResult},
    value::{Repr, Value},
    EvalState,
};
use reel_syntax::Pos;

fn json_string(s: &str) -> String {
    serde_json::Value::String(String::from(s)).to_string()
}

impl EvalState {
    /**
    The canonical text of a value, used as a replay key argument.

    The rendering only depends on the value's content: sets are ordered by
    attribute name rather than by symbol, string context is left out, and paths
    are shown as they were in the recorded run.
    */
    pub fn parameter_value(&mut self, value: &Value) -> EvalResult<String> {
        self.force_value_deep(value)?;
        let mut out = String::new();
        self.render_into(value, &mut out)?;
        Ok(out)
    }

    fn render_into(&mut self, value: &Value, out: &mut String) -> EvalResult<()> {
        match value.get() {
            Repr::Int(n) => out.push_str(&n.to_string()),
            Repr::Bool(b) => out.push_str(if b { "true" } else { "false" }),
            Repr::Null => out.push_str("null"),
            Repr::String(s) => out.push_str(&json_string(&s.text)),
            Repr::Path(path) => {
                let path = self.unsubstitute_path(&path);
                out.push_str("path:");
                out.push_str(&json_string(&path.to_string_lossy()));
            }
            Repr::List(items) => {
                out.push('[');
                for (ix, item) in items.iter().enumerate() {
                    if ix > 0 {
                        out.push(',');
                    }
                    self.render_into(item, out)?;
                }
                out.push(']');
            }
            Repr::Attrs(attrs) => {
                if self.is_derivation(value)? {
                    if let Some(attr) = attrs.get(self.names.out_path) {
                        let out_path = attr.value.clone();
                        return self.render_into(&out_path, out);
                    }
                }
                let mut sorted: Vec<(String, Value)> = attrs
                    .iter()
                    .map(|attr| {
                        (
                            String::from(self.symbols.name(attr.name)),
                            attr.value.clone(),
                        )
                    })
                    .collect();
                sorted.sort_by(|a, b| a.0.cmp(&b.0));
                out.push('{');
                for (ix, (name, value)) in sorted.iter().enumerate() {
                    if ix > 0 {
                        out.push(',');
                    }
                    out.push_str(&json_string(name));
                    out.push(':');
                    self.render_into(value, out)?;
                }
                out.push('}');
            }
            _ => {
                return Err(EvalError::Unrenderable {
                    actual: value.value_type(),
                    pos: Pos::none(),
                })
            }
        }
        Ok(())
    }
}
