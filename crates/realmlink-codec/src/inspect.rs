use crate::value::Value;

/// Longest preview, in characters, before truncation.
pub const INSPECTION_CUTOFF: usize = 40;

/// Short JSON-ish preview of a value for error messages and logs.
pub fn inspect(value: &Value) -> String {
    let rendered = match value {
        Value::Undefined => "undefined".to_string(),
        other => serde_json::to_string(&other.to_json()).unwrap_or_else(|_| other.kind().to_string()),
    };
    truncate(rendered)
}

fn truncate(rendered: String) -> String {
    match rendered.char_indices().nth(INSPECTION_CUTOFF) {
        Some((end, _)) => format!("{}...", &rendered[..end]),
        None => rendered,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Object, Symbol};

    #[test]
    fn short_values_are_complete() {
        assert_eq!(inspect(&Value::from("hi")), "\"hi\"");
        assert_eq!(inspect(&Value::Undefined), "undefined");
        assert_eq!(inspect(&Value::Symbol(Symbol::new("wat"))), "\"Symbol(wat)\"");
        assert_eq!(
            inspect(&Value::object(Object::new().with("a", 1))),
            "{\"a\":1}"
        );
    }

    #[test]
    fn long_values_are_cut() {
        let long = Value::string("x".repeat(100));
        let preview = inspect(&long);
        assert_eq!(preview.chars().count(), INSPECTION_CUTOFF + 3);
        assert!(preview.ends_with("..."));
    }

    #[test]
    fn cut_respects_char_boundaries() {
        let preview = inspect(&Value::string("é".repeat(60)));
        assert!(preview.starts_with("\"é"));
        assert_eq!(preview.chars().count(), INSPECTION_CUTOFF + 3);
    }

    #[test]
    fn exactly_at_cutoff_is_not_cut() {
        let text = "y".repeat(INSPECTION_CUTOFF - 2);
        assert_eq!(inspect(&Value::string(&text)), format!("\"{text}\""));
    }
}
