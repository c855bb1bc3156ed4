use serde_json::Value;

const FALSY_STRINGS: [&str; 6] = ["false", "f", "no", "n", "off", "0"];

/// Coerces a rendered condition to a boolean.
///
/// `false`, `null`, zero, the empty string and the strings `false`, `f`,
/// `no`, `n`, `off` and `0` (ignoring case and surrounding whitespace) are
/// falsy. Everything else, including empty arrays and objects, is truthy.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => {
            let s = s.trim();
            !s.is_empty() && !FALSY_STRINGS.iter().any(|f| s.eq_ignore_ascii_case(f))
        }
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_falsy_values() {
        for value in [
            json!(null),
            json!(false),
            json!(0),
            json!(0.0),
            json!(""),
            json!("  "),
            json!("false"),
            json!("FALSE"),
            json!("f"),
            json!("No"),
            json!("n"),
            json!("off"),
            json!("0"),
        ] {
            assert!(!is_truthy(&value), "expected {value} to be falsy");
        }
    }

    #[test]
    fn test_truthy_values() {
        for value in [
            json!(true),
            json!(1),
            json!(-0.5),
            json!("yes"),
            json!("nope"),
            json!([]),
            json!({}),
        ] {
            assert!(is_truthy(&value), "expected {value} to be truthy");
        }
    }
}
