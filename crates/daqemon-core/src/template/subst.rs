// Placeholder substitution over JSON templates
//
// `Null` marks an inapplicable part of a template. Substitution drops it
// wherever it appears, so the result never contains `Null`.

use serde_json::{Map, Value};

/// Deep-copy `template`, pruning `Null` members and array elements and
/// filling `{0}`, `{1}`... in strings from `args`.
///
/// Returns `None` when the template itself is `Null`.
pub fn substitute(template: &Value, args: &[&str]) -> Option<Value> {
    match template {
        Value::Null => None,
        Value::Object(map) => Some(Value::Object(
            map.iter()
                .filter_map(|(k, v)| substitute(v, args).map(|v| (k.clone(), v)))
                .collect::<Map<_, _>>(),
        )),
        Value::Array(items) => Some(Value::Array(
            items.iter().filter_map(|v| substitute(v, args)).collect(),
        )),
        Value::String(s) if has_placeholder(s) => Some(Value::String(format_args_once(s, args))),
        other => Some(other.clone()),
    }
}

/// True for strings containing `{` digit `}`.
fn has_placeholder(s: &str) -> bool {
    s.as_bytes()
        .windows(3)
        .any(|w| w[0] == b'{' && w[1].is_ascii_digit() && w[2] == b'}')
}

/// Replace the first occurrence of each `{i}` with `args[i]`. Placeholders
/// without an argument are left as they are.
pub fn format_args_once(s: &str, args: &[&str]) -> String {
    let mut out = s.to_owned();
    for (i, arg) in args.iter().enumerate() {
        out = out.replacen(&format!("{{{i}}}"), arg, 1);
    }
    out
}
