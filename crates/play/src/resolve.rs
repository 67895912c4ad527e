//! Argument resolution: args, then basket, then defaults.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::basket::{ArgValue, Args, Basket};
use crate::outcome::render_value;

/// Fields checked, in order, when a raw object wraps the real payload.
const WRAPPER_FIELDS: [&str; 3] = ["data", "value", "result"];

/// A value after normalization. Command logic only ever sees this type.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved(Value);

impl Resolved {
    /// Normalizes a value coming from any producer.
    pub fn from_arg(arg: &ArgValue) -> Self {
        match arg {
            ArgValue::Outcome(outcome) => Resolved(outcome.value().cloned().unwrap_or(Value::Null)),
            ArgValue::Raw(value) => Resolved::from_value(value),
        }
    }

    pub fn from_value(value: &Value) -> Self {
        if let Value::Object(map) = value {
            for field in WRAPPER_FIELDS {
                if let Some(inner) = map.get(field) {
                    return Resolved(inner.clone());
                }
            }
        }
        Resolved(value.clone())
    }

    pub fn value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// Display text: strings as-is, other JSON rendered.
    pub fn as_text(&self) -> String {
        render_value(&self.0)
    }

    /// Integer view; numeric strings are accepted.
    pub fn as_i64(&self) -> Option<i64> {
        match &self.0 {
            Value::Number(number) => number.as_i64(),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    /// True for null and for strings that are empty after trimming.
    pub fn is_blank(&self) -> bool {
        match &self.0 {
            Value::Null => true,
            Value::String(text) => text.trim().is_empty(),
            _ => false,
        }
    }
}

/// Resolves each name in `names`: a value in `args` wins, then one in
/// `basket`, then the default at the same position in `defaults`. Blank
/// values (null, whitespace-only text) fall through to the next tier.
/// Names with no value in any tier are absent from the returned map.
pub fn resolve(
    names: &[&str],
    args: &Args,
    basket: &Basket,
    defaults: &[Option<Value>],
) -> BTreeMap<String, Resolved> {
    let mut resolved = BTreeMap::new();
    for (index, name) in names.iter().enumerate() {
        let default = defaults.get(index).and_then(Option::as_ref);
        if let Some(value) = lookup(name, args, basket, default) {
            resolved.insert((*name).to_string(), value);
        }
    }
    resolved
}

/// Precedence shared by every resolver: non-blank arg, then non-blank
/// basket value, then `default`.
pub fn lookup(
    name: &str,
    args: &Args,
    basket: &Basket,
    default: Option<&Value>,
) -> Option<Resolved> {
    resolve_one(name, args, basket).or_else(|| default.map(Resolved::from_value))
}

/// Resolves a single name from args or basket, skipping blank values.
pub fn resolve_one(name: &str, args: &Args, basket: &Basket) -> Option<Resolved> {
    let present = |value: Option<&ArgValue>| {
        value
            .map(Resolved::from_arg)
            .filter(|value| !value.is_blank())
    };
    present(args.get(name)).or_else(|| present(basket.get(name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::Outcome;
    use serde_json::json;

    #[test]
    fn args_take_precedence_over_basket() {
        let args = Args::new().with("subject", "cats");
        let mut basket = Basket::new();
        basket.insert("subject", "dogs");
        basket.insert("type", "dad");

        let resolved = resolve(&["subject", "type"], &args, &basket, &[]);
        assert_eq!(resolved["subject"].as_text(), "cats");
        assert_eq!(resolved["type"].as_text(), "dad");
    }

    #[test]
    fn defaults_are_positional() {
        let resolved = resolve(
            &["a", "b", "c"],
            &Args::new(),
            &Basket::new(),
            &[Some(json!(1)), None],
        );
        assert_eq!(resolved["a"].value(), &json!(1));
        assert!(!resolved.contains_key("b"));
        assert!(!resolved.contains_key("c"));
    }

    #[test]
    fn unwraps_previous_outcomes() {
        let args = Args::new()
            .with("ok", Outcome::answer("payload"))
            .with("bad", Outcome::failure("awi:nope"));
        let resolved = resolve(&["ok", "bad"], &args, &Basket::new(), &[]);
        assert_eq!(resolved["ok"].as_text(), "payload");
        assert!(!resolved.contains_key("bad"));
    }

    #[test]
    fn blank_arg_falls_through_to_basket_then_default() {
        let args = Args::new().with("text", "").with("other", "  ");
        let mut basket = Basket::new();
        basket.insert("text", "from basket");

        let resolved = resolve(&["text", "other"], &args, &basket, &[None, Some(json!("fallback"))]);
        assert_eq!(resolved["text"].as_text(), "from basket");
        assert_eq!(resolved["other"].as_text(), "fallback");
        assert_eq!(
            lookup("text", &args, &basket, None).map(|value| value.as_text()),
            Some("from basket".to_string())
        );
    }

    #[test]
    fn unwraps_wrapper_fields_in_order() {
        assert_eq!(Resolved::from_value(&json!({"data": 1, "value": 2})).value(), &json!(1));
        assert_eq!(Resolved::from_value(&json!({"value": 2, "result": 3})).value(), &json!(2));
        assert_eq!(Resolved::from_value(&json!({"result": 3})).value(), &json!(3));
        assert_eq!(
            Resolved::from_value(&json!({"other": 4})).value(),
            &json!({"other": 4})
        );
        assert_eq!(Resolved::from_value(&json!("raw")).value(), &json!("raw"));
    }

    #[test]
    fn numeric_views() {
        assert_eq!(Resolved::from_value(&json!(" 12 ")).as_i64(), Some(12));
        assert_eq!(Resolved::from_value(&json!(7)).as_i64(), Some(7));
        assert_eq!(Resolved::from_value(&json!("x")).as_i64(), None);
        assert!(Resolved::from_value(&json!("  ")).is_blank());
    }
}
