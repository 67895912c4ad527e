//! Procedures: named, parameterized scripts of command and chat steps.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::basket::{Args, Basket};
use crate::command::parser::is_command_line;
use crate::control::Control;
use crate::editor::{PrintStyle, Speaker};
use crate::host::Host;
use crate::outcome::{error_key, not_found, render_value, Outcome, NAMESPACE};

/// Positional parameters a procedure accepts; "1".."5" are always bound.
pub const MAX_POSITIONAL: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ParameterDecl {
    Name(String),
    Spec(ParameterSpec),
}

impl From<ParameterDecl> for ParameterSpec {
    fn from(decl: ParameterDecl) -> Self {
        match decl {
            ParameterDecl::Name(name) => ParameterSpec {
                name,
                default: None,
            },
            ParameterDecl::Spec(spec) => spec,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcedureDefinition {
    pub parameters: Vec<ParameterSpec>,
    pub steps: Vec<String>,
}

impl ProcedureDefinition {
    /// Accepts `{ "parameters": [...], "steps": [...] }` or a bare list of
    /// step strings. A missing, empty or non-list step collection is
    /// `procedure-empty`.
    pub fn from_value(name: &str, value: &Value) -> Result<Self, Outcome> {
        let empty = || Outcome::failure(error_key(NAMESPACE, "procedure-empty")).with_data(name);
        let (parameters, steps) = match value {
            Value::Array(steps) => (Vec::new(), steps),
            Value::Object(map) => {
                let parameters = match map.get("parameters") {
                    None | Some(Value::Null) => Vec::new(),
                    Some(raw) => serde_json::from_value::<Vec<ParameterDecl>>(raw.clone())
                        .map_err(|error| {
                            Outcome::failure(error_key(NAMESPACE, "procedure-invalid"))
                                .with_data(format!("{name}: {error}"))
                        })?
                        .into_iter()
                        .map(ParameterSpec::from)
                        .collect(),
                };
                match map.get("steps") {
                    Some(Value::Array(steps)) => (parameters, steps),
                    _ => return Err(empty()),
                }
            }
            _ => return Err(empty()),
        };
        if steps.is_empty() {
            return Err(empty());
        }
        let steps = steps
            .iter()
            .map(|step| match step {
                Value::String(text) => text.clone(),
                other => render_value(other),
            })
            .collect();
        Ok(Self { parameters, steps })
    }
}

/// Builds the substitution map: each declared parameter takes the
/// positional value at its index, or its default when that value is
/// missing or empty. "1".."5" alias the effective positional values.
pub fn bind_parameters(
    parameters: &[ParameterSpec],
    positional: &[Option<String>],
) -> BTreeMap<String, String> {
    let mut bindings = BTreeMap::new();
    for index in 0..MAX_POSITIONAL.max(parameters.len()) {
        let given = positional
            .get(index)
            .and_then(|value| value.as_ref())
            .filter(|value| !value.is_empty())
            .cloned();
        let declared = parameters.get(index);
        let effective = given
            .or_else(|| {
                declared
                    .and_then(|parameter| parameter.default.as_ref())
                    .map(render_value)
            })
            .unwrap_or_default();
        if let Some(parameter) = declared {
            bindings.insert(parameter.name.clone(), effective.clone());
        }
        if index < MAX_POSITIONAL {
            bindings.insert((index + 1).to_string(), effective);
        }
    }
    bindings
}

/// Replaces each `{{ key }}` whose trimmed key is bound. Unknown
/// placeholders are kept verbatim.
pub fn substitute(step: &str, bindings: &BTreeMap<String, String>) -> String {
    let mut output = String::with_capacity(step.len());
    let mut rest = step;
    while let Some(open) = rest.find("{{") {
        output.push_str(&rest[..open]);
        let after_open = &rest[open + 2..];
        let Some(close) = after_open.find("}}") else {
            output.push_str(&rest[open..]);
            return output;
        };
        let key = after_open[..close].trim();
        match bindings.get(key) {
            Some(value) => output.push_str(value),
            None => output.push_str(&rest[open..open + 2 + close + 2]),
        }
        rest = &after_open[close + 2..];
    }
    output.push_str(rest);
    output
}

/// Finds a procedure on the active persona, reloading the persona from its
/// durable source once when the name is unknown.
pub async fn locate(host: &Host, name: &str) -> Result<ProcedureDefinition, Outcome> {
    let persona = host.config().persona();
    if let Some(raw) = persona.procedures.get(name) {
        return ProcedureDefinition::from_value(name, raw);
    }

    tracing::debug!(procedure = name, persona = %persona.token, "procedure unknown, reloading persona");
    match host.personas().load_persona(&persona.token).await {
        Ok(reloaded) => {
            let raw = reloaded.procedures.get(name).cloned();
            if let Err(error) = host.config().set_persona(reloaded) {
                tracing::warn!(%error, "failed to store reloaded persona");
            }
            if let Some(raw) = raw {
                return ProcedureDefinition::from_value(name, &raw);
            }
        }
        Err(error) => {
            tracing::warn!(persona = %persona.token, %error, "failed to reload persona");
        }
    }
    Err(not_found(NAMESPACE, "procedure", name))
}

/// Runs procedure `name` step by step.
///
/// Steps run strictly in order and the first failing step ends the run;
/// its Failure is returned unchanged. On success the Answer holds the
/// text of the last step's result.
pub async fn run(
    name: &str,
    positional: &[Option<String>],
    args: &Args,
    basket: &mut Basket,
    control: &Control,
) -> Outcome {
    let host = control.host();
    let definition = match locate(host, name).await {
        Ok(definition) => definition,
        Err(failure) => return failure,
    };
    let bindings = bind_parameters(&definition.parameters, positional);
    let prefix = host.config().command_prefix();
    let editor = control.editor();
    let step_control = control.as_recursive();
    let total = definition.steps.len();
    let mut last = String::new();

    tracing::info!(procedure = name, steps = total, "running procedure");
    for (index, step) in definition.steps.iter().enumerate() {
        let text = substitute(step, &bindings);
        editor.print(text.as_str(), PrintStyle::new(Speaker::User));

        let is_command = is_command_line(&prefix, &text);
        let outcome = if is_command {
            host.dispatch(&text, Args::new(), basket, &step_control).await
        } else {
            host.converse(&text, args, basket, &step_control).await
        };
        if outcome.is_error() {
            tracing::info!(procedure = name, step = index + 1, failure = %outcome.print(), "procedure stopped");
            return outcome;
        }

        last = outcome.print();
        if !is_command && index + 1 < total {
            editor.print(last.as_str(), PrintStyle::new(Speaker::Awi));
        }
    }
    Outcome::answer(last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Persona;
    use crate::testing::{fixture, fixture_with_personas};
    use serde_json::json;

    fn positional(values: &[&str]) -> Vec<Option<String>> {
        values.iter().map(|value| Some(value.to_string())).collect()
    }

    fn joke_parameters() -> Vec<ParameterSpec> {
        vec![
            ParameterSpec {
                name: "type".to_string(),
                default: Some(json!("dad")),
            },
            ParameterSpec {
                name: "subject".to_string(),
                default: None,
            },
        ]
    }

    #[test]
    fn defaults_fill_empty_positionals() {
        let bindings = bind_parameters(&joke_parameters(), &positional(&["", "cats"]));
        assert_eq!(
            substitute("Tell a {{type}} joke about {{subject}}", &bindings),
            "Tell a dad joke about cats"
        );
        assert_eq!(bindings["1"], "dad");
        assert_eq!(bindings["2"], "cats");
        assert_eq!(bindings["5"], "");
    }

    #[test]
    fn positional_aliases_exist_without_declarations() {
        let bindings = bind_parameters(&[], &positional(&["a", "b"]));
        assert_eq!(substitute("{{1}}-{{ 2 }}-{{3}}", &bindings), "a-b-");
    }

    #[test]
    fn unknown_placeholders_are_kept() {
        let bindings = bind_parameters(&joke_parameters(), &positional(&["pun"]));
        assert_eq!(
            substitute("{{type}} {{ mystery }} {{subject}} {{unclosed", &bindings),
            "pun {{ mystery }}  {{unclosed"
        );
    }

    #[test]
    fn definition_accepts_both_forms() {
        let bare = ProcedureDefinition::from_value("p", &json!(["one", "two"])).unwrap();
        assert!(bare.parameters.is_empty());
        assert_eq!(bare.steps, vec!["one", "two"]);

        let full = ProcedureDefinition::from_value(
            "p",
            &json!({"parameters": ["a", {"name": "b", "default": "x"}], "steps": ["{{a}}{{b}}"]}),
        )
        .unwrap();
        assert_eq!(full.parameters[0].name, "a");
        assert_eq!(full.parameters[1].default, Some(json!("x")));
    }

    #[test]
    fn empty_or_non_list_steps_are_rejected() {
        for value in [
            json!([]),
            json!({"steps": []}),
            json!({"steps": "not a list"}),
            json!({"parameters": []}),
            json!("just text"),
        ] {
            let failure = ProcedureDefinition::from_value("p", &value).unwrap_err();
            assert_eq!(failure.message(), Some("awi:procedure-empty"), "{value}");
        }
    }

    #[tokio::test]
    async fn runs_steps_and_returns_last_result() {
        let fixture = fixture();
        fixture.set_procedure(
            "jokes",
            json!({
                "parameters": [{"name": "type", "default": "dad"}, {"name": "subject"}],
                "steps": ["awi.echo warming-up", "Tell a {{type}} joke about {{subject}}", "Another one"]
            }),
        );
        let mut basket = Basket::new();
        let outcome = run(
            "jokes",
            &positional(&["", "cats"]),
            &Args::new(),
            &mut basket,
            &fixture.control(),
        )
        .await;

        assert_eq!(outcome, Outcome::answer("reply to: Another one"));
        assert_eq!(
            fixture.conversation.prompts(),
            vec!["Tell a dad joke about cats", "Another one"]
        );
        assert_eq!(
            fixture.terminal.texts(Speaker::User),
            vec!["awi.echo warming-up", "Tell a dad joke about cats", "Another one"]
        );
        assert_eq!(
            fixture.terminal.texts(Speaker::Awi),
            vec!["reply to: Tell a dad joke about cats"]
        );
        let record = fixture.host.invocations().records().pop().unwrap();
        assert!(record.recursive);
    }

    #[tokio::test]
    async fn aborts_on_first_failing_step() {
        let fixture = fixture();
        fixture.set_procedure("abc", json!(["step A", "awi.fail boom", "step C"]));
        let outcome = run("abc", &[], &Args::new(), &mut Basket::new(), &fixture.control()).await;

        assert_eq!(outcome, Outcome::failure("test:boom").with_data("boom"));
        assert_eq!(fixture.conversation.prompts(), vec!["step A"]);
    }

    #[tokio::test]
    async fn unknown_procedure_reloads_persona_then_fails() {
        let fixture = fixture();
        let outcome = run("missing", &[], &Args::new(), &mut Basket::new(), &fixture.control()).await;
        assert_eq!(outcome.message(), Some("awi:procedure-not-found"));
        assert_eq!(outcome.data(), Some(&json!("missing")));
        assert_eq!(fixture.personas.loads(), 1);
    }

    #[tokio::test]
    async fn reloaded_persona_supplies_procedure() {
        let mut stored = Persona {
            token: "awi".to_string(),
            ..Persona::default()
        };
        stored
            .procedures
            .insert("fresh".to_string(), json!(["awi.echo reloaded"]));
        let fixture = fixture_with_personas(vec![stored]);

        let outcome = run("fresh", &[], &Args::new(), &mut Basket::new(), &fixture.control()).await;
        assert_eq!(outcome, Outcome::answer("reloaded"));
        assert!(fixture.host.config().persona().procedures.contains_key("fresh"));
    }

    #[tokio::test]
    async fn empty_procedure_fails() {
        let fixture = fixture();
        fixture.set_procedure("nothing", json!({"steps": []}));
        let outcome = run("nothing", &[], &Args::new(), &mut Basket::new(), &fixture.control()).await;
        assert_eq!(outcome.message(), Some("awi:procedure-empty"));
    }
}
