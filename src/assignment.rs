//! Parameter assignments
//!
//! An [`Assignment`] pairs one parameter with the argument tokens bound to
//! it and the result of converting them. Assignments are rebuilt from
//! scratch on every edit, so they hold owned clones of their tokens.

use std::sync::Arc;

use serde::Serialize;

use crate::catalog::CommandCatalog;
use crate::command::Parameter;
use crate::error::DiagnosticKind;
use crate::status::Status;
use crate::tokenizer::Argument;
use crate::types::{Conversion, ParamType};
use crate::value::Value;

/// Synthetic parameter name of the command assignment
pub const COMMAND_PARAM: &str = "__command";

/// Synthetic parameter name of overflow assignments
pub const UNASSIGNED_PARAM: &str = "__unassigned";

// ============================================================================
// Binding
// ============================================================================

/// The argument tokens bound to a parameter
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Binding {
    /// Nothing typed
    Blank,
    /// A single positional token
    Positional { arg: Argument },
    /// Several tokens read as one (sub-command names, rest parameters)
    Merged { args: Vec<Argument> },
    /// `--name value`; `value` is `None` when the line ends after the flag
    Named {
        flag: Argument,
        value: Option<Argument>,
    },
    /// Boolean flag presence
    Flag { flag: Argument },
}

impl Binding {
    pub(crate) fn from_args(mut args: Vec<Argument>) -> Self {
        match args.len() {
            0 => Binding::Blank,
            1 => Binding::Positional {
                arg: args.remove(0),
            },
            _ => Binding::Merged { args },
        }
    }

    /// True when no text at all has been typed for the parameter
    pub fn is_blank(&self) -> bool {
        match self {
            Binding::Blank => true,
            Binding::Positional { arg } => arg.is_blank(),
            Binding::Merged { args } => args.iter().all(Argument::is_blank),
            Binding::Named { value, .. } => value.as_ref().is_none_or(Argument::is_blank),
            Binding::Flag { .. } => false,
        }
    }

    pub fn is_named(&self) -> bool {
        matches!(self, Binding::Named { .. } | Binding::Flag { .. })
    }

    /// Unescaped text of the value tokens. Merged tokens keep the
    /// whitespace that separated them in the input.
    pub fn text(&self) -> String {
        match self {
            Binding::Blank | Binding::Flag { .. } => String::new(),
            Binding::Positional { arg } => arg.text.clone(),
            Binding::Merged { args } => {
                let mut text = String::new();
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        text.push_str(&arg.leading);
                    }
                    text.push_str(&arg.text);
                }
                text
            }
            Binding::Named { value, .. } => value.as_ref().map(|a| a.text.clone()).unwrap_or_default(),
        }
    }

    /// Every token in source order, flag included
    pub fn arguments(&self) -> Vec<&Argument> {
        match self {
            Binding::Blank => vec![],
            Binding::Positional { arg } => vec![arg],
            Binding::Merged { args } => args.iter().collect(),
            Binding::Named { flag, value } => std::iter::once(flag).chain(value.iter()).collect(),
            Binding::Flag { flag } => vec![flag],
        }
    }

    /// Exact source text covered by the binding
    pub fn source(&self) -> String {
        self.arguments().into_iter().map(Argument::source).collect()
    }
}

// ============================================================================
// Assignment
// ============================================================================

/// A parameter, its binding and the conversion of that binding
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Assignment {
    pub param: Parameter,
    pub binding: Binding,
    pub conversion: Conversion,
}

impl Assignment {
    /// Bind and convert a declared parameter
    pub(crate) fn new(param: Parameter, binding: Binding, catalog: &Arc<CommandCatalog>) -> Self {
        let conversion = convert_binding(&param, &binding, catalog);
        Self {
            param,
            binding,
            conversion,
        }
    }

    /// The command assignment: merged command tokens against the catalog
    pub(crate) fn for_command(binding: Binding, catalog: &CommandCatalog) -> Self {
        let name: Vec<&str> = binding
            .arguments()
            .into_iter()
            .map(|a| a.text.as_str())
            .collect();
        let conversion = catalog.convert_name(&name.join(" "));
        Self {
            param: Parameter::new(COMMAND_PARAM, ParamType::Command),
            binding,
            conversion,
        }
    }

    /// An overflow token with a precomputed verdict
    pub(crate) fn unassigned(arg: Argument, conversion: Conversion) -> Self {
        let mut param = Parameter::new(UNASSIGNED_PARAM, ParamType::String);
        param.required = false;
        Self {
            param,
            binding: Binding::Positional { arg },
            conversion,
        }
    }

    pub fn name(&self) -> &str {
        &self.param.name
    }

    pub fn status(&self) -> Status {
        self.conversion.status
    }

    /// Empty when `Valid`
    pub fn message(&self) -> &str {
        &self.conversion.message
    }

    pub fn diagnostic(&self) -> Option<DiagnosticKind> {
        self.conversion.diagnostic
    }

    pub fn predictions(&self) -> &[String] {
        &self.conversion.predictions
    }

    /// The converted value. Defaults are never copied in here.
    pub fn value(&self) -> Option<&Value> {
        self.conversion.value.as_ref()
    }

    /// Value, else declared default, else `Null`
    pub fn effective_value(&self) -> Value {
        self.value()
            .or(self.param.default.as_ref())
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// Source text of the binding, whitespace and quotes included
    pub fn arg_text(&self) -> String {
        self.binding.source()
    }

    pub fn is_blank(&self) -> bool {
        self.binding.is_blank()
    }
}

fn convert_binding(param: &Parameter, binding: &Binding, catalog: &Arc<CommandCatalog>) -> Conversion {
    match binding {
        Binding::Flag { .. } => Conversion::valid(Value::Bool(true)),
        Binding::Named { value: None, .. } if param.param_type.is_boolean() => {
            Conversion::valid(Value::Bool(true))
        }
        Binding::Named { value: None, .. } => Conversion::incomplete(),
        b if b.is_blank() => {
            // An absent flag is false unless a default says otherwise
            if param.param_type.is_boolean() {
                return match param.default {
                    Some(_) => Conversion::empty(),
                    None => Conversion::valid(Value::Bool(false)),
                };
            }
            // Blank still offers whatever the type could complete to
            let predictions = param.param_type.convert("", catalog).predictions;
            if param.required {
                Conversion::incomplete()
                    .with_diagnostic(DiagnosticKind::MissingRequiredParameter)
                    .with_predictions(predictions)
            } else {
                Conversion::empty().with_predictions(predictions)
            }
        }
        b => {
            let text = b.text();
            if text.is_empty() && !param.required {
                return Conversion::empty();
            }
            param.param_type.convert(&text, catalog)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;

    fn catalog() -> Arc<CommandCatalog> {
        Arc::new(CommandCatalog::new())
    }

    fn positional(input: &str) -> Binding {
        Binding::from_args(tokenize(input))
    }

    #[test]
    fn test_blank_required_is_incomplete_without_message() {
        let a = Assignment::new(Parameter::string("msg"), Binding::Blank, &catalog());
        assert_eq!(a.status(), Status::Incomplete);
        assert_eq!(a.message(), "");
        assert_eq!(a.diagnostic(), Some(DiagnosticKind::MissingRequiredParameter));
        assert_eq!(a.value(), None);
    }

    #[test]
    fn test_value_ignores_default() {
        let a = Assignment::new(
            Parameter::number("num2").default_value(42),
            Binding::Blank,
            &catalog(),
        );
        assert_eq!(a.status(), Status::Valid);
        assert_eq!(a.value(), None);
        assert_eq!(a.effective_value(), Value::Number(42.0));
    }

    #[test]
    fn test_blank_boolean_is_false() {
        let a = Assignment::new(Parameter::boolean("bool"), Binding::Blank, &catalog());
        assert_eq!(a.value(), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_blank_boolean_falls_back_to_default() {
        let a = Assignment::new(
            Parameter::boolean("on").default_value(true),
            Binding::Blank,
            &catalog(),
        );
        assert_eq!(a.status(), Status::Valid);
        assert_eq!(a.value(), None);
        assert_eq!(a.effective_value(), Value::Bool(true));

        let flag = tokenize("--on").remove(0);
        let a = Assignment::new(
            Parameter::boolean("on").default_value(false),
            Binding::Flag { flag },
            &catalog(),
        );
        assert_eq!(a.effective_value(), Value::Bool(true));
    }

    #[test]
    fn test_named_without_value_is_incomplete() {
        let flag = tokenize("--num").remove(0);
        let a = Assignment::new(
            Parameter::number("num"),
            Binding::Named { flag, value: None },
            &catalog(),
        );
        assert_eq!(a.status(), Status::Incomplete);
        assert_eq!(a.arg_text(), "--num");
    }

    #[test]
    fn test_merged_text_keeps_inner_whitespace() {
        let b = positional("hello   big 'wide world'  ");
        assert_eq!(b.text(), "hello   big wide world");
        assert_eq!(b.source(), "hello   big 'wide world'  ");
    }

    #[test]
    fn test_explicit_empty_string_on_optional_is_valid() {
        let a = Assignment::new(Parameter::string("text").optional(), positional("\"\""), &catalog());
        assert_eq!(a.status(), Status::Valid);
        assert_eq!(a.value(), None);
    }

    #[test]
    fn test_effective_value_null_without_default() {
        let a = Assignment::new(Parameter::string("text").optional(), Binding::Blank, &catalog());
        assert_eq!(a.effective_value(), Value::Null);
    }
}
