//! Parameter types and argument conversion
//!
//! [`ParamType`] is the closed set of semantic parameter kinds. Each kind
//! converts argument text into a [`Conversion`]: a value (or none), a
//! [`Status`], a message and completion predictions. Conversion never
//! fails in the `Result` sense; every problem is an `Error` or
//! `Incomplete` status with a message.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::catalog::CommandCatalog;
use crate::error::DiagnosticKind;
use crate::requisition::Requisition;
use crate::status::Status;
use crate::value::Value;

static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)$").unwrap());

/// Minimum Jaro-Winkler similarity for a "did you mean" suggestion
const SUGGESTION_THRESHOLD: f64 = 0.8;

// ============================================================================
// Parameter Types
// ============================================================================

/// Semantic type of a parameter
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    /// Presence of the flag means `true`
    Boolean,
    /// Signed integer or decimal, optionally bounded
    Number {
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
        #[serde(default = "default_allow_float")]
        allow_float: bool,
    },
    /// Free text
    String,
    /// One of a fixed set of options
    Selection { options: Vec<String> },
    /// The name of a registered command
    Command,
    /// A complete nested command line, always rest-of-line
    Requisition,
}

fn default_allow_float() -> bool {
    true
}

impl ParamType {
    pub fn number() -> Self {
        ParamType::Number {
            min: None,
            max: None,
            allow_float: true,
        }
    }

    pub fn selection<I, S>(options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ParamType::Selection {
            options: options.into_iter().map(Into::into).collect(),
        }
    }

    /// Short type name for help text and diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            ParamType::Boolean => "boolean",
            ParamType::Number { .. } => "number",
            ParamType::String => "string",
            ParamType::Selection { .. } => "selection",
            ParamType::Command => "command",
            ParamType::Requisition => "requisition",
        }
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, ParamType::Boolean)
    }

    /// Kinds that may swallow the rest of the line
    pub fn can_be_rest(&self) -> bool {
        matches!(
            self,
            ParamType::String | ParamType::Command | ParamType::Requisition
        )
    }

    /// Convert argument text to a value of this type.
    ///
    /// `text` is already unescaped and de-quoted. Blank handling for
    /// optional parameters happens in the assignment; here a blank is
    /// simply "nothing typed yet".
    pub fn convert(&self, text: &str, catalog: &Arc<CommandCatalog>) -> Conversion {
        match self {
            ParamType::Boolean => convert_boolean(text),
            ParamType::Number {
                min,
                max,
                allow_float,
            } => convert_number(text, *min, *max, *allow_float),
            ParamType::String => convert_string(text),
            ParamType::Selection { options } => convert_selection(text, options),
            ParamType::Command => catalog.convert_name(text),
            ParamType::Requisition => convert_requisition(text, catalog),
        }
    }

    /// Check that a declared default is a legal value of this type
    pub fn check_default(&self, value: &Value) -> Result<(), String> {
        match (self, value) {
            (ParamType::Boolean, Value::Bool(_)) => Ok(()),
            (
                ParamType::Number {
                    min,
                    max,
                    allow_float,
                },
                Value::Number(n),
            ) => check_number(*n, *min, *max, *allow_float, &Value::Number(*n).to_string()),
            (ParamType::String | ParamType::Command | ParamType::Requisition, Value::String(_)) => {
                Ok(())
            }
            (ParamType::Selection { options }, Value::String(s)) => {
                if options.iter().any(|o| o == s) {
                    Ok(())
                } else {
                    Err(format!("'{}' is not one of: {}", s, options.join(", ")))
                }
            }
            (ty, other) => Err(format!("{:?} is not a {}", other, ty.name())),
        }
    }
}

// ============================================================================
// Conversion
// ============================================================================

/// Outcome of converting one argument
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Conversion {
    /// Converted value, `None` when nothing usable was typed
    pub value: Option<Value>,
    pub status: Status,
    /// Empty when `Valid`
    pub message: String,
    pub diagnostic: Option<DiagnosticKind>,
    /// Candidate completions, best first
    pub predictions: Vec<String>,
}

impl Conversion {
    pub fn valid(value: Value) -> Self {
        Self {
            value: Some(value),
            status: Status::Valid,
            message: String::new(),
            diagnostic: None,
            predictions: vec![],
        }
    }

    /// Valid with nothing typed (optional blank parameter)
    pub fn empty() -> Self {
        Self {
            value: None,
            status: Status::Valid,
            message: String::new(),
            diagnostic: None,
            predictions: vec![],
        }
    }

    pub fn incomplete() -> Self {
        Self {
            value: None,
            status: Status::Incomplete,
            message: String::new(),
            diagnostic: None,
            predictions: vec![],
        }
    }

    pub fn error(diagnostic: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            value: None,
            status: Status::Error,
            message: message.into(),
            diagnostic: Some(diagnostic),
            predictions: vec![],
        }
    }

    pub fn with_predictions(mut self, predictions: Vec<String>) -> Self {
        self.predictions = predictions;
        self
    }

    pub fn with_diagnostic(mut self, diagnostic: DiagnosticKind) -> Self {
        self.diagnostic = Some(diagnostic);
        self
    }
}

fn convert_boolean(text: &str) -> Conversion {
    Conversion::valid(Value::Bool(!text.trim().is_empty()))
}

fn convert_string(text: &str) -> Conversion {
    if text.is_empty() {
        return Conversion::incomplete().with_diagnostic(DiagnosticKind::MissingRequiredParameter);
    }
    Conversion::valid(Value::String(text.to_string()))
}

fn convert_number(text: &str, min: Option<f64>, max: Option<f64>, allow_float: bool) -> Conversion {
    let trimmed = text.trim();

    // A sign or point on its own may still become a number
    if trimmed.is_empty() || matches!(trimmed, "-" | "+" | "." | "-." | "+.") {
        return Conversion::incomplete();
    }

    if !NUMBER_RE.is_match(trimmed) {
        return Conversion::error(
            DiagnosticKind::ConversionError,
            format!("'{}' is not a number", text),
        );
    }

    let parsed = match trimmed.parse::<f64>() {
        Ok(n) if n.is_finite() => n,
        _ => {
            return Conversion::error(
                DiagnosticKind::ConversionError,
                format!("'{}' is not a number", text),
            )
        }
    };

    match check_number(parsed, min, max, allow_float, trimmed) {
        Ok(()) => Conversion::valid(Value::Number(parsed)),
        Err(message) => Conversion::error(DiagnosticKind::ConversionError, message),
    }
}

fn check_number(
    n: f64,
    min: Option<f64>,
    max: Option<f64>,
    allow_float: bool,
    text: &str,
) -> Result<(), String> {
    if !allow_float && n.fract() != 0.0 {
        return Err(format!("'{}' is not an integer", text));
    }
    if let Some(min) = min {
        if n < min {
            return Err(format!(
                "{} is smaller than minimum allowed: {}.",
                Value::Number(n),
                Value::Number(min)
            ));
        }
    }
    if let Some(max) = max {
        if n > max {
            return Err(format!(
                "{} is greater than maximum allowed: {}.",
                Value::Number(n),
                Value::Number(max)
            ));
        }
    }
    Ok(())
}

fn convert_selection(text: &str, options: &[String]) -> Conversion {
    if text.is_empty() {
        return Conversion::incomplete().with_predictions(options.to_vec());
    }

    let prefixed: Vec<String> = options
        .iter()
        .filter(|o| o.starts_with(text))
        .cloned()
        .collect();

    if options.iter().any(|o| o == text) {
        // Exact match first, longer options after
        let mut predictions = vec![text.to_string()];
        predictions.extend(prefixed.into_iter().filter(|o| o != text));
        return Conversion::valid(Value::String(text.to_string())).with_predictions(predictions);
    }

    match prefixed.len() {
        0 => {
            let mut message = format!(
                "Can't use '{}'. Options are: {}",
                text,
                options.join(", ")
            );
            if let Some(suggestion) = did_you_mean(text, options.iter().map(String::as_str)) {
                message.push_str(&format!(" (did you mean '{}'?)", suggestion));
            }
            Conversion::error(DiagnosticKind::ConversionError, message)
        }
        1 => Conversion::valid(Value::String(prefixed[0].clone())).with_predictions(prefixed),
        _ => Conversion::incomplete().with_predictions(prefixed),
    }
}

fn convert_requisition(text: &str, catalog: &Arc<CommandCatalog>) -> Conversion {
    if text.trim().is_empty() {
        return Conversion::incomplete().with_diagnostic(DiagnosticKind::MissingRequiredParameter);
    }

    let nested = Requisition::with_input(Arc::clone(catalog), text);
    let status = nested.severity();

    let mut conversion = Conversion {
        value: None,
        status,
        message: nested.first_message().unwrap_or_default(),
        diagnostic: nested.first_diagnostic(),
        predictions: vec![],
    };

    if let Some(command) = nested.command() {
        let mut invocation = std::collections::BTreeMap::new();
        invocation.insert("command".to_string(), Value::String(command.name.clone()));
        invocation.insert("args".to_string(), Value::from(nested.args()));
        conversion.value = Some(Value::Map(invocation));
    }

    conversion
}

/// Closest candidate to `text`, if any is similar enough
pub(crate) fn did_you_mean<'a>(
    text: &str,
    candidates: impl IntoIterator<Item = &'a str>,
) -> Option<String> {
    candidates
        .into_iter()
        .map(|c| (c, strsim::jaro_winkler(text, c)))
        .filter(|(_, score)| *score >= SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(c, _)| c.to_string())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Arc<CommandCatalog> {
        Arc::new(CommandCatalog::new())
    }

    fn convert(ty: &ParamType, text: &str) -> Conversion {
        ty.convert(text, &catalog())
    }

    #[test]
    fn test_number_accepts_signed_and_decimal() {
        let ty = ParamType::number();
        assert_eq!(convert(&ty, "42").value, Some(Value::Number(42.0)));
        assert_eq!(convert(&ty, "-4").value, Some(Value::Number(-4.0)));
        assert_eq!(convert(&ty, "+1.5").value, Some(Value::Number(1.5)));
        assert_eq!(convert(&ty, ".5").status, Status::Valid);
    }

    #[test]
    fn test_number_rejects_text() {
        let c = convert(&ParamType::number(), "abc");
        assert_eq!(c.status, Status::Error);
        assert_eq!(c.message, "'abc' is not a number");
        assert_eq!(c.diagnostic, Some(DiagnosticKind::ConversionError));
        assert_eq!(c.value, None);

        assert_eq!(convert(&ParamType::number(), "inf").status, Status::Error);
        assert_eq!(convert(&ParamType::number(), "1e5").status, Status::Error);
    }

    #[test]
    fn test_number_partial_sign_is_incomplete() {
        assert_eq!(convert(&ParamType::number(), "-").status, Status::Incomplete);
        assert_eq!(convert(&ParamType::number(), "").status, Status::Incomplete);
    }

    #[test]
    fn test_number_range_and_integer() {
        let ty = ParamType::Number {
            min: Some(0.0),
            max: Some(10.0),
            allow_float: false,
        };
        let c = convert(&ty, "11");
        assert_eq!(c.status, Status::Error);
        assert_eq!(c.message, "11 is greater than maximum allowed: 10.");
        let c = convert(&ty, "-1");
        assert_eq!(c.message, "-1 is smaller than minimum allowed: 0.");
        let c = convert(&ty, "2.5");
        assert_eq!(c.message, "'2.5' is not an integer");
        assert_eq!(convert(&ty, "10").status, Status::Valid);
    }

    #[test]
    fn test_selection_exact_and_unique_prefix() {
        let ty = ParamType::selection(["collapse", "basic", "with space"]);
        let c = convert(&ty, "basic");
        assert_eq!(c.status, Status::Valid);
        assert_eq!(c.value, Some(Value::from("basic")));

        let c = convert(&ty, "col");
        assert_eq!(c.status, Status::Valid);
        assert_eq!(c.value, Some(Value::from("collapse")));
        assert_eq!(c.predictions, vec!["collapse"]);
    }

    #[test]
    fn test_selection_ambiguous_prefix_is_incomplete() {
        let ty = ParamType::selection(["valid1", "valid2"]);
        let c = convert(&ty, "v");
        assert_eq!(c.status, Status::Incomplete);
        assert_eq!(c.value, None);
        assert_eq!(c.predictions, vec!["valid1", "valid2"]);
    }

    #[test]
    fn test_selection_exact_beats_longer_prefix_match() {
        let ty = ParamType::selection(["with", "with space"]);
        let c = convert(&ty, "with");
        assert_eq!(c.status, Status::Valid);
        assert_eq!(c.predictions, vec!["with", "with space"]);
    }

    #[test]
    fn test_selection_no_match_lists_options() {
        let ty = ParamType::selection(["option1", "option2"]);
        let c = convert(&ty, "optoin1");
        assert_eq!(c.status, Status::Error);
        assert!(c.message.starts_with("Can't use 'optoin1'. Options are: option1, option2"));
        assert!(c.message.contains("did you mean"));
    }

    #[test]
    fn test_boolean_never_errors() {
        assert_eq!(convert(&ParamType::Boolean, "").value, Some(Value::Bool(false)));
        assert_eq!(convert(&ParamType::Boolean, "yes").value, Some(Value::Bool(true)));
        assert_eq!(convert(&ParamType::Boolean, "zzz").status, Status::Valid);
    }

    #[test]
    fn test_string_blank_is_incomplete() {
        assert_eq!(convert(&ParamType::String, "").status, Status::Incomplete);
        assert_eq!(convert(&ParamType::String, "hi").value, Some(Value::from("hi")));
    }

    #[test]
    fn test_check_default() {
        let ty = ParamType::selection(["a", "b"]);
        assert!(ty.check_default(&Value::from("a")).is_ok());
        assert!(ty.check_default(&Value::from("c")).is_err());
        assert!(ParamType::Boolean.check_default(&Value::from(1)).is_err());
        assert!(ParamType::number().check_default(&Value::from(2)).is_ok());
    }

    #[test]
    fn test_param_type_from_yaml() {
        let ty: ParamType = serde_yaml::from_str("boolean").unwrap();
        assert_eq!(ty, ParamType::Boolean);
        let ty: ParamType = serde_yaml::from_str("number: { max: 5 }").unwrap();
        assert_eq!(
            ty,
            ParamType::Number {
                min: None,
                max: Some(5.0),
                allow_float: true
            }
        );
        let ty: ParamType = serde_yaml::from_str("selection: { options: [a, b] }").unwrap();
        assert_eq!(ty, ParamType::selection(["a", "b"]));
    }

    #[test]
    fn test_did_you_mean() {
        assert_eq!(
            did_you_mean("tslnog", ["tslong", "tsv", "echo"]),
            Some("tslong".to_string())
        );
        assert_eq!(did_you_mean("zzz", ["tslong"]), None);
    }
}
