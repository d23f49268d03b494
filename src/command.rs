//! Command and parameter declarations
//!
//! A [`Command`] is an immutable declaration: a name (space separated for
//! sub-commands), an ordered list of [`Parameter`]s and an optional
//! handler. A command without a handler is a group that only exists to
//! hold sub-commands.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::output::{ExecutionContext, Reply};
use crate::types::ParamType;
use crate::value::{Args, Value};

/// Command handler.
///
/// Receives the effective value of every declared parameter. Returning
/// `Err` produces an error-bearing output; it never propagates further.
pub type Handler = Arc<dyn Fn(&Args, &mut ExecutionContext) -> anyhow::Result<Reply> + Send + Sync>;

// ============================================================================
// Flag Policy
// ============================================================================

/// How the binder treats a token that both spells a flag and could fill an
/// open positional parameter
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagPolicy {
    /// Exact flag spellings are extracted first, wherever they appear;
    /// remaining tokens fill positional parameters in order
    #[default]
    ExactFlag,
    /// Tokens fill open positional parameters left to right, even when
    /// they spell a flag; flags are recognised once no slot is open
    PositionalFirst,
}

// ============================================================================
// Parameter
// ============================================================================

/// Static declaration of one command parameter
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Parameter {
    pub name: String,
    pub param_type: ParamType,
    pub description: String,
    /// A blank required parameter is `Incomplete`
    pub required: bool,
    pub default: Option<Value>,
    /// Single letter spelling, `-n`
    pub short: Option<char>,
    /// Extra full spellings including dashes, e.g. `--number`
    pub aliases: Vec<String>,
    /// May only be given as `--name value`
    pub named_only: bool,
    /// Swallows every remaining positional token
    pub rest: bool,
}

impl Parameter {
    /// Required positional parameter; booleans are optional and named-only
    pub fn new(name: impl Into<String>, param_type: ParamType) -> Self {
        let boolean = param_type.is_boolean();
        let rest = matches!(param_type, ParamType::Requisition);
        Self {
            name: name.into(),
            param_type,
            description: String::new(),
            required: !boolean,
            default: None,
            short: None,
            aliases: vec![],
            named_only: boolean,
            rest,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::String)
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::number())
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Boolean)
    }

    pub fn selection<I, S>(name: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(name, ParamType::selection(options))
    }

    pub fn command(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Command)
    }

    pub fn requisition(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Requisition)
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Sets a default, which makes the parameter optional
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self.required = false;
        self
    }

    pub fn short(mut self, c: char) -> Self {
        self.short = Some(c);
        self
    }

    pub fn alias(mut self, spelling: impl Into<String>) -> Self {
        self.aliases.push(spelling.into());
        self
    }

    pub fn named_only(mut self) -> Self {
        self.named_only = true;
        self
    }

    pub fn rest(mut self) -> Self {
        self.rest = true;
        self
    }

    pub fn is_positional(&self) -> bool {
        !self.named_only
    }

    pub fn is_rest(&self) -> bool {
        self.rest && self.is_positional()
    }

    /// Every spelling this parameter answers to
    pub fn flags(&self) -> Vec<String> {
        let mut flags = vec![format!("--{}", self.name)];
        if let Some(c) = self.short {
            flags.push(format!("-{}", c));
        }
        flags.extend(self.aliases.iter().cloned());
        flags
    }

    pub fn is_known_as(&self, text: &str) -> bool {
        self.flags().iter().any(|f| f == text)
    }
}

// ============================================================================
// Command
// ============================================================================

/// Static declaration of a command
#[derive(Clone)]
pub struct Command {
    /// Full name, words separated by single spaces
    pub name: String,
    pub description: String,
    pub params: Vec<Parameter>,
    pub flag_policy: FlagPolicy,
    /// Resolves when typed in full but is never offered as a completion
    pub hidden: bool,
    handler: Option<Handler>,
}

impl Command {
    /// A command with no handler yet (a group until `exec` is called)
    pub fn new(name: impl Into<String>) -> Self {
        let name: String = name.into();
        Self {
            name: name.split_whitespace().collect::<Vec<_>>().join(" "),
            description: String::new(),
            params: vec![],
            flag_policy: FlagPolicy::default(),
            hidden: false,
            handler: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn param(mut self, param: Parameter) -> Self {
        self.params.push(param);
        self
    }

    pub fn flag_policy(mut self, policy: FlagPolicy) -> Self {
        self.flag_policy = policy;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn exec<F>(mut self, f: F) -> Self
    where
        F: Fn(&Args, &mut ExecutionContext) -> anyhow::Result<Reply> + Send + Sync + 'static,
    {
        self.handler = Some(Arc::new(f));
        self
    }

    pub fn with_handler(mut self, handler: Handler) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn handler(&self) -> Option<&Handler> {
        self.handler.as_ref()
    }

    pub fn is_group(&self) -> bool {
        self.handler.is_none()
    }

    /// Name of the enclosing group command, if this is a sub-command
    pub fn parent_name(&self) -> Option<&str> {
        self.name.rsplit_once(' ').map(|(parent, _)| parent)
    }

    pub fn get_param(&self, name: &str) -> Option<&Parameter> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Structural checks run at registration time
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.name.is_empty() {
            return Err(CatalogError::EmptyName);
        }

        let mut names = HashSet::new();
        let mut flags = HashSet::new();
        let mut rest_seen: Option<&str> = None;

        for param in &self.params {
            if !names.insert(param.name.as_str()) {
                return Err(CatalogError::DuplicateParameter {
                    command: self.name.clone(),
                    param: param.name.clone(),
                });
            }

            for flag in param.flags() {
                if !flags.insert(flag.clone()) {
                    return Err(CatalogError::DuplicateFlag {
                        command: self.name.clone(),
                        flag,
                    });
                }
            }

            if param.required && param.default.is_some() {
                return Err(CatalogError::RequiredWithDefault {
                    command: self.name.clone(),
                    param: param.name.clone(),
                });
            }

            if let ParamType::Selection { options } = &param.param_type {
                if options.is_empty() {
                    return Err(CatalogError::EmptySelection {
                        command: self.name.clone(),
                        param: param.name.clone(),
                    });
                }
            }

            if let Some(default) = &param.default {
                param
                    .param_type
                    .check_default(default)
                    .map_err(|message| CatalogError::InvalidDefault {
                        command: self.name.clone(),
                        param: param.name.clone(),
                        message,
                    })?;
            }

            if param.rest && !param.param_type.can_be_rest() {
                return Err(CatalogError::InvalidRestType {
                    command: self.name.clone(),
                    param: param.name.clone(),
                    kind: param.param_type.name().to_string(),
                });
            }

            match (rest_seen, param.is_positional()) {
                (Some(_), true) if param.is_rest() => {
                    return Err(CatalogError::MultipleRestParameters {
                        command: self.name.clone(),
                    });
                }
                (Some(rest), true) => {
                    return Err(CatalogError::RestNotLast {
                        command: self.name.clone(),
                        param: rest.to_string(),
                    });
                }
                _ => {}
            }

            if param.is_rest() {
                rest_seen = Some(param.name.as_str());
            }
        }

        Ok(())
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("flag_policy", &self.flag_policy)
            .field("hidden", &self.hidden)
            .field("group", &self.is_group())
            .finish()
    }
}
