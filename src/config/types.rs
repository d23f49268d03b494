//! Serde shapes of a YAML command catalog

use serde::{Deserialize, Serialize};

use crate::command::{FlagPolicy, Parameter};
use crate::types::ParamType;
use crate::value::Value;

/// A whole catalog file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub commands: Vec<CommandConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Name looked up in the handler registry; omit for group commands
    #[serde(default)]
    pub handler: Option<String>,
    #[serde(default)]
    pub flag_policy: FlagPolicy,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub params: Vec<ParamConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    #[serde(default)]
    pub description: String,
    /// Defaults to true unless a default is given or the type is boolean
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub short: Option<char>,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub named_only: Option<bool>,
    #[serde(default)]
    pub rest: bool,
}

impl ParamConfig {
    pub fn to_parameter(&self) -> Parameter {
        let mut param = Parameter::new(&self.name, self.param_type.clone())
            .description(&self.description);
        if let Some(default) = &self.default {
            param = param.default_value(default.clone());
        }
        if let Some(required) = self.required {
            param.required = required;
        }
        if let Some(c) = self.short {
            param = param.short(c);
        }
        for alias in &self.aliases {
            param = param.alias(alias);
        }
        if let Some(named_only) = self.named_only {
            param.named_only = named_only;
        }
        if self.rest {
            param = param.rest();
        }
        param
    }
}

impl CatalogConfig {
    pub fn from_yaml_str(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// Append the commands of another file
    pub fn merge(&mut self, other: CatalogConfig) {
        self.commands.extend(other.commands);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_catalog_yaml() {
        let yaml = r#"
commands:
  - name: tsv
    handler: echo
    params:
      - name: optionType
        type: { selection: { options: [option1, option2] } }
      - name: optionValue
        type: string
        default: "x"
        short: v
  - name: tsn
"#;
        let config = CatalogConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.commands.len(), 2);
        assert_eq!(config.commands[0].flag_policy, FlagPolicy::ExactFlag);
        assert_eq!(config.commands[1].handler, None);

        let value = config.commands[0].params[1].to_parameter();
        assert!(!value.required);
        assert_eq!(value.short, Some('v'));
        assert_eq!(value.default, Some(Value::from("x")));
    }

    #[test]
    fn test_boolean_param_defaults() {
        let yaml = "name: loud\ntype: boolean\n";
        let param: ParamConfig = serde_yaml::from_str(yaml).unwrap();
        let param = param.to_parameter();
        assert!(!param.required);
        assert!(param.named_only);
    }

    #[test]
    fn test_flag_policy_spelling() {
        let yaml = "name: x\nflag_policy: positional_first\n";
        let command: CommandConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(command.flag_policy, FlagPolicy::PositionalFirst);
    }
}
