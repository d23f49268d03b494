//! Command catalog
//!
//! Registry of [`Command`] declarations keyed by full name. Sub-commands
//! use space separated names and require their parent group to be
//! registered first. The catalog also converts typed command names,
//! which is how both the command assignment and `command` parameters
//! resolve.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::command::Command;
use crate::error::{CatalogError, DiagnosticKind};
use crate::types::{did_you_mean, Conversion};
use crate::value::Value;

/// Registry of known commands
#[derive(Clone, Debug, Default)]
pub struct CommandCatalog {
    commands: BTreeMap<String, Arc<Command>>,
}

impl CommandCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command after validating its declaration
    pub fn register(&mut self, command: Command) -> Result<(), CatalogError> {
        command.validate()?;

        if self.commands.contains_key(&command.name) {
            return Err(CatalogError::DuplicateCommand(command.name));
        }

        if let Some(parent) = command.parent_name() {
            if !self.commands.contains_key(parent) {
                return Err(CatalogError::MissingParent {
                    command: command.name.clone(),
                    parent: parent.to_string(),
                });
            }
        }

        debug!(
            command = %command.name,
            params = command.params.len(),
            group = command.is_group(),
            "Registered command"
        );
        self.commands.insert(command.name.clone(), Arc::new(command));
        Ok(())
    }

    /// Builder-style registration
    pub fn with(mut self, command: Command) -> Result<Self, CatalogError> {
        self.register(command)?;
        Ok(self)
    }

    /// Remove a command and all of its sub-commands
    pub fn unregister(&mut self, name: &str) -> Option<Arc<Command>> {
        let removed = self.commands.remove(name)?;
        let prefix = format!("{} ", name);
        self.commands.retain(|k, _| !k.starts_with(&prefix));
        Some(removed)
    }

    pub fn get(&self, name: &str) -> Option<Arc<Command>> {
        self.commands.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// All command names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    pub fn commands(&self) -> impl Iterator<Item = &Arc<Command>> {
        self.commands.values()
    }

    /// Direct sub-commands of a group
    pub fn children(&self, parent: &str) -> Vec<Arc<Command>> {
        self.commands
            .values()
            .filter(|c| c.parent_name() == Some(parent))
            .cloned()
            .collect()
    }

    /// Visible command names starting with `prefix`, sorted.
    /// A blank prefix lists the top-level commands only.
    pub fn predictions(&self, prefix: &str) -> Vec<String> {
        self.commands
            .values()
            .filter(|c| !c.hidden)
            .filter(|c| {
                if prefix.is_empty() {
                    c.parent_name().is_none()
                } else {
                    c.name.starts_with(prefix)
                }
            })
            .map(|c| c.name.clone())
            .collect()
    }

    /// Convert a typed command name.
    ///
    /// Exact names are `Valid`, strict prefixes of a visible name are
    /// `Incomplete`, anything else is an unknown command.
    pub fn convert_name(&self, text: &str) -> Conversion {
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");

        if text.is_empty() {
            return Conversion::incomplete().with_predictions(self.predictions(""));
        }

        if let Some(command) = self.commands.get(&text) {
            let mut predictions = vec![command.name.clone()];
            predictions.extend(self.predictions(&text).into_iter().filter(|n| *n != text));
            return Conversion::valid(Value::String(command.name.clone()))
                .with_predictions(predictions);
        }

        let predictions = self.predictions(&text);
        if !predictions.is_empty() {
            return Conversion::incomplete().with_predictions(predictions);
        }

        let mut message = format!("Unknown command '{}'", text);
        let visible = self.commands.values().filter(|c| !c.hidden).map(|c| c.name.as_str());
        if let Some(suggestion) = did_you_mean(&text, visible) {
            message.push_str(&format!(" (did you mean '{}'?)", suggestion));
        }
        Conversion::error(DiagnosticKind::UnknownCommand, message)
    }
}
