//! The requisition: live state of one command line
//!
//! A [`Requisition`] owns the typed text, the cursor and every
//! [`Assignment`] derived from them. Each edit re-tokenizes and re-binds
//! from scratch; nothing is patched incrementally, so later tokens can
//! never keep stale bindings after an earlier token moves.
//!
//! ## Derivation
//!
//! 1. Tokenize ([`crate::tokenizer`])
//! 2. Resolve the command, greedily merging tokens through group commands
//! 3. Bind the remaining tokens to parameters according to the command's
//!    [`FlagPolicy`]
//! 4. Convert every binding; leftover tokens become overflow assignments
//!
//! Every input character is owned by exactly one assignment, which is what
//! cursor lookup and status markup are built on.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::assignment::{Assignment, Binding, COMMAND_PARAM};
use crate::catalog::CommandCatalog;
use crate::command::{Command, FlagPolicy, Parameter};
use crate::error::DiagnosticKind;
use crate::hints::Hints;
use crate::output::{self, ExecOptions, Output};
use crate::status::Status;
use crate::tokenizer::{tokenize, ArgPart, Argument};
use crate::types::{Conversion, ParamType};
use crate::value::{Args, Value};

/// Which assignment a token (and its characters) belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum Owner {
    Command,
    Param(usize),
    Unassigned(usize),
}

#[derive(Clone, Copy, Debug)]
struct Slot {
    owner: Owner,
    /// The token is a recognised flag spelling
    flag: bool,
}

impl Slot {
    fn new(owner: Owner) -> Self {
        Self { owner, flag: false }
    }
}

#[derive(Clone, Copy, Debug)]
struct TraceEntry {
    arg: usize,
    part: ArgPart,
    owner: Owner,
}

/// A run of input characters sharing one status
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StatusSpan {
    pub text: String,
    pub status: Status,
}

impl StatusSpan {
    /// Length in chars
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

// ============================================================================
// Requisition
// ============================================================================

/// Command line under construction, re-derived on every edit
#[derive(Clone, Debug)]
pub struct Requisition {
    catalog: Arc<CommandCatalog>,
    typed: String,
    cursor: usize,
    args: Vec<Argument>,
    slots: Vec<Slot>,
    command: Option<Arc<Command>>,
    command_assignment: Assignment,
    assignments: Vec<Assignment>,
    unassigned: Vec<Assignment>,
}

impl Requisition {
    /// An empty command line
    pub fn new(catalog: Arc<CommandCatalog>) -> Self {
        let command_assignment = Assignment::for_command(Binding::Blank, &catalog);
        Self {
            catalog,
            typed: String::new(),
            cursor: 0,
            args: vec![],
            slots: vec![],
            command: None,
            command_assignment,
            assignments: vec![],
            unassigned: vec![],
        }
    }

    /// A requisition derived from `input` with the cursor at the end
    pub fn with_input(catalog: Arc<CommandCatalog>, input: &str) -> Self {
        let mut requisition = Self::new(catalog);
        requisition.set_input(input, None);
        requisition
    }

    /// Replace the typed text and re-derive everything.
    ///
    /// The cursor defaults to the end of the input and is clamped to it.
    pub fn set_input(&mut self, input: &str, cursor: Option<usize>) {
        let len = input.chars().count();
        self.typed = input.to_string();
        self.cursor = cursor.unwrap_or(len).min(len);
        self.args = tokenize(input);
        self.derive();

        debug!(
            typed = %self.typed,
            cursor = self.cursor,
            command = self.command.as_ref().map(|c| c.name.as_str()).unwrap_or("-"),
            severity = %self.severity(),
            "Re-derived requisition"
        );
    }

    /// Move the cursor. Only cursor-dependent answers change.
    pub fn set_cursor(&mut self, cursor: usize) {
        self.cursor = cursor.min(self.typed.chars().count());
    }

    pub fn typed(&self) -> &str {
        &self.typed
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn catalog(&self) -> &Arc<CommandCatalog> {
        &self.catalog
    }

    /// Tokens of the current input
    pub fn arguments(&self) -> &[Argument] {
        &self.args
    }

    /// The resolved command, if the command assignment is valid
    pub fn command(&self) -> Option<&Arc<Command>> {
        self.command.as_ref()
    }

    pub fn command_assignment(&self) -> &Assignment {
        &self.command_assignment
    }

    /// Parameter assignments in declaration order
    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    /// Overflow assignments
    pub fn unassigned(&self) -> &[Assignment] {
        &self.unassigned
    }

    /// Look up an assignment by parameter name; `__command` names the
    /// command assignment
    pub fn get_assignment(&self, name: &str) -> Option<&Assignment> {
        if name == COMMAND_PARAM {
            return Some(&self.command_assignment);
        }
        self.assignments.iter().find(|a| a.name() == name)
    }

    /// Effective value of every declared parameter
    pub fn args(&self) -> Args {
        let mut args = Args::new();
        for assignment in &self.assignments {
            args.insert(assignment.name(), assignment.effective_value());
        }
        args
    }

    // ------------------------------------------------------------------------
    // Status
    // ------------------------------------------------------------------------

    /// Maximum status over the command, parameter and overflow assignments
    pub fn severity(&self) -> Status {
        Status::worst(self.all_assignments().map(|(_, a)| a.status()))
    }

    /// Status of the line as an executable whole.
    ///
    /// An `Incomplete` assignment away from the cursor can no longer be
    /// finished by typing where the user is, so it counts as `Error`.
    /// For the plain maximum over every assignment use [`severity`](Self::severity).
    pub fn status(&self) -> Status {
        let current = self.owner_at(self.cursor);
        Status::worst(self.all_assignments().map(|(owner, a)| match a.status() {
            Status::Incomplete if owner != current => Status::Error,
            status => status,
        }))
    }

    /// First non-empty message, command assignment first
    pub fn first_message(&self) -> Option<String> {
        self.all_assignments()
            .map(|(_, a)| a.message())
            .find(|m| !m.is_empty())
            .map(str::to_string)
    }

    pub fn first_diagnostic(&self) -> Option<DiagnosticKind> {
        self.all_assignments()
            .filter(|(_, a)| !a.status().is_valid())
            .find_map(|(_, a)| a.diagnostic())
    }

    fn all_assignments(&self) -> impl Iterator<Item = (Owner, &Assignment)> {
        std::iter::once((Owner::Command, &self.command_assignment))
            .chain(
                self.assignments
                    .iter()
                    .enumerate()
                    .map(|(i, a)| (Owner::Param(i), a)),
            )
            .chain(
                self.unassigned
                    .iter()
                    .enumerate()
                    .map(|(i, a)| (Owner::Unassigned(i), a)),
            )
    }

    // ------------------------------------------------------------------------
    // Cursor
    // ------------------------------------------------------------------------

    /// The assignment being edited when the cursor is at `cursor`
    pub fn assignment_at(&self, cursor: usize) -> &Assignment {
        self.assignment_for(self.owner_at(cursor))
    }

    /// The assignment at the current cursor
    pub fn current_assignment(&self) -> &Assignment {
        self.assignment_at(self.cursor)
    }

    pub(crate) fn owner_at(&self, cursor: usize) -> Owner {
        let trace = self.trace();
        if cursor == 0 || trace.is_empty() {
            return Owner::Command;
        }
        trace[cursor.min(trace.len()) - 1].owner
    }

    pub(crate) fn assignment_for(&self, owner: Owner) -> &Assignment {
        match owner {
            Owner::Command => &self.command_assignment,
            Owner::Param(i) => &self.assignments[i],
            Owner::Unassigned(i) => &self.unassigned[i],
        }
    }

    /// The text typed so far for an assignment, as a completion would see it
    pub(crate) fn typed_text_of(&self, owner: Owner) -> String {
        match owner {
            Owner::Command => {
                let words: Vec<&str> = self
                    .command_assignment
                    .binding
                    .arguments()
                    .into_iter()
                    .map(|a| a.text.as_str())
                    .collect();
                words.join(" ")
            }
            other => self.assignment_for(other).binding.text(),
        }
    }

    /// Owner of every input char, in order
    fn trace(&self) -> Vec<TraceEntry> {
        let mut trace = Vec::with_capacity(self.typed.len());
        for (i, arg) in self.args.iter().enumerate() {
            let owner = self.slots[i].owner;
            let trailing = self.trailing_owner(owner);
            for part in arg.char_parts() {
                let owner = if part == ArgPart::Trailing { trailing } else { owner };
                trace.push(TraceEntry { arg: i, part, owner });
            }
        }
        trace
    }

    /// Whitespace after the last token moves on to the next blank
    /// positional parameter, unless a flag is still waiting for its value
    fn trailing_owner(&self, owner: Owner) -> Owner {
        if let Owner::Param(p) = owner {
            if matches!(self.assignments[p].binding, Binding::Named { value: None, .. }) {
                return owner;
            }
        }
        self.first_blank_positional().map(Owner::Param).unwrap_or(owner)
    }

    fn first_blank_positional(&self) -> Option<usize> {
        self.assignments
            .iter()
            .position(|a| a.param.is_positional() && a.binding == Binding::Blank)
    }

    // ------------------------------------------------------------------------
    // Markup
    // ------------------------------------------------------------------------

    /// Status of every input character, merged into runs.
    ///
    /// Whitespace, quotes and recognised flags are `Valid`. An `Incomplete`
    /// character is shown as `Error` unless the cursor is on text of the
    /// same assignment.
    pub fn input_status_markup(&self, cursor: usize) -> Vec<StatusSpan> {
        let trace = self.trace();
        let Some(at) = trace.get(cursor.min(trace.len()).saturating_sub(1)) else {
            return vec![];
        };
        let cursor_on_blank = self.args[at.arg].is_blank();

        let mut spans: Vec<StatusSpan> = vec![];
        for (ch, entry) in self.typed.chars().zip(&trace) {
            let status = if entry.part != ArgPart::Text || self.slots[entry.arg].flag {
                Status::Valid
            } else {
                match self.assignment_for(entry.owner).status() {
                    Status::Incomplete
                        if entry.owner != at.owner
                            || (at.part != ArgPart::Text && !cursor_on_blank) =>
                    {
                        Status::Error
                    }
                    status => status,
                }
            };

            match spans.last_mut() {
                Some(last) if last.status == status => last.text.push(ch),
                _ => spans.push(StatusSpan {
                    text: ch.to_string(),
                    status,
                }),
            }
        }
        spans
    }

    /// Markup as one status code per char, e.g. `VVVVIIIIII`
    pub fn markup_codes(&self, cursor: usize) -> String {
        self.input_status_markup(cursor)
            .iter()
            .flat_map(|span| std::iter::repeat(span.status.code()).take(span.len()))
            .collect()
    }

    // ------------------------------------------------------------------------
    // Completion
    // ------------------------------------------------------------------------

    pub fn hints(&self) -> Hints {
        Hints::compute(self)
    }

    /// Apply the completion offered at the cursor.
    ///
    /// Returns the new input and cursor, or `None` when nothing is offered.
    pub fn complete_at_cursor(&self) -> Option<(String, usize)> {
        let hints = self.hints();

        if !hints.direct_tab_text.is_empty() {
            let mut text = self.typed.clone();
            text.push_str(&hints.direct_tab_text);
            text.push(' ');
            let cursor = text.chars().count();
            return Some((text, cursor));
        }

        if hints.arrow_tab_text.is_empty() {
            return None;
        }

        let owner = self.owner_at(self.cursor);
        let prediction = self.assignment_for(owner).predictions().first()?;
        let replacement = if owner == Owner::Command {
            prediction.clone()
        } else {
            quote(prediction)
        };

        let tokens: Vec<&Argument> = self
            .args
            .iter()
            .zip(&self.slots)
            .filter(|(_, slot)| slot.owner == owner && !slot.flag)
            .map(|(arg, _)| arg)
            .collect();
        let (from, to) = match (tokens.first(), tokens.last()) {
            (Some(first), Some(last)) => (
                first.token_start(),
                last.end() - last.trailing.chars().count(),
            ),
            _ => (self.cursor, self.cursor),
        };

        let chars: Vec<char> = self.typed.chars().collect();
        let mut text: String = chars[..from].iter().collect();
        text.push_str(&replacement);
        let cursor = text.chars().count();
        text.extend(&chars[to..]);
        Some((text, cursor))
    }

    /// The line rebuilt from its bindings: command name, positional
    /// values, then named values. Prefix completions are substituted.
    pub fn to_canonical(&self) -> String {
        let Some(command) = &self.command else {
            return self.typed.trim().to_string();
        };

        let mut positional = vec![command.name.clone()];
        let mut named = vec![];
        for assignment in &self.assignments {
            let Some(value) = assignment.value() else {
                continue;
            };
            let text = match value {
                Value::String(_) | Value::Number(_) | Value::Bool(_) => quote(&value.to_string()),
                _ => assignment.binding.text(),
            };
            match &assignment.binding {
                Binding::Blank => {}
                Binding::Flag { .. } => named.push(format!("--{}", assignment.name())),
                Binding::Named { .. } => {
                    named.push(format!("--{}", assignment.name()));
                    named.push(text);
                }
                Binding::Positional { .. } | Binding::Merged { .. } => positional.push(text),
            }
        }

        positional.extend(named);
        positional.join(" ")
    }

    // ------------------------------------------------------------------------
    // Execution
    // ------------------------------------------------------------------------

    /// Run the resolved command with the current values.
    ///
    /// Runs whatever the status; invalid assignments contribute their
    /// default or `Null` and the handler decides. Failures land in the
    /// returned [`Output`].
    pub fn execute(&self, options: ExecOptions) -> Output {
        let unresolved = self.command_assignment.message().to_string();
        output::run(
            &self.catalog,
            self.command.as_ref(),
            &self.typed,
            self.args(),
            unresolved,
            options,
        )
    }

    // ========================================================================
    // Derivation
    // ========================================================================

    fn derive(&mut self) {
        self.command = None;
        self.assignments.clear();
        self.unassigned.clear();
        self.slots = vec![Slot::new(Owner::Command); self.args.len()];

        let used = self.resolve_command();

        let Some(command) = self.command.clone() else {
            let leftover: Vec<usize> = (used..self.args.len()).collect();
            self.push_unassigned(&leftover, None, &[]);
            return;
        };

        let (bindings, leftover) = match command.flag_policy {
            FlagPolicy::ExactFlag => self.bind_flags_first(&command, used),
            FlagPolicy::PositionalFirst => self.bind_in_order(&command, used),
        };

        self.push_unassigned(&leftover, Some(&command), &bindings);
        self.assignments = command
            .params
            .iter()
            .cloned()
            .zip(bindings)
            .map(|(param, binding)| Assignment::new(param, binding, &self.catalog))
            .collect();
    }

    /// Resolve the command name, returning how many tokens it used
    fn resolve_command(&mut self) -> usize {
        let n = self.args.len();
        if n == 0 {
            self.command_assignment = Assignment::for_command(Binding::Blank, &self.catalog);
            return 0;
        }

        let mut used = 1;
        loop {
            let binding = Binding::from_args(self.args[..used].to_vec());
            let assignment = Assignment::for_command(binding, &self.catalog);
            let resolved = assignment
                .value()
                .and_then(Value::as_str)
                .and_then(|name| self.catalog.get(name));

            match resolved {
                Some(command) if command.is_group() && used < n => used += 1,
                resolved => {
                    self.command = resolved;
                    self.command_assignment = assignment;
                    return used;
                }
            }
        }
    }

    fn spells_flag(&self, idx: usize, param: &Parameter) -> bool {
        let arg = &self.args[idx];
        arg.open_quote.is_none() && param.is_known_as(&arg.text)
    }

    fn spells_any_flag(&self, idx: usize, command: &Command) -> bool {
        command.params.iter().any(|p| self.spells_flag(idx, p))
    }

    /// Bind a flag token and, for non-booleans, the token after it
    fn bind_named(
        &mut self,
        command: &Command,
        p: usize,
        flag_idx: usize,
        value_idx: Option<usize>,
    ) -> (Binding, bool) {
        self.slots[flag_idx] = Slot {
            owner: Owner::Param(p),
            flag: true,
        };
        let flag = self.args[flag_idx].clone();

        if command.params[p].param_type.is_boolean() {
            return (Binding::Flag { flag }, false);
        }

        match value_idx.filter(|&v| !self.spells_any_flag(v, command)) {
            Some(v) => {
                self.slots[v] = Slot::new(Owner::Param(p));
                let value = Some(self.args[v].clone());
                (Binding::Named { flag, value }, true)
            }
            None => (Binding::Named { flag, value: None }, false),
        }
    }

    fn bind_rest(&mut self, p: usize, taken: &[usize]) -> Binding {
        for &idx in taken {
            self.slots[idx] = Slot::new(Owner::Param(p));
        }
        Binding::from_args(taken.iter().map(|&i| self.args[i].clone()).collect())
    }

    /// Flags first wherever they appear, then positional order
    fn bind_flags_first(&mut self, command: &Command, start: usize) -> (Vec<Binding>, Vec<usize>) {
        let params = &command.params;
        let n = self.args.len();
        let mut bindings = vec![Binding::Blank; params.len()];
        let mut bound = vec![false; n];
        let mut leftover = vec![];

        // A flag only ever takes the token directly after it
        let mut i = start;
        while i < n {
            let Some(p) = params.iter().position(|param| self.spells_flag(i, param)) else {
                i += 1;
                continue;
            };
            let value_idx = (i + 1 < n).then_some(i + 1);
            let (binding, took_value) = self.bind_named(command, p, i, value_idx);
            bound[i] = true;
            if took_value {
                bound[i + 1] = true;
            }
            // A later repeat overrides an earlier one
            bindings[p] = binding;
            i += if took_value { 2 } else { 1 };
        }

        let mut remaining: Vec<usize> = (start..n).filter(|&idx| !bound[idx]).collect();

        for (p, param) in params.iter().enumerate() {
            if remaining.is_empty() {
                break;
            }
            if !param.is_positional() || bindings[p] != Binding::Blank {
                continue;
            }
            if param.is_rest() {
                let taken = std::mem::take(&mut remaining);
                bindings[p] = self.bind_rest(p, &taken);
                break;
            }

            let idx = remaining.remove(0);
            if self.looks_like_option(idx, param) {
                leftover.push(idx);
                continue;
            }
            self.slots[idx] = Slot::new(Owner::Param(p));
            bindings[p] = Binding::Positional {
                arg: self.args[idx].clone(),
            };
        }

        leftover.extend(remaining);
        leftover.sort_unstable();
        (bindings, leftover)
    }

    /// Left to right: open positional slots take any token, flags are
    /// only recognised once every positional slot is filled
    fn bind_in_order(&mut self, command: &Command, start: usize) -> (Vec<Binding>, Vec<usize>) {
        let params = &command.params;
        let n = self.args.len();
        let mut bindings = vec![Binding::Blank; params.len()];
        let mut leftover = vec![];

        let mut i = start;
        while i < n {
            let open = params
                .iter()
                .enumerate()
                .position(|(p, param)| param.is_positional() && bindings[p] == Binding::Blank);

            if let Some(p) = open {
                if params[p].is_rest() {
                    let taken: Vec<usize> = (i..n).collect();
                    bindings[p] = self.bind_rest(p, &taken);
                    break;
                }
                self.slots[i] = Slot::new(Owner::Param(p));
                bindings[p] = Binding::Positional {
                    arg: self.args[i].clone(),
                };
                i += 1;
                continue;
            }

            if let Some(p) = params.iter().position(|param| self.spells_flag(i, param)) {
                let value_idx = (i + 1 < n).then_some(i + 1);
                let (binding, took_value) = self.bind_named(command, p, i, value_idx);
                bindings[p] = binding;
                i += if took_value { 2 } else { 1 };
                continue;
            }

            leftover.push(i);
            i += 1;
        }

        (bindings, leftover)
    }

    /// A token that would read as an option rather than a value.
    /// For numbers `-4` is a value; `-x` and `--` are not.
    fn looks_like_option(&self, idx: usize, param: &Parameter) -> bool {
        let arg = &self.args[idx];
        if arg.open_quote.is_some() {
            return false;
        }
        let mut chars = arg.text.chars();
        if chars.next() != Some('-') {
            return false;
        }
        match param.param_type {
            ParamType::Number { .. } => chars
                .next()
                .is_some_and(|c| c == '-' || c == '_' || c.is_alphabetic()),
            _ => true,
        }
    }

    fn push_unassigned(&mut self, leftover: &[usize], command: Option<&Command>, bindings: &[Binding]) {
        for &idx in leftover {
            let conversion = self.overflow(idx, command, bindings);
            self.slots[idx] = Slot::new(Owner::Unassigned(self.unassigned.len()));
            self.unassigned
                .push(Assignment::unassigned(self.args[idx].clone(), conversion));
        }
    }

    /// Verdict on a token no parameter accepted
    fn overflow(&self, idx: usize, command: Option<&Command>, bindings: &[Binding]) -> Conversion {
        let arg = &self.args[idx];
        if arg.is_blank() {
            return Conversion::empty();
        }

        let text = &arg.text;
        let numeric = text
            .strip_prefix('-')
            .and_then(|rest| rest.chars().next())
            .is_some_and(|c| c.is_ascii_digit() || c == '.');

        if arg.open_quote.is_none() && text.starts_with('-') && !numeric {
            let candidates: Vec<String> = command
                .map(|c| {
                    c.params
                        .iter()
                        .zip(bindings)
                        .filter(|(_, b)| **b == Binding::Blank)
                        .flat_map(|(p, _)| p.flags())
                        .filter(|f| f.starts_with(text.as_str()) && f != text)
                        .collect()
                })
                .unwrap_or_default();

            if candidates.is_empty() {
                return Conversion::error(
                    DiagnosticKind::OverflowArgument,
                    format!("Unknown option '{}'", text),
                );
            }
            return Conversion::incomplete()
                .with_diagnostic(DiagnosticKind::OverflowArgument)
                .with_predictions(candidates);
        }

        Conversion::error(DiagnosticKind::OverflowArgument, "Too many arguments")
    }
}

/// Quote text that would not survive tokenizing as a single word
fn quote(text: &str) -> String {
    let plain = !text.is_empty()
        && !text
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '\\'));
    if plain {
        return text.to_string();
    }
    let escaped = text.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::Reply;

    fn noop() -> impl Fn(&Args, &mut crate::output::ExecutionContext) -> anyhow::Result<Reply> {
        |_, _| Ok(Reply::Value(Value::Null))
    }

    fn catalog() -> Arc<CommandCatalog> {
        let mut catalog = CommandCatalog::new();
        catalog
            .register(
                Command::new("tsv")
                    .param(Parameter::selection("optionType", ["option1", "option2", "option3"]))
                    .param(Parameter::string("optionValue"))
                    .exec(noop()),
            )
            .unwrap();
        catalog
            .register(
                Command::new("tsu")
                    .param(Parameter::new(
                        "num",
                        ParamType::Number {
                            min: Some(-5.0),
                            max: Some(10.0),
                            allow_float: false,
                        },
                    ))
                    .exec(noop()),
            )
            .unwrap();
        catalog
            .register(
                Command::new("tsr")
                    .param(Parameter::string("text").rest())
                    .exec(noop()),
            )
            .unwrap();
        catalog
            .register(
                Command::new("tsf")
                    .param(Parameter::string("first"))
                    .param(Parameter::number("num").short('n').optional())
                    .param(Parameter::boolean("loud"))
                    .exec(noop()),
            )
            .unwrap();
        catalog
            .register(
                Command::new("tsp")
                    .flag_policy(FlagPolicy::PositionalFirst)
                    .param(Parameter::string("first"))
                    .param(Parameter::string("second").optional())
                    .exec(noop()),
            )
            .unwrap();
        catalog.register(Command::new("tsn")).unwrap();
        catalog
            .register(
                Command::new("tsn dif")
                    .param(Parameter::string("text"))
                    .exec(noop()),
            )
            .unwrap();
        Arc::new(catalog)
    }

    fn req(input: &str) -> Requisition {
        Requisition::with_input(catalog(), input)
    }

    #[test]
    fn test_empty_input_is_incomplete() {
        let r = req("");
        assert_eq!(r.severity(), Status::Incomplete);
        assert_eq!(r.status(), Status::Incomplete);
        assert!(r.command().is_none());
        assert!(r.input_status_markup(0).is_empty());
    }

    #[test]
    fn test_whitespace_only_belongs_to_command() {
        let r = req("  ");
        assert_eq!(r.assignment_at(2).name(), COMMAND_PARAM);
        assert_eq!(r.markup_codes(2), "VV");
    }

    #[test]
    fn test_unknown_command() {
        let r = req("tsx");
        assert_eq!(r.status(), Status::Error);
        assert!(r
            .first_message()
            .is_some_and(|m| m.starts_with("Unknown command 'tsx'")));
        assert_eq!(r.first_diagnostic(), Some(DiagnosticKind::UnknownCommand));
        assert_eq!(r.markup_codes(3), "EEE");
    }

    #[test]
    fn test_sub_command_merges_tokens() {
        let r = req("tsn dif hello");
        assert_eq!(r.command().map(|c| c.name.as_str()), Some("tsn dif"));
        assert_eq!(r.command_assignment().arg_text(), "tsn dif");
        assert_eq!(r.get_assignment("text").and_then(|a| a.value()), Some(&Value::from("hello")));
        assert_eq!(r.status(), Status::Valid);
    }

    #[test]
    fn test_partial_sub_command_is_incomplete() {
        let r = req("tsn d");
        assert!(r.command().is_none());
        assert_eq!(r.command_assignment().status(), Status::Incomplete);
        assert_eq!(r.markup_codes(5), "IIIVI");
        assert_eq!(r.hints().direct_tab_text, "if");
    }

    #[test]
    fn test_selection_prefix_at_cursor() {
        let r = req("tsv option");
        assert_eq!(r.current_assignment().name(), "optionType");
        assert_eq!(r.markup_codes(10), "VVVVIIIIII");
        assert_eq!(r.status(), Status::Error);
    }

    #[test]
    fn test_trailing_space_moves_to_next_blank_param() {
        let r = req("tsv option1 ");
        assert_eq!(r.current_assignment().name(), "optionValue");
        assert_eq!(r.assignment_at(11).name(), "optionType");
        assert_eq!(r.status(), Status::Incomplete);
    }

    #[test]
    fn test_number_range_error() {
        let r = req("tsu 11");
        let num = r.get_assignment("num").unwrap();
        assert_eq!(num.status(), Status::Error);
        assert_eq!(num.message(), "11 is greater than maximum allowed: 10.");
        assert_eq!(r.markup_codes(6), "VVVVEE");
    }

    #[test]
    fn test_negative_number_is_a_value() {
        let r = req("tsu -4");
        assert_eq!(r.get_assignment("num").and_then(|a| a.value()), Some(&Value::from(-4)));
        assert!(r.unassigned().is_empty());
    }

    #[test]
    fn test_flag_like_token_is_not_positional() {
        let r = req("tsu --x");
        assert_eq!(r.get_assignment("num").unwrap().binding, Binding::Blank);
        assert_eq!(r.unassigned().len(), 1);
        assert_eq!(r.unassigned()[0].message(), "Unknown option '--x'");
    }

    #[test]
    fn test_too_many_arguments() {
        let r = req("tsu 4 5");
        assert_eq!(r.unassigned().len(), 1);
        assert_eq!(r.unassigned()[0].message(), "Too many arguments");
        assert_eq!(r.status(), Status::Error);
        assert_eq!(r.markup_codes(7), "VVVVVVE");
    }

    #[test]
    fn test_rest_swallows_remaining_tokens() {
        let r = req("tsr hello   big 'world'");
        let text = r.get_assignment("text").unwrap();
        assert_eq!(text.value(), Some(&Value::from("hello   big world")));
        assert!(r.unassigned().is_empty());
    }

    #[test]
    fn test_flags_anywhere_with_exact_flag_policy() {
        let r = req("tsf -n 3 hello --loud");
        assert_eq!(r.get_assignment("first").and_then(|a| a.value()), Some(&Value::from("hello")));
        assert_eq!(r.get_assignment("num").and_then(|a| a.value()), Some(&Value::from(3)));
        assert_eq!(r.get_assignment("loud").and_then(|a| a.value()), Some(&Value::Bool(true)));
        assert_eq!(r.status(), Status::Valid);
    }

    #[test]
    fn test_later_flag_repeat_overrides() {
        let r = req("tsf x -n 1 --num 2");
        assert_eq!(r.get_assignment("num").and_then(|a| a.value()), Some(&Value::from(2)));
    }

    #[test]
    fn test_named_flag_waiting_for_value() {
        let r = req("tsf hello --num ");
        let num = r.get_assignment("num").unwrap();
        assert_eq!(num.status(), Status::Incomplete);
        assert_eq!(r.current_assignment().name(), "num");
        assert_eq!(r.status(), Status::Incomplete);
    }

    #[test]
    fn test_partial_flag_is_incomplete_overflow() {
        let r = req("tsf hello --lo");
        assert_eq!(r.unassigned().len(), 1);
        assert_eq!(r.unassigned()[0].status(), Status::Incomplete);
        assert_eq!(r.unassigned()[0].predictions(), ["--loud"]);
        assert_eq!(r.hints().direct_tab_text, "ud");
    }

    #[test]
    fn test_positional_first_policy() {
        let r = req("tsp --second x");
        assert_eq!(r.get_assignment("first").and_then(|a| a.value()), Some(&Value::from("--second")));
        assert_eq!(r.get_assignment("second").and_then(|a| a.value()), Some(&Value::from("x")));

        let r = req("tsp a b --first");
        assert!(r.unassigned().is_empty());
        let first = r.get_assignment("first").unwrap();
        assert_eq!(first.arg_text(), " --first");
        assert_eq!(first.status(), Status::Incomplete);
    }

    #[test]
    fn test_set_cursor_changes_current_only() {
        let mut r = req("tsv option1 x");
        assert_eq!(r.current_assignment().name(), "optionValue");
        r.set_cursor(2);
        assert_eq!(r.current_assignment().name(), COMMAND_PARAM);
        r.set_cursor(100);
        assert_eq!(r.cursor(), 13);
    }

    #[test]
    fn test_args_cover_every_parameter() {
        let r = req("tsf hello");
        let args = r.args();
        assert_eq!(args.len(), 3);
        assert_eq!(args.get("num"), Some(&Value::Null));
        assert_eq!(args.get("loud"), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_canonical_substitutes_prefix() {
        let r = req("tsf  'hello world' --loud -n 3");
        assert_eq!(r.to_canonical(), "tsf \"hello world\" --num 3 --loud");
    }

    #[test]
    fn test_complete_at_cursor() {
        let r = req("tsn d");
        assert_eq!(r.complete_at_cursor(), Some(("tsn dif ".to_string(), 8)));

        let r = req("tsv option1 x");
        assert_eq!(r.complete_at_cursor(), None);
    }

    #[test]
    fn test_unicode_cursor_offsets() {
        let r = req("tsv option1 überall");
        assert_eq!(r.assignment_at(19).name(), "optionValue");
        assert_eq!(r.markup_codes(19).chars().count(), 19);
    }
}
