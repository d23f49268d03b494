//! Explicit display context
//!
//! A [`Session`] is what a display talks to: it holds the input text, the
//! cursor, the live [`Requisition`] and the history of visible outputs.
//! Each display owns its own session; nothing is process-wide.

use std::sync::Arc;

use serde::Serialize;

use crate::catalog::CommandCatalog;
use crate::output::{ExecOptions, Output};
use crate::requisition::{Requisition, StatusSpan};
use crate::status::Status;
use crate::value::Value;

/// Input state as seen by a display
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct InputSnapshot {
    pub input: String,
    pub cursor: usize,
    /// Name of the assignment under the cursor
    pub current: String,
    pub status: Status,
    /// One status code per input char
    pub markup: String,
    pub hints: String,
    pub command: Option<String>,
    pub predictions: Vec<String>,
    pub assignments: Vec<AssignmentSnapshot>,
    pub unassigned: Vec<AssignmentSnapshot>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AssignmentSnapshot {
    pub name: String,
    pub value: Option<Value>,
    /// Source text bound to the parameter
    pub arg: String,
    pub status: Status,
    pub message: String,
}

/// Owner of one live command line and its history
#[derive(Debug)]
pub struct Session {
    requisition: Requisition,
    history: Vec<Output>,
}

impl Session {
    pub fn new(catalog: Arc<CommandCatalog>) -> Self {
        Self {
            requisition: Requisition::new(catalog),
            history: vec![],
        }
    }

    pub fn set_input(&mut self, input: &str, cursor: Option<usize>) {
        self.requisition.set_input(input, cursor);
    }

    pub fn set_cursor(&mut self, cursor: usize) {
        self.requisition.set_cursor(cursor);
    }

    pub fn input(&self) -> &str {
        self.requisition.typed()
    }

    pub fn cursor(&self) -> usize {
        self.requisition.cursor()
    }

    pub fn requisition(&self) -> &Requisition {
        &self.requisition
    }

    pub fn status(&self) -> Status {
        self.requisition.status()
    }

    pub fn hints(&self) -> String {
        self.requisition.hints().to_string()
    }

    pub fn markup(&self) -> String {
        self.requisition.markup_codes(self.cursor())
    }

    pub fn markup_spans(&self) -> Vec<StatusSpan> {
        self.requisition.input_status_markup(self.cursor())
    }

    /// Name of the assignment under the cursor
    pub fn current(&self) -> &str {
        self.requisition.current_assignment().name()
    }

    /// Execute the current line. Visible outputs go to the history.
    pub fn exec(&mut self, options: ExecOptions) -> Output {
        let output = self.requisition.execute(options);
        if !options.hidden {
            self.history.push(output.clone());
        }
        output
    }

    /// Replace the input, then execute it
    pub fn exec_typed(&mut self, input: &str, options: ExecOptions) -> Output {
        self.set_input(input, None);
        self.exec(options)
    }

    /// Apply tab completion. Returns whether the input changed.
    pub fn tab(&mut self) -> bool {
        match self.requisition.complete_at_cursor() {
            Some((input, cursor)) => {
                self.set_input(&input, Some(cursor));
                true
            }
            None => false,
        }
    }

    pub fn history(&self) -> &[Output] {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn snapshot(&self) -> InputSnapshot {
        let r = &self.requisition;
        let current = r.current_assignment();
        InputSnapshot {
            input: r.typed().to_string(),
            cursor: r.cursor(),
            current: current.name().to_string(),
            status: r.status(),
            markup: self.markup(),
            hints: self.hints(),
            command: r.command().map(|c| c.name.clone()),
            predictions: current.predictions().to_vec(),
            assignments: r.assignments().iter().map(snapshot_of).collect(),
            unassigned: r.unassigned().iter().map(snapshot_of).collect(),
        }
    }
}

fn snapshot_of(assignment: &crate::assignment::Assignment) -> AssignmentSnapshot {
    AssignmentSnapshot {
        name: assignment.name().to_string(),
        value: assignment.value().cloned(),
        arg: assignment.arg_text(),
        status: assignment.status(),
        message: assignment.message().to_string(),
    }
}
