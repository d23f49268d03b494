//! Execution results
//!
//! Executing a requisition always produces an [`Output`], whether the
//! handler answers at once, defers, or fails. An output is a cheap clone
//! of shared completion state; it is detached from the requisition that
//! made it, so later edits never touch it.
//!
//! Deferred handlers call [`ExecutionContext::defer`] to get a
//! [`Completer`] and finish through it later, from any thread. The single
//! completion event runs registered callbacks and wakes [`Output::wait`].

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{info, warn};
use uuid::Uuid;

use crate::catalog::CommandCatalog;
use crate::command::Command;
use crate::error::ExecutionError;
use crate::render::{render_outcome, RenderNode};
use crate::value::{Args, Value};

/// Final result of an execution
pub type Outcome = Result<Value, ExecutionError>;

type Listener = Box<dyn FnOnce(&Outcome) + Send>;

/// Execution options
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecOptions {
    /// Keep the output out of the visible history
    pub hidden: bool,
}

impl ExecOptions {
    pub fn hidden() -> Self {
        Self { hidden: true }
    }

    pub fn visible() -> Self {
        Self { hidden: false }
    }
}

/// What a handler returns
#[derive(Clone, Debug, PartialEq)]
pub enum Reply {
    /// Completed now with this value
    Value(Value),
    /// Will complete later through the [`Completer`] from `ctx.defer()`
    Deferred,
}

impl Reply {
    pub fn value(value: impl Into<Value>) -> Self {
        Reply::Value(value.into())
    }
}

impl From<Value> for Reply {
    fn from(value: Value) -> Self {
        Reply::Value(value)
    }
}

// ============================================================================
// Completion State
// ============================================================================

struct CellState {
    outcome: Option<Outcome>,
    end: Option<DateTime<Utc>>,
    listeners: Vec<Listener>,
}

struct CompletionCell {
    state: Mutex<CellState>,
    done: watch::Sender<bool>,
}

impl CompletionCell {
    fn new() -> Self {
        let (done, _) = watch::channel(false);
        Self {
            state: Mutex::new(CellState {
                outcome: None,
                end: None,
                listeners: vec![],
            }),
            done,
        }
    }

    fn lock(&self) -> MutexGuard<'_, CellState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the outcome once. Returns `false` if already complete.
    fn complete(&self, outcome: Outcome) -> bool {
        let listeners = {
            let mut state = self.lock();
            if state.outcome.is_some() {
                return false;
            }
            state.outcome = Some(outcome.clone());
            state.end = Some(Utc::now());
            std::mem::take(&mut state.listeners)
        };

        self.done.send_replace(true);
        for listener in listeners {
            listener(&outcome);
        }
        true
    }
}

// ============================================================================
// Handler Context
// ============================================================================

/// Passed to every handler invocation
pub struct ExecutionContext {
    typed: String,
    command: String,
    cell: Arc<CompletionCell>,
    deferred: bool,
}

impl ExecutionContext {
    /// The input line being executed
    pub fn typed(&self) -> &str {
        &self.typed
    }

    pub fn command_name(&self) -> &str {
        &self.command
    }

    /// Switch to deferred completion. The handler must then return
    /// [`Reply::Deferred`] and finish through the returned handle.
    pub fn defer(&mut self) -> Completer {
        self.deferred = true;
        Completer {
            cell: Some(Arc::clone(&self.cell)),
            command: self.command.clone(),
        }
    }
}

/// One-shot handle that completes a deferred output.
///
/// Dropping it unfinished completes the output with
/// [`ExecutionError::Abandoned`].
pub struct Completer {
    cell: Option<Arc<CompletionCell>>,
    command: String,
}

impl Completer {
    pub fn complete(mut self, value: impl Into<Value>) {
        self.finish(Ok(value.into()));
    }

    pub fn fail(mut self, message: impl Into<String>) {
        self.finish(Err(ExecutionError::Handler(message.into())));
    }

    fn finish(&mut self, outcome: Outcome) {
        if let Some(cell) = self.cell.take() {
            let failed = outcome.is_err();
            if cell.complete(outcome) {
                info!(command = %self.command, failed, "Deferred command completed");
            } else {
                warn!(command = %self.command, "Ignoring second completion of command");
            }
        }
    }
}

impl Drop for Completer {
    fn drop(&mut self) {
        if let Some(cell) = self.cell.take() {
            if cell.complete(Err(ExecutionError::Abandoned(self.command.clone()))) {
                warn!(command = %self.command, "Deferred command abandoned");
            }
        }
    }
}

impl fmt::Debug for Completer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completer")
            .field("command", &self.command)
            .field("pending", &self.cell.is_some())
            .finish()
    }
}

// ============================================================================
// Output
// ============================================================================

/// Result record of one execution
#[derive(Clone)]
pub struct Output {
    id: Uuid,
    typed: String,
    command: Option<String>,
    args: Args,
    hidden: bool,
    start: DateTime<Utc>,
    cell: Arc<CompletionCell>,
}

impl Output {
    fn new(typed: &str, command: Option<String>, args: Args, hidden: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            typed: typed.to_string(),
            command,
            args,
            hidden,
            start: Utc::now(),
            cell: Arc::new(CompletionCell::new()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The input line as it was when executed
    pub fn typed(&self) -> &str {
        &self.typed
    }

    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }

    pub fn args(&self) -> &Args {
        &self.args
    }

    pub fn hidden(&self) -> bool {
        self.hidden
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.cell.lock().end
    }

    pub fn completed(&self) -> bool {
        self.cell.lock().outcome.is_some()
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.cell.lock().outcome.clone()
    }

    /// The value, once completed successfully
    pub fn value(&self) -> Option<Value> {
        self.outcome().and_then(Result::ok)
    }

    pub fn error(&self) -> Option<ExecutionError> {
        self.outcome().and_then(Result::err)
    }

    /// Run `callback` on completion, or right away if already complete
    pub fn on_complete<F>(&self, callback: F)
    where
        F: FnOnce(&Outcome) + Send + 'static,
    {
        let outcome = {
            let mut state = self.cell.lock();
            match &state.outcome {
                Some(outcome) => outcome.clone(),
                None => {
                    state.listeners.push(Box::new(callback));
                    return;
                }
            }
        };
        callback(&outcome);
    }

    /// Wait for completion
    pub async fn wait(&self) -> Outcome {
        let mut done = self.cell.done.subscribe();
        // The sender lives as long as `self`, so this only returns once set
        let _ = done.wait_for(|finished| *finished).await;
        self.outcome().unwrap_or_else(|| {
            Err(ExecutionError::Abandoned(
                self.command.clone().unwrap_or_default(),
            ))
        })
    }

    /// Display tree; `Empty` while pending
    pub fn render(&self) -> RenderNode {
        match self.outcome() {
            Some(outcome) => render_outcome(&outcome),
            None => RenderNode::Empty,
        }
    }

    /// Plain text of the rendered output
    pub fn to_text(&self) -> String {
        self.render().text_content()
    }

    /// Serialisable snapshot of the current state
    pub fn record(&self) -> OutputRecord {
        let outcome = self.outcome();
        OutputRecord {
            id: self.id,
            typed: self.typed.clone(),
            command: self.command.clone(),
            args: self.args.clone(),
            hidden: self.hidden,
            start: self.start,
            end: self.end(),
            completed: outcome.is_some(),
            value: outcome.clone().and_then(Result::ok),
            error: outcome.and_then(Result::err).map(|e| e.to_string()),
        }
    }
}

impl fmt::Debug for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Output")
            .field("id", &self.id)
            .field("typed", &self.typed)
            .field("command", &self.command)
            .field("outcome", &self.outcome())
            .finish()
    }
}

/// JSON shape of an [`Output`]
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OutputRecord {
    pub id: Uuid,
    pub typed: String,
    pub command: Option<String>,
    pub args: Args,
    pub hidden: bool,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    pub completed: bool,
    pub value: Option<Value>,
    pub error: Option<String>,
}

// ============================================================================
// Pipeline
// ============================================================================

/// Invoke the handler of `command` and wrap whatever happens in an output
pub(crate) fn run(
    catalog: &CommandCatalog,
    command: Option<&Arc<Command>>,
    typed: &str,
    args: Args,
    unresolved: String,
    options: ExecOptions,
) -> Output {
    let output = Output::new(typed, command.map(|c| c.name.clone()), args, options.hidden);

    let Some(command) = command else {
        let message = if unresolved.is_empty() {
            "No command".to_string()
        } else {
            unresolved
        };
        info!(typed, "Execution without a resolved command");
        output.cell.complete(Err(ExecutionError::UnknownCommand(message)));
        return output;
    };

    info!(command = %command.name, id = %output.id, hidden = options.hidden, "Executing command");

    let Some(handler) = command.handler() else {
        let children: Vec<Value> = catalog
            .children(&command.name)
            .into_iter()
            .filter(|c| !c.hidden)
            .map(|c| Value::String(c.name.clone()))
            .collect();
        output.cell.complete(Ok(Value::List(children)));
        return output;
    };

    let mut ctx = ExecutionContext {
        typed: typed.to_string(),
        command: command.name.clone(),
        cell: Arc::clone(&output.cell),
        deferred: false,
    };

    match handler(&output.args, &mut ctx) {
        Ok(Reply::Value(value)) => {
            if !output.cell.complete(Ok(value)) {
                warn!(command = %command.name, "Handler completed before returning a value");
            }
        }
        Ok(Reply::Deferred) if ctx.deferred => {}
        Ok(Reply::Deferred) => {
            warn!(command = %command.name, "Handler returned Deferred without deferring");
            output
                .cell
                .complete(Err(ExecutionError::NotDeferred(command.name.clone())));
        }
        Err(err) => {
            warn!(command = %command.name, error = %err, "Command handler failed");
            output
                .cell
                .complete(Err(ExecutionError::Handler(format!("{:#}", err))));
        }
    }

    output
}
