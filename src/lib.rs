//! requisition: live command-line input engine
//!
//! Turns a partially typed command line into a structured, continuously
//! validated request:
//! - nom-based tokenizer that keeps every source character
//! - command catalog with sub-commands, prefix predictions and suggestions
//! - parameter binder (positional, named, boolean flags, rest-of-line)
//! - per-assignment status on a `Valid < Incomplete < Error` lattice,
//!   cursor lookup, status markup and completion hints
//! - execution pipeline with synchronous and deferred handlers
//! - display-agnostic output rendering
//! - YAML catalog loader
//!
//! ```
//! use std::sync::Arc;
//! use requisition::{Command, CommandCatalog, Parameter, Reply, Session, Status};
//!
//! let mut catalog = CommandCatalog::new();
//! catalog
//!     .register(
//!         Command::new("echo")
//!             .param(Parameter::string("message").rest())
//!             .exec(|args, _| Ok(Reply::value(args.get_str("message").unwrap_or_default()))),
//!     )
//!     .unwrap();
//!
//! let mut session = Session::new(Arc::new(catalog));
//! session.set_input("echo", None);
//! assert_eq!(session.hints(), " <message>");
//!
//! session.set_input("echo hello world", None);
//! assert_eq!(session.status(), Status::Valid);
//! ```

pub mod assignment;
pub mod catalog;
pub mod command;
pub mod config;
pub mod error;
pub mod hints;
pub mod output;
pub mod render;
pub mod requisition;
pub mod session;
pub mod status;
pub mod tokenizer;
pub mod types;
pub mod value;

// Re-export commonly used types
pub use assignment::{Assignment, Binding, COMMAND_PARAM, UNASSIGNED_PARAM};
pub use catalog::CommandCatalog;
pub use command::{Command, FlagPolicy, Handler, Parameter};
pub use config::{CatalogConfig, CatalogLoader, HandlerRegistry};
pub use error::{CatalogError, ConfigError, DiagnosticKind, ExecutionError};
pub use hints::Hints;
pub use output::{Completer, ExecOptions, ExecutionContext, Outcome, Output, OutputRecord, Reply};
pub use render::{render_outcome, render_value, RenderNode};
pub use requisition::{Requisition, StatusSpan};
pub use session::{AssignmentSnapshot, InputSnapshot, Session};
pub use status::Status;
pub use tokenizer::{tokenize, ArgPart, Argument, TokenKind};
pub use types::{Conversion, ParamType};
pub use value::{Args, Value};
