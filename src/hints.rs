//! Completion hints for the current input
//!
//! A [`Hints`] value is what a display shows after the typed text: the
//! rest of a unique completion, the parameters still waiting for input and
//! an arrow completion when the best prediction is not a simple
//! extension of what was typed.

use std::fmt;

use serde::Serialize;

use crate::requisition::{Owner, Requisition};

/// Completer data for one input state
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Hints {
    /// Text that tab would append at the cursor
    pub direct_tab_text: String,
    /// `<required>`, `[optional]` and `[options]` markers
    pub empty_parameters: Vec<String>,
    /// `-> prediction` when tab would replace the current argument
    pub arrow_tab_text: String,
    #[serde(skip)]
    lead_space: bool,
}

impl Hints {
    pub fn compute(requisition: &Requisition) -> Self {
        let typed = requisition.typed();
        let cursor = requisition.cursor();
        let at_end = cursor == typed.chars().count();
        let owner = requisition.owner_at(cursor);
        let current = requisition.assignment_for(owner);

        let mut hints = Hints {
            lead_space: !typed.ends_with(char::is_whitespace),
            ..Hints::default()
        };

        if !typed.trim().is_empty() {
            if let Some(prediction) = current.predictions().first() {
                let existing = requisition.typed_text_of(owner);
                if *prediction != existing {
                    match prediction.strip_prefix(existing.as_str()) {
                        Some(rest) if at_end => hints.direct_tab_text = rest.to_string(),
                        _ => hints.arrow_tab_text = format!("-> {}", prediction),
                    }
                }
            }
        }

        if requisition.command().is_none() {
            return hints;
        }

        let mut named_blank = false;
        for (i, assignment) in requisition.assignments().iter().enumerate() {
            if !assignment.is_blank() {
                continue;
            }
            let param = &assignment.param;
            if !param.is_positional() {
                named_blank = true;
                continue;
            }
            if owner == Owner::Param(i) && !hints.direct_tab_text.is_empty() {
                continue;
            }
            hints.empty_parameters.push(if param.required {
                format!("<{}>", param.name)
            } else {
                format!("[{}]", param.name)
            });
        }
        if named_blank {
            hints.empty_parameters.push("[options]".to_string());
        }

        hints
    }

    pub fn is_empty(&self) -> bool {
        self.direct_tab_text.is_empty()
            && self.empty_parameters.is_empty()
            && self.arrow_tab_text.is_empty()
    }
}

impl fmt::Display for Hints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = self.direct_tab_text.clone();
        if !self.empty_parameters.is_empty() {
            if self.lead_space || !out.is_empty() {
                out.push(' ');
            }
            out.push_str(&self.empty_parameters.join(" "));
        }
        if !self.arrow_tab_text.is_empty() {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(&self.arrow_tab_text);
        }
        f.write_str(out.trim_end())
    }
}
