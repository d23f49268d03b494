//! Display-agnostic rendering of execution outcomes
//!
//! Rendering is a pure function from an outcome to a [`RenderNode`] tree.
//! Displays turn the tree into whatever they draw with; the crate only
//! provides plain text flattening.

use serde::Serialize;

use crate::output::Outcome;
use crate::value::Value;

/// Structural display tree
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", content = "content", rename_all = "snake_case")]
pub enum RenderNode {
    Empty,
    Text(String),
    /// Children shown inline
    Line(Vec<RenderNode>),
    /// One child per line
    Block(Vec<RenderNode>),
    /// Bulleted items
    List(Vec<RenderNode>),
    Error(String),
}

impl RenderNode {
    /// Concatenated text, like a DOM `textContent`. Block and list
    /// children are separated by newlines.
    pub fn text_content(&self) -> String {
        match self {
            RenderNode::Empty => String::new(),
            RenderNode::Text(text) | RenderNode::Error(text) => text.clone(),
            RenderNode::Line(children) => children.iter().map(RenderNode::text_content).collect(),
            RenderNode::Block(children) | RenderNode::List(children) => children
                .iter()
                .map(RenderNode::text_content)
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    /// Indented plain text with bullets for lists
    pub fn to_plain(&self) -> String {
        let mut out = String::new();
        self.write_plain(0, &mut out);
        out.trim_end().to_string()
    }

    fn write_plain(&self, depth: usize, out: &mut String) {
        let indent = "  ".repeat(depth);
        match self {
            RenderNode::Empty => {}
            RenderNode::Text(_) | RenderNode::Line(_) => {
                out.push_str(&indent);
                out.push_str(&self.text_content());
                out.push('\n');
            }
            RenderNode::Error(message) => {
                out.push_str(&indent);
                out.push_str("Error: ");
                out.push_str(message);
                out.push('\n');
            }
            RenderNode::Block(children) => {
                for child in children {
                    child.write_plain(depth, out);
                }
            }
            RenderNode::List(items) => {
                for item in items {
                    match item {
                        RenderNode::Block(_) | RenderNode::List(_) => {
                            out.push_str(&indent);
                            out.push_str("-\n");
                            item.write_plain(depth + 1, out);
                        }
                        _ => {
                            out.push_str(&indent);
                            out.push_str("- ");
                            out.push_str(&item.text_content());
                            out.push('\n');
                        }
                    }
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, RenderNode::Empty)
    }
}

/// Render a completed outcome
pub fn render_outcome(outcome: &Outcome) -> RenderNode {
    match outcome {
        Ok(value) => render_value(value),
        Err(err) => RenderNode::Error(err.to_string()),
    }
}

pub fn render_value(value: &Value) -> RenderNode {
    match value {
        Value::Null => RenderNode::Empty,
        Value::Bool(_) | Value::Number(_) | Value::String(_) => RenderNode::Text(value.to_string()),
        Value::List(items) => RenderNode::List(items.iter().map(render_value).collect()),
        Value::Map(entries) => RenderNode::Block(
            entries
                .iter()
                .map(|(key, value)| {
                    RenderNode::Line(vec![
                        RenderNode::Text(format!("{}: ", key)),
                        render_value(value),
                    ])
                })
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::error::ExecutionError;

    #[test]
    fn test_scalars_render_as_text() {
        assert_eq!(render_value(&Value::from("hi")), RenderNode::Text("hi".into()));
        assert_eq!(render_value(&Value::from(3)).text_content(), "3");
        assert_eq!(render_value(&Value::Null), RenderNode::Empty);
    }

    #[test]
    fn test_map_renders_key_lines() {
        let mut map = BTreeMap::new();
        map.insert("a".to_string(), Value::from(1));
        map.insert("b".to_string(), Value::List(vec![Value::from("x"), Value::from("y")]));
        let node = render_value(&Value::Map(map));
        assert_eq!(node.text_content(), "a: 1\nb: x\ny");
        assert_eq!(node.to_plain(), "a: 1\nb: x\ny");
    }

    #[test]
    fn test_list_plain_has_bullets() {
        let node = render_value(&Value::List(vec![Value::from("tsn dif"), Value::from("tsn ext")]));
        assert_eq!(node.to_plain(), "- tsn dif\n- tsn ext");
        assert_eq!(node.text_content(), "tsn dif\ntsn ext");
    }

    #[test]
    fn test_error_outcome() {
        let node = render_outcome(&Err(ExecutionError::Handler("boom".into())));
        assert_eq!(node, RenderNode::Error("boom".into()));
        assert_eq!(node.to_plain(), "Error: boom");
    }

    #[test]
    fn test_rendering_is_idempotent() {
        let outcome = Ok(Value::List(vec![Value::from(1), Value::Null]));
        assert_eq!(render_outcome(&outcome), render_outcome(&outcome));
    }
}
