//! Wire types and command builders.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Command interpreter name understood by the backend.
pub const TAO: &str = "tao";

/// One request to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub cmd: String,
    pub val: String,
}

impl Command {
    pub fn tao(val: impl Into<String>) -> Self {
        Self {
            cmd: TAO.to_string(),
            val: val.into(),
        }
    }

    /// List every non-slave wiggler element.
    ///
    /// The reply has one line per element plus a trailing summary line.
    pub fn show_wigglers() -> Self {
        Self::tao("show ele -no_slaves Wiggler::*  ")
    }

    /// Tabulate `attribute` for elements matching `pattern`.
    pub fn show_attribute(attribute: &str, pattern: &str) -> Self {
        Self::tao(format!(
            "show lat -no_label_lines -attribute {attribute} {pattern}"
        ))
    }

    /// Set `attribute` of `element` to `value`.
    pub fn set_attribute(element: &str, attribute: &str, value: f64) -> Self {
        Self::tao(format!("set ele {element} {attribute} = {value}"))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.cmd, self.val.trim_end())
    }
}

/// One reply from the backend.
///
/// Only `result` is interpreted; any other fields the backend echoes are
/// kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    #[serde(default)]
    pub result: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Reply {
    pub fn lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            result: lines.into_iter().map(Into::into).collect(),
            extra: Map::new(),
        }
    }

    /// Error text reported by the backend, if any.
    pub fn error(&self) -> Option<&str> {
        self.extra.get("error").and_then(Value::as_str)
    }
}
