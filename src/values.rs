// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Values ferried between pipeline nodes, including the control tokens.
//!
//! Every node produces a [`Value`]: either user data (an arbitrary JSON
//! value), nothing at all, or one of two control tokens that downstream
//! execution reacts to:
//!
//! * [`Value::Skip`] — short-circuits the consuming node and all of its
//!   descendants; printed as `SKIP_EVENT`.
//! * [`Value::Ignore`] — dropped from the consuming node's positional
//!   inputs; printed as `IGNORE_EVENT`.
//!
//! Tokens are payload-free enum variants. Serialization emits only the
//! variant tag, so a token that crosses a worker boundary deserializes back
//! into the very same variant and remains recognisable by equality.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Keyword parameters handed to a unit invocation or construction.
pub type ParamMap = HashMap<String, serde_json::Value>;

/// The result of executing a single pipeline node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Value {
    /// No result. Units that exist for their side effects return this;
    /// absent inputs are filtered out before a downstream unit runs.
    None,
    /// Control token: do not execute this branch any further.
    Skip,
    /// Control token: treat this input as if it were never produced.
    Ignore,
    /// Ordinary user data.
    Data(serde_json::Value),
}

impl Value {
    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, Value::Skip)
    }

    pub fn is_ignore(&self) -> bool {
        matches!(self, Value::Ignore)
    }

    /// The inner JSON data, if this is a data value.
    pub fn data(&self) -> Option<&serde_json::Value> {
        match self {
            Value::Data(v) => Some(v),
            _ => None,
        }
    }

    /// The inner data as a string slice, if it is a JSON string.
    pub fn as_str(&self) -> Option<&str> {
        self.data().and_then(|v| v.as_str())
    }

    /// Short rendering for log records and error context.
    pub fn summary(&self) -> String {
        match self {
            Value::Data(v) => {
                let s = v.to_string();
                if s.chars().count() > 64 {
                    let truncated: String = s.chars().take(64).collect();
                    format!("{}…", truncated)
                } else {
                    s
                }
            }
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "NONE"),
            Value::Skip => write!(f, "SKIP_EVENT"),
            Value::Ignore => write!(f, "IGNORE_EVENT"),
            Value::Data(v) => write!(f, "{}", v),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::None,
            other => Value::Data(other),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Data(serde_json::Value::String(s.to_string()))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Data(serde_json::Value::String(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_display() {
        assert_eq!(Value::Skip.to_string(), "SKIP_EVENT");
        assert_eq!(Value::Ignore.to_string(), "IGNORE_EVENT");
    }

    #[test]
    fn test_tokens_equal_only_themselves() {
        assert_eq!(Value::Skip, Value::Skip);
        assert_eq!(Value::Ignore, Value::Ignore);
        assert_ne!(Value::Skip, Value::Ignore);
        assert_ne!(Value::Skip, Value::from("SKIP_EVENT"));
        assert_ne!(Value::Ignore, Value::None);
    }

    #[test]
    fn test_tokens_survive_serde_round_trip() {
        // Workers exchange values through the serde wire format; the tokens
        // must come back as the same sentinel.
        for token in [Value::Skip, Value::Ignore] {
            let wire = serde_json::to_string(&token).unwrap();
            let back: Value = serde_json::from_str(&wire).unwrap();
            assert_eq!(back, token);
        }
    }

    #[test]
    fn test_data_round_trip() {
        let value = Value::from("a_b_c");
        let wire = serde_json::to_string(&value).unwrap();
        let back: Value = serde_json::from_str(&wire).unwrap();
        assert_eq!(back, value);
        assert_eq!(back.as_str(), Some("a_b_c"));
    }

    #[test]
    fn test_null_json_becomes_none() {
        assert!(Value::from(serde_json::Value::Null).is_none());
    }
}
