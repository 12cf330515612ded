#![forbid(unsafe_code)]

//! Error types.
//!
//! Configuration errors come from wiring containers together and are fatal
//! for the container being initialized. Structural errors come from direct
//! positional edits.

use std::fmt;

/// A container relationship graph that cannot be wired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A set names the same other set as both its superset and its base.
    SubsetAndExtensionOfSame { set: String, other: String },
    /// `set` is a subset of `superset`, which is an extension of `set`.
    SubsetOfExtension { set: String, superset: String },
    /// `set` is an extension of `base`, which is a subset of `set`.
    ExtensionOfSubset { set: String, base: String },
    /// A related set was dropped before the relationship could be wired.
    MissingRelation { set: String, relation: &'static str },
    /// Two containers registered under the same name.
    DuplicateName(String),
    /// Lookup of a container name that was never registered.
    UnknownName(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SubsetAndExtensionOfSame { set, other } => write!(
                f,
                "set '{set}' cannot be both a subset and an extension of '{other}'"
            ),
            Self::SubsetOfExtension { set, superset } => write!(
                f,
                "set '{set}' is a subset of '{superset}', and '{superset}' is an extension of '{set}'"
            ),
            Self::ExtensionOfSubset { set, base } => write!(
                f,
                "set '{set}' is an extension of '{base}', and '{base}' is a subset of '{set}'"
            ),
            Self::MissingRelation { set, relation } => {
                write!(f, "set '{set}' refers to a dropped {relation} set")
            }
            Self::DuplicateName(name) => write!(f, "container '{name}' is already registered"),
            Self::UnknownName(name) => write!(f, "no container named '{name}'"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Failure of a direct structural edit on a set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetError {
    /// Positional access past the end of the contents.
    IndexOutOfRange { index: usize, len: usize },
}

impl fmt::Display for SetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IndexOutOfRange { index, len } => {
                write!(f, "index {index} out of range for set of length {len}")
            }
        }
    }
}

impl std::error::Error for SetError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_messages_name_both_sets() {
        let e = ConfigError::SubsetOfExtension {
            set: "enemies".into(),
            superset: "actors".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("enemies"));
        assert!(msg.contains("actors"));
    }

    #[test]
    fn index_out_of_range_message() {
        let e = SetError::IndexOutOfRange { index: 5, len: 2 };
        assert_eq!(e.to_string(), "index 5 out of range for set of length 2");
    }
}
