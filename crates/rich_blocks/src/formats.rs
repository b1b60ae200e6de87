// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The value of a single format, as it appears in delta attributes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FormatValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

/// Format name to value. Ordered so that equal maps compare and serialize
/// identically.
pub type Formats = BTreeMap<String, FormatValue>;

impl FormatValue {
    /// `false`, `0` and `""` clear a format; everything else sets it.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Int(n) => *n != 0,
            Self::Str(s) => !s.is_empty(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Str(s) => s.parse().ok(),
            Self::Bool(_) => None,
        }
    }
}

impl fmt::Display for FormatValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<bool> for FormatValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for FormatValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for FormatValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for FormatValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

/// The attributes that turn `from` into `to`. Keys missing from `to` map
/// to `false` so that applying the result clears them.
pub fn diff_formats(from: &Formats, to: &Formats) -> Formats {
    let mut changes: Formats = to
        .iter()
        .filter(|(name, value)| from.get(*name) != Some(*value))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();
    for name in from.keys() {
        if !to.contains_key(name) {
            changes.insert(name.clone(), FormatValue::Bool(false));
        }
    }
    changes
}
