// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Insert-only change operations.
//!
//! A [`Delta`] is the linear form of a document or of one line: a sequence
//! of inserts, each carrying the formats composed for that run. It
//! serializes to the usual JSON shape:
//!
//! ```json
//! {"ops":[{"insert":"Hi","attributes":{"bold":true}},{"insert":"\n"}]}
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::TreeError;
use crate::formats::Formats;
use crate::text::utf16_len;

/// An embedded object, written as a single-key map `{name: value}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, String>",
    into = "BTreeMap<String, String>"
)]
pub struct Embed {
    pub name: String,
    pub value: String,
}

impl Embed {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl TryFrom<BTreeMap<String, String>> for Embed {
    type Error = TreeError;

    fn try_from(map: BTreeMap<String, String>) -> Result<Self, Self::Error> {
        if map.len() != 1 {
            return Err(TreeError::InvalidEmbed(map.len()));
        }
        map.into_iter()
            .next()
            .map(|(name, value)| Self { name, value })
            .ok_or(TreeError::InvalidEmbed(0))
    }
}

impl From<Embed> for BTreeMap<String, String> {
    fn from(embed: Embed) -> Self {
        BTreeMap::from([(embed.name, embed.value)])
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InsertValue {
    Text(String),
    Embed(Embed),
}

impl InsertValue {
    /// UTF-16 length; an embed counts as one.
    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => utf16_len(text),
            Self::Embed(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Text(text) if text.is_empty())
    }
}

impl From<&str> for InsertValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<String> for InsertValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Embed> for InsertValue {
    fn from(embed: Embed) -> Self {
        Self::Embed(embed)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Op {
    pub insert: InsertValue,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: Formats,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delta {
    ops: Vec<Op>,
}

impl Delta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, TreeError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, TreeError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn insert(
        &mut self,
        value: impl Into<InsertValue>,
        attributes: Formats,
    ) -> &mut Self {
        self.push(Op {
            insert: value.into(),
            attributes,
        })
    }

    /// Append `op`, dropping empty text and folding text into the previous
    /// op when both carry the same attributes.
    pub fn push(&mut self, op: Op) -> &mut Self {
        if op.insert.is_empty() {
            return self;
        }
        if let (
            Some(Op {
                insert: InsertValue::Text(last),
                attributes: last_attributes,
            }),
            InsertValue::Text(text),
        ) = (self.ops.last_mut(), &op.insert)
        {
            if *last_attributes == op.attributes {
                last.push_str(text);
                return self;
            }
        }
        self.ops.push(op);
        self
    }

    pub fn concat(mut self, other: Delta) -> Self {
        for op in other.ops {
            self.push(op);
        }
        self
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn length(&self) -> usize {
        self.ops.iter().map(|op| op.insert.len()).sum()
    }

    /// The text inserts joined together; embeds are skipped.
    pub fn text(&self) -> String {
        self.ops
            .iter()
            .filter_map(|op| match &op.insert {
                InsertValue::Text(text) => Some(text.as_str()),
                InsertValue::Embed(_) => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use speculoos::prelude::*;

    use super::*;
    use crate::formats::FormatValue;

    fn bold() -> Formats {
        Formats::from([("bold".to_owned(), FormatValue::Bool(true))])
    }

    #[test]
    fn adjacent_text_with_equal_attributes_merges() {
        let mut delta = Delta::new();
        delta.insert("ab", Formats::new()).insert("cd", Formats::new());
        assert_that!(delta.ops().len()).is_equal_to(1);
        assert_eq!(delta.text(), "abcd");
    }

    #[test]
    fn different_attributes_stay_separate() {
        let mut delta = Delta::new();
        delta.insert("ab", Formats::new()).insert("cd", bold());
        assert_that!(delta.ops().len()).is_equal_to(2);
    }

    #[test]
    fn empty_text_is_skipped() {
        let mut delta = Delta::new();
        delta.insert("", bold());
        assert!(delta.is_empty());
    }

    #[test]
    fn embeds_never_merge_and_count_as_one() {
        let mut delta = Delta::new();
        delta
            .insert(Embed::new("image", "a.png"), Formats::new())
            .insert(Embed::new("image", "a.png"), Formats::new())
            .insert("😀", Formats::new());
        assert_that!(delta.ops().len()).is_equal_to(3);
        assert_eq!(delta.length(), 4);
        assert_eq!(delta.text(), "😀");
    }

    #[test]
    fn concat_merges_across_the_seam() {
        let mut left = Delta::new();
        left.insert("a\n", Formats::new());
        let mut right = Delta::new();
        right.insert("b\n", Formats::new());
        let joined = left.concat(right);
        assert_that!(joined.ops().len()).is_equal_to(1);
        assert_eq!(joined.text(), "a\nb\n");
    }

    #[test]
    fn serializes_to_the_conventional_json_shape() {
        let mut delta = Delta::new();
        delta
            .insert("Hi", bold())
            .insert(Embed::new("video", "https://v"), Formats::new())
            .insert("\n", Formats::new());
        assert_eq!(
            delta.to_json().unwrap(),
            r#"{"ops":[{"insert":"Hi","attributes":{"bold":true}},{"insert":{"video":"https://v"}},{"insert":"\n"}]}"#
        );
    }

    #[test]
    fn parses_json_with_embeds_and_attributes() {
        let delta = Delta::from_json(
            r#"{"ops":[{"insert":{"image":"x.png"}},{"insert":"\n","attributes":{"align":"center"}}]}"#,
        )
        .unwrap();
        assert_eq!(
            delta.ops()[0].insert,
            InsertValue::Embed(Embed::new("image", "x.png"))
        );
        assert_eq!(
            delta.ops()[1].attributes.get("align"),
            Some(&FormatValue::from("center"))
        );
    }

    #[test]
    fn embed_with_two_keys_is_rejected() {
        let result = Delta::from_json(
            r#"{"ops":[{"insert":{"image":"x.png","video":"y"}}]}"#,
        );
        assert!(result.is_err());
    }
}
