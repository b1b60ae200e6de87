// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Paragraph lines.
//!
//! A block owns a run of inline children and counts one extra unit for its
//! trailing newline. Its length and delta are memoized in the node's
//! [`BlockCache`](crate::node::BlockCache); every edit below ends by
//! emptying that cache.

use log::{debug, trace};

use crate::blots::bubble::bubble_formats;
use crate::delta::Delta;
use crate::error::TreeError;
use crate::formats::{FormatValue, Formats};
use crate::node::{BlockTag, NodeId, NodeKind};
use crate::registry::{blot_name, BlotKind, Definition, Scope};
use crate::scroll::{Insertion, Scroll};
use crate::text::utf16_len;
use crate::tree::header_tag;

pub const NEWLINE_LENGTH: usize = 1;

const INDENT: &str = "indent";

impl Scroll {
    pub(crate) fn block_length(&self, id: NodeId) -> usize {
        match self.kind(id) {
            Some(NodeKind::Block(block)) => *block
                .cache
                .length
                .get_or_init(|| self.children_length(id) + NEWLINE_LENGTH),
            _ => 0,
        }
    }

    pub(crate) fn block_delta(&self, id: NodeId) -> Result<&Delta, TreeError> {
        match &self.node(id)?.kind {
            NodeKind::Block(block) => Ok(block
                .cache
                .delta
                .get_or_init(|| self.compute_block_delta(id))),
            _ => Err(TreeError::NotALine(id)),
        }
    }

    /// The line's leaves with their composed formats, then its newline.
    pub(crate) fn compute_block_delta(&self, id: NodeId) -> Delta {
        let leaves = self.leaves(id);
        let mut delta = Delta::new();
        for &leaf in &leaves {
            if self.node_length(leaf) == 0 {
                continue;
            }
            if let Some(value) = self.node_value(leaf) {
                let formats = bubble_formats(self, Some(leaf), Formats::new());
                delta.insert(value, formats);
            }
        }
        let placeholder = match leaves.as_slice() {
            [only] => Some(*only).filter(|leaf| {
                self.kind(*leaf).is_some_and(NodeKind::is_placeholder)
            }),
            _ => None,
        };
        let newline = match placeholder {
            Some(placeholder) => self.empty_line_formats(id, placeholder),
            None => bubble_formats(self, Some(id), Formats::new()),
        };
        delta.insert("\n", newline);
        delta
    }

    /// An empty line has nothing but its placeholder to carry formats, so
    /// list membership and indent are copied onto the newline.
    fn empty_line_formats(&self, id: NodeId, placeholder: NodeId) -> Formats {
        let mut formats =
            bubble_formats(self, Some(placeholder), Formats::new());
        if let Some(NodeKind::Block(block)) = self.kind(id) {
            if block.tag == BlockTag::ListItem {
                if let Some(NodeKind::List(list)) =
                    self.parent(id).and_then(|parent| self.kind(parent))
                {
                    formats.insert(
                        blot_name::LIST.to_owned(),
                        list.as_ref().into(),
                    );
                }
            }
        }
        if let Some(indent @ FormatValue::Int(_)) =
            self.node_formats(id).get(INDENT)
        {
            formats.insert(INDENT.to_owned(), indent.clone());
        }
        formats
    }

    pub(crate) fn block_insert_at(
        &mut self,
        id: NodeId,
        index: usize,
        insertion: Insertion<'_>,
    ) -> Result<(), TreeError> {
        let text = match insertion {
            Insertion::Text(text) => text,
            Insertion::Embed { .. } => {
                self.container_insert_at(id, index, insertion)?;
                self.invalidate(id);
                return Ok(());
            }
        };
        if text.is_empty() {
            return Ok(());
        }
        let mut lines = text.split('\n');
        let first = lines.next().unwrap_or_default();
        if !first.is_empty() {
            let last = self.block_length(id) - NEWLINE_LENGTH;
            match self.tail(id) {
                Some(tail) if index >= last => {
                    let end = self.node_length(tail);
                    self.node_insert_at(tail, end, Insertion::Text(first))?;
                }
                _ => self.container_insert_at(
                    id,
                    index.min(last),
                    Insertion::Text(first),
                )?,
            }
            self.invalidate(id);
        }
        let mut block = id;
        let mut at = index + utf16_len(first);
        for line in lines {
            block = self
                .block_split(block, at, true)?
                .ok_or(TreeError::Detached(block))?;
            self.block_insert_at(block, 0, Insertion::Text(line))?;
            at = utf16_len(line);
        }
        Ok(())
    }

    pub(crate) fn block_delete_at(
        &mut self,
        id: NodeId,
        index: usize,
        length: usize,
    ) -> Result<(), TreeError> {
        self.container_delete_at(id, index, length)?;
        self.invalidate(id);
        Ok(())
    }

    /// Forced splits at either edge leave the content alone and add an
    /// empty copy of the line instead: before it when `index` is 0, after
    /// it otherwise. The line that now starts at `index` is returned.
    pub(crate) fn block_split(
        &mut self,
        id: NodeId,
        index: usize,
        force: bool,
    ) -> Result<Option<NodeId>, TreeError> {
        let last = self.block_length(id) - NEWLINE_LENGTH;
        if !(force && (index == 0 || index >= last)) {
            let next = self.container_split(id, index, force)?;
            self.invalidate(id);
            return Ok(next);
        }
        let parent = self.parent(id).ok_or(TreeError::Detached(id))?;
        let clone = self.clone_node(id)?;
        self.optimize_node(clone)?;
        if index == 0 {
            debug!("opening an empty line {clone} before {id}");
            self.insert_child(parent, clone, Some(id))?;
            Ok(Some(id))
        } else {
            debug!("opening an empty line {clone} after {id}");
            let next = self.next(id);
            self.insert_child(parent, clone, next)?;
            Ok(Some(clone))
        }
    }

    /// Link `child` and drop the line's placeholder break if it was the
    /// first child.
    pub(crate) fn block_insert_before(
        &mut self,
        id: NodeId,
        child: NodeId,
        before: Option<NodeId>,
    ) -> Result<(), TreeError> {
        let head = self.head(id);
        self.link(id, child, before)?;
        if let Some(head) = head.filter(|head| *head != child) {
            if matches!(self.kind(head), Some(NodeKind::Break))
                && self.parent(head) == Some(id)
            {
                trace!("dropping placeholder {head} from {id}");
                self.unlink(head)?;
                self.free(head);
            }
        }
        self.invalidate(id);
        Ok(())
    }

    /// Block formats apply only to a range ending exactly at the newline.
    /// Inline formats are clamped to the line.
    pub(crate) fn block_format_at(
        &mut self,
        id: NodeId,
        index: usize,
        length: usize,
        name: &str,
        value: &FormatValue,
    ) -> Result<(), TreeError> {
        if length == 0 {
            return Ok(());
        }
        let line_length = self.block_length(id);
        if self.registry.query(name, Scope::BLOCK).is_some() {
            if index + length == line_length {
                self.block_format(id, name, value)?;
            } else {
                trace!("{name} on {id} must reach the end of the line");
            }
        } else {
            let length = length.min(line_length.saturating_sub(index));
            self.container_format_at(id, index, length, name, value)?;
        }
        if self.is_live(id) {
            self.invalidate(id);
        }
        Ok(())
    }

    pub(crate) fn block_format(
        &mut self,
        id: NodeId,
        name: &str,
        value: &FormatValue,
    ) -> Result<(), TreeError> {
        let Some(definition) = self.registry.query(name, Scope::BLOCK).cloned()
        else {
            trace!("no block format named {name}");
            return Ok(());
        };
        match definition {
            Definition::Attribute(attributor) => {
                if let NodeKind::Block(block) = &mut self.node_mut(id)?.kind {
                    block.attributes.attribute(&attributor, value);
                }
            }
            Definition::Blot(def) => match def.kind {
                BlotKind::List => return self.format_list(id, value),
                BlotKind::Block => {
                    let current = match self.kind(id) {
                        Some(NodeKind::Block(block)) => block.tag,
                        _ => return Err(TreeError::NotALine(id)),
                    };
                    let tag = match (def.name.as_str(), value.is_truthy()) {
                        (blot_name::HEADER, true) => header_tag(value),
                        (_, true) => BlockTag::Paragraph,
                        (blot_name::HEADER, false)
                            if matches!(current, BlockTag::Header(_)) =>
                        {
                            BlockTag::Paragraph
                        }
                        _ => return Ok(()),
                    };
                    self.lift_out_of_list(id)?;
                    if let NodeKind::Block(block) = &mut self.node_mut(id)?.kind
                    {
                        block.tag = tag;
                    }
                }
                _ => trace!("{name} cannot format a line"),
            },
        }
        self.mark(id);
        Ok(())
    }

    /// Keep at least a placeholder so an empty line still has a length.
    pub(crate) fn block_optimize(
        &mut self,
        id: NodeId,
    ) -> Result<(), TreeError> {
        if self.children(id).is_empty() {
            let placeholder = self.create_break();
            self.insert_child(id, placeholder, None)?;
        }
        self.invalidate(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use speculoos::prelude::*;

    use super::*;
    use crate::delta::{InsertValue, Op};

    fn scroll_with_text(text: &str) -> Scroll {
        let mut scroll = Scroll::new();
        scroll.insert_text(0, text).unwrap();
        scroll
    }

    fn line_text(scroll: &Scroll, line: NodeId) -> String {
        scroll.node_delta(line).unwrap().text()
    }

    fn newline_formats(scroll: &Scroll, line: NodeId) -> Formats {
        let delta = scroll.node_delta(line).unwrap();
        match delta.ops().last() {
            Some(Op {
                insert: InsertValue::Text(text),
                attributes,
            }) if text.ends_with('\n') => attributes.clone(),
            other => panic!("line does not end in a newline: {other:?}"),
        }
    }

    #[test]
    fn length_counts_the_newline() {
        let scroll = scroll_with_text("héllo");
        let line = scroll.lines()[0];
        assert_eq!(scroll.node_length(line), 6);
        assert_eq!(scroll.node_length(line), scroll.children_length(line) + 1);
        assert_eq!(scroll.node_length(Scroll::new().lines()[0]), 1);
    }

    #[test]
    fn lengths_are_in_utf16_units() {
        let scroll = scroll_with_text("a😀");
        let line = scroll.lines()[0];
        assert_eq!(scroll.node_length(line), 4);
    }

    #[test]
    fn delta_tags_each_leaf_with_its_formats() {
        let mut scroll = scroll_with_text("Hello world");
        scroll.format_at(6, 5, "bold", &true.into()).unwrap();
        let line = scroll.lines()[0];
        let delta = scroll.node_delta(line).unwrap();
        assert_that!(delta.ops().len()).is_equal_to(3);
        assert_eq!(delta.ops()[0].insert, InsertValue::from("Hello "));
        assert_eq!(delta.ops()[1].insert, InsertValue::from("world"));
        assert_eq!(
            delta.ops()[1].attributes.get("bold"),
            Some(&FormatValue::Bool(true))
        );
        assert!(delta.ops()[2].attributes.is_empty());
    }

    #[test]
    fn newline_carries_the_line_formats() {
        let mut scroll = scroll_with_text("title");
        scroll.format_line(0, 1, "header", &FormatValue::Int(2)).unwrap();
        scroll.format_line(0, 1, "align", &"center".into()).unwrap();
        let line = scroll.lines()[0];
        let formats = newline_formats(&scroll, line);
        assert_eq!(formats.get("header"), Some(&FormatValue::Int(2)));
        assert_eq!(formats.get("align"), Some(&"center".into()));
    }

    #[test]
    fn empty_list_lines_keep_their_type() {
        let mut scroll = Scroll::new();
        scroll.insert_text(0, "\n\n").unwrap();
        scroll.format_line(0, 1, "list", &"ordered".into()).unwrap();
        scroll.format_line(1, 1, "list", &"bullet".into()).unwrap();
        let lines = scroll.lines();
        assert_eq!(
            newline_formats(&scroll, lines[0]).get("list"),
            Some(&"ordered".into())
        );
        assert_eq!(
            newline_formats(&scroll, lines[1]).get("list"),
            Some(&"bullet".into())
        );
        assert!(!newline_formats(&scroll, lines[2]).contains_key("list"));
    }

    #[test]
    fn empty_lines_keep_their_indent() {
        let mut scroll = Scroll::new();
        scroll.format_line(0, 1, "indent", &FormatValue::Int(3)).unwrap();
        let line = scroll.lines()[0];
        assert_eq!(
            newline_formats(&scroll, line).get("indent"),
            Some(&FormatValue::Int(3))
        );
    }

    #[test]
    fn empty_lines_drop_their_header() {
        let mut scroll = Scroll::new();
        scroll.format_line(0, 1, "header", &FormatValue::Int(1)).unwrap();
        let line = scroll.lines()[0];
        assert!(newline_formats(&scroll, line).is_empty());
    }

    #[test]
    fn multi_line_insert_splits_at_each_newline() {
        let mut scroll = scroll_with_text("xy");
        let before = scroll.len();
        scroll.insert_text(0, "ab\ncd").unwrap();
        let lines = scroll.lines();
        assert_that!(lines.len()).is_equal_to(2);
        assert_eq!(line_text(&scroll, lines[0]), "ab\n");
        assert_eq!(line_text(&scroll, lines[1]), "cdxy\n");
        assert_eq!(scroll.len(), before + 5);
    }

    #[test]
    fn three_line_insert_in_the_middle() {
        let mut scroll = scroll_with_text("xy");
        scroll.insert_text(1, "ab\ncd\nef").unwrap();
        let text: Vec<_> = scroll
            .lines()
            .into_iter()
            .map(|line| line_text(&scroll, line))
            .collect();
        assert_eq!(text, ["xab\n", "cd\n", "efy\n"]);
    }

    #[test]
    fn appending_at_the_end_extends_the_last_run() {
        let mut scroll = scroll_with_text("ab");
        scroll.format_at(0, 2, "bold", &true.into()).unwrap();
        scroll.insert_text(2, "c").unwrap();
        let line = scroll.lines()[0];
        let delta = scroll.node_delta(line).unwrap();
        assert_eq!(delta.ops()[0].insert, InsertValue::from("abc"));
        assert_eq!(
            delta.ops()[0].attributes.get("bold"),
            Some(&FormatValue::Bool(true))
        );
    }

    #[test]
    fn forced_split_at_the_start_opens_a_line_before() {
        let mut scroll = scroll_with_text("abc");
        scroll.format_line(0, 1, "align", &"right".into()).unwrap();
        let line = scroll.lines()[0];
        let result = scroll.block_split(line, 0, true).unwrap();
        scroll.optimize().unwrap();
        assert_eq!(result, Some(line));
        let lines = scroll.lines();
        assert_that!(lines.len()).is_equal_to(2);
        assert_eq!(lines[1], line);
        assert_eq!(line_text(&scroll, lines[0]), "\n");
        assert_eq!(
            scroll.node_formats(lines[0]).get("align"),
            Some(&"right".into())
        );
        assert_eq!(line_text(&scroll, line), "abc\n");
    }

    #[test]
    fn forced_split_at_the_end_opens_a_line_after() {
        let mut scroll = scroll_with_text("abc");
        let line = scroll.lines()[0];
        let clone = scroll.block_split(line, 3, true).unwrap().unwrap();
        scroll.optimize().unwrap();
        assert_eq!(scroll.lines(), vec![line, clone]);
        assert_eq!(line_text(&scroll, line), "abc\n");
        assert_eq!(line_text(&scroll, clone), "\n");
    }

    #[test]
    fn interior_split_divides_the_children() {
        let mut scroll = scroll_with_text("abcd");
        let line = scroll.lines()[0];
        let after = scroll.block_split(line, 1, true).unwrap().unwrap();
        scroll.optimize().unwrap();
        assert_eq!(line_text(&scroll, line), "a\n");
        assert_eq!(line_text(&scroll, after), "bcd\n");
    }

    #[test]
    fn inserting_content_drops_the_placeholder() {
        let mut scroll = Scroll::new();
        let line = scroll.lines()[0];
        let placeholder = scroll.head(line).unwrap();
        scroll.insert_text(0, "a").unwrap();
        assert!(!scroll.is_live(placeholder));
        assert_that!(scroll.children(line).len()).is_equal_to(1);
    }

    #[test]
    fn partial_block_format_is_ignored() {
        let mut scroll = scroll_with_text("abc");
        scroll.format_at(0, 2, "align", &"center".into()).unwrap();
        let line = scroll.lines()[0];
        assert!(newline_formats(&scroll, line).is_empty());
        scroll.format_at(2, 2, "align", &"center".into()).unwrap();
        assert_eq!(
            newline_formats(&scroll, line).get("align"),
            Some(&"center".into())
        );
    }

    #[test]
    fn inline_format_is_clamped_to_the_line() {
        let mut scroll = scroll_with_text("ab\ncd");
        let first = scroll.lines()[0];
        scroll.block_format_at(first, 1, 10, "bold", &true.into()).unwrap();
        scroll.optimize().unwrap();
        let delta = scroll.delta();
        assert_eq!(delta.ops()[1].insert, InsertValue::from("b"));
        assert!(delta.ops()[1].attributes.contains_key("bold"));
        assert_eq!(delta.ops()[2].insert, InsertValue::from("\ncd\n"));
    }

    #[test]
    fn zero_length_and_unknown_formats_change_nothing() {
        let mut scroll = scroll_with_text("abc");
        let before = scroll.delta();
        scroll.format_at(0, 0, "bold", &true.into()).unwrap();
        scroll.format_at(0, 3, "sparkle", &true.into()).unwrap();
        scroll.format_line(0, 1, "sparkle", &true.into()).unwrap();
        assert_eq!(scroll.delta(), before);
    }

    #[test]
    fn header_can_be_cleared() {
        let mut scroll = scroll_with_text("abc");
        scroll.format_line(0, 1, "header", &FormatValue::Int(9)).unwrap();
        let line = scroll.lines()[0];
        assert_eq!(
            newline_formats(&scroll, line).get("header"),
            Some(&FormatValue::Int(6))
        );
        scroll.format_line(0, 1, "header", &false.into()).unwrap();
        assert!(newline_formats(&scroll, line).is_empty());
    }

    #[test]
    fn cache_follows_every_edit() {
        let mut scroll = scroll_with_text("abc");
        let line = scroll.lines()[0];
        assert_eq!(scroll.node_length(line), 4);
        scroll.insert_text(1, "zz").unwrap();
        assert_eq!(scroll.node_length(line), 6);
        scroll.delete_at(0, 2).unwrap();
        assert_eq!(scroll.node_length(line), 4);
        assert_eq!(line_text(&scroll, line), "zbc\n");
        scroll.explicitly_assert_invariants();
    }
}
