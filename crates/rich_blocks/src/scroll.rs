// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! The document root.
//!
//! Document-level operations address the whole tree by UTF-16 offset,
//! route to the lines they cover and finish with an optimize pass. The
//! `node_*` operations in [`crate::blots`] act on one node and leave the
//! optimize pass to the caller.

use std::collections::BTreeSet;

use log::debug;

use crate::blots::bubble::bubble_formats;
use crate::blots::block::NEWLINE_LENGTH;
use crate::delta::{Delta, Embed, InsertValue, Op};
use crate::error::TreeError;
use crate::formats::{diff_formats, FormatValue, Formats};
use crate::node::{BlockTag, Node, NodeId, NodeKind};
use crate::registry::{blot_name, BlotKind, Registry, Scope};

/// What to insert: text, or a registered embed with its value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Insertion<'a> {
    Text(&'a str),
    Embed { name: &'a str, value: &'a str },
}

impl<'a> From<&'a str> for Insertion<'a> {
    fn from(text: &'a str) -> Self {
        Self::Text(text)
    }
}

impl<'a> From<&'a Embed> for Insertion<'a> {
    fn from(embed: &'a Embed) -> Self {
        Self::Embed {
            name: &embed.name,
            value: &embed.value,
        }
    }
}

pub struct Scroll {
    pub(crate) registry: Registry,
    pub(crate) nodes: Vec<Option<Node>>,
    pub(crate) root: NodeId,
    pub(crate) dirty: BTreeSet<NodeId>,
}

impl Default for Scroll {
    fn default() -> Self {
        Self::new()
    }
}

impl Scroll {
    pub fn new() -> Self {
        Self::with_registry(Registry::default())
    }

    /// A document holding one empty paragraph.
    pub fn with_registry(registry: Registry) -> Self {
        let mut scroll = Self {
            registry,
            nodes: Vec::new(),
            root: NodeId::new(0),
            dirty: BTreeSet::new(),
        };
        let scope =
            scroll.registry.scope_of(blot_name::SCROLL, Scope::BLOCK_BLOT);
        scroll.root = scroll.alloc(NodeKind::Scroll, scope);
        let block = scroll.create_block(BlockTag::Paragraph);
        let placeholder = scroll.create_break();
        scroll.adopt(scroll.root, block);
        scroll.adopt(block, placeholder);
        scroll
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Document length, counting one for every line's newline.
    pub fn len(&self) -> usize {
        self.node_length(self.root)
    }

    /// True for a document holding only an empty line.
    pub fn is_empty(&self) -> bool {
        self.len() <= NEWLINE_LENGTH
    }

    // ────────────────────────────────────────────────────────────────────
    // Lines
    // ────────────────────────────────────────────────────────────────────

    /// The line covering `index` and the offset into it. The end of the
    /// document resolves to the last line.
    pub fn line(&self, index: usize) -> Option<(NodeId, usize)> {
        let length = self.len();
        if index == length && index > 0 {
            return self.line(index - 1);
        }
        self.descend_to_line(self.root, index)
    }

    fn descend_to_line(
        &self,
        parent: NodeId,
        index: usize,
    ) -> Option<(NodeId, usize)> {
        let (child, offset) = self.find_child(parent, index)?;
        match self.kind(child)? {
            kind if kind.is_line() => Some((child, offset)),
            NodeKind::List(_) => self.descend_to_line(child, offset),
            _ => None,
        }
    }

    /// Every line in document order, looking inside list containers.
    pub fn lines(&self) -> Vec<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|id| self.kind(*id).is_some_and(NodeKind::is_line))
            .collect()
    }

    /// The lines touched by `[index, index + length)`.
    pub fn lines_in(&self, index: usize, length: usize) -> Vec<NodeId> {
        let mut lines = Vec::new();
        self.collect_lines(self.root, index, length, &mut lines);
        lines
    }

    fn collect_lines(
        &self,
        parent: NodeId,
        index: usize,
        length: usize,
        lines: &mut Vec<NodeId>,
    ) {
        for (child, offset, span) in self.spans_at(parent, index, length) {
            match self.kind(child) {
                Some(kind) if kind.is_line() => lines.push(child),
                Some(NodeKind::List(_)) => {
                    self.collect_lines(child, offset, span, lines)
                }
                _ => {}
            }
        }
    }

    /// The leaf of `line` covering `offset`.
    pub(crate) fn leaf_at(
        &self,
        line: NodeId,
        offset: usize,
    ) -> Option<NodeId> {
        let (child, offset) = self.find_child(line, offset)?;
        if self.kind(child)?.is_leaf() {
            Some(child)
        } else {
            self.leaf_at(child, offset)
        }
    }

    /// The whole document as a delta.
    pub fn delta(&self) -> Delta {
        self.lines()
            .into_iter()
            .filter_map(|line| self.node_delta(line).ok())
            .fold(Delta::new(), Delta::concat)
    }

    /// The document's text; embeds are left out.
    pub fn text(&self) -> String {
        self.delta().text()
    }

    // ────────────────────────────────────────────────────────────────────
    // Editing
    // ────────────────────────────────────────────────────────────────────

    pub fn insert_at(
        &mut self,
        index: usize,
        insertion: Insertion<'_>,
    ) -> Result<(), TreeError> {
        if insertion == Insertion::Text("") {
            return Ok(());
        }
        let block_embed = match insertion {
            Insertion::Embed { name, .. } => {
                self.registry.blot_kind(name) == Some(BlotKind::BlockEmbed)
            }
            Insertion::Text(_) => false,
        };
        if index >= self.len() {
            if block_embed {
                let embed = self.create_insertion(insertion)?;
                self.insert_child(self.root, embed, None)?;
            } else {
                let block = self.create_block(BlockTag::Paragraph);
                self.insert_child(self.root, block, None)?;
                let insertion = match insertion {
                    Insertion::Text(text) => {
                        Insertion::Text(text.strip_suffix('\n').unwrap_or(text))
                    }
                    embed => embed,
                };
                self.node_insert_at(block, 0, insertion)?;
            }
        } else if block_embed {
            self.insert_block_embed(index, insertion)?;
        } else {
            self.node_insert_at(self.root, index, insertion)?;
        }
        self.finish()
    }

    pub fn insert_text(
        &mut self,
        index: usize,
        text: &str,
    ) -> Result<(), TreeError> {
        self.insert_at(index, Insertion::Text(text))
    }

    pub fn insert_embed(
        &mut self,
        index: usize,
        name: &str,
        value: &str,
    ) -> Result<(), TreeError> {
        self.insert_at(index, Insertion::Embed { name, value })
    }

    /// Place a block embed between lines, splitting the line at `index`
    /// when it falls inside it.
    fn insert_block_embed(
        &mut self,
        index: usize,
        insertion: Insertion<'_>,
    ) -> Result<(), TreeError> {
        let (line, offset) =
            self.line(index).ok_or(TreeError::NotALine(self.root))?;
        let embed = self.create_insertion(insertion)?;
        let before = if offset == 0 {
            Some(line)
        } else if offset >= self.node_length(line) - NEWLINE_LENGTH {
            self.next(line)
        } else {
            self.node_split(line, offset, false)?
        };
        let parent = self.parent(line).ok_or(TreeError::Detached(line))?;
        if let Some(NodeKind::List(_)) = self.kind(parent) {
            let grandparent =
                self.parent(parent).ok_or(TreeError::Detached(parent))?;
            let anchor = match before.and_then(|item| self.position(item)) {
                Some(0) => Some(parent),
                Some(position) => Some(self.divide_list(parent, position)?),
                None => self.next(parent),
            };
            self.insert_child(grandparent, embed, anchor)
        } else {
            self.insert_child(parent, embed, before)
        }
    }

    pub fn delete_at(
        &mut self,
        index: usize,
        length: usize,
    ) -> Result<(), TreeError> {
        if length == 0 {
            return Ok(());
        }
        let first = self.line(index);
        let last = self.line(index + length);
        self.node_delete_at(self.root, index, length)?;
        if let (Some((first, offset)), Some((last, _))) = (first, last) {
            if first != last
                && offset > 0
                && self.is_attached(first)
                && self.is_attached(last)
            {
                self.merge_lines(first, last)?;
            }
        }
        self.finish()
    }

    /// Fold what is left of `first` into the start of `last`.
    fn merge_lines(
        &mut self,
        first: NodeId,
        last: NodeId,
    ) -> Result<(), TreeError> {
        let is_embed =
            |id| matches!(self.kind(id), Some(NodeKind::BlockEmbed(_)));
        if is_embed(first) || is_embed(last) {
            return Ok(());
        }
        let before = self
            .head(last)
            .filter(|head| !matches!(self.kind(*head), Some(NodeKind::Break)));
        debug!("merging line {first} into {last}");
        self.move_children(first, last, before)?;
        self.remove(first)
    }

    pub fn format_at(
        &mut self,
        index: usize,
        length: usize,
        name: &str,
        value: &FormatValue,
    ) -> Result<(), TreeError> {
        self.node_format_at(self.root, index, length, name, value)?;
        self.finish()
    }

    /// Apply a line format to every line touched by the range.
    pub fn format_line(
        &mut self,
        index: usize,
        length: usize,
        name: &str,
        value: &FormatValue,
    ) -> Result<(), TreeError> {
        for line in self.lines_in(index, length.max(1)) {
            self.node_format(line, name, value)?;
        }
        self.finish()
    }

    /// Apply an insert-only delta from the start of the document. Each run
    /// is formatted with whatever its op's attributes add to, or remove
    /// from, the formats it inherited where it landed.
    pub fn apply_delta(&mut self, delta: &Delta) -> Result<(), TreeError> {
        let mut consume_next_newline = false;
        let mut scroll_length = self.len();
        let mut index = 0;
        for Op { insert, attributes } in delta.ops() {
            let length = insert.len();
            let mut attributes = attributes.clone();
            match insert {
                InsertValue::Text(text) => {
                    let mut text = text.as_str();
                    if consume_next_newline {
                        if let Some(stripped) = text.strip_suffix('\n') {
                            consume_next_newline = false;
                            text = stripped;
                        }
                    }
                    if index >= scroll_length && !text.ends_with('\n') {
                        consume_next_newline = true;
                    }
                    self.insert_at(index, Insertion::Text(text))?;
                    if let Some((line, offset)) = self.line(index) {
                        let mut formats =
                            bubble_formats(self, Some(line), Formats::new());
                        if let Some(NodeKind::Block(_)) = self.kind(line) {
                            let leaf = self.leaf_at(line, offset);
                            formats.extend(bubble_formats(
                                self,
                                leaf,
                                Formats::new(),
                            ));
                        }
                        attributes = diff_formats(&formats, &attributes);
                    }
                }
                InsertValue::Embed(embed) => {
                    self.insert_at(index, Insertion::from(embed))?;
                }
            }
            scroll_length += length;
            for (name, value) in &attributes {
                self.format_at(index, length, name, value)?;
            }
            index += length;
        }
        Ok(())
    }

    /// Replace the document with `delta`.
    pub fn set_contents(&mut self, delta: &Delta) -> Result<(), TreeError> {
        self.delete_at(0, self.len())?;
        self.apply_delta(delta)?;
        if let Some(Op {
            insert: InsertValue::Text(text),
            ..
        }) = delta.ops().last()
        {
            if text.ends_with('\n') {
                self.delete_at(self.len() - 1, 1)?;
            }
        }
        Ok(())
    }

    // ────────────────────────────────────────────────────────────────────
    // Cursor
    // ────────────────────────────────────────────────────────────────────

    /// Put a cursor marker at `index`, wrapped in `formats`, so an empty
    /// line remembers the formats pending at the caret.
    pub fn place_cursor(
        &mut self,
        index: usize,
        formats: &Formats,
    ) -> Result<NodeId, TreeError> {
        let (line, offset) =
            self.line(index).ok_or(TreeError::NotALine(self.root))?;
        if !matches!(self.kind(line), Some(NodeKind::Block(_))) {
            return Err(TreeError::NotALine(line));
        }
        let cursor =
            self.create(blot_name::CURSOR, &FormatValue::Bool(true))?;
        self.insert_node_at(line, offset, cursor)?;
        for (name, value) in formats {
            self.wrap_leaf_format(cursor, name, value)?;
        }
        self.finish()?;
        Ok(cursor)
    }

    pub fn remove_cursor(&mut self, cursor: NodeId) -> Result<(), TreeError> {
        match self.kind(cursor) {
            Some(NodeKind::Cursor) => {
                self.remove(cursor)?;
                self.finish()
            }
            Some(_) => Err(TreeError::NotACursor(cursor)),
            None => Err(TreeError::Missing(cursor)),
        }
    }

    /// Put an existing detached node at `index` inside `container`,
    /// descending to the leaf level.
    fn insert_node_at(
        &mut self,
        container: NodeId,
        index: usize,
        node: NodeId,
    ) -> Result<(), TreeError> {
        match self.find_child(container, index) {
            Some((child, offset)) if !self.node(child)?.kind.is_leaf() => {
                self.insert_node_at(child, offset, node)
            }
            Some((leaf, offset)) => {
                let before = self.node_split(leaf, offset, false)?;
                self.insert_child(container, node, before)
            }
            None => self.insert_child(container, node, None),
        }
    }

    // ────────────────────────────────────────────────────────────────────
    // Optimize and invariants
    // ────────────────────────────────────────────────────────────────────

    pub fn optimize(&mut self) -> Result<(), TreeError> {
        self.finish()
    }

    fn finish(&mut self) -> Result<(), TreeError> {
        self.run_optimize()?;
        #[cfg(feature = "assert-invariants")]
        self.explicitly_assert_invariants();
        Ok(())
    }

    /// Panics unless every parent link is mutual and every cached block
    /// length and delta equals a fresh computation.
    pub fn explicitly_assert_invariants(&self) {
        assert_eq!(self.parent(self.root), None, "the root has a parent");
        for (index, slot) in self.nodes.iter().enumerate() {
            let Some(node) = slot else {
                continue;
            };
            let id = NodeId::new(index);
            for child in &node.children {
                assert_eq!(
                    self.parent(*child),
                    Some(id),
                    "{child} does not point back to its parent {id}"
                );
            }
            if let NodeKind::Block(block) = &node.kind {
                if let Some(length) = block.cache.length.get() {
                    assert_eq!(
                        *length,
                        self.children_length(id) + NEWLINE_LENGTH,
                        "stale length cached on {id}"
                    );
                }
                if let Some(delta) = block.cache.delta.get() {
                    assert_eq!(
                        delta,
                        &self.compute_block_delta(id),
                        "stale delta cached on {id}"
                    );
                }
            }
        }
    }
}
