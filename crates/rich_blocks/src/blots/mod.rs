// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Per-node operations, dispatched on [`NodeKind`].
//!
//! Each `node_*` method picks the behavior for the node's kind: lines live
//! in [`block`] and [`block_embed`], inline spans and leaves in
//! [`inline`], list containers in [`list`]. What is left here is the
//! shared container behavior those build on.

pub mod block;
pub mod block_embed;
pub mod bubble;
pub mod inline;
pub mod list;

use crate::delta::{Delta, InsertValue};
use crate::error::TreeError;
use crate::formats::{FormatValue, Formats};
use crate::node::{BlockTag, NodeId, NodeKind};
use crate::registry::{BlotKind, Scope};
use crate::scroll::{Insertion, Scroll};

impl Scroll {
    // ────────────────────────────────────────────────────────────────────
    // Queries
    // ────────────────────────────────────────────────────────────────────

    /// UTF-16 length of a node. Blocks count their trailing newline.
    pub fn node_length(&self, id: NodeId) -> usize {
        match self.kind(id) {
            Some(NodeKind::Block(_)) => self.block_length(id),
            Some(NodeKind::Text(text)) => text.len(),
            Some(NodeKind::Embed(_) | NodeKind::BlockEmbed(_)) => 1,
            Some(
                NodeKind::Scroll | NodeKind::List(_) | NodeKind::Inline(_),
            ) => self.children_length(id),
            Some(NodeKind::Break | NodeKind::Cursor) | None => 0,
        }
    }

    pub(crate) fn children_length(&self, id: NodeId) -> usize {
        self.children(id)
            .iter()
            .map(|child| self.node_length(*child))
            .sum()
    }

    /// The formats a node contributes itself, without its ancestors.
    pub fn node_formats(&self, id: NodeId) -> Formats {
        self.kind(id)
            .and_then(NodeKind::as_formattable)
            .map(|formattable| formattable.formats())
            .unwrap_or_default()
    }

    /// The insert value of a leaf.
    pub fn node_value(&self, id: NodeId) -> Option<InsertValue> {
        match self.kind(id)? {
            NodeKind::Text(text) => Some(InsertValue::Text(text.to_string())),
            NodeKind::Embed(embed) => Some(InsertValue::Embed(embed.clone())),
            NodeKind::BlockEmbed(embed) => {
                Some(InsertValue::Embed(embed.value.clone()))
            }
            NodeKind::Break | NodeKind::Cursor => {
                Some(InsertValue::Text(String::new()))
            }
            _ => None,
        }
    }

    /// The delta of a line, a list of lines, or the whole document.
    pub fn node_delta(&self, id: NodeId) -> Result<Delta, TreeError> {
        match &self.node(id)?.kind {
            NodeKind::Block(_) => self.block_delta(id).cloned(),
            NodeKind::BlockEmbed(_) => self.block_embed_delta(id),
            NodeKind::List(_) | NodeKind::Scroll => Ok(self
                .children(id)
                .iter()
                .filter_map(|child| self.node_delta(*child).ok())
                .fold(Delta::new(), Delta::concat)),
            _ => Err(TreeError::NotALine(id)),
        }
    }

    // ────────────────────────────────────────────────────────────────────
    // Edits
    // ────────────────────────────────────────────────────────────────────

    pub fn node_insert_at(
        &mut self,
        id: NodeId,
        index: usize,
        insertion: Insertion<'_>,
    ) -> Result<(), TreeError> {
        match &self.node(id)?.kind {
            NodeKind::Block(_) => self.block_insert_at(id, index, insertion),
            NodeKind::BlockEmbed(_) => {
                self.block_embed_insert_at(id, index, insertion)
            }
            NodeKind::Text(_) => self.text_insert_at(id, index, insertion),
            NodeKind::Break | NodeKind::Cursor | NodeKind::Embed(_) => {
                self.leaf_insert_at(id, index, insertion)
            }
            NodeKind::Scroll | NodeKind::List(_) | NodeKind::Inline(_) => {
                self.container_insert_at(id, index, insertion)
            }
        }
    }

    pub fn node_delete_at(
        &mut self,
        id: NodeId,
        index: usize,
        length: usize,
    ) -> Result<(), TreeError> {
        match &self.node(id)?.kind {
            NodeKind::Block(_) => self.block_delete_at(id, index, length),
            NodeKind::Text(_) => self.text_delete_at(id, index, length),
            NodeKind::Break
            | NodeKind::Cursor
            | NodeKind::Embed(_)
            | NodeKind::BlockEmbed(_) => self.remove(id),
            NodeKind::Scroll | NodeKind::List(_) | NodeKind::Inline(_) => {
                self.container_delete_at(id, index, length)
            }
        }
    }

    pub fn node_format_at(
        &mut self,
        id: NodeId,
        index: usize,
        length: usize,
        name: &str,
        value: &FormatValue,
    ) -> Result<(), TreeError> {
        match &self.node(id)?.kind {
            NodeKind::Block(_) => {
                self.block_format_at(id, index, length, name, value)
            }
            NodeKind::BlockEmbed(_) => self.block_embed_format(id, name, value),
            NodeKind::Inline(_) => {
                self.inline_format_at(id, index, length, name, value)
            }
            NodeKind::Text(_)
            | NodeKind::Break
            | NodeKind::Cursor
            | NodeKind::Embed(_) => {
                self.leaf_format_at(id, index, length, name, value)
            }
            NodeKind::Scroll | NodeKind::List(_) => {
                self.container_format_at(id, index, length, name, value)
            }
        }
    }

    /// Apply a format to the node as a whole.
    pub fn node_format(
        &mut self,
        id: NodeId,
        name: &str,
        value: &FormatValue,
    ) -> Result<(), TreeError> {
        match &self.node(id)?.kind {
            NodeKind::Block(_) => self.block_format(id, name, value),
            NodeKind::BlockEmbed(_) => self.block_embed_format(id, name, value),
            NodeKind::Inline(_) => self.inline_format(id, name, value),
            NodeKind::Text(_)
            | NodeKind::Break
            | NodeKind::Cursor
            | NodeKind::Embed(_) => self.wrap_leaf_format(id, name, value),
            NodeKind::Scroll | NodeKind::List(_) => Ok(()),
        }
    }

    /// Split `id` at `index`, returning the node that now starts there.
    /// Unforced splits at either edge move nothing: they return `id` itself
    /// at 0 and the next sibling at the end.
    pub fn node_split(
        &mut self,
        id: NodeId,
        index: usize,
        force: bool,
    ) -> Result<Option<NodeId>, TreeError> {
        match &self.node(id)?.kind {
            NodeKind::Block(_) => self.block_split(id, index, force),
            NodeKind::Text(_) => self.text_split(id, index, force),
            NodeKind::Break
            | NodeKind::Cursor
            | NodeKind::Embed(_)
            | NodeKind::BlockEmbed(_) => {
                Ok(if index == 0 { Some(id) } else { self.next(id) })
            }
            NodeKind::Scroll => Err(TreeError::Root("split")),
            NodeKind::List(_) | NodeKind::Inline(_) => {
                self.container_split(id, index, force)
            }
        }
    }

    // ────────────────────────────────────────────────────────────────────
    // Structure
    // ────────────────────────────────────────────────────────────────────

    /// Insert `child` into `parent` before `before`. Lines refuse bare
    /// inline blots: the scroll and list containers wrap them in a fresh
    /// line first.
    pub(crate) fn insert_child(
        &mut self,
        parent: NodeId,
        child: NodeId,
        before: Option<NodeId>,
    ) -> Result<(), TreeError> {
        let child_scope = self.node(child)?.scope;
        match &self.node(parent)?.kind {
            NodeKind::Block(_) => {
                self.block_insert_before(parent, child, before)
            }
            NodeKind::Scroll | NodeKind::List(_)
                if child_scope == Scope::INLINE_BLOT =>
            {
                let tag = match self.kind(parent) {
                    Some(NodeKind::List(_)) => BlockTag::ListItem,
                    _ => BlockTag::Paragraph,
                };
                let wrapper = self.create_block(tag);
                self.insert_child(wrapper, child, None)?;
                self.link(parent, wrapper, before)
            }
            NodeKind::List(_) => {
                if let NodeKind::Block(block) =
                    &mut self.node_mut(child)?.kind
                {
                    block.tag = BlockTag::ListItem;
                }
                self.link(parent, child, before)
            }
            _ => self.link(parent, child, before),
        }
    }

    pub(crate) fn remove_child(
        &mut self,
        parent: NodeId,
        child: NodeId,
    ) -> Result<(), TreeError> {
        self.unlink(child)?;
        if let Some(NodeKind::Block(_)) = self.kind(parent) {
            self.invalidate(parent);
        }
        Ok(())
    }

    /// Detach `id` and drop it with everything below it.
    pub(crate) fn remove(&mut self, id: NodeId) -> Result<(), TreeError> {
        if id == self.root {
            return Err(TreeError::Root("remove"));
        }
        if let Some(parent) = self.node(id)?.parent {
            self.remove_child(parent, id)?;
        }
        self.free(id);
        Ok(())
    }

    /// Move every child of `source` into `target` before `before`.
    pub(crate) fn move_children(
        &mut self,
        source: NodeId,
        target: NodeId,
        before: Option<NodeId>,
    ) -> Result<(), TreeError> {
        for child in self.children(source).to_vec() {
            self.insert_child(target, child, before)?;
        }
        self.invalidate(source);
        Ok(())
    }

    /// Cut `id` so that `[index, index + length)` is a node of its own,
    /// and return that node.
    pub(crate) fn isolate(
        &mut self,
        id: NodeId,
        index: usize,
        length: usize,
    ) -> Result<Option<NodeId>, TreeError> {
        let Some(target) = self.node_split(id, index, false)? else {
            return Ok(None);
        };
        self.node_split(target, length, false)?;
        Ok(Some(target))
    }

    /// Wrap `id` in a new blot called `name`.
    pub(crate) fn wrap(
        &mut self,
        id: NodeId,
        name: &str,
        value: &FormatValue,
    ) -> Result<NodeId, TreeError> {
        let wrapper = self.create(name, value)?;
        self.wrap_in(id, wrapper)?;
        Ok(wrapper)
    }

    /// Put `wrapper` where `id` is and move `id` into it.
    pub(crate) fn wrap_in(
        &mut self,
        id: NodeId,
        wrapper: NodeId,
    ) -> Result<(), TreeError> {
        let parent = self.parent(id).ok_or(TreeError::Detached(id))?;
        let next = self.next(id);
        self.insert_child(parent, wrapper, next)?;
        self.insert_child(wrapper, id, None)
    }

    /// Replace `id` by its children.
    pub(crate) fn unwrap(&mut self, id: NodeId) -> Result<(), TreeError> {
        let parent = self.parent(id).ok_or(TreeError::Detached(id))?;
        let next = self.next(id);
        self.move_children(id, parent, next)?;
        self.remove(id)
    }

    // ────────────────────────────────────────────────────────────────────
    // Containers
    // ────────────────────────────────────────────────────────────────────

    pub(crate) fn container_insert_at(
        &mut self,
        id: NodeId,
        index: usize,
        insertion: Insertion<'_>,
    ) -> Result<(), TreeError> {
        match self.find_child(id, index) {
            Some((child, offset)) => {
                self.node_insert_at(child, offset, insertion)
            }
            None => {
                let blot = self.create_insertion(insertion)?;
                self.insert_child(id, blot, None)
            }
        }
    }

    /// A detached blot holding `insertion`.
    pub(crate) fn create_insertion(
        &mut self,
        insertion: Insertion<'_>,
    ) -> Result<NodeId, TreeError> {
        match insertion {
            Insertion::Text(text) => Ok(self.create_text(text)),
            Insertion::Embed { name, value } => {
                match self.registry.blot(name)?.kind {
                    BlotKind::Embed
                    | BlotKind::BlockEmbed
                    | BlotKind::Cursor => {
                        self.create(name, &FormatValue::from(value))
                    }
                    _ => Err(TreeError::NotEmbeddable(name.to_owned())),
                }
            }
        }
    }

    pub(crate) fn container_delete_at(
        &mut self,
        id: NodeId,
        index: usize,
        length: usize,
    ) -> Result<(), TreeError> {
        if id != self.root && index == 0 && length == self.node_length(id) {
            return self.remove(id);
        }
        for (child, offset, span) in self.spans_at(id, index, length) {
            if self.is_live(child) {
                self.node_delete_at(child, offset, span)?;
            }
        }
        Ok(())
    }

    pub(crate) fn container_format_at(
        &mut self,
        id: NodeId,
        index: usize,
        length: usize,
        name: &str,
        value: &FormatValue,
    ) -> Result<(), TreeError> {
        for (child, offset, span) in self.spans_at(id, index, length) {
            if self.is_live(child) {
                self.node_format_at(child, offset, span, name, value)?;
            }
        }
        Ok(())
    }

    pub(crate) fn container_split(
        &mut self,
        id: NodeId,
        index: usize,
        force: bool,
    ) -> Result<Option<NodeId>, TreeError> {
        if !force {
            if index == 0 {
                return Ok(Some(id));
            }
            if index == self.node_length(id) {
                return Ok(self.next(id));
            }
        }
        let parent = self.parent(id).ok_or(TreeError::Detached(id))?;
        let after = self.clone_node(id)?;
        let next = self.next(id);
        self.insert_child(parent, after, next)?;
        let length = self.node_length(id);
        for (child, offset, _) in self.spans_at(id, index, length) {
            if !self.is_live(child) {
                continue;
            }
            if let Some(piece) = self.node_split(child, offset, force)? {
                self.insert_child(after, piece, None)?;
            }
        }
        Ok(Some(after))
    }

    // ────────────────────────────────────────────────────────────────────
    // Optimize
    // ────────────────────────────────────────────────────────────────────

    pub(crate) fn optimize_node(
        &mut self,
        id: NodeId,
    ) -> Result<(), TreeError> {
        match &self.node(id)?.kind {
            NodeKind::Scroll => {
                if self.children(id).is_empty() {
                    let block = self.create_block(BlockTag::Paragraph);
                    self.insert_child(id, block, None)?;
                }
                Ok(())
            }
            NodeKind::Block(_) => self.block_optimize(id),
            NodeKind::List(_) => self.list_optimize(id),
            NodeKind::Inline(_) => self.inline_optimize(id),
            NodeKind::Text(_) => self.text_optimize(id),
            NodeKind::Break => {
                if self.prev(id).is_some() || self.next(id).is_some() {
                    self.remove(id)?;
                }
                Ok(())
            }
            NodeKind::Cursor | NodeKind::Embed(_) | NodeKind::BlockEmbed(_) => {
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use speculoos::prelude::*;

    use super::*;

    fn scroll_with_text(text: &str) -> Scroll {
        let mut scroll = Scroll::new();
        scroll.insert_text(0, text).unwrap();
        scroll
    }

    #[test]
    fn inline_blots_under_the_scroll_get_a_line() {
        let mut scroll = Scroll::new();
        let text = scroll.create_text("loose");
        scroll.insert_child(scroll.root(), text, None).unwrap();
        let wrapper = scroll.parent(text).unwrap();
        assert!(matches!(scroll.kind(wrapper), Some(NodeKind::Block(_))));
        assert_eq!(scroll.parent(wrapper), Some(scroll.root()));
    }

    #[test]
    fn isolate_cuts_a_text_run_in_three() {
        let mut scroll = scroll_with_text("abcdef");
        let line = scroll.lines()[0];
        let text = scroll.head(line).unwrap();
        let middle = scroll.isolate(text, 2, 2).unwrap().unwrap();
        assert_eq!(
            scroll.node_value(middle),
            Some(InsertValue::Text("cd".to_owned()))
        );
        assert_that!(scroll.children(line).len()).is_equal_to(3);
    }

    #[test]
    fn unforced_container_split_at_the_edges_moves_nothing() {
        let mut scroll = scroll_with_text("abc");
        scroll.format_at(0, 3, "bold", &true.into()).unwrap();
        let line = scroll.lines()[0];
        let bold = scroll.head(line).unwrap();
        assert_eq!(scroll.node_split(bold, 0, false).unwrap(), Some(bold));
        assert_eq!(scroll.node_split(bold, 3, false).unwrap(), None);
        assert_that!(scroll.children(line).len()).is_equal_to(1);
    }

    #[test]
    fn unknown_embeds_are_rejected() {
        let mut scroll = Scroll::new();
        assert!(matches!(
            scroll.insert_embed(0, "marquee", "x"),
            Err(TreeError::UnknownBlot(_))
        ));
        assert!(matches!(
            scroll.insert_embed(0, "bold", "x"),
            Err(TreeError::NotEmbeddable(_))
        ));
    }

    #[test]
    fn removing_the_root_is_refused() {
        let mut scroll = Scroll::new();
        assert!(matches!(
            scroll.remove(scroll.root()),
            Err(TreeError::Root(_))
        ));
    }
}
