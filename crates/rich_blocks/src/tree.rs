// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Arena primitives: allocation, linking, navigation and the optimize
//! pass.
//!
//! Every structural change goes through [`Scroll::link`] or
//! [`Scroll::unlink`], and every content change calls [`Scroll::mark`].
//! Marking puts the node and its ancestors on the dirty list for the next
//! optimize pass and empties the cache of every block on the way up, so a
//! block can never serve a length or delta computed before the change.

use std::cmp::Reverse;

use log::warn;
use widestring::Utf16String;

use crate::delta::Embed;
use crate::error::TreeError;
use crate::formats::FormatValue;
use crate::node::{
    BlockEmbedNode, BlockNode, BlockTag, InlineNode, Node, NodeId, NodeKind,
};
use crate::registry::{blot_name, BlotKind, ListType, Scope};
use crate::scroll::Scroll;
use crate::store::AttributeStore;

pub(crate) const MAX_OPTIMIZE_ITERATIONS: usize = 100;

impl Scroll {
    // ────────────────────────────────────────────────────────────────────
    // Allocation
    // ────────────────────────────────────────────────────────────────────

    pub(crate) fn alloc(&mut self, kind: NodeKind, scope: Scope) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(Some(Node::new(kind, scope)));
        id
    }

    pub(crate) fn create_block(&mut self, tag: BlockTag) -> NodeId {
        let scope =
            self.registry.scope_of(tag.blot_name(), Scope::BLOCK_BLOT);
        self.alloc(NodeKind::Block(BlockNode::new(tag)), scope)
    }

    pub(crate) fn create_text(&mut self, text: &str) -> NodeId {
        let scope =
            self.registry.scope_of(blot_name::TEXT, Scope::INLINE_BLOT);
        self.alloc(NodeKind::Text(Utf16String::from_str(text)), scope)
    }

    pub(crate) fn create_break(&mut self) -> NodeId {
        let scope =
            self.registry.scope_of(blot_name::BREAK, Scope::INLINE_BLOT);
        self.alloc(NodeKind::Break, scope)
    }

    /// Create a detached blot by registered name.
    pub(crate) fn create(
        &mut self,
        name: &str,
        value: &FormatValue,
    ) -> Result<NodeId, TreeError> {
        let def = self.registry.blot(name)?.clone();
        let invalid = || TreeError::InvalidValue {
            name: name.to_owned(),
            value: value.to_string(),
        };
        let kind = match def.kind {
            BlotKind::Scroll => return Err(TreeError::Root("create")),
            BlotKind::Block => NodeKind::Block(BlockNode::new(
                match name {
                    blot_name::HEADER => header_tag(value),
                    blot_name::LIST_ITEM => BlockTag::ListItem,
                    _ => BlockTag::Paragraph,
                },
            )),
            BlotKind::BlockEmbed => NodeKind::BlockEmbed(BlockEmbedNode::new(
                Embed::new(name, value.to_string()),
            )),
            BlotKind::List => NodeKind::List(
                value
                    .as_str()
                    .and_then(|s| s.parse::<ListType>().ok())
                    .ok_or_else(invalid)?,
            ),
            BlotKind::Inline => NodeKind::Inline(InlineNode::new(name, value)),
            BlotKind::Text => {
                NodeKind::Text(Utf16String::from_str(&value.to_string()))
            }
            BlotKind::Break => NodeKind::Break,
            BlotKind::Cursor => NodeKind::Cursor,
            BlotKind::Embed => {
                NodeKind::Embed(Embed::new(name, value.to_string()))
            }
        };
        Ok(self.alloc(kind, def.scope))
    }

    /// A shallow copy of `id`: same kind and formats, no children.
    pub(crate) fn clone_node(
        &mut self,
        id: NodeId,
    ) -> Result<NodeId, TreeError> {
        let node = self.node(id)?;
        let scope = node.scope;
        let kind = match &node.kind {
            NodeKind::Scroll => return Err(TreeError::Root("clone")),
            NodeKind::Block(block) => NodeKind::Block(block.shallow_clone()),
            NodeKind::BlockEmbed(embed) => {
                let copy = BlockEmbedNode::new(embed.value.clone());
                if let Some(store) = embed.attributes.get() {
                    let _ = copy.attributes.set(store.clone());
                }
                NodeKind::BlockEmbed(copy)
            }
            other => other.clone(),
        };
        Ok(self.alloc(kind, scope))
    }

    // ────────────────────────────────────────────────────────────────────
    // Lookup and navigation
    // ────────────────────────────────────────────────────────────────────

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index()).and_then(Option::as_ref)
    }

    pub(crate) fn node(&self, id: NodeId) -> Result<&Node, TreeError> {
        self.get(id).ok_or(TreeError::Missing(id))
    }

    pub(crate) fn node_mut(
        &mut self,
        id: NodeId,
    ) -> Result<&mut Node, TreeError> {
        self.nodes
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(TreeError::Missing(id))
    }

    pub(crate) fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.get(id).map(|node| &node.kind)
    }

    pub fn is_live(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// True when `id` is the root or hangs from it.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root {
                return true;
            }
            match self.get(current).and_then(|node| node.parent) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|node| node.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map_or(&[], |node| node.children.as_slice())
    }

    pub fn head(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).first().copied()
    }

    pub fn tail(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).last().copied()
    }

    pub(crate) fn position(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|child| *child == id)
    }

    pub fn next(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let position = self.position(id)?;
        self.children(parent).get(position + 1).copied()
    }

    pub fn prev(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let position = self.position(id)?;
        position
            .checked_sub(1)
            .and_then(|before| self.children(parent).get(before).copied())
    }

    pub(crate) fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = self.parent(id);
        while let Some(parent) = current {
            depth += 1;
            current = self.parent(parent);
        }
        depth
    }

    /// All nodes below `id` in document order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut stack: Vec<NodeId> =
            self.children(id).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            found.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        found
    }

    pub fn leaves(&self, id: NodeId) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|node| self.kind(*node).is_some_and(NodeKind::is_leaf))
            .collect()
    }

    /// Offset of `id` from the start of `ancestor`.
    pub(crate) fn offset_in(&self, id: NodeId, ancestor: NodeId) -> usize {
        let mut offset = 0;
        let mut current = id;
        while current != ancestor {
            let Some(parent) = self.parent(current) else {
                break;
            };
            offset += self
                .children(parent)
                .iter()
                .take_while(|sibling| **sibling != current)
                .map(|sibling| self.node_length(*sibling))
                .sum::<usize>();
            current = parent;
        }
        offset
    }

    /// The child of `parent` covering `index`, with the offset into it.
    /// Zero-length children never match.
    pub(crate) fn find_child(
        &self,
        parent: NodeId,
        index: usize,
    ) -> Option<(NodeId, usize)> {
        let mut index = index;
        for &child in self.children(parent) {
            let length = self.node_length(child);
            if index < length {
                return Some((child, index));
            }
            index -= length;
        }
        None
    }

    /// The children of `parent` touched by `[index, index + length)`, each
    /// with the offset and length that falls inside it. Zero-length
    /// children after the first match are included with length zero.
    pub(crate) fn spans_at(
        &self,
        parent: NodeId,
        index: usize,
        length: usize,
    ) -> Vec<(NodeId, usize, usize)> {
        let mut spans = Vec::new();
        if length == 0 {
            return spans;
        }
        let Some((start, offset)) = self.find_child(parent, index) else {
            return spans;
        };
        let children = self.children(parent);
        let first = children
            .iter()
            .position(|child| *child == start)
            .unwrap_or(children.len());
        let end = index + length;
        let mut current = index - offset;
        for &child in &children[first..] {
            if current >= end {
                break;
            }
            let child_length = self.node_length(child);
            if index > current {
                spans.push((
                    child,
                    index - current,
                    length.min(current + child_length - index),
                ));
            } else {
                spans.push((child, 0, child_length.min(end - current)));
            }
            current += child_length;
        }
        spans
    }

    // ────────────────────────────────────────────────────────────────────
    // Linking
    // ────────────────────────────────────────────────────────────────────

    /// Put `child` under `parent` before `before`, or last. The child is
    /// taken from its old parent first.
    pub(crate) fn link(
        &mut self,
        parent: NodeId,
        child: NodeId,
        before: Option<NodeId>,
    ) -> Result<(), TreeError> {
        if child == self.root {
            return Err(TreeError::Root("move"));
        }
        let before = match before {
            Some(reference) if reference == child => self.next(child),
            other => other,
        };
        self.node(parent)?;
        self.unlink(child)?;
        let position = match before {
            Some(reference) => self
                .children(parent)
                .iter()
                .position(|sibling| *sibling == reference)
                .ok_or(TreeError::NotAChild {
                    parent,
                    child: reference,
                })?,
            None => self.children(parent).len(),
        };
        self.node_mut(parent)?.children.insert(position, child);
        self.node_mut(child)?.parent = Some(parent);
        self.attach(child);
        self.mark(child);
        if let Some(previous) = self.prev(child) {
            self.mark(previous);
        }
        Ok(())
    }

    /// Raw append used while building a fresh tree.
    pub(crate) fn adopt(&mut self, parent: NodeId, child: NodeId) {
        if let Ok(node) = self.node_mut(parent) {
            node.children.push(child);
        }
        if let Ok(node) = self.node_mut(child) {
            node.parent = Some(parent);
        }
    }

    fn attach(&mut self, id: NodeId) {
        if let Some(NodeKind::BlockEmbed(embed)) =
            self.get(id).map(|node| &node.kind)
        {
            embed.attributes.get_or_init(AttributeStore::new);
        }
    }

    /// Take `child` out of its parent, if it has one. The node stays
    /// allocated.
    pub(crate) fn unlink(&mut self, child: NodeId) -> Result<(), TreeError> {
        let Some(parent) = self.node(child)?.parent else {
            return Ok(());
        };
        let previous = self.prev(child);
        self.node_mut(parent)?.children.retain(|sibling| *sibling != child);
        self.node_mut(child)?.parent = None;
        self.mark(parent);
        if let Some(previous) = previous {
            self.mark(previous);
        }
        Ok(())
    }

    /// Drop `id` and everything below it from the arena.
    pub(crate) fn free(&mut self, id: NodeId) {
        let children = self.children(id).to_vec();
        for child in children {
            self.free(child);
        }
        if let Some(slot) = self.nodes.get_mut(id.index()) {
            *slot = None;
        }
        self.dirty.remove(&id);
    }

    // ────────────────────────────────────────────────────────────────────
    // Invalidation
    // ────────────────────────────────────────────────────────────────────

    /// Record a change at `id`: it and its ancestors get optimized on the
    /// next pass, and their block caches are emptied.
    pub(crate) fn mark(&mut self, id: NodeId) {
        let mut current = Some(id);
        while let Some(node_id) = current {
            let Some(node) =
                self.nodes.get_mut(node_id.index()).and_then(Option::as_mut)
            else {
                break;
            };
            if let NodeKind::Block(block) = &mut node.kind {
                block.cache.clear();
            }
            self.dirty.insert(node_id);
            current = node.parent;
        }
    }

    /// Empty the cache of `id` if it is a block.
    pub(crate) fn invalidate(&mut self, id: NodeId) {
        if let Some(Node {
            kind: NodeKind::Block(block),
            ..
        }) = self.nodes.get_mut(id.index()).and_then(Option::as_mut)
        {
            block.cache.clear();
        }
    }

    // ────────────────────────────────────────────────────────────────────
    // Optimize pass
    // ────────────────────────────────────────────────────────────────────

    /// Optimize every dirty node, deepest first, until nothing is dirty.
    pub(crate) fn run_optimize(&mut self) -> Result<(), TreeError> {
        for _ in 0..MAX_OPTIMIZE_ITERATIONS {
            if self.dirty.is_empty() {
                return Ok(());
            }
            let mut batch: Vec<NodeId> = std::mem::take(&mut self.dirty)
                .into_iter()
                .filter(|id| self.is_attached(*id))
                .collect();
            batch.sort_by_key(|id| Reverse(self.depth(*id)));
            for id in batch {
                if self.is_attached(id) {
                    self.optimize_node(id)?;
                }
            }
        }
        if !self.dirty.is_empty() {
            warn!(
                "optimize did not settle after {MAX_OPTIMIZE_ITERATIONS} \
                 passes, {} nodes still dirty",
                self.dirty.len()
            );
            self.dirty.clear();
        }
        Ok(())
    }
}

pub(crate) fn header_tag(value: &FormatValue) -> BlockTag {
    let level = value.as_int().unwrap_or(1).clamp(1, 6);
    BlockTag::Header(u8::try_from(level).unwrap_or(1))
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
    fn find_child_skips_zero_length_children() {
        let scroll = Scroll::new();
        let block = scroll.head(scroll.root()).unwrap();
        assert_that!(scroll.find_child(block, 0)).is_none();
        assert_eq!(scroll.find_child(scroll.root(), 0), Some((block, 0)));
    }

    #[test]
    fn spans_cover_partial_first_and_last_children() {
        let scroll = scroll_with_text("ab\ncd\nef");
        let lines = scroll.lines();
        let spans = scroll.spans_at(scroll.root(), 1, 5);
        assert_eq!(spans, vec![(lines[0], 1, 2), (lines[1], 0, 3)]);
    }

    #[test]
    fn offsets_are_measured_from_the_ancestor() {
        let scroll = scroll_with_text("ab\ncd");
        let second = scroll.lines()[1];
        let text = scroll.head(second).unwrap();
        assert_eq!(scroll.offset_in(text, scroll.root()), 3);
        assert_eq!(scroll.offset_in(text, second), 0);
    }

    #[test]
    fn marking_empties_ancestor_caches() {
        let mut scroll = scroll_with_text("ab");
        let line = scroll.lines()[0];
        assert_eq!(scroll.node_length(line), 3);
        let text = scroll.head(line).unwrap();
        let Some(NodeKind::Block(block)) = scroll.kind(line) else {
            panic!("expected a block");
        };
        assert_that!(block.cache.length.get()).is_some();
        scroll.mark(text);
        let Some(NodeKind::Block(block)) = scroll.kind(line) else {
            panic!("expected a block");
        };
        assert_that!(block.cache.length.get()).is_none();
    }

    #[test]
    fn linking_a_node_before_itself_keeps_its_place() {
        let mut scroll = scroll_with_text("ab\ncd");
        let lines = scroll.lines();
        scroll.link(scroll.root(), lines[0], Some(lines[0])).unwrap();
        assert_eq!(scroll.lines(), lines);
    }

    #[test]
    fn freed_ids_are_never_reused() {
        let mut scroll = scroll_with_text("ab");
        let line = scroll.lines()[0];
        let text = scroll.head(line).unwrap();
        scroll.unlink(text).unwrap();
        scroll.free(text);
        assert!(!scroll.is_live(text));
        let fresh = scroll.create_text("x");
        assert_ne!(fresh, text);
    }

    #[test]
    fn linking_before_a_stranger_is_an_error() {
        let mut scroll = scroll_with_text("ab\ncd");
        let lines = scroll.lines();
        let text = scroll.head(lines[1]).unwrap();
        let fresh = scroll.create_text("x");
        assert!(matches!(
            scroll.link(lines[0], fresh, Some(text)),
            Err(TreeError::NotAChild { .. })
        ));
    }
}
