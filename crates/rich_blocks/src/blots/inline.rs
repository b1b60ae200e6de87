// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Inline containers, text runs and inline leaves.
//!
//! Inline formats are expressed as nesting: formatting a range isolates it
//! and wraps it in an inline blot named after the format. The optimize pass
//! then restores the canonical shape, where adjacent equal wrappers are
//! merged and wrappers nest in [`Registry::compare_inline`] order.
//!
//! [`Registry::compare_inline`]: crate::Registry::compare_inline

use log::trace;

use crate::error::TreeError;
use crate::formats::FormatValue;
use crate::node::{InlineNode, NodeId, NodeKind};
use crate::registry::{blot_name, BlotKind, Definition, Scope};
use crate::scroll::{Insertion, Scroll};
use crate::store::AttributeStore;
use crate::text::{splice, split_at};

impl Scroll {
    // ────────────────────────────────────────────────────────────────────
    // Leaves
    // ────────────────────────────────────────────────────────────────────

    /// Put a new blot for `insertion` beside the leaf, splitting it first.
    pub(crate) fn leaf_insert_at(
        &mut self,
        id: NodeId,
        index: usize,
        insertion: Insertion<'_>,
    ) -> Result<(), TreeError> {
        let blot = self.create_insertion(insertion)?;
        let parent = self.parent(id).ok_or(TreeError::Detached(id))?;
        let before = self.node_split(id, index, false)?;
        self.insert_child(parent, blot, before)
    }

    pub(crate) fn leaf_format_at(
        &mut self,
        id: NodeId,
        index: usize,
        length: usize,
        name: &str,
        value: &FormatValue,
    ) -> Result<(), TreeError> {
        if self.kind(id).is_some_and(NodeKind::is_placeholder) {
            return Ok(());
        }
        match self.isolate(id, index, length)? {
            Some(target) => self.wrap_leaf_format(target, name, value),
            None => Ok(()),
        }
    }

    /// Format a whole leaf by wrapping it: in the inline blot `name`, or in
    /// a generic inline holding the attribute `name`.
    pub(crate) fn wrap_leaf_format(
        &mut self,
        id: NodeId,
        name: &str,
        value: &FormatValue,
    ) -> Result<(), TreeError> {
        let inline_blot = matches!(
            self.registry.query(name, Scope::BLOT),
            Some(Definition::Blot(def)) if def.kind == BlotKind::Inline
        );
        if inline_blot {
            if value.is_truthy() {
                self.wrap(id, name, value)?;
            }
        } else if self.registry.query(name, Scope::ATTRIBUTE).is_some() {
            let wrapper =
                self.wrap(id, blot_name::INLINE, &FormatValue::Bool(true))?;
            self.inline_format(wrapper, name, value)?;
        } else {
            trace!("no inline format named {name}");
        }
        Ok(())
    }

    // ────────────────────────────────────────────────────────────────────
    // Text
    // ────────────────────────────────────────────────────────────────────

    pub(crate) fn text_insert_at(
        &mut self,
        id: NodeId,
        index: usize,
        insertion: Insertion<'_>,
    ) -> Result<(), TreeError> {
        let Insertion::Text(text) = insertion else {
            return self.leaf_insert_at(id, index, insertion);
        };
        if let NodeKind::Text(content) = &mut self.node_mut(id)?.kind {
            *content = splice(content, index, 0, text);
        }
        self.mark(id);
        Ok(())
    }

    pub(crate) fn text_delete_at(
        &mut self,
        id: NodeId,
        index: usize,
        length: usize,
    ) -> Result<(), TreeError> {
        if let NodeKind::Text(content) = &mut self.node_mut(id)?.kind {
            *content = splice(content, index, length, "");
        }
        self.mark(id);
        Ok(())
    }

    pub(crate) fn text_split(
        &mut self,
        id: NodeId,
        index: usize,
        force: bool,
    ) -> Result<Option<NodeId>, TreeError> {
        if !force {
            if index == 0 {
                return Ok(Some(id));
            }
            if index >= self.node_length(id) {
                return Ok(self.next(id));
            }
        }
        let parent = self.parent(id).ok_or(TreeError::Detached(id))?;
        let node = self.node_mut(id)?;
        let scope = node.scope;
        let NodeKind::Text(content) = &mut node.kind else {
            return Err(TreeError::NotALine(id));
        };
        let (head, tail) = split_at(content, index);
        *content = head;
        self.mark(id);
        let after = self.alloc(NodeKind::Text(tail), scope);
        let next = self.next(id);
        self.insert_child(parent, after, next)?;
        Ok(Some(after))
    }

    /// Drop empty runs and fold the next run into this one.
    pub(crate) fn text_optimize(
        &mut self,
        id: NodeId,
    ) -> Result<(), TreeError> {
        if self.node_length(id) == 0 {
            return self.remove(id);
        }
        let Some(next) = self.next(id) else {
            return Ok(());
        };
        let Some(NodeKind::Text(following)) = self.kind(next) else {
            return Ok(());
        };
        let following = following.to_string();
        if let NodeKind::Text(content) = &mut self.node_mut(id)?.kind {
            content.push_str(&following);
        }
        self.remove(next)?;
        self.mark(id);
        Ok(())
    }

    // ────────────────────────────────────────────────────────────────────
    // Inline containers
    // ────────────────────────────────────────────────────────────────────

    fn inline_name(&self, id: NodeId) -> Option<&str> {
        match self.kind(id)? {
            NodeKind::Inline(inline) => Some(inline.name()),
            _ => None,
        }
    }

    pub(crate) fn inline_format_at(
        &mut self,
        id: NodeId,
        index: usize,
        length: usize,
        name: &str,
        value: &FormatValue,
    ) -> Result<(), TreeError> {
        let own = self.inline_name(id).unwrap_or_default().to_owned();
        let inline_blot = matches!(
            self.registry.query(name, Scope::BLOT),
            Some(Definition::Blot(def)) if def.kind == BlotKind::Inline
        );
        if inline_blot && self.registry.compare_inline(&own, name).is_lt() {
            if let Some(target) = self.isolate(id, index, length)? {
                if value.is_truthy() {
                    self.wrap(target, name, value)?;
                }
            }
            return Ok(());
        }
        if self.node_formats(id).contains_key(name)
            || self.registry.query(name, Scope::ATTRIBUTE).is_some()
        {
            if let Some(target) = self.isolate(id, index, length)? {
                self.inline_format(target, name, value)?;
            }
            return Ok(());
        }
        self.container_format_at(id, index, length, name, value)
    }

    /// Apply `name` to the whole inline. Clearing its own format unwraps it,
    /// handing its attributes down to the children.
    pub(crate) fn inline_format(
        &mut self,
        id: NodeId,
        name: &str,
        value: &FormatValue,
    ) -> Result<(), TreeError> {
        let NodeKind::Inline(inline) = &self.node(id)?.kind else {
            return Ok(());
        };
        if inline.name == name && !value.is_truthy() {
            let attributes = inline.attributes.clone();
            return self.unwrap_inline(id, &attributes);
        }
        let current = inline.formats_value(name);
        match self.registry.query(name, Scope::INLINE).cloned() {
            Some(Definition::Attribute(attributor)) => {
                if let NodeKind::Inline(inline) = &mut self.node_mut(id)?.kind
                {
                    inline.attributes.attribute(&attributor, value);
                }
            }
            Some(Definition::Blot(def))
                if def.kind == BlotKind::Inline
                    && value.is_truthy()
                    && current.as_ref() != Some(value) =>
            {
                let replacement = InlineNode::new(name, value);
                if let NodeKind::Inline(inline) = &mut self.node_mut(id)?.kind
                {
                    trace!("replacing {} with {name}", inline.name);
                    inline.name = replacement.name;
                    inline.value = replacement.value;
                }
            }
            Some(_) => return Ok(()),
            None => {
                trace!("no inline format named {name}");
                return Ok(());
            }
        }
        self.mark(id);
        Ok(())
    }

    fn unwrap_inline(
        &mut self,
        id: NodeId,
        attributes: &AttributeStore,
    ) -> Result<(), TreeError> {
        for child in self.children(id).to_vec() {
            let target = match self.kind(child) {
                Some(NodeKind::Inline(_)) => child,
                _ => self.wrap(
                    child,
                    blot_name::INLINE,
                    &FormatValue::Bool(true),
                )?,
            };
            if let NodeKind::Inline(inline) = &mut self.node_mut(target)?.kind {
                attributes.copy_into(&mut inline.attributes);
            }
            self.mark(target);
        }
        self.unwrap(id)
    }

    pub(crate) fn inline_optimize(
        &mut self,
        id: NodeId,
    ) -> Result<(), TreeError> {
        if self.children(id).is_empty() {
            return self.remove(id);
        }
        let formats = self.node_formats(id);
        if formats.is_empty() {
            return self.unwrap(id);
        }
        if let Some(next) = self.next(id) {
            if matches!(self.kind(next), Some(NodeKind::Inline(_)))
                && self.node_formats(next) == formats
            {
                self.move_children(next, id, None)?;
                self.remove(next)?;
            }
        }
        self.restore_nesting(id)
    }

    /// Swap `id` above its parent when their names are nested the wrong
    /// way round.
    fn restore_nesting(&mut self, id: NodeId) -> Result<(), TreeError> {
        let Some(parent) = self.parent(id) else {
            return Ok(());
        };
        let (Some(own), Some(above)) =
            (self.inline_name(id), self.inline_name(parent))
        else {
            return Ok(());
        };
        if !self.registry.compare_inline(own, above).is_gt() {
            return Ok(());
        }
        let offset = self.offset_in(id, parent);
        let length = self.node_length(id);
        if let Some(piece) = self.isolate(parent, offset, length)? {
            self.move_children(id, piece, None)?;
            self.wrap_in(piece, id)?;
        }
        Ok(())
    }
}

impl InlineNode {
    fn formats_value(&self, name: &str) -> Option<FormatValue> {
        if self.name == name {
            self.value.clone()
        } else {
            self.attributes.get(name).cloned()
        }
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use speculoos::prelude::*;

    use super::*;
    use crate::delta::InsertValue;
    use crate::to_tree::ToTree;

    fn scroll_with_text(text: &str) -> Scroll {
        let mut scroll = Scroll::new();
        scroll.insert_text(0, text).unwrap();
        scroll
    }

    #[test]
    fn text_splits_in_utf16_units() {
        let mut scroll = scroll_with_text("a😀b");
        let line = scroll.lines()[0];
        let text = scroll.head(line).unwrap();
        let after = scroll.text_split(text, 3, false).unwrap().unwrap();
        assert_eq!(
            scroll.node_value(text),
            Some(InsertValue::from("a😀"))
        );
        assert_eq!(scroll.node_value(after), Some(InsertValue::from("b")));
    }

    #[test]
    fn adjacent_runs_merge() {
        let mut scroll = scroll_with_text("abc");
        let line = scroll.lines()[0];
        let text = scroll.head(line).unwrap();
        scroll.text_split(text, 1, false).unwrap();
        assert_that!(scroll.children(line).len()).is_equal_to(2);
        scroll.optimize().unwrap();
        assert_that!(scroll.children(line).len()).is_equal_to(1);
    }

    #[test]
    fn formats_nest_in_canonical_order() {
        let mut scroll = scroll_with_text("abc");
        scroll.format_at(0, 3, "italic", &true.into()).unwrap();
        scroll.format_at(1, 1, "bold", &true.into()).unwrap();
        assert_eq!(
            scroll.to_tree(),
            indoc! {r#"

            └>p
              ├>italic
              │ └>"a"
              ├>bold
              │ └>italic
              │   └>"b"
              └>italic
                └>"c"
            "#}
        );
    }

    #[test]
    fn equal_neighbours_merge_back() {
        let mut scroll = scroll_with_text("abc");
        scroll.format_at(0, 1, "bold", &true.into()).unwrap();
        scroll.format_at(1, 2, "bold", &true.into()).unwrap();
        let line = scroll.lines()[0];
        assert_that!(scroll.children(line).len()).is_equal_to(1);
        assert_eq!(scroll.text(), "abc\n");
    }

    #[test]
    fn clearing_a_format_unwraps() {
        let mut scroll = scroll_with_text("abc");
        scroll.format_at(0, 3, "bold", &true.into()).unwrap();
        scroll.format_at(1, 1, "bold", &false.into()).unwrap();
        let delta = scroll.delta();
        let bold: Vec<bool> = delta
            .ops()
            .iter()
            .map(|op| op.attributes.contains_key("bold"))
            .collect();
        assert_eq!(bold, [true, false, true, false]);
    }

    #[test]
    fn link_values_are_replaced() {
        let mut scroll = scroll_with_text("abc");
        scroll.format_at(0, 3, "link", &"https://a".into()).unwrap();
        scroll.format_at(0, 3, "link", &"https://b".into()).unwrap();
        let delta = scroll.delta();
        assert_eq!(
            delta.ops()[0].attributes.get("link"),
            Some(&"https://b".into())
        );
        let line = scroll.lines()[0];
        assert_that!(scroll.children(line).len()).is_equal_to(1);
    }

    #[test]
    fn inline_attributes_use_a_generic_wrapper() {
        let mut scroll = scroll_with_text("abc");
        scroll.format_at(0, 2, "font", &"serif".into()).unwrap();
        scroll.format_at(2, 1, "font", &"comic".into()).unwrap();
        let delta = scroll.delta();
        assert_eq!(delta.ops()[0].insert, InsertValue::from("ab"));
        assert_eq!(
            delta.ops()[0].attributes.get("font"),
            Some(&"serif".into())
        );
        assert!(!delta.ops()[1].attributes.contains_key("font"));
    }

    #[test]
    fn image_embeds_sit_inside_the_line() {
        let mut scroll = scroll_with_text("ab");
        scroll.insert_embed(1, "image", "cat.png").unwrap();
        assert_eq!(scroll.len(), 4);
        let lines = scroll.lines();
        assert_that!(lines.len()).is_equal_to(1);
        assert_that!(scroll.children(lines[0]).len()).is_equal_to(3);
    }
}
