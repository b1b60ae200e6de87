// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Ordered and bullet list containers. The list type lives on the
//! container; its children are list-item lines.

use log::{debug, trace};

use crate::error::TreeError;
use crate::formats::FormatValue;
use crate::node::{BlockTag, NodeId, NodeKind};
use crate::registry::{blot_name, ListType};
use crate::scroll::Scroll;

impl Scroll {
    fn list_type(&self, id: NodeId) -> Option<ListType> {
        match self.kind(id)? {
            NodeKind::List(list_type) => Some(*list_type),
            _ => None,
        }
    }

    fn set_tag(&mut self, id: NodeId, tag: BlockTag) -> Result<(), TreeError> {
        if let NodeKind::Block(block) = &mut self.node_mut(id)?.kind {
            block.tag = tag;
        }
        self.mark(id);
        Ok(())
    }

    /// Put the line in a list of the given type, move it to a list of
    /// another type, or with a falsy value take it out of its list.
    pub(crate) fn format_list(
        &mut self,
        id: NodeId,
        value: &FormatValue,
    ) -> Result<(), TreeError> {
        let parent = self.parent(id).ok_or(TreeError::Detached(id))?;
        let current = self.list_type(parent);
        if !value.is_truthy() {
            if current.is_some() {
                debug!("lifting {id} out of list {parent}");
                self.lift_out_of_list(id)?;
                self.set_tag(id, BlockTag::Paragraph)?;
            }
            return Ok(());
        }
        let Some(list_type) =
            value.as_str().and_then(|s| s.parse::<ListType>().ok())
        else {
            trace!("{value} is not a list type");
            return Ok(());
        };
        match current {
            Some(existing) if existing == list_type => Ok(()),
            Some(_) => {
                let list = self.isolate_in_list(id)?;
                if let NodeKind::List(existing) = &mut self.node_mut(list)?.kind
                {
                    *existing = list_type;
                }
                self.mark(list);
                self.mark(id);
                Ok(())
            }
            None => {
                self.set_tag(id, BlockTag::ListItem)?;
                let list = self.create(blot_name::LIST, value)?;
                self.wrap_in(id, list)
            }
        }
    }

    /// Take the line out of its list container, if it is in one. The line
    /// keeps its tag.
    pub(crate) fn lift_out_of_list(
        &mut self,
        id: NodeId,
    ) -> Result<(), TreeError> {
        let Some(parent) = self.parent(id) else {
            return Ok(());
        };
        if self.list_type(parent).is_none() {
            return Ok(());
        }
        let list = self.isolate_in_list(id)?;
        self.unwrap(list)
    }

    /// Split the line's list so the line is alone in one, and return that
    /// list.
    fn isolate_in_list(&mut self, id: NodeId) -> Result<NodeId, TreeError> {
        let mut list = self.parent(id).ok_or(TreeError::Detached(id))?;
        let position = self.position(id).ok_or(TreeError::Detached(id))?;
        if position > 0 {
            list = self.divide_list(list, position)?;
        }
        if self.children(list).len() > 1 {
            self.divide_list(list, 1)?;
        }
        Ok(list)
    }

    /// Move the items from `position` on into a new list of the same type
    /// right after `list`, and return the new list.
    pub(crate) fn divide_list(
        &mut self,
        list: NodeId,
        position: usize,
    ) -> Result<NodeId, TreeError> {
        let parent = self.parent(list).ok_or(TreeError::Detached(list))?;
        let after = self.clone_node(list)?;
        let next = self.next(list);
        self.insert_child(parent, after, next)?;
        let moving = self
            .children(list)
            .get(position..)
            .map(<[NodeId]>::to_vec)
            .unwrap_or_default();
        for item in moving {
            self.insert_child(after, item, None)?;
        }
        Ok(after)
    }

    pub(crate) fn list_optimize(
        &mut self,
        id: NodeId,
    ) -> Result<(), TreeError> {
        if self.children(id).is_empty() {
            return self.remove(id);
        }
        let Some(next) = self.next(id) else {
            return Ok(());
        };
        if self.list_type(next).is_some()
            && self.list_type(next) == self.list_type(id)
        {
            self.move_children(next, id, None)?;
            self.remove(next)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use speculoos::prelude::*;

    use super::*;
    use crate::formats::Formats;
    use crate::to_tree::ToTree;

    fn scroll_with_lines(text: &str) -> Scroll {
        let mut scroll = Scroll::new();
        scroll.insert_text(0, text).unwrap();
        scroll
    }

    fn list_of(scroll: &Scroll, line: NodeId) -> Option<ListType> {
        scroll.parent(line).and_then(|parent| scroll.list_type(parent))
    }

    #[test]
    fn neighbouring_items_share_a_list() {
        let mut scroll = scroll_with_lines("a\nb\nc");
        scroll.format_line(0, 4, "list", &"bullet".into()).unwrap();
        assert_eq!(
            scroll.to_tree(),
            indoc! {r#"

            ├>ul
            │ ├>li
            │ │ └>"a"
            │ └>li
            │   └>"b"
            └>p
              └>"c"
            "#}
        );
    }

    #[test]
    fn items_formatted_one_by_one_merge() {
        let mut scroll = scroll_with_lines("a\nb");
        scroll.format_line(0, 1, "list", &"ordered".into()).unwrap();
        scroll.format_line(2, 1, "list", &"ordered".into()).unwrap();
        assert_that!(scroll.children(scroll.root()).len()).is_equal_to(1);
    }

    #[test]
    fn clearing_the_middle_item_splits_the_list() {
        let mut scroll = scroll_with_lines("a\nb\nc");
        scroll.format_line(0, 5, "list", &"ordered".into()).unwrap();
        scroll.format_line(2, 1, "list", &false.into()).unwrap();
        assert_eq!(
            scroll.to_tree(),
            indoc! {r#"

            ├>ol
            │ └>li
            │   └>"a"
            ├>p
            │ └>"b"
            └>ol
              └>li
                └>"c"
            "#}
        );
    }

    #[test]
    fn changing_the_type_of_one_item() {
        let mut scroll = scroll_with_lines("a\nb\nc");
        scroll.format_line(0, 5, "list", &"ordered".into()).unwrap();
        scroll.format_line(2, 1, "list", &"bullet".into()).unwrap();
        let lines = scroll.lines();
        assert_eq!(list_of(&scroll, lines[0]), Some(ListType::Ordered));
        assert_eq!(list_of(&scroll, lines[1]), Some(ListType::Bullet));
        assert_eq!(list_of(&scroll, lines[2]), Some(ListType::Ordered));
        scroll.format_line(2, 1, "list", &"ordered".into()).unwrap();
        assert_that!(scroll.children(scroll.root()).len()).is_equal_to(1);
    }

    #[test]
    fn list_items_carry_the_type_in_their_newline() {
        let mut scroll = scroll_with_lines("a");
        scroll.format_line(0, 1, "list", &"bullet".into()).unwrap();
        let delta = scroll.delta();
        let expected = Formats::from([("list".to_owned(), "bullet".into())]);
        assert_eq!(delta.ops()[1].attributes, expected);
    }

    #[test]
    fn unknown_list_types_are_ignored() {
        let mut scroll = scroll_with_lines("a");
        scroll.format_line(0, 1, "list", &"checked".into()).unwrap();
        let line = scroll.lines()[0];
        assert_eq!(list_of(&scroll, line), None);
    }

    #[test]
    fn a_header_leaves_the_list() {
        let mut scroll = scroll_with_lines("a\nb");
        scroll.format_line(0, 3, "list", &"bullet".into()).unwrap();
        scroll
            .format_line(0, 1, "header", &FormatValue::Int(1))
            .unwrap();
        let lines = scroll.lines();
        assert_eq!(list_of(&scroll, lines[0]), None);
        assert_eq!(list_of(&scroll, lines[1]), Some(ListType::Bullet));
        let Some(NodeKind::Block(block)) = scroll.kind(lines[0]) else {
            panic!("expected a block");
        };
        assert_eq!(block.tag(), BlockTag::Header(1));
    }

    #[test]
    fn divided_lists_keep_their_type() {
        let mut scroll = scroll_with_lines("a\nb");
        scroll.format_line(0, 3, "list", &"ordered".into()).unwrap();
        let list = scroll.head(scroll.root()).unwrap();
        let after = scroll.divide_list(list, 1).unwrap();
        assert_eq!(scroll.list_type(after), Some(ListType::Ordered));
        assert_that!(scroll.children(after).len()).is_equal_to(1);
        assert_that!(scroll.children(list).len()).is_equal_to(1);
    }
}
