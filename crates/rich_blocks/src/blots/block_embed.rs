// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Atomic block-level embeds such as video.

use log::{debug, trace};

use crate::delta::Delta;
use crate::error::TreeError;
use crate::formats::FormatValue;
use crate::node::{BlockTag, NodeId, NodeKind};
use crate::registry::{Definition, Scope};
use crate::scroll::{Insertion, Scroll};

impl Scroll {
    /// One insert of the embed, carrying its own formats and its stored
    /// block attributes.
    pub(crate) fn block_embed_delta(
        &self,
        id: NodeId,
    ) -> Result<Delta, TreeError> {
        let NodeKind::BlockEmbed(embed) = &self.node(id)?.kind else {
            return Err(TreeError::NotALine(id));
        };
        let mut formats = self.node_formats(id);
        if let Some(store) = embed.attributes() {
            formats.extend(
                store
                    .values()
                    .iter()
                    .map(|(name, value)| (name.clone(), value.clone())),
            );
        }
        let mut delta = Delta::new();
        delta.insert(embed.value.clone(), formats);
        Ok(delta)
    }

    /// Only block attributes apply; anything else is ignored. Range
    /// arguments never reach here since the embed is indivisible.
    pub(crate) fn block_embed_format(
        &mut self,
        id: NodeId,
        name: &str,
        value: &FormatValue,
    ) -> Result<(), TreeError> {
        let Some(Definition::Attribute(attributor)) =
            self.registry.query(name, Scope::BLOCK_ATTRIBUTE).cloned()
        else {
            trace!("{name} does not apply to block embed {id}");
            return Ok(());
        };
        if let NodeKind::BlockEmbed(embed) = &mut self.node_mut(id)?.kind {
            if let Some(store) = embed.attributes.get_mut() {
                store.attribute(&attributor, value);
            }
        }
        self.mark(id);
        Ok(())
    }

    /// Text ending in a newline becomes a new line beside the embed, before
    /// it at index 0 and after it otherwise.
    pub(crate) fn block_embed_insert_at(
        &mut self,
        id: NodeId,
        index: usize,
        insertion: Insertion<'_>,
    ) -> Result<(), TreeError> {
        let Insertion::Text(text) = insertion else {
            return self.leaf_insert_at(id, index, insertion);
        };
        let Some(content) = text.strip_suffix('\n') else {
            return self.leaf_insert_at(id, index, insertion);
        };
        let parent = self.parent(id).ok_or(TreeError::Detached(id))?;
        let block = self.create_block(BlockTag::Paragraph);
        let before = if index == 0 { Some(id) } else { self.next(id) };
        debug!("opening line {block} beside block embed {id}");
        self.insert_child(parent, block, before)?;
        self.node_insert_at(block, 0, Insertion::Text(content))
    }
}
