// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Tree nodes and the per-kind data they carry.

use std::fmt;

use once_cell::unsync::OnceCell;
use widestring::Utf16String;

use crate::delta::{Delta, Embed};
use crate::formats::{FormatValue, Formats};
use crate::registry::{blot_name, ListType, Scope};
use crate::store::AttributeStore;

/// Index of a node in its [`Scroll`](crate::Scroll). Ids of removed nodes
/// are never handed out again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Debug)]
pub struct Node {
    pub(crate) scope: Scope,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) kind: NodeKind,
}

impl Node {
    pub(crate) fn new(kind: NodeKind, scope: Scope) -> Self {
        Self {
            scope,
            parent: None,
            children: Vec::new(),
            kind,
        }
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn blot_name(&self) -> &str {
        self.kind.blot_name()
    }
}

#[derive(Clone, Debug)]
pub enum NodeKind {
    Scroll,
    Block(BlockNode),
    BlockEmbed(BlockEmbedNode),
    List(ListType),
    Inline(InlineNode),
    Text(Utf16String),
    Break,
    Cursor,
    Embed(Embed),
}

impl NodeKind {
    pub fn blot_name(&self) -> &str {
        match self {
            Self::Scroll => blot_name::SCROLL,
            Self::Block(block) => block.tag.blot_name(),
            Self::BlockEmbed(embed) => &embed.value.name,
            Self::List(_) => blot_name::LIST,
            Self::Inline(inline) => &inline.name,
            Self::Text(_) => blot_name::TEXT,
            Self::Break => blot_name::BREAK,
            Self::Cursor => blot_name::CURSOR,
            Self::Embed(embed) => &embed.name,
        }
    }

    /// Leaves never have children.
    pub fn is_leaf(&self) -> bool {
        matches!(
            self,
            Self::Text(_)
                | Self::Break
                | Self::Cursor
                | Self::Embed(_)
                | Self::BlockEmbed(_)
        )
    }

    /// A zero-length leaf that keeps an otherwise empty line alive.
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Break | Self::Cursor)
    }

    pub fn is_line(&self) -> bool {
        matches!(self, Self::Block(_) | Self::BlockEmbed(_))
    }

    pub fn as_formattable(&self) -> Option<&dyn Formattable> {
        match self {
            Self::Block(block) => Some(block),
            Self::BlockEmbed(embed) => Some(embed),
            Self::List(list) => Some(list),
            Self::Inline(inline) => Some(inline),
            Self::Embed(embed) => Some(embed),
            Self::Break | Self::Cursor => Some(&NoFormats),
            Self::Scroll | Self::Text(_) => None,
        }
    }
}

// ─── Formats ────────────────────────────────────────────────────────────────

/// Nodes that contribute formats to the runs beneath them.
pub trait Formattable {
    fn formats(&self) -> Formats;
}

struct NoFormats;

impl Formattable for NoFormats {
    fn formats(&self) -> Formats {
        Formats::new()
    }
}

impl Formattable for Embed {
    fn formats(&self) -> Formats {
        Formats::new()
    }
}

impl Formattable for ListType {
    fn formats(&self) -> Formats {
        Formats::from([(blot_name::LIST.to_owned(), self.as_ref().into())])
    }
}

// ─── Blocks ─────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockTag {
    Paragraph,
    Header(u8),
    ListItem,
}

impl BlockTag {
    pub fn blot_name(self) -> &'static str {
        match self {
            Self::Paragraph => blot_name::BLOCK,
            Self::Header(_) => blot_name::HEADER,
            Self::ListItem => blot_name::LIST_ITEM,
        }
    }
}

/// Memoized results for one block. Both cells are emptied together on any
/// change inside the block.
#[derive(Clone, Debug, Default)]
pub(crate) struct BlockCache {
    pub(crate) length: OnceCell<usize>,
    pub(crate) delta: OnceCell<Delta>,
}

impl BlockCache {
    pub(crate) fn clear(&mut self) {
        self.length.take();
        self.delta.take();
    }
}

#[derive(Clone, Debug)]
pub struct BlockNode {
    pub(crate) tag: BlockTag,
    pub(crate) attributes: AttributeStore,
    pub(crate) cache: BlockCache,
}

impl BlockNode {
    pub(crate) fn new(tag: BlockTag) -> Self {
        Self {
            tag,
            attributes: AttributeStore::new(),
            cache: BlockCache::default(),
        }
    }

    /// A content-free copy: same tag and attributes, empty cache.
    pub(crate) fn shallow_clone(&self) -> Self {
        Self {
            tag: self.tag,
            attributes: self.attributes.clone(),
            cache: BlockCache::default(),
        }
    }

    pub fn tag(&self) -> BlockTag {
        self.tag
    }

    pub fn attributes(&self) -> &AttributeStore {
        &self.attributes
    }
}

impl Formattable for BlockNode {
    fn formats(&self) -> Formats {
        let mut formats = self.attributes.values().clone();
        if let BlockTag::Header(level) = self.tag {
            formats.insert(
                blot_name::HEADER.to_owned(),
                FormatValue::Int(i64::from(level)),
            );
        }
        formats
    }
}

#[derive(Clone, Debug)]
pub struct BlockEmbedNode {
    pub(crate) value: Embed,
    pub(crate) attributes: OnceCell<AttributeStore>,
}

impl BlockEmbedNode {
    pub(crate) fn new(value: Embed) -> Self {
        Self {
            value,
            attributes: OnceCell::new(),
        }
    }

    pub fn value(&self) -> &Embed {
        &self.value
    }

    /// `None` until the embed has been attached to a parent.
    pub fn attributes(&self) -> Option<&AttributeStore> {
        self.attributes.get()
    }
}

impl Formattable for BlockEmbedNode {
    fn formats(&self) -> Formats {
        Formats::new()
    }
}

// ─── Inlines ────────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct InlineNode {
    pub(crate) name: String,
    /// `None` for the generic inline, which only carries attributes.
    pub(crate) value: Option<FormatValue>,
    pub(crate) attributes: AttributeStore,
}

impl InlineNode {
    pub(crate) fn new(name: &str, value: &FormatValue) -> Self {
        let value = match value {
            _ if name == blot_name::INLINE => None,
            FormatValue::Bool(_) => Some(FormatValue::Bool(true)),
            other => Some(other.clone()),
        };
        Self {
            name: name.to_owned(),
            value,
            attributes: AttributeStore::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> Option<&FormatValue> {
        self.value.as_ref()
    }
}

impl Formattable for InlineNode {
    fn formats(&self) -> Formats {
        let mut formats = self.attributes.values().clone();
        if let Some(value) = &self.value {
            formats.insert(self.name.clone(), value.clone());
        }
        formats
    }
}
