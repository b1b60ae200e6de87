// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Block-level node model for a line-oriented rich text document.
//!
//! A [`Scroll`] owns a tree of blots: paragraphs ([`blots`] of kind
//! `Block`), block embeds, list containers, inline format spans and the
//! text, break, cursor and embed leaves below them. Edits are addressed by
//! UTF-16 offsets into the flattened document, and every line can be
//! reconstructed as a [`Delta`] of insert operations carrying the composed
//! formatting of each run.
//!
//! ```
//! use rich_blocks::{FormatValue, Scroll};
//!
//! let mut scroll = Scroll::new();
//! scroll.insert_text(0, "Hello world\n").unwrap();
//! scroll.format_at(6, 5, "bold", &FormatValue::Bool(true)).unwrap();
//! assert_eq!(scroll.text(), "Hello world\n\n");
//! ```

pub mod blots;
mod delta;
mod error;
mod formats;
mod node;
mod registry;
mod scroll;
mod store;
mod text;
mod to_tree;
mod tree;

pub use crate::blots::bubble::bubble_formats;
pub use crate::delta::{Delta, Embed, InsertValue, Op};
pub use crate::error::TreeError;
pub use crate::formats::{diff_formats, FormatValue, Formats};
pub use crate::node::{
    BlockEmbedNode, BlockNode, BlockTag, Formattable, InlineNode, Node,
    NodeId, NodeKind,
};
pub use crate::registry::{
    blot_name, Attributor, BlotDef, BlotKind, Definition, ListType,
    Registry, Scope,
};
pub use crate::scroll::{Insertion, Scroll};
pub use crate::store::AttributeStore;
pub use crate::to_tree::ToTree;
