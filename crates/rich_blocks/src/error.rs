// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use crate::node::NodeId;

/// Structural failures raised by the tree.
///
/// Policy outcomes such as clamped ranges or unknown format names are not
/// errors; they are ignored (and traced) by the operation itself.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    #[error("no blot named `{0}` is registered")]
    UnknownBlot(String),
    #[error("`{0}` cannot be inserted as an embed")]
    NotEmbeddable(String),
    #[error("`{value}` is not a valid value for `{name}`")]
    InvalidValue { name: String, value: String },
    #[error("node {0} does not exist")]
    Missing(NodeId),
    #[error("node {0} is not attached to a parent")]
    Detached(NodeId),
    #[error("node {child} is not a child of {parent}")]
    NotAChild { parent: NodeId, child: NodeId },
    #[error("node {0} is not a cursor")]
    NotACursor(NodeId),
    #[error("node {0} is not a line")]
    NotALine(NodeId),
    #[error("cannot {0} the document root")]
    Root(&'static str),
    #[error("an embed must have exactly one key, found {0}")]
    InvalidEmbed(usize),
    #[error("malformed delta: {0}")]
    Json(#[from] serde_json::Error),
}
