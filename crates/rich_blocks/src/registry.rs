// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Blot and attribute definitions, looked up by name and scope.
//!
//! A [`Scope`] packs two facts into four bits: the TYPE (attribute or
//! blot) and the LEVEL (block or inline). A lookup succeeds when the
//! definition shares at least one bit of each with the requested mask, so
//! `Scope::BLOCK` finds both block blots and block attributes.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use strum_macros::{AsRefStr, Display, EnumString};

use crate::error::TreeError;
use crate::formats::FormatValue;

// ─── Scope ──────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Scope(u8);

impl Scope {
    pub const TYPE: Scope = Scope(0b0011);
    pub const LEVEL: Scope = Scope(0b1100);
    pub const ATTRIBUTE: Scope = Scope(0b1101);
    pub const BLOT: Scope = Scope(0b1110);
    pub const INLINE: Scope = Scope(0b0111);
    pub const BLOCK: Scope = Scope(0b1011);
    pub const BLOCK_BLOT: Scope = Scope(0b1010);
    pub const INLINE_BLOT: Scope = Scope(0b0110);
    pub const BLOCK_ATTRIBUTE: Scope = Scope(0b1001);
    pub const INLINE_ATTRIBUTE: Scope = Scope(0b0101);
    pub const ANY: Scope = Scope(0b1111);

    pub fn bits(self) -> u8 {
        self.0
    }

    /// True when `self` shares a LEVEL bit and a TYPE bit with `mask`.
    pub fn matches(self, mask: Scope) -> bool {
        let shared = self.0 & mask.0;
        shared & Self::LEVEL.0 != 0 && shared & Self::TYPE.0 != 0
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Scope({:#06b})", self.0)
    }
}

// ─── Definitions ────────────────────────────────────────────────────────────

/// Names of the blots the tree creates on its own.
pub mod blot_name {
    pub const SCROLL: &str = "scroll";
    pub const BLOCK: &str = "block";
    pub const HEADER: &str = "header";
    pub const LIST: &str = "list";
    pub const LIST_ITEM: &str = "list-item";
    pub const INLINE: &str = "inline";
    pub const TEXT: &str = "text";
    pub const BREAK: &str = "break";
    pub const CURSOR: &str = "cursor";
}

/// The node shape a blot name creates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlotKind {
    Scroll,
    Block,
    BlockEmbed,
    List,
    Inline,
    Text,
    Break,
    Cursor,
    Embed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlotDef {
    pub name: String,
    pub kind: BlotKind,
    pub scope: Scope,
}

impl BlotDef {
    pub fn new(name: impl Into<String>, kind: BlotKind, scope: Scope) -> Self {
        Self {
            name: name.into(),
            kind,
            scope,
        }
    }
}

/// A format stored as an attribute of a blot rather than as a blot of its
/// own. Values outside `whitelist`, when there is one, are refused.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attributor {
    pub name: String,
    pub scope: Scope,
    pub whitelist: Option<Vec<FormatValue>>,
}

impl Attributor {
    pub fn new(name: impl Into<String>, scope: Scope) -> Self {
        Self {
            name: name.into(),
            scope,
            whitelist: None,
        }
    }

    pub fn with_whitelist(
        mut self,
        values: impl IntoIterator<Item = FormatValue>,
    ) -> Self {
        self.whitelist = Some(values.into_iter().collect());
        self
    }

    pub fn accepts(&self, value: &FormatValue) -> bool {
        self.whitelist
            .as_ref()
            .is_none_or(|allowed| allowed.contains(value))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Definition {
    Blot(BlotDef),
    Attribute(Attributor),
}

impl Definition {
    pub fn name(&self) -> &str {
        match self {
            Self::Blot(def) => &def.name,
            Self::Attribute(attributor) => &attributor.name,
        }
    }

    pub fn scope(&self) -> Scope {
        match self {
            Self::Blot(def) => def.scope,
            Self::Attribute(attributor) => attributor.scope,
        }
    }
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, AsRefStr, Display, EnumString,
)]
pub enum ListType {
    #[strum(serialize = "ordered")]
    Ordered,
    #[strum(serialize = "bullet")]
    Bullet,
}

// ─── Registry ───────────────────────────────────────────────────────────────

/// Every blot and attributor a document knows about, plus the order inline
/// formats nest in (first entry innermost).
#[derive(Clone, Debug)]
pub struct Registry {
    definitions: BTreeMap<String, Definition>,
    inline_order: Vec<String>,
}

impl Registry {
    /// A registry with nothing in it. Documents need at least the blots in
    /// [`blot_name`]; see [`Registry::default`].
    pub fn empty() -> Self {
        Self {
            definitions: BTreeMap::new(),
            inline_order: Vec::new(),
        }
    }

    pub fn register_blot(&mut self, def: BlotDef) -> &mut Self {
        self.definitions
            .insert(def.name.clone(), Definition::Blot(def));
        self
    }

    pub fn register_attributor(&mut self, attributor: Attributor) -> &mut Self {
        self.definitions.insert(
            attributor.name.clone(),
            Definition::Attribute(attributor),
        );
        self
    }

    pub fn set_inline_order<I, S>(&mut self, order: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inline_order = order.into_iter().map(Into::into).collect();
        self
    }

    pub fn inline_order(&self) -> &[String] {
        &self.inline_order
    }

    pub fn query(&self, name: &str, scope: Scope) -> Option<&Definition> {
        self.definitions
            .get(name)
            .filter(|def| def.scope().matches(scope))
    }

    pub fn blot(&self, name: &str) -> Result<&BlotDef, TreeError> {
        match self.definitions.get(name) {
            Some(Definition::Blot(def)) => Ok(def),
            _ => Err(TreeError::UnknownBlot(name.to_owned())),
        }
    }

    pub(crate) fn blot_kind(&self, name: &str) -> Option<BlotKind> {
        self.blot(name).ok().map(|def| def.kind)
    }

    pub(crate) fn scope_of(&self, name: &str, fallback: Scope) -> Scope {
        self.blot(name).map_or(fallback, |def| def.scope)
    }

    /// Negative when `a` nests inside `b`. Names missing from the order
    /// sort before listed ones, and alphabetically among themselves.
    pub fn compare_inline(&self, a: &str, b: &str) -> Ordering {
        let position = |name: &str| {
            self.inline_order
                .iter()
                .position(|entry| entry == name)
                .map_or(-1, |index| index as isize)
        };
        let (a_index, b_index) = (position(a), position(b));
        if a_index >= 0 || b_index >= 0 {
            a_index.cmp(&b_index)
        } else {
            a.cmp(b)
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        use BlotKind::*;

        let mut registry = Self::empty();
        for (name, kind, scope) in [
            (blot_name::SCROLL, Scroll, Scope::BLOCK_BLOT),
            (blot_name::BLOCK, Block, Scope::BLOCK_BLOT),
            (blot_name::HEADER, Block, Scope::BLOCK_BLOT),
            (blot_name::LIST_ITEM, Block, Scope::BLOCK_BLOT),
            (blot_name::LIST, List, Scope::BLOCK_BLOT),
            ("video", BlockEmbed, Scope::BLOCK_BLOT),
            (blot_name::INLINE, Inline, Scope::INLINE_BLOT),
            ("bold", Inline, Scope::INLINE_BLOT),
            ("italic", Inline, Scope::INLINE_BLOT),
            ("underline", Inline, Scope::INLINE_BLOT),
            ("strike", Inline, Scope::INLINE_BLOT),
            ("link", Inline, Scope::INLINE_BLOT),
            (blot_name::TEXT, Text, Scope::INLINE_BLOT),
            (blot_name::BREAK, Break, Scope::INLINE_BLOT),
            (blot_name::CURSOR, Cursor, Scope::INLINE_BLOT),
            ("image", Embed, Scope::INLINE_BLOT),
            ("formula", Embed, Scope::INLINE_BLOT),
        ] {
            registry.register_blot(BlotDef::new(name, kind, scope));
        }

        let words = |values: &[&str]| {
            values
                .iter()
                .map(|value| FormatValue::from(*value))
                .collect::<Vec<_>>()
        };
        registry
            .register_attributor(
                Attributor::new("align", Scope::BLOCK_ATTRIBUTE)
                    .with_whitelist(words(&["right", "center", "justify"])),
            )
            .register_attributor(
                Attributor::new("direction", Scope::BLOCK_ATTRIBUTE)
                    .with_whitelist(words(&["rtl"])),
            )
            .register_attributor(
                Attributor::new("indent", Scope::BLOCK_ATTRIBUTE)
                    .with_whitelist((1..=8).map(FormatValue::Int)),
            )
            .register_attributor(
                Attributor::new("font", Scope::INLINE_ATTRIBUTE)
                    .with_whitelist(words(&["serif", "monospace"])),
            )
            .register_attributor(Attributor::new(
                "color",
                Scope::INLINE_ATTRIBUTE,
            ))
            .set_inline_order([
                "cursor",
                blot_name::INLINE,
                "underline",
                "strike",
                "italic",
                "bold",
                "script",
                "link",
                "code",
            ]);
        registry
    }
}
