// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use crate::formats::Formats;
use crate::node::{BlockTag, NodeId, NodeKind};
use crate::registry::ListType;
use crate::scroll::Scroll;

/// A box-drawing dump of a tree, one node per line.
pub trait ToTree {
    fn to_tree(&self) -> String;
}

impl ToTree for Scroll {
    fn to_tree(&self) -> String {
        let mut out = String::from("\n");
        let children = self.children(self.root());
        for (i, child) in children.iter().enumerate() {
            self.write_tree(*child, "", i + 1 == children.len(), &mut out);
        }
        out
    }
}

impl Scroll {
    fn write_tree(
        &self,
        id: NodeId,
        prefix: &str,
        is_last: bool,
        out: &mut String,
    ) {
        let Some(kind) = self.kind(id) else {
            return;
        };
        out.push_str(prefix);
        out.push_str(if is_last { "└>" } else { "├>" });
        out.push_str(&label(kind));
        out.push('\n');
        let indent = if is_last { "  " } else { "│ " };
        let prefix = format!("{prefix}{indent}");
        let children = self.children(id);
        for (i, child) in children.iter().enumerate() {
            self.write_tree(*child, &prefix, i + 1 == children.len(), out);
        }
    }
}

fn label(kind: &NodeKind) -> String {
    match kind {
        NodeKind::Scroll => String::from("scroll"),
        NodeKind::Block(block) => {
            let tag = match block.tag() {
                BlockTag::Paragraph => String::from("p"),
                BlockTag::Header(level) => format!("h{level}"),
                BlockTag::ListItem => String::from("li"),
            };
            tag + &attributes(block.attributes().values())
        }
        NodeKind::BlockEmbed(embed) => {
            let mut out =
                format!("{} \"{}\"", embed.value.name, embed.value.value);
            if let Some(store) = embed.attributes() {
                out.push_str(&attributes(store.values()));
            }
            out
        }
        NodeKind::List(ListType::Ordered) => String::from("ol"),
        NodeKind::List(ListType::Bullet) => String::from("ul"),
        NodeKind::Inline(inline) => {
            let mut out = inline.name().to_owned();
            if let Some(url) = inline.value().and_then(|value| value.as_str())
            {
                out.push_str(&format!(" \"{url}\""));
            }
            out + &attributes(inline.attributes.values())
        }
        NodeKind::Text(text) => format!("\"{text}\""),
        NodeKind::Break => String::from("br"),
        NodeKind::Cursor => String::from("cursor"),
        NodeKind::Embed(embed) => {
            format!("{} \"{}\"", embed.name, embed.value)
        }
    }
}

fn attributes(values: &Formats) -> String {
    values
        .iter()
        .map(|(name, value)| format!(" {name}=\"{value}\""))
        .collect()
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;
    use crate::formats::FormatValue;

    #[test]
    fn empty_document() {
        assert_eq!(
            Scroll::new().to_tree(),
            indoc! {r#"

            └>p
              └>br
            "#}
        );
    }

    #[test]
    fn lines_with_formats_and_embeds() {
        let mut scroll = Scroll::new();
        scroll.insert_text(0, "Title\nsee here").unwrap();
        scroll
            .format_line(0, 1, "header", &FormatValue::Int(2))
            .unwrap();
        scroll.format_line(6, 1, "align", &"center".into()).unwrap();
        scroll.format_at(10, 4, "link", &"https://x".into()).unwrap();
        scroll.insert_embed(6, "video", "clip.mp4").unwrap();
        assert_eq!(
            scroll.to_tree(),
            indoc! {r#"

            ├>h2
            │ └>"Title"
            ├>video "clip.mp4"
            └>p align="center"
              ├>"see "
              └>link "https://x"
                └>"here"
            "#}
        );
    }
}
