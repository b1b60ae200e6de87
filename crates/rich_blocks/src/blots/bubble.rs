// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use crate::formats::Formats;
use crate::node::NodeId;
use crate::scroll::Scroll;

/// Collect the formats in effect at `node`: its own, then those of every
/// ancestor of the same scope, stopping below the document root.
///
/// Formats are folded into `formats` on the way up, so an ancestor's value
/// replaces a descendant's for the same name. `None` returns `formats`
/// untouched.
pub fn bubble_formats(
    scroll: &Scroll,
    node: Option<NodeId>,
    mut formats: Formats,
) -> Formats {
    let Some(id) = node else {
        return formats;
    };
    let Some(current) = scroll.get(id) else {
        return formats;
    };
    formats.extend(scroll.node_formats(id));
    match current.parent {
        Some(parent)
            if parent != scroll.root()
                && scroll
                    .get(parent)
                    .is_some_and(|above| above.scope == current.scope) =>
        {
            bubble_formats(scroll, Some(parent), formats)
        }
        _ => formats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::FormatValue;

    #[test]
    fn nothing_to_bubble_from_returns_the_input() {
        let scroll = Scroll::new();
        let input = Formats::from([("bold".to_owned(), true.into())]);
        assert_eq!(bubble_formats(&scroll, None, input.clone()), input);
    }

    #[test]
    fn leaf_formats_include_every_wrapping_inline() {
        let mut scroll = Scroll::new();
        scroll.insert_text(0, "abc").unwrap();
        scroll.format_at(0, 3, "bold", &true.into()).unwrap();
        scroll.format_at(1, 1, "italic", &true.into()).unwrap();
        let (line, _) = scroll.line(1).unwrap();
        let leaf = scroll.leaf_at(line, 1);
        let formats = bubble_formats(&scroll, leaf, Formats::new());
        assert_eq!(formats.get("bold"), Some(&FormatValue::Bool(true)));
        assert_eq!(formats.get("italic"), Some(&FormatValue::Bool(true)));
    }

    #[test]
    fn bubbling_stops_at_the_line() {
        let mut scroll = Scroll::new();
        scroll.insert_text(0, "abc").unwrap();
        scroll.format_line(0, 1, "header", &FormatValue::Int(2)).unwrap();
        let (line, _) = scroll.line(0).unwrap();
        let leaf = scroll.leaf_at(line, 0);
        assert!(bubble_formats(&scroll, leaf, Formats::new()).is_empty());
        let formats = bubble_formats(&scroll, Some(line), Formats::new());
        assert_eq!(formats.get("header"), Some(&FormatValue::Int(2)));
    }

    #[test]
    fn ancestors_win_over_descendants() {
        let mut scroll = Scroll::new();
        scroll.insert_text(0, "abc").unwrap();
        scroll.format_at(0, 3, "link", &"https://outer".into()).unwrap();
        let (line, _) = scroll.line(0).unwrap();
        let leaf = scroll.leaf_at(line, 0);
        let seeded =
            Formats::from([("link".to_owned(), "https://inner".into())]);
        let formats = bubble_formats(&scroll, leaf, seeded);
        assert_eq!(formats.get("link"), Some(&"https://outer".into()));
    }
}
