// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! UTF-16 helpers for text leaves. Offsets landing inside a surrogate pair
//! are moved back to the start of the pair.

use widestring::{Utf16Str, Utf16String};

pub(crate) fn utf16_len(text: &str) -> usize {
    text.encode_utf16().count()
}

fn boundary(units: &[u16], index: usize) -> usize {
    let index = index.min(units.len());
    if index > 0
        && index < units.len()
        && (0xDC00..=0xDFFF).contains(&units[index])
    {
        index - 1
    } else {
        index
    }
}

fn from_units(units: &[u16]) -> Utf16String {
    Utf16String::from_str(&String::from_utf16_lossy(units))
}

/// Replace `remove` code units at `at` with `insert`.
pub(crate) fn splice(
    text: &Utf16Str,
    at: usize,
    remove: usize,
    insert: &str,
) -> Utf16String {
    let units = text.as_slice();
    let start = boundary(units, at);
    let end = boundary(units, start.saturating_add(remove));
    let mut out = Vec::with_capacity(units.len() + insert.len());
    out.extend_from_slice(&units[..start]);
    out.extend(insert.encode_utf16());
    out.extend_from_slice(&units[end..]);
    from_units(&out)
}

/// Split into the code units before and from `at`.
pub(crate) fn split_at(
    text: &Utf16Str,
    at: usize,
) -> (Utf16String, Utf16String) {
    let units = text.as_slice();
    let at = boundary(units, at);
    (from_units(&units[..at]), from_units(&units[at..]))
}
