// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use log::trace;

use crate::formats::{FormatValue, Formats};
use crate::registry::Attributor;

/// The attributor-backed formats carried by one blot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AttributeStore {
    values: Formats,
}

impl AttributeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `attributor` to `value`, or clear it when `value` is falsy.
    /// Values the attributor refuses leave the store unchanged. Returns
    /// whether anything changed.
    pub fn attribute(
        &mut self,
        attributor: &Attributor,
        value: &FormatValue,
    ) -> bool {
        if !value.is_truthy() {
            return self.values.remove(&attributor.name).is_some();
        }
        if !attributor.accepts(value) {
            trace!("{} refuses value {value}", attributor.name);
            return false;
        }
        let previous =
            self.values.insert(attributor.name.clone(), value.clone());
        previous.as_ref() != Some(value)
    }

    pub fn get(&self, name: &str) -> Option<&FormatValue> {
        self.values.get(name)
    }

    pub fn values(&self) -> &Formats {
        &self.values
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Copy every value into `target`, overwriting what it had.
    pub fn copy_into(&self, target: &mut AttributeStore) {
        target.values.extend(
            self.values
                .iter()
                .map(|(name, value)| (name.clone(), value.clone())),
        );
    }
}
