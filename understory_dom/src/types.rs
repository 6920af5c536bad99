// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types for the element tree: node identifiers, flags, and control kinds.

/// Identifier for a node in the document (generational).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32, pub(crate) u32);

impl NodeId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

bitflags::bitflags! {
    /// Node flags controlling presentation state.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct NodeFlags: u8 {
        /// Node is hidden.
        const HIDDEN        = 0b0000_0001;
        /// Node is displayed as a block rather than inline.
        const DISPLAY_BLOCK = 0b0000_0010;
    }
}

/// How an element participates in form-style value binding.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ControlKind {
    /// `<input type="checkbox">`: bound through `checked`.
    Checkbox,
    /// `<input type="radio">`: checked when its declared value matches.
    Radio,
    /// Any other `<input>`.
    Input,
    /// `<select>`.
    Select,
    /// `<textarea>`.
    TextArea,
    /// Not a form control; bound through inner markup.
    None,
}

impl ControlKind {
    /// Whether the control carries a `value` property.
    pub const fn has_value(self) -> bool {
        matches!(self, Self::Input | Self::Select | Self::TextArea)
    }
}
