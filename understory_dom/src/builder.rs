// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A small declarative markup builder.

/// Declarative description of an element subtree.
///
/// Build it with the chaining methods and materialize it with
/// [`Document::build`](crate::Document::build).
///
/// ```rust
/// use understory_dom::{Document, El};
///
/// let mut doc = Document::new();
/// let list = doc.build(
///     None,
///     &El::new("ul").child(El::new("li").attr("data-name", "label").text("A")),
/// );
/// let item = doc.children_of(list)[0];
/// assert_eq!(doc.tag(item), Some("li"));
/// assert_eq!(doc.text_content(list), "A");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct El {
    pub(crate) tag: String,
    pub(crate) attributes: Vec<(String, String)>,
    pub(crate) text: String,
    pub(crate) children: Vec<Self>,
}

impl El {
    /// Start describing an element with the given tag name.
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            ..Self::default()
        }
    }

    /// Set an attribute.
    #[must_use]
    pub fn attr(mut self, name: &str, value: impl Into<String>) -> Self {
        let name = name.to_ascii_lowercase();
        let value = value.into();
        match self.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
        self
    }

    /// Set the inner text.
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Append a child element.
    #[must_use]
    pub fn child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    /// Append several child elements.
    #[must_use]
    pub fn children(mut self, children: impl IntoIterator<Item = Self>) -> Self {
        self.children.extend(children);
        self
    }
}
