// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compound selectors: `tag#id.class[attr][attr=value]`.
//!
//! Combinators (descendant, child, sibling) and selector lists are not supported.

use core::str::FromStr;

use smallvec::SmallVec;

use crate::{Document, NodeId};

/// Errors from [`Selector::parse`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SelectorError {
    /// The selector was empty or whitespace.
    #[error("empty selector")]
    Empty,
    /// A character that the compound-selector grammar does not accept.
    #[error("unsupported selector syntax at byte {offset} in {selector:?}")]
    Unsupported {
        /// Byte offset of the offending character.
        offset: usize,
        /// The full selector text.
        selector: String,
    },
    /// An attribute selector without a closing `]`.
    #[error("unterminated attribute selector in {0:?}")]
    Unterminated(String),
}

/// A parsed compound selector.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selector {
    tag: Option<String>,
    id: Option<String>,
    classes: SmallVec<[String; 2]>,
    attributes: SmallVec<[(String, Option<String>); 2]>,
}

fn ident_len(s: &str) -> usize {
    s.char_indices()
        .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        .map_or(s.len(), |(i, _)| i)
}

impl Selector {
    /// Parse a compound selector.
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        let selector = input.trim();
        if selector.is_empty() {
            return Err(SelectorError::Empty);
        }
        let unsupported = |rest: &str| SelectorError::Unsupported {
            offset: selector.len() - rest.len(),
            selector: selector.to_owned(),
        };

        let mut sel = Self::default();
        let mut rest = selector;
        let tag_len = ident_len(rest);
        if tag_len > 0 {
            sel.tag = Some(rest[..tag_len].to_ascii_lowercase());
            rest = &rest[tag_len..];
        } else if let Some(r) = rest.strip_prefix('*') {
            rest = r;
        }

        while let Some(c) = rest.chars().next() {
            match c {
                '#' | '.' => {
                    let n = ident_len(&rest[1..]);
                    if n == 0 {
                        return Err(unsupported(rest));
                    }
                    let name = rest[1..=n].to_owned();
                    if c == '#' {
                        sel.id = Some(name);
                    } else {
                        sel.classes.push(name);
                    }
                    rest = &rest[1 + n..];
                }
                '[' => {
                    let Some(end) = rest.find(']') else {
                        return Err(SelectorError::Unterminated(selector.to_owned()));
                    };
                    let body = &rest[1..end];
                    let (name, value) = match body.split_once('=') {
                        Some((n, v)) => (
                            n.trim(),
                            Some(v.trim().trim_matches(|q| q == '"' || q == '\'').to_owned()),
                        ),
                        None => (body.trim(), None),
                    };
                    if name.is_empty() || ident_len(name) != name.len() {
                        return Err(unsupported(rest));
                    }
                    sel.attributes.push((name.to_ascii_lowercase(), value));
                    rest = &rest[end + 1..];
                }
                _ => return Err(unsupported(rest)),
            }
        }
        Ok(sel)
    }

    /// Whether the live node `id` matches this selector.
    pub fn matches(&self, doc: &Document, id: NodeId) -> bool {
        if !doc.is_alive(id) {
            return false;
        }
        if let Some(tag) = &self.tag
            && doc.tag(id) != Some(tag.as_str())
        {
            return false;
        }
        if let Some(want) = &self.id
            && doc.attribute(id, "id") != Some(want.as_str())
        {
            return false;
        }
        self.classes.iter().all(|c| doc.has_class(id, c))
            && self.attributes.iter().all(|(name, value)| {
                match (doc.attribute(id, name), value) {
                    (Some(actual), Some(want)) => actual == want,
                    (Some(_), None) => true,
                    (None, _) => false,
                }
            })
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
