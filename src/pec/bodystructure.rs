//-
// Copyright (c) 2024, the Pecmap authors
//
// This file is part of Pecmap.
//
// Pecmap is free software: you can  redistribute it and/or modify it under the
// terms of  the GNU General Public  License as published by  the Free Software
// Foundation, either version  3 of the License, or (at  your option) any later
// version.
//
// Pecmap is distributed  in the hope that  it will be useful,  but WITHOUT ANY
// WARRANTY; without  even the implied  warranty of MERCHANTABILITY  or FITNESS
// FOR  A PARTICULAR  PURPOSE.  See the  GNU General  Public  License for  more
// details.
//
// You should have received a copy of the GNU General Public License along with
// Pecmap. If not, see <http://www.gnu.org/licenses/>.

//! The IMAP `BODYSTRUCTURE` as seen by the PEC views, and location of
//! `postacert.eml` parts within it.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use thiserror::Error;

/// One node of a body structure as reported by the server.
///
/// Servers differ in how much detail they give, so everything about a leaf
/// is optional.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BodyStructureNode {
    /// A `multipart/*` node.
    Composite { children: Vec<BodyStructureNode> },
    /// Anything else.
    Leaf {
        media_type: Option<String>,
        subtype: Option<String>,
        /// Content-Type parameters, as reported.
        parameters: Vec<(String, String)>,
        /// For `message/rfc822`, the structure of the embedded message.
        embedded_body: Option<Box<BodyStructureNode>>,
    },
}

impl BodyStructureNode {
    pub fn composite(children: Vec<BodyStructureNode>) -> Self {
        BodyStructureNode::Composite { children }
    }

    pub fn leaf(media_type: &str, subtype: &str) -> Self {
        BodyStructureNode::Leaf {
            media_type: Some(media_type.to_owned()),
            subtype: Some(subtype.to_owned()),
            parameters: vec![],
            embedded_body: None,
        }
    }

    /// A `MESSAGE/RFC822` leaf, optionally named and carrying the embedded
    /// message's structure.
    pub fn message(name: Option<&str>, embedded: Option<Self>) -> Self {
        let mut node = BodyStructureNode::leaf("MESSAGE", "RFC822");
        if let Some(name) = name {
            node = node.with_parameter("NAME", name);
        }
        if let Some(embedded) = embedded {
            node = node.with_embedded(embedded);
        }
        node
    }

    /// Add a parameter to a leaf. No effect on composites.
    pub fn with_parameter(mut self, name: &str, value: &str) -> Self {
        if let BodyStructureNode::Leaf {
            ref mut parameters, ..
        } = self
        {
            parameters.push((name.to_owned(), value.to_owned()));
        }
        self
    }

    /// Set the embedded body of a leaf. No effect on composites.
    pub fn with_embedded(mut self, body: BodyStructureNode) -> Self {
        if let BodyStructureNode::Leaf {
            ref mut embedded_body,
            ..
        } = self
        {
            *embedded_body = Some(Box::new(body));
        }
        self
    }

    fn is_postacert_part(&self) -> bool {
        match *self {
            BodyStructureNode::Composite { .. } => false,
            BodyStructureNode::Leaf {
                ref media_type,
                ref subtype,
                ref parameters,
                ..
            } => {
                media_type
                    .as_deref()
                    .map_or(false, |t| t.eq_ignore_ascii_case("MESSAGE"))
                    && subtype
                        .as_deref()
                        .map_or(false, |s| s.eq_ignore_ascii_case("RFC822"))
                    && parameters.iter().any(|&(ref name, ref value)| {
                        name.eq_ignore_ascii_case("NAME")
                            && value.to_lowercase().contains("postacert.eml")
                    })
            }
        }
    }
}

/// Address of a body part in IMAP section syntax, e.g. `2.1`.
///
/// The empty path means the whole message.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartPath(Vec<u32>);

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Invalid part path")]
pub struct InvalidPartPath;

impl PartPath {
    /// The path of the entire message.
    pub fn root() -> Self {
        PartPath(vec![])
    }

    /// The path of the `index`th (1-based) child of this part.
    pub fn child(&self, index: u32) -> Self {
        let mut v = self.0.clone();
        v.push(index);
        PartPath(v)
    }

    pub fn is_whole_message(&self) -> bool {
        self.0.is_empty()
    }

    pub fn indices(&self) -> &[u32] {
        &self.0
    }
}

impl fmt::Display for PartPath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (ix, part) in self.0.iter().enumerate() {
            if ix > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", part)?;
        }
        Ok(())
    }
}

impl FromStr for PartPath {
    type Err = InvalidPartPath;

    fn from_str(s: &str) -> Result<Self, InvalidPartPath> {
        if s.is_empty() {
            return Ok(PartPath::root());
        }

        s.split('.')
            .map(|p| match p.parse::<u32>() {
                Ok(0) | Err(_) => Err(InvalidPartPath),
                Ok(n) => Ok(n),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(PartPath)
    }
}

impl Serialize for PartPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Find every `postacert.eml` part within `node`, in document order.
///
/// `prefix` is the path of the message whose body `node` is; pass the root
/// path for the top-level structure. A bare leaf at the top is addressed as
/// the first child of `prefix`, as IMAP does for single-part messages.
///
/// If `include_nested` is set, the structures of embedded messages are
/// searched too, whether or not the embedding part itself qualified.
pub fn find_postacert_parts(
    node: Option<&BodyStructureNode>,
    prefix: &PartPath,
    include_nested: bool,
) -> Vec<PartPath> {
    let mut found = Vec::new();
    match node {
        None => (),
        Some(&BodyStructureNode::Composite { ref children }) => {
            find_in_children(children, prefix, include_nested, &mut found)
        }
        Some(leaf) => {
            find_in_node(leaf, prefix.child(1), include_nested, &mut found)
        }
    }
    found
}

fn find_in_children(
    children: &[BodyStructureNode],
    prefix: &PartPath,
    include_nested: bool,
    found: &mut Vec<PartPath>,
) {
    for (ix, child) in children.iter().enumerate() {
        find_in_node(
            child,
            prefix.child(ix as u32 + 1),
            include_nested,
            found,
        );
    }
}

fn find_in_node(
    node: &BodyStructureNode,
    path: PartPath,
    include_nested: bool,
    found: &mut Vec<PartPath>,
) {
    match *node {
        BodyStructureNode::Composite { ref children } => {
            find_in_children(children, &path, include_nested, found)
        }
        BodyStructureNode::Leaf {
            ref embedded_body, ..
        } => {
            if node.is_postacert_part() {
                found.push(path.clone());
            }

            if include_nested {
                if let Some(&BodyStructureNode::Composite { ref children }) =
                    embedded_body.as_deref()
                {
                    find_in_children(children, &path, include_nested, found);
                }
            }
        }
    }
}
