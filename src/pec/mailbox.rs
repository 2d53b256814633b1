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

//! An in-memory mailbox, for working with `.eml` files without a server.
//!
//! `LocalMailbox` derives what an IMAP server would report for each message
//! (envelope and body structure) and answers part fetches the way
//! `BINARY[path]` would.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use log::debug;

use super::bodystructure::{BodyStructureNode, PartPath};
use super::fetch::PartFetcher;
use super::message::Message;
use super::model::Uid;
use crate::mime::envelope::{parse_envelope, Envelope};
use crate::mime::raw::{RawMessage, RawPart};
use crate::support::config::PecConfig;
use crate::support::error::Error;

#[derive(Debug, Default)]
pub struct LocalMailbox {
    messages: BTreeMap<Uid, Vec<u8>>,
    config: Rc<PecConfig>,
    closed: Cell<bool>,
}

impl LocalMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: Rc<PecConfig>) -> Self {
        LocalMailbox {
            config,
            ..Self::default()
        }
    }

    /// Add `data` as message `uid`, replacing any message already there.
    pub fn insert(&mut self, uid: Uid, data: impl Into<Vec<u8>>) {
        self.messages.insert(uid, data.into());
    }

    /// Add the `.eml` file at `path` under the next free UID, which is
    /// returned.
    pub fn insert_file(&mut self, path: impl AsRef<Path>) -> Result<Uid, Error> {
        let data = fs::read(path)?;
        let next = self.messages.keys().next_back().map_or(1, |u| u.get() + 1);
        let uid = Uid::of(next)
            .ok_or(Error::MalformedMessage("mailbox UIDs exhausted"))?;
        self.insert(uid, data);
        Ok(uid)
    }

    pub fn uids(&self) -> impl Iterator<Item = Uid> + '_ {
        self.messages.keys().copied()
    }

    /// Make every further fetch fail as if the session had dropped.
    pub fn close(&self) {
        self.closed.set(true);
    }

    fn raw(&self, uid: Uid) -> Result<&[u8], Error> {
        if self.closed.get() {
            return Err(Error::ConnectionUnavailable(
                "mailbox closed".to_owned(),
            ));
        }

        self.messages
            .get(&uid)
            .map(|data| &data[..])
            .ok_or_else(|| Error::PartUnavailable {
                uid,
                path: PartPath::root(),
            })
    }

    /// The IMAP envelope of message `uid`.
    pub fn envelope(&self, uid: Uid) -> Result<Envelope, Error> {
        Ok(parse_envelope(self.raw(uid)?))
    }

    /// The IMAP body structure of message `uid`, or `None` if the message
    /// does not parse.
    pub fn bodystructure(
        &self,
        uid: Uid,
    ) -> Result<Option<BodyStructureNode>, Error> {
        Ok(RawMessage::parse(self.raw(uid)?)
            .ok()
            .map(|message| bodystructure_of(&message.root)))
    }

    /// Open message `uid` as a PEC message backed by this mailbox.
    pub fn message(&self, uid: Uid) -> Result<Message<'_>, Error> {
        Ok(Message::with_config(
            self,
            uid,
            self.envelope(uid)?,
            self.bodystructure(uid)?,
            Rc::clone(&self.config),
        ))
    }
}

impl PartFetcher for LocalMailbox {
    fn fetch_part_bytes(
        &self,
        uid: Uid,
        path: &PartPath,
    ) -> Result<Vec<u8>, Error> {
        let data = self.raw(uid)?;
        if path.is_whole_message() {
            debug!("{} Local fetch of whole message", uid);
            return Ok(data.to_vec());
        }

        let message = RawMessage::parse(data)?;
        let content = locate(&message.root, path.indices()).ok_or_else(|| {
            Error::PartUnavailable {
                uid,
                path: path.clone(),
            }
        })?;
        debug!("{} Local fetch of [{}], {} bytes", uid, path, content.len());
        Ok(content)
    }
}

fn bodystructure_of(part: &RawPart) -> BodyStructureNode {
    if part.is_multipart() {
        return BodyStructureNode::composite(
            part.children.iter().map(bodystructure_of).collect(),
        );
    }

    let embedded_body = if part.is_message_rfc822() {
        RawMessage::parse(&part.body)
            .ok()
            .map(|embedded| Box::new(bodystructure_of(&embedded.root)))
    } else {
        None
    };

    BodyStructureNode::Leaf {
        media_type: Some(part.media_type.to_ascii_uppercase()),
        subtype: Some(part.media_subtype.to_ascii_uppercase()),
        parameters: part
            .content_type_parms
            .iter()
            .map(|&(ref name, ref value)| {
                (name.to_ascii_uppercase(), value.clone())
            })
            .collect(),
        embedded_body,
    }
}

/// Find the content of the part at `indices` below `root`, the top part of
/// some message.
///
/// A `root` which is not multipart is its own part 1.
fn locate(root: &RawPart, indices: &[u32]) -> Option<Vec<u8>> {
    let (&first, rest) = indices.split_first()?;
    let part = if root.is_multipart() {
        root.children.get((first as usize).checked_sub(1)?)?
    } else if 1 == first {
        root
    } else {
        return None;
    };

    if rest.is_empty() {
        if part.is_multipart() {
            None
        } else {
            Some(part.body.clone())
        }
    } else if part.is_multipart() {
        locate(part, rest)
    } else if part.is_message_rfc822() {
        let embedded = RawMessage::parse(&part.body).ok()?;
        locate(&embedded.root, rest)
    } else {
        None
    }
}
