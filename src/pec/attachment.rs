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

use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use log::debug;

use super::cache::Lazy;
use crate::mime::raw::{RawMessage, RawPart};
use crate::support::error::Error;
use crate::support::file_ops;
use crate::support::safe_name::is_safe_file_name;

/// The name PEC providers give the embedded original message.
pub const POSTACERT_FILENAME: &str = "postacert.eml";

/// One file attached to a message.
pub struct Attachment {
    filename: String,
    mime_type: String,
    content: Vec<u8>,
    message: Lazy<RawMessage>,
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("filename", &self.filename)
            .field("mime_type", &self.mime_type)
            .field("content", &format_args!("[{} bytes]", self.content.len()))
            .finish()
    }
}

impl Attachment {
    pub fn new(
        filename: impl Into<String>,
        mime_type: impl Into<String>,
        content: Vec<u8>,
    ) -> Self {
        Attachment {
            filename: filename.into(),
            mime_type: mime_type.into(),
            content,
            message: Lazy::new(),
        }
    }

    /// Wrap an attachment part of a parsed message.
    ///
    /// Parts without a file name are given a generic one.
    pub fn from_part(part: &RawPart) -> Self {
        let filename = part.filename().map(str::to_owned).unwrap_or_else(|| {
            if part.is_message_rfc822() {
                "message.eml".to_owned()
            } else {
                "attachment.bin".to_owned()
            }
        });

        Attachment::new(filename, part.mime_type(), part.body.clone())
    }

    /// Wrap an already parsed nested postacert message.
    pub(crate) fn postacert(content: Vec<u8>, message: RawMessage) -> Self {
        Attachment {
            filename: POSTACERT_FILENAME.to_owned(),
            mime_type: "message/rfc822".to_owned(),
            content,
            message: Lazy::resolved(message),
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// The decoded content of the attachment.
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn size(&self) -> usize {
        self.content.len()
    }

    /// Whether this attachment is (or claims to be) an embedded PEC.
    pub fn is_postacert(&self) -> bool {
        self.filename.eq_ignore_ascii_case(POSTACERT_FILENAME)
            || (self.filename.to_ascii_lowercase().ends_with(".eml")
                && self.mime_type.to_ascii_lowercase().starts_with("message/"))
    }

    /// Parse the content as a message.
    ///
    /// The result is kept; failures are not.
    pub fn message(&self) -> Result<Rc<RawMessage>, Error> {
        self.message
            .get_or_try_resolve(|| RawMessage::parse(&self.content).map(Some))?
            .ok_or(Error::MalformedMessage("empty message"))
    }

    /// Write the content to `path`, replacing anything already there.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let path = path.as_ref();
        debug!(
            "Saving {} ({} bytes) to {}",
            self.filename,
            self.content.len(),
            path.display()
        );
        file_ops::spit(path, &self.content)?;
        Ok(())
    }

    /// Write the content into `dir` under its own file name, returning the
    /// path written.
    ///
    /// Fails with `Error::UnsafeName` if the file name cannot be used as a
    /// plain name inside `dir`.
    pub fn save_to_dir(&self, dir: impl AsRef<Path>) -> Result<PathBuf, Error> {
        if !is_safe_file_name(&self.filename) {
            return Err(Error::UnsafeName);
        }

        let path = dir.as_ref().join(&self.filename);
        self.save_to(&path)?;
        Ok(path)
    }
}
