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

//! Selection and decoding of the human-readable body of a message.

use encoding_rs::Encoding;
use serde::Serialize;

use super::raw::{RawMessage, RawPart};
use crate::support::error::Error;

/// A decoded text body, along with where it came from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TextBody {
    /// The text, as UTF-8.
    pub content: String,
    /// The MIME type of the part the text was taken from.
    pub content_type: String,
    /// The charset the part was decoded from.
    pub charset: String,
}

/// Find the first leaf of `message` whose MIME type is `mime_type`.
///
/// Multiparts are searched depth-first in document order without regard to
/// their subtype. Embedded messages are not searched.
pub fn select_text<'a>(
    message: &'a RawMessage,
    mime_type: &str,
) -> Option<&'a RawPart> {
    if message.is_multipart() {
        find_leaf(&message.root.children, mime_type)
    } else if message.root.mime_type().eq_ignore_ascii_case(mime_type) {
        Some(&message.root)
    } else {
        None
    }
}

fn find_leaf<'a>(parts: &'a [RawPart], mime_type: &str) -> Option<&'a RawPart> {
    parts.iter().find_map(|part| {
        if part.is_multipart() {
            find_leaf(&part.children, mime_type)
        } else if part.mime_type().eq_ignore_ascii_case(mime_type) {
            Some(part)
        } else {
            None
        }
    })
}

/// Pick the body part to present: plain text if there is any, else HTML.
pub fn select_body(message: &RawMessage) -> Option<&RawPart> {
    select_text(message, "text/plain")
        .or_else(|| select_text(message, "text/html"))
}

/// Decode the (transfer-decoded) body of `part` to UTF-8.
///
/// The charset is the one declared on the part, else a `charset` parameter
/// of any other type, else `default_charset`. Unknown charsets and byte
/// sequences that are invalid in the charset are errors.
pub fn decode_body(
    part: &RawPart,
    default_charset: &str,
) -> Result<TextBody, Error> {
    let charset = part
        .charset
        .as_deref()
        .or_else(|| part.content_type_parm("charset"))
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(default_charset);

    let encoding = Encoding::for_label_no_replacement(charset.as_bytes())
        .ok_or_else(|| Error::Decode {
            charset: charset.to_owned(),
            reason: "unknown charset",
        })?;
    let content = encoding
        .decode_without_bom_handling_and_without_replacement(&part.body)
        .ok_or_else(|| Error::Decode {
            charset: charset.to_owned(),
            reason: "invalid byte sequence",
        })?;

    Ok(TextBody {
        content: content.into_owned(),
        content_type: part.mime_type(),
        charset: charset.to_owned(),
    })
}

/// `select_body` followed by `decode_body`.
pub fn body(
    message: &RawMessage,
    default_charset: &str,
) -> Result<Option<TextBody>, Error> {
    select_body(message)
        .map(|part| decode_body(part, default_charset))
        .transpose()
}
