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

//! Splitting raw messages into MIME entities.
//!
//! Messages are always held in memory in full, so this works directly on
//! slices of the original bytes. Nothing is decoded here: an `Entity` only
//! records where its header fields and body are, plus the one header
//! (`Content-Type`) needed to find the children of a multipart.
//!
//! The splitter accepts anything. Lines without a colon in the header block
//! are skipped, bare LF line endings are treated like CRLF, and a multipart
//! with no close delimiter simply ends at the end of the data.

use std::borrow::Cow;
use std::str;

use memchr::memchr;

use super::header::{self, ContentType};

/// Multiparts nested deeper than this are left as opaque content.
const MAX_DEPTH: u32 = 20;
/// Total number of child entities split out of one message.
const MAX_PARTS: u32 = 1000;
/// Header fields longer than this, including folding, are ignored.
const MAX_FIELD_LEN: usize = 65536;

/// One MIME entity within a message.
#[derive(Clone, Debug)]
pub struct Entity<'a> {
    /// Every usable header field, in order.
    ///
    /// Names are trimmed. Values are raw: they start right after the colon
    /// and still include folding and the final line ending.
    pub headers: Vec<(&'a str, &'a [u8])>,
    /// The first parseable `Content-Type`, or the default for the position
    /// of the entity if there is none.
    pub content_type: ContentType<'a>,
    /// Everything after the blank line which ends the header block.
    pub body: &'a [u8],
    /// The parts of a multipart, in order. Always empty for other types.
    pub children: Vec<Entity<'a>>,
}

/// Split `data` into a tree of entities.
///
/// Embedded `message/rfc822` entities are not descended into; their body is
/// the complete embedded message.
pub fn parse(data: &[u8]) -> Entity<'_> {
    let mut remaining_parts = MAX_PARTS;
    Entity::parse(data, text_plain(), 0, &mut remaining_parts)
}

impl<'a> Entity<'a> {
    fn parse(
        data: &'a [u8],
        default_content_type: ContentType<'static>,
        depth: u32,
        remaining_parts: &mut u32,
    ) -> Self {
        let (headers, body) = split_headers(data);
        let content_type = headers
            .iter()
            .filter(|&&(name, _)| "Content-Type".eq_ignore_ascii_case(name))
            .find_map(|&(_, value)| header::parse_content_type(value))
            .unwrap_or(default_content_type);

        let mut children = Vec::new();
        if depth < MAX_DEPTH && content_type.is_type("multipart") {
            if let Some(boundary) = content_type.parm("boundary") {
                let child_default = if content_type.is_subtype("digest") {
                    message_rfc822()
                } else {
                    text_plain()
                };

                for part in split_multipart(body, boundary) {
                    if 0 == *remaining_parts {
                        break;
                    }
                    *remaining_parts -= 1;

                    children.push(Entity::parse(
                        part,
                        child_default.clone(),
                        depth + 1,
                        remaining_parts,
                    ));
                }
            }
        }

        Entity {
            headers,
            content_type,
            body,
            children,
        }
    }
}

/// Split the header block off the front of `data`.
///
/// Returns the usable header fields and the body after the blank line. If
/// there is no blank line, everything is header and the body is empty.
pub fn split_headers(data: &[u8]) -> (Vec<(&str, &[u8])>, &[u8]) {
    let mut headers = Vec::new();
    let mut pos = 0;

    while pos < data.len() {
        let mut end = line_end(data, pos);
        let line = &data[pos..end];
        if b"\r\n" == line || b"\n" == line {
            return (headers, &data[end..]);
        }

        // Pull in any continuation lines
        while end < data.len() && is_folding_whitespace(data[end]) {
            end = line_end(data, end);
        }

        // A continuation with nothing to continue is dropped
        if !is_folding_whitespace(line[0]) {
            if let Some(field) = split_field(&data[pos..end]) {
                headers.push(field);
            }
        }

        pos = end;
    }

    (headers, &data[data.len()..])
}

fn split_field(field: &[u8]) -> Option<(&str, &[u8])> {
    if field.len() > MAX_FIELD_LEN {
        return None;
    }

    let colon = memchr(b':', field)?;
    let name = str::from_utf8(&field[..colon]).ok()?.trim();
    if name.is_empty() {
        None
    } else {
        Some((name, &field[colon + 1..]))
    }
}

/// Split the body of a multipart into the raw content of each part.
///
/// A delimiter is any line starting with `--` and the boundary. The line
/// ending before a delimiter belongs to the delimiter. The preamble and
/// epilogue are discarded.
fn split_multipart<'a>(body: &'a [u8], boundary: &[u8]) -> Vec<&'a [u8]> {
    let mut parts = Vec::new();
    let mut part_start = None;
    let mut pos = 0;

    while pos < body.len() {
        let end = line_end(body, pos);
        if let Some(is_close) = delimiter(&body[pos..end], boundary) {
            if let Some(start) = part_start {
                parts.push(without_line_ending(&body[start..pos]));
            }

            if is_close {
                return parts;
            }
            part_start = Some(end);
        }

        pos = end;
    }

    // Unterminated; the last part runs to the end
    if let Some(start) = part_start {
        parts.push(without_line_ending(&body[start..]));
    }
    parts
}

/// If `line` delimits parts for `boundary`, whether it is the close
/// delimiter.
fn delimiter(line: &[u8], boundary: &[u8]) -> Option<bool> {
    let rest = line.strip_prefix(b"--")?.strip_prefix(boundary)?;
    Some(rest.starts_with(b"--"))
}

/// The index just past the line starting at `pos`, including its LF.
fn line_end(data: &[u8], pos: usize) -> usize {
    memchr(b'\n', &data[pos..]).map_or(data.len(), |lf| pos + lf + 1)
}

fn without_line_ending(s: &[u8]) -> &[u8] {
    s.strip_suffix(b"\r\n")
        .or_else(|| s.strip_suffix(b"\n"))
        .unwrap_or(s)
}

fn is_folding_whitespace(b: u8) -> bool {
    b' ' == b || b'\t' == b
}

fn text_plain() -> ContentType<'static> {
    ContentType {
        typ: Cow::Borrowed(b"text"),
        subtype: Cow::Borrowed(b"plain"),
        parms: vec![],
    }
}

fn message_rfc822() -> ContentType<'static> {
    ContentType {
        typ: Cow::Borrowed(b"message"),
        subtype: Cow::Borrowed(b"rfc822"),
        parms: vec![],
    }
}
