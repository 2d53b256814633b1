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

//! Fetching and parsing of embedded messages.

use log::debug;

use super::bodystructure::{find_postacert_parts, BodyStructureNode, PartPath};
use super::fetch::PartFetcher;
use super::model::Uid;
use crate::mime::raw::RawMessage;
use crate::support::error::Error;

/// Fetch the part at `path` of message `uid` and parse it as a message.
///
/// Returns the fetched bytes along with the parsed message. A lost
/// connection is passed through as is; anything else is wrapped in
/// `Error::Extraction`.
pub fn fetch_message(
    fetcher: &dyn PartFetcher,
    uid: Uid,
    path: &PartPath,
) -> Result<(Vec<u8>, RawMessage), Error> {
    debug!("{} Fetching part [{}]", uid, path);
    let wrap = |e: Error| {
        if e.is_connection_loss() {
            e
        } else {
            Error::extraction(uid, path.clone(), e)
        }
    };

    let data = fetcher.fetch_part_bytes(uid, path).map_err(wrap)?;
    let message = RawMessage::parse(&data).map_err(wrap)?;
    debug!("{} Parsed part [{}], {} bytes", uid, path, data.len());
    Ok((data, message))
}

/// Locate, fetch and parse the primary `postacert.eml` of a message.
///
/// The primary part is the first one in document order, not counting those
/// inside embedded messages. A message without one yields `None`.
pub fn extract_postacert(
    fetcher: &dyn PartFetcher,
    uid: Uid,
    bodystructure: Option<&BodyStructureNode>,
) -> Result<Option<RawMessage>, Error> {
    let path = match primary_postacert_path(bodystructure) {
        Some(path) => path,
        None => {
            debug!("{} No postacert part", uid);
            return Ok(None);
        }
    };

    fetch_message(fetcher, uid, &path).map(|(_, message)| Some(message))
}

pub fn primary_postacert_path(
    bodystructure: Option<&BodyStructureNode>,
) -> Option<PartPath> {
    find_postacert_parts(bodystructure, &PartPath::root(), false)
        .into_iter()
        .next()
}
