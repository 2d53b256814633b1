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

use super::bodystructure::PartPath;
use super::model::Uid;
use crate::support::error::Error;

/// The mail session the PEC views fetch message content through.
///
/// Implementations perform a blocking fetch and return the content of the
/// part at `path` of message `uid` (`BINARY[path]` in IMAP terms), or the
/// whole message if `path` is the root path.
///
/// A missing message or part must be reported as `Error::PartUnavailable`,
/// and a dead session as `Error::ConnectionUnavailable`.
pub trait PartFetcher {
    fn fetch_part_bytes(&self, uid: Uid, path: &PartPath)
        -> Result<Vec<u8>, Error>;
}

