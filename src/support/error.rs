//-
// Copyright (c) 2020, Jason Lingle
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

use std::io;

use thiserror::Error;

use crate::pec::bodystructure::PartPath;
use crate::pec::model::Uid;

#[derive(Error, Debug)]
pub enum Error {
    /// The mail session behind the fetch collaborator cannot be used.
    #[error("Mail session unavailable: {0}")]
    ConnectionUnavailable(String),
    /// The server has no such message, or the message has no such part.
    #[error("Part [{path}] of message {uid} is unavailable")]
    PartUnavailable { uid: Uid, path: PartPath },
    /// A part known to exist could not be fetched or parsed.
    #[error("Failed to extract part [{path}] of message {uid}: {source}")]
    Extraction {
        uid: Uid,
        path: PartPath,
        #[source]
        source: Box<Error>,
    },
    #[error("Cannot decode text as {charset}: {reason}")]
    Decode {
        charset: String,
        reason: &'static str,
    },
    #[error("Malformed message: {0}")]
    MalformedMessage(&'static str),
    #[error("Unsafe attachment file name")]
    UnsafeName,
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Config(#[from] toml::de::Error),
}

impl Error {
    /// Whether this error means that no further fetches can succeed.
    pub fn is_connection_loss(&self) -> bool {
        match *self {
            Error::ConnectionUnavailable(..) => true,
            Error::Extraction { ref source, .. } => source.is_connection_loss(),
            _ => false,
        }
    }

    pub(crate) fn extraction(uid: Uid, path: PartPath, source: Error) -> Self {
        Error::Extraction {
            uid,
            path,
            source: Box::new(source),
        }
    }
}
