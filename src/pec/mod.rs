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

//! Reading PEC (Posta Elettronica Certificata) messages.
//!
//! A PEC as delivered is a transport envelope written by the provider; the
//! message the sender wrote travels inside it as a `message/rfc822` part
//! named `postacert.eml`. `Message` presents the inner message as if it were
//! the message itself, fetching only the parts it needs through a
//! `PartFetcher`.

pub mod attachment;
pub mod bodystructure;
pub mod cache;
pub mod extract;
pub mod fetch;
pub mod mailbox;
pub mod message;
pub mod model;
pub mod nested;
pub mod sender;

#[cfg(test)]
mod integration_tests;
