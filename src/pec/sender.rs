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

//! Recovery of the human sender of a PEC from the provider's `From`.
//!
//! PEC providers send the transport envelope from their own mailbox, putting
//! the real sender in the display name, e.g.
//! `"Per conto di: mario.rossi@example.it" <posta-certificata@pec.example.it>`.

use lazy_static::lazy_static;
use regex::Regex;

use crate::mime::encoded_word::ew_decode_unstructured;
use crate::mime::envelope::EnvelopeAddress;
use crate::support::config::SenderConfig;

lazy_static! {
    static ref EMAIL: Regex = Regex::new(
        r"[A-Za-z0-9!#$%&'*+/=?^_`{|}~.-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}"
    )
    .unwrap();
}

/// Produce the string to show as the sender of the message `from`.
///
/// In order of preference:
///
/// - The first email address in the display name, if the name carries the
///   "on behalf of" marker.
///
/// - The display name, unless it is provider noise.
///
/// - `mailbox@host`.
pub fn resolve_sender(from: &EnvelopeAddress, config: &SenderConfig) -> String {
    let name = from
        .name
        .as_deref()
        .map(|name| ew_decode_unstructured(name.trim()).trim().to_owned())
        .filter(|name| !name.is_empty());

    if let Some(name) = name {
        if !config.on_behalf_marker.is_empty()
            && name.contains(&config.on_behalf_marker)
        {
            if let Some(email) = EMAIL.find(&name) {
                return email.as_str().to_owned();
            }
        }

        if config.provider_noise.is_empty()
            || !name.contains(&config.provider_noise)
        {
            return name;
        }
    }

    from.email()
}
