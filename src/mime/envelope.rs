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

use std::borrow::Cow;
use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::entity::split_headers;
use super::header;
use super::strings::*;

/// The subset of the IMAP `ENVELOPE` structure the PEC views are built on.
///
/// Values are kept in their raw header form, apart from unfolding; in
/// particular, encoded words in `subject` and display names are *not*
/// decoded, matching what an IMAP server reports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// The `Date` header, trimmed.
    pub date: Option<String>,
    /// The `Subject` header, unfolded.
    pub subject: Option<String>,
    /// The `From` header.
    ///
    /// Group syntax is flattened away; only real mailboxes remain.
    pub from: Vec<EnvelopeAddress>,
    /// The `To` header, flattened like `from`.
    pub to: Vec<EnvelopeAddress>,
    /// The `Message-ID` header, trimmed.
    pub message_id: Option<String>,
}

/// One mailbox in an `Envelope`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeAddress {
    /// The display name if present, still encoded.
    pub name: Option<String>,
    /// The local part (RFC 3501 calls it "mailbox name").
    pub mailbox: String,
    /// The domain (RFC 3501 calls it "host").
    pub host: String,
}

impl EnvelopeAddress {
    pub fn new(name: Option<&str>, mailbox: &str, host: &str) -> Self {
        EnvelopeAddress {
            name: name.map(str::to_owned),
            mailbox: mailbox.to_owned(),
            host: host.to_owned(),
        }
    }

    /// The bare `mailbox@host` form.
    pub fn email(&self) -> String {
        format!("{}@{}", self.mailbox, self.host)
    }
}

impl fmt::Display for EnvelopeAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.name {
            Some(ref name) => {
                write!(f, "{} <{}@{}>", name, self.mailbox, self.host)
            }
            None => write!(f, "{}@{}", self.mailbox, self.host),
        }
    }
}

bitflags! {
    struct EnvelopeParts: u32 {
        const DATE = 1 << 0;
        const SUBJECT = 1 << 1;
        const FROM = 1 << 2;
        const TO = 1 << 3;
        const MESSAGE_ID = 1 << 4;
    }
}

impl Default for EnvelopeParts {
    fn default() -> Self {
        EnvelopeParts::empty()
    }
}

/// Collects the `Envelope` from a header block.
///
/// Only the first instance of each header counts.
#[derive(Debug, Default)]
struct EnvelopeBuilder {
    envelope: Envelope,
    seen: EnvelopeParts,
}

impl EnvelopeBuilder {
    fn header(&mut self, name: &str, value: &[u8]) {
        use EnvelopeParts as E;

        if "Date".eq_ignore_ascii_case(name) {
            self.trimmed(E::DATE, |e| &mut e.date, value);
        } else if "Subject".eq_ignore_ascii_case(name) {
            self.trimmed(E::SUBJECT, |e| &mut e.subject, value);
        } else if "From".eq_ignore_ascii_case(name) {
            self.addr_list(E::FROM, |e| &mut e.from, value);
        } else if "To".eq_ignore_ascii_case(name) {
            self.addr_list(E::TO, |e| &mut e.to, value);
        } else if "Message-Id".eq_ignore_ascii_case(name) {
            self.trimmed(E::MESSAGE_ID, |e| &mut e.message_id, value);
        }
    }

    fn is_complete(&self) -> bool {
        self.seen.is_all()
    }

    fn addr_list(
        &mut self,
        part: EnvelopeParts,
        accessor: impl FnOnce(&mut Envelope) -> &mut Vec<EnvelopeAddress>,
        value: &[u8],
    ) {
        if !self.seen.contains(part) {
            *accessor(&mut self.envelope) = parse_envelope_addresses(value);
            self.seen |= part;
        }
    }

    fn trimmed(
        &mut self,
        part: EnvelopeParts,
        accessor: impl FnOnce(&mut Envelope) -> &mut Option<String>,
        value: &[u8],
    ) {
        if !self.seen.contains(part) {
            *accessor(&mut self.envelope) =
                Some(unfold(Cow::Borrowed(value)));
            self.seen |= part;
        }
    }
}

/// Parse an address-list header value into flat `EnvelopeAddress`es.
///
/// An unparseable value yields no addresses.
pub fn parse_envelope_addresses(value: &[u8]) -> Vec<EnvelopeAddress> {
    let mut out = Vec::new();
    for address in header::parse_address_list(value).unwrap_or_default() {
        match address {
            header::Address::Mailbox(mbox) => {
                out.push(to_envelope_address(mbox))
            }
            header::Address::Group(group) => {
                out.extend(group.boxes.into_iter().map(to_envelope_address))
            }
        }
    }
    out
}

fn to_envelope_address(mbox: header::MailboxSpec) -> EnvelopeAddress {
    EnvelopeAddress {
        name: Some(decode_phrase(mbox.name)).filter(|s| !s.is_empty()),
        mailbox: decode_dotted(mbox.addr.local),
        host: decode_dotted(mbox.addr.domain),
    }
}

/// Read just the `Envelope` of the given message.
pub fn parse_envelope(message: &[u8]) -> Envelope {
    let (headers, _) = split_headers(message);
    let mut builder = EnvelopeBuilder::default();
    for (name, value) in headers {
        builder.header(name, value);
        if builder.is_complete() {
            break;
        }
    }
    builder.envelope
}
