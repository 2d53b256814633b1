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

//! Fully parsed MIME messages.
//!
//! `RawMessage::parse` splits a message into entities and turns them into
//! an owned tree of `RawPart`s, transfer-decoding leaf bodies on the way.
//! Embedded `message/rfc822` parts stay as leaves holding the embedded
//! bytes; they are only parsed when somebody asks.

use std::borrow::Cow;

use chrono::prelude::*;

use super::content_encoding::decode_transfer_encoding;
use super::entity::{self, Entity};
use super::envelope::{parse_envelope_addresses, EnvelopeAddress};
use super::header::{self, ContentTransferEncoding};
use super::strings::{decode_unstructured, unfold};
use crate::support::error::Error;

/// One node of a parsed MIME tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawPart {
    /// Every syntactically valid header, in order, with raw values.
    pub headers: Vec<(String, Vec<u8>)>,
    /// Lower-case media type, e.g. `text`.
    pub media_type: String,
    /// Lower-case media subtype, e.g. `plain`.
    pub media_subtype: String,
    /// `Content-Type` parameters, names lower-cased, RFC 2231 resolved.
    pub content_type_parms: Vec<(String, String)>,
    /// The charset declared on a `text/*` part.
    pub charset: Option<String>,
    /// Lower-case `Content-Disposition` value.
    pub disposition: Option<String>,
    pub disposition_parms: Vec<(String, String)>,
    pub content_transfer_encoding: ContentTransferEncoding,
    /// Transfer-decoded content. Empty for multiparts.
    pub body: Vec<u8>,
    /// Children of a multipart, in order.
    pub children: Vec<RawPart>,
}

impl RawPart {
    fn from_entity(entity: &Entity<'_>) -> Self {
        let ct = &entity.content_type;
        let mut part = RawPart {
            headers: entity
                .headers
                .iter()
                .map(|&(name, value)| (name.to_owned(), value.to_vec()))
                .collect(),
            media_type: String::from_utf8_lossy(&ct.typ).to_lowercase(),
            media_subtype: String::from_utf8_lossy(&ct.subtype)
                .to_lowercase(),
            content_type_parms: header::decode_parms(&ct.parms),
            ..RawPart::default()
        };

        if ct.is_type("text") {
            part.charset = part
                .content_type_parm("charset")
                .map(|c| c.trim().to_owned())
                .filter(|c| !c.is_empty());
        }

        // The first usable instance of each header wins
        if let Some(cte) = entity
            .headers
            .iter()
            .filter(|&&(name, _)| {
                "Content-Transfer-Encoding".eq_ignore_ascii_case(name)
            })
            .find_map(|&(_, value)| {
                header::parse_content_transfer_encoding(value)
            })
        {
            part.content_transfer_encoding = cte;
        }

        if let Some(cd) = entity
            .headers
            .iter()
            .filter(|&&(name, _)| {
                "Content-Disposition".eq_ignore_ascii_case(name)
            })
            .find_map(|&(_, value)| header::parse_content_disposition(value))
        {
            part.disposition =
                Some(String::from_utf8_lossy(&cd.disposition).to_lowercase());
            part.disposition_parms = header::decode_parms(&cd.parms);
        }

        if part.is_multipart() {
            part.children =
                entity.children.iter().map(RawPart::from_entity).collect();
        } else {
            part.body = decode_transfer_encoding(
                part.content_transfer_encoding,
                entity.body,
            );
        }

        part
    }

    /// The full `type/subtype` string.
    pub fn mime_type(&self) -> String {
        format!("{}/{}", self.media_type, self.media_subtype)
    }

    pub fn is_multipart(&self) -> bool {
        "multipart" == self.media_type
    }

    pub fn is_message_rfc822(&self) -> bool {
        "message" == self.media_type && "rfc822" == self.media_subtype
    }

    /// The raw value of the first header called `name`.
    pub fn header(&self, name: &str) -> Option<&[u8]> {
        self.headers
            .iter()
            .find(|&&(ref n, _)| n.eq_ignore_ascii_case(name))
            .map(|&(_, ref v)| &v[..])
    }

    pub fn content_type_parm(&self, name: &str) -> Option<&str> {
        find_parm(&self.content_type_parms, name)
    }

    pub fn disposition_parm(&self, name: &str) -> Option<&str> {
        find_parm(&self.disposition_parms, name)
    }

    /// The file name the sender gave this part, if any.
    ///
    /// The `Content-Disposition` `filename` wins over the older `Content-Type`
    /// `name`.
    pub fn filename(&self) -> Option<&str> {
        self.disposition_parm("filename")
            .or_else(|| self.content_type_parm("name"))
            .filter(|name| !name.is_empty())
    }

    /// Whether this part should be presented as an attachment.
    pub fn is_attachment(&self) -> bool {
        !self.is_multipart()
            && (self.filename().is_some()
                || Some("attachment") == self.disposition.as_deref()
                || self.is_message_rfc822())
    }

    fn collect_attachments<'a>(&'a self, dst: &mut Vec<&'a RawPart>) {
        if self.is_multipart() {
            for child in &self.children {
                child.collect_attachments(dst);
            }
        } else if self.is_attachment() {
            dst.push(self);
        }
    }
}

fn find_parm<'a>(parms: &'a [(String, String)], name: &str) -> Option<&'a str> {
    parms
        .iter()
        .find(|&&(ref n, _)| n.eq_ignore_ascii_case(name))
        .map(|&(_, ref v)| &v[..])
}

/// A complete parsed message with its commonly used headers decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct RawMessage {
    /// `Subject`, unfolded and RFC 2047 decoded.
    pub subject: Option<String>,
    pub from: Vec<EnvelopeAddress>,
    pub to: Vec<EnvelopeAddress>,
    pub date: Option<DateTime<FixedOffset>>,
    pub message_id: Option<String>,
    /// The top-level entity, which carries the message headers.
    pub root: RawPart,
}

impl RawMessage {
    /// Parse `data` as an RFC 822 message.
    ///
    /// This only fails if there is nothing that looks like a message at
    /// all; anything else is accepted as well as possible.
    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        if data.iter().all(|b| b.is_ascii_whitespace()) {
            return Err(Error::MalformedMessage("empty message"));
        }

        let entity = entity::parse(data);
        if entity.headers.is_empty() {
            return Err(Error::MalformedMessage("no headers"));
        }
        let root = RawPart::from_entity(&entity);

        let subject = root
            .header("Subject")
            .map(|v| decode_unstructured(Cow::Borrowed(v)));
        let from = root
            .header("From")
            .map(parse_envelope_addresses)
            .unwrap_or_default();
        let to = root
            .header("To")
            .map(parse_envelope_addresses)
            .unwrap_or_default();
        let date = root
            .header("Date")
            .and_then(|v| std::str::from_utf8(v).ok())
            .and_then(header::parse_datetime);
        let message_id =
            root.header("Message-ID").map(|v| unfold(Cow::Borrowed(v)));

        Ok(RawMessage {
            subject,
            from,
            to,
            date,
            message_id,
            root,
        })
    }

    pub fn is_multipart(&self) -> bool {
        self.root.is_multipart()
    }

    /// The top-level parts: the root's children for a multipart message,
    /// else the root itself.
    pub fn parts(&self) -> &[RawPart] {
        if self.is_multipart() {
            &self.root.children
        } else {
            std::slice::from_ref(&self.root)
        }
    }

    /// All attachment parts, depth-first in document order.
    ///
    /// Embedded messages are returned as attachments themselves; their own
    /// contents are not searched.
    pub fn attachments(&self) -> Vec<&RawPart> {
        let mut ret = Vec::new();
        if self.is_multipart() {
            self.root.collect_attachments(&mut ret);
        } else if self.root.is_attachment()
            && self.root.disposition.is_some()
        {
            // A single-part message is only an attachment if it says so;
            // otherwise its body is just the text.
            ret.push(&self.root);
        }
        ret
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn parse(message: &str) -> RawMessage {
        RawMessage::parse(message.replace('\n', "\r\n").as_bytes()).unwrap()
    }

    fn outline(part: &RawPart) -> String {
        if part.is_multipart() {
            format!(
                "{}[{}]",
                part.mime_type(),
                part.children
                    .iter()
                    .map(outline)
                    .collect::<Vec<_>>()
                    .join(",")
            )
        } else {
            part.mime_type()
        }
    }

    #[test]
    fn simple_message() {
        let message = parse(
            "\
From: Mario Rossi <mario.rossi@example.it>
To: a@example.it, \"B\" <b@example.it>
Subject: =?UTF-8?Q?Perch=C3=A9?= no
Date: Tue, 5 Mar 2024 09:07:12 +0100
Message-ID: <abc@example.it>

Ciao,
a presto.
",
        );

        assert_eq!(Some("Perché no"), message.subject.as_deref());
        assert_eq!("mario.rossi@example.it", message.from[0].email());
        assert_eq!(Some("Mario Rossi"), message.from[0].name.as_deref());
        assert_eq!(2, message.to.len());
        assert_eq!(
            "2024-03-05T09:07:12+01:00",
            message.date.unwrap().to_rfc3339()
        );
        assert_eq!(Some("<abc@example.it>"), message.message_id.as_deref());
        assert!(!message.is_multipart());
        assert_eq!("text/plain", message.root.mime_type());
        assert_eq!(b"Ciao,\r\na presto.\r\n", &message.root.body[..]);
        assert_eq!(1, message.parts().len());
        assert!(message.attachments().is_empty());
    }

    #[test]
    fn multipart_structure() {
        let message = parse(
            "\
Subject: multi
Content-Type: multipart/mixed; boundary=outer

preamble
--outer
Content-Type: multipart/alternative; boundary=\"inner\"

--inner
Content-Type: text/plain; charset=ISO-8859-1
Content-Transfer-Encoding: quoted-printable

citt=E0
--inner
Content-Type: text/html

<p>citt&agrave;</p>
--inner--
--outer
Content-Type: application/pdf; name=\"fattura.pdf\"
Content-Disposition: attachment
Content-Transfer-Encoding: base64

JVBERi0x
LjQK
--outer
Content-Type: message/rfc822; name=postacert.eml

Subject: inner
Content-Type: multipart/mixed; boundary=deeper

--deeper
Content-Type: text/plain

hidden
--deeper--

--outer--
epilogue
",
        );

        assert_eq!(
            "multipart/mixed[multipart/alternative[text/plain,text/html],\
             application/pdf,message/rfc822]",
            outline(&message.root)
        );
        assert_eq!(3, message.parts().len());

        let alt = &message.root.children[0];
        assert_eq!(Some("ISO-8859-1"), alt.children[0].charset.as_deref());
        assert_eq!(b"citt\xE0", &alt.children[0].body[..]);
        assert_eq!(b"<p>citt&agrave;</p>", &alt.children[1].body[..]);

        let pdf = &message.root.children[1];
        assert_eq!(b"%PDF-1.4\n", &pdf.body[..]);
        assert_eq!(Some("fattura.pdf"), pdf.filename());
        assert_eq!(Some("attachment"), pdf.disposition.as_deref());

        let eml = &message.root.children[2];
        assert!(eml.is_message_rfc822());
        assert!(eml.children.is_empty());
        assert!(eml.body.starts_with(b"Subject: inner\r\n"));
        let embedded = RawMessage::parse(&eml.body).unwrap();
        assert_eq!(Some("inner"), embedded.subject.as_deref());
        assert_eq!(b"hidden", &embedded.parts()[0].body[..]);

        let attachments = message.attachments();
        assert_eq!(2, attachments.len());
        assert_eq!(Some("fattura.pdf"), attachments[0].filename());
        assert_eq!(Some("postacert.eml"), attachments[1].filename());
    }

    #[test]
    fn digest_defaults_to_message() {
        let message = parse(
            "\
Content-Type: multipart/digest; boundary=d

--d

Subject: one

1
--d
Content-Type: text/plain

two
--d--
",
        );

        assert_eq!(
            "multipart/digest[message/rfc822,text/plain]",
            outline(&message.root)
        );
    }

    #[test]
    fn unnamed_attachments() {
        let message = parse(
            "\
Content-Type: multipart/mixed; boundary=b

--b
Content-Type: text/plain

body
--b
Content-Type: application/octet-stream
Content-Disposition: attachment

xyz
--b
Content-Type: image/png
Content-Disposition: inline; filename*=UTF-8''logo%20blu.png

png
--b--
",
        );

        let attachments = message.attachments();
        assert_eq!(2, attachments.len());
        assert_eq!(None, attachments[0].filename());
        assert!(attachments[0].is_attachment());
        assert_eq!(Some("logo blu.png"), attachments[1].filename());
    }

    #[test]
    fn malformed_input() {
        assert_matches!(
            Err(Error::MalformedMessage(_)),
            RawMessage::parse(b"")
        );
        assert_matches!(
            Err(Error::MalformedMessage(_)),
            RawMessage::parse(b"\r\n\r\n")
        );
        assert_matches!(
            Err(Error::MalformedMessage(_)),
            RawMessage::parse(b"just some text\r\nand more\r\n")
        );

        // Odd but recognisable
        let message = RawMessage::parse(
            b"Content-Type: multipart/mixed; boundary=x\r\n\r\nno parts",
        )
        .unwrap();
        assert!(message.is_multipart());
        assert!(message.parts().is_empty());
    }

    #[test]
    fn long_lines_and_bare_newlines() {
        let long = "x".repeat(1000);
        let message = RawMessage::parse(
            format!(
                "Subject: long\nContent-Type: multipart/mixed; boundary=b\n\n\
                 --b\n\n{}\n--b--\n",
                long
            )
            .as_bytes(),
        )
        .unwrap();
        assert_eq!(long.as_bytes(), &message.parts()[0].body[..]);
    }

    #[test]
    fn recursion_is_bounded() {
        let mut message = String::new();
        for i in 0..30 {
            message.push_str(&format!(
                "Content-Type: multipart/mixed; boundary=b{}\n\n--b{}\n",
                i, i
            ));
        }
        message.push_str("\nbottom\n");

        let parsed = RawMessage::parse(message.as_bytes()).unwrap();
        let mut depth = 0;
        let mut part = &parsed.root;
        while let Some(child) = part.children.first() {
            depth += 1;
            part = child;
        }
        assert!(depth <= 20);
    }
}
