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

//! The PEC views of a message.
//!
//! A `Message` is built from what an IMAP `FETCH (UID ENVELOPE
//! BODYSTRUCTURE)` returns. It answers questions about the outer transport
//! envelope directly, and fetches the embedded `postacert.eml` (the message
//! the sender actually wrote) when something about it is asked for. Every
//! fetched or derived value is kept for the lifetime of the `Message`.

use std::fmt;
use std::rc::Rc;

use chrono::prelude::*;
use log::{debug, warn};
use serde::{Serialize, Serializer};

use super::attachment::Attachment;
use super::bodystructure::{BodyStructureNode, PartPath};
use super::cache::Lazy;
use super::extract::{extract_postacert, fetch_message};
use super::fetch::PartFetcher;
use super::model::Uid;
use super::nested::{self, PostacertEntry};
use super::sender::resolve_sender;
use crate::mime::envelope::Envelope;
use crate::mime::header::parse_datetime;
use crate::mime::raw::RawMessage;
use crate::mime::strings::decode_unstructured;
use crate::mime::text::{self, TextBody};
use crate::support::config::PecConfig;
use crate::support::error::Error;

type Attachments = Rc<Vec<Rc<Attachment>>>;

/// The accessors shared by `Message` and `NestedMessageView`.
pub trait PostacertView {
    /// The configuration in effect for this view.
    fn shared_config(&self) -> Rc<PecConfig>;

    /// The parsed postacert message, if there is one.
    fn postacert(&self) -> Result<Option<Rc<RawMessage>>, Error>;

    fn subject(&self) -> Result<Option<String>, Error>;
    fn from(&self) -> Result<Option<String>, Error>;
    fn to(&self) -> Result<Vec<String>, Error>;
    fn date(&self) -> Result<Option<DateTime<FixedOffset>>, Error>;

    /// Every attachment, postacerts included.
    fn attachments(&self) -> Result<Attachments, Error>;

    /// The postacert attachments found within this message.
    fn nested_attachments(&self) -> Result<Attachments, Error>;

    fn has_postacert(&self) -> Result<bool, Error> {
        Ok(self.postacert()?.is_some())
    }

    /// The body of the postacert message, plain text preferred.
    fn postacert_body(&self) -> Result<Option<TextBody>, Error> {
        match self.postacert()? {
            Some(message) => {
                text::body(&message, &self.shared_config().default_charset)
            }
            None => Ok(None),
        }
    }

    fn postacert_body_text(&self) -> Result<Option<TextBody>, Error> {
        match self.postacert()? {
            Some(message) => text_of(&message, "text/plain", &self.shared_config()),
            None => Ok(None),
        }
    }

    fn postacert_body_html(&self) -> Result<Option<TextBody>, Error> {
        match self.postacert()? {
            Some(message) => text_of(&message, "text/html", &self.shared_config()),
            None => Ok(None),
        }
    }

    /// `attachments()` without the postacerts.
    fn regular_attachments(&self) -> Result<Vec<Rc<Attachment>>, Error> {
        Ok(self
            .attachments()?
            .iter()
            .filter(|a| !a.is_postacert())
            .cloned()
            .collect())
    }

    /// Views of the nested postacert messages.
    ///
    /// Attachments that do not parse are logged and skipped.
    fn nested_postacerts(&self) -> Result<Vec<Rc<NestedMessageView>>, Error> {
        let config = self.shared_config();
        let mut views = Vec::new();
        for attachment in self.nested_attachments()?.iter() {
            match attachment.message() {
                Ok(message) => views.push(Rc::new(NestedMessageView::new(
                    message,
                    Rc::clone(&config),
                ))),
                Err(e) => warn!(
                    "Skipping unparseable nested postacert {}: {}",
                    attachment.filename(),
                    e
                ),
            }
        }
        Ok(views)
    }

    fn has_nested_postacerts(&self) -> Result<bool, Error> {
        Ok(!self.nested_attachments()?.is_empty())
    }

    /// The primary postacert and the ones nested within, flattened two
    /// levels deep.
    fn all_postacert_messages(&self) -> Result<Vec<PostacertEntry>, Error> {
        nested::all_postacert_messages(self)
    }
}

fn text_of(
    message: &RawMessage,
    mime_type: &str,
    config: &PecConfig,
) -> Result<Option<TextBody>, Error> {
    text::select_text(message, mime_type)
        .map(|part| text::decode_body(part, &config.default_charset))
        .transpose()
}

fn first_email(message: &RawMessage) -> Option<String> {
    message.from.first().map(|a| a.email())
}

fn all_emails(message: &RawMessage) -> Vec<String> {
    message.to.iter().map(|a| a.email()).collect()
}

/// A PEC message in a mailbox.
pub struct Message<'f> {
    fetcher: &'f dyn PartFetcher,
    uid: Uid,
    envelope: Envelope,
    bodystructure: Option<BodyStructureNode>,
    config: Rc<PecConfig>,

    postacert: Lazy<RawMessage>,
    attachments: Lazy<Vec<Rc<Attachment>>>,
    nested_attachments: Lazy<Vec<Rc<Attachment>>>,
    whole_message: Lazy<RawMessage>,
}

impl fmt::Debug for Message<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Message")
            .field("uid", &self.uid)
            .field("envelope", &self.envelope)
            .field("bodystructure", &self.bodystructure)
            .field("postacert", &self.postacert)
            .finish()
    }
}

impl<'f> Message<'f> {
    /// Wrap a fetched message, using the default configuration.
    pub fn new(
        fetcher: &'f dyn PartFetcher,
        uid: Uid,
        envelope: Envelope,
        bodystructure: Option<BodyStructureNode>,
    ) -> Self {
        Self::with_config(
            fetcher,
            uid,
            envelope,
            bodystructure,
            Rc::new(PecConfig::default()),
        )
    }

    pub fn with_config(
        fetcher: &'f dyn PartFetcher,
        uid: Uid,
        envelope: Envelope,
        bodystructure: Option<BodyStructureNode>,
        config: Rc<PecConfig>,
    ) -> Self {
        Message {
            fetcher,
            uid,
            envelope,
            bodystructure,
            config,
            postacert: Lazy::new(),
            attachments: Lazy::new(),
            nested_attachments: Lazy::new(),
            whole_message: Lazy::new(),
        }
    }

    pub fn uid(&self) -> Uid {
        self.uid
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    pub fn bodystructure(&self) -> Option<&BodyStructureNode> {
        self.bodystructure.as_ref()
    }

    pub fn config(&self) -> &PecConfig {
        &self.config
    }

    /// The envelope subject, decoded, without the provider's prefix.
    pub fn original_subject(&self) -> Option<String> {
        let subject =
            decode_unstructured(self.envelope.subject.as_deref()?.as_bytes().into());
        let prefix = &self.config.subject_prefix;
        let subject = if !prefix.is_empty() && subject.starts_with(prefix.as_str()) {
            &subject[prefix.len()..]
        } else {
            &subject[..]
        };
        Some(subject.trim().to_owned())
    }

    /// The real sender as far as the envelope tells.
    pub fn original_from(&self) -> Option<String> {
        self.envelope
            .from
            .first()
            .map(|from| resolve_sender(from, &self.config.sender))
    }

    pub fn original_to(&self) -> Vec<String> {
        self.envelope.to.iter().map(|a| a.email()).collect()
    }

    pub fn original_date(&self) -> Option<DateTime<FixedOffset>> {
        self.envelope.date.as_deref().and_then(parse_datetime)
    }

    /// The entire message, parsed.
    fn whole_message(&self) -> Result<Rc<RawMessage>, Error> {
        let (uid, fetcher) = (self.uid, self.fetcher);
        self.whole_message
            .get_or_try_resolve(|| {
                fetch_message(fetcher, uid, &PartPath::root())
                    .map(|(_, message)| Some(message))
            })?
            .ok_or(Error::MalformedMessage("empty message"))
    }

    fn raw_text(
        &self,
        select: impl FnOnce(&RawMessage) -> Result<Option<TextBody>, Error>,
    ) -> Result<Option<TextBody>, Error> {
        match self.postacert()? {
            Some(postacert) => select(&postacert),
            None => select(&*self.whole_message()?),
        }
    }

    /// The body of the postacert if there is one, else of the message
    /// itself.
    pub fn raw_body(&self) -> Result<Option<TextBody>, Error> {
        let charset = self.config.default_charset.clone();
        self.raw_text(|m| text::body(m, &charset))
    }

    pub fn raw_body_text(&self) -> Result<Option<TextBody>, Error> {
        let config = Rc::clone(&self.config);
        self.raw_text(|m| text_of(m, "text/plain", &config))
    }

    pub fn raw_body_html(&self) -> Result<Option<TextBody>, Error> {
        let config = Rc::clone(&self.config);
        self.raw_text(|m| text_of(m, "text/html", &config))
    }

    fn collect_attachments(&self) -> Result<Vec<Rc<Attachment>>, Error> {
        let postacert = match self.postacert()? {
            Some(postacert) => postacert,
            None => return Ok(vec![]),
        };

        let mut attachments: Vec<Rc<Attachment>> = postacert
            .attachments()
            .into_iter()
            .map(|part| Rc::new(Attachment::from_part(part)))
            .collect();
        attachments.extend(self.nested_attachments()?.iter().cloned());
        debug!("{} {} attachments", self.uid, attachments.len());
        Ok(attachments)
    }

    /// Produce the summary of this message.
    pub fn summary(&self) -> Result<Summary, Error> {
        Ok(Summary {
            uid: self.uid,
            subject: self.subject()?,
            from: self.from()?,
            to: self.to()?,
            date: self.date()?,
            original_subject: self.original_subject(),
            original_from: self.original_from(),
            original_to: self.original_to(),
            original_date: self.original_date(),
            has_postacert: self.has_postacert()?,
            attachments: self.attachments()?.len(),
            regular_attachments: self.regular_attachments()?.len(),
            nested_postacerts: self.nested_postacerts()?.len(),
            has_nested_postacerts: self.has_nested_postacerts()?,
            all_postacert_messages: self.all_postacert_messages()?.len(),
        })
    }
}

impl PostacertView for Message<'_> {
    fn shared_config(&self) -> Rc<PecConfig> {
        Rc::clone(&self.config)
    }

    fn postacert(&self) -> Result<Option<Rc<RawMessage>>, Error> {
        let (uid, fetcher) = (self.uid, self.fetcher);
        let bodystructure = self.bodystructure.as_ref();
        self.postacert.get_or_try_resolve(|| {
            debug!("{} Resolving postacert", uid);
            extract_postacert(fetcher, uid, bodystructure)
        })
    }

    fn subject(&self) -> Result<Option<String>, Error> {
        Ok(match self.postacert()? {
            Some(postacert) => postacert.subject.clone(),
            None => self.original_subject(),
        })
    }

    fn from(&self) -> Result<Option<String>, Error> {
        Ok(match self.postacert()? {
            Some(postacert) => first_email(&postacert),
            None => self.original_from(),
        })
    }

    fn to(&self) -> Result<Vec<String>, Error> {
        Ok(match self.postacert()? {
            Some(postacert) => all_emails(&postacert),
            None => self.original_to(),
        })
    }

    fn date(&self) -> Result<Option<DateTime<FixedOffset>>, Error> {
        Ok(match self.postacert()? {
            Some(postacert) => postacert.date,
            None => self.original_date(),
        })
    }

    /// The attachments of the postacert plus the nested postacerts.
    ///
    /// Empty if there is no postacert; the outer message is not searched.
    fn attachments(&self) -> Result<Attachments, Error> {
        let resolved = self
            .attachments
            .get_or_try_resolve(|| self.collect_attachments().map(Some))?;
        Ok(resolved.unwrap_or_default())
    }

    fn nested_attachments(&self) -> Result<Attachments, Error> {
        let (uid, fetcher) = (self.uid, self.fetcher);
        let bodystructure = self.bodystructure.as_ref();
        let resolved = self.nested_attachments.get_or_try_resolve(|| {
            nested::resolve_nested_attachments(fetcher, uid, bodystructure)
                .map(Some)
        })?;
        Ok(resolved.unwrap_or_default())
    }
}

/// View of a postacert message found inside another one.
///
/// The message itself plays the part of the postacert, so every accessor is
/// answered from it; its nested postacerts are those of its attachments
/// which look like postacerts.
#[derive(Debug)]
pub struct NestedMessageView {
    message: Rc<RawMessage>,
    config: Rc<PecConfig>,
    attachments: Lazy<Vec<Rc<Attachment>>>,
}

impl NestedMessageView {
    pub fn new(message: Rc<RawMessage>, config: Rc<PecConfig>) -> Self {
        NestedMessageView {
            message,
            config,
            attachments: Lazy::new(),
        }
    }

    pub fn message(&self) -> &RawMessage {
        &self.message
    }
}

impl PostacertView for NestedMessageView {
    fn shared_config(&self) -> Rc<PecConfig> {
        Rc::clone(&self.config)
    }

    fn postacert(&self) -> Result<Option<Rc<RawMessage>>, Error> {
        Ok(Some(Rc::clone(&self.message)))
    }

    fn subject(&self) -> Result<Option<String>, Error> {
        Ok(self.message.subject.clone())
    }

    fn from(&self) -> Result<Option<String>, Error> {
        Ok(first_email(&self.message))
    }

    fn to(&self) -> Result<Vec<String>, Error> {
        Ok(all_emails(&self.message))
    }

    fn date(&self) -> Result<Option<DateTime<FixedOffset>>, Error> {
        Ok(self.message.date)
    }

    fn attachments(&self) -> Result<Attachments, Error> {
        let message = &self.message;
        let resolved = self.attachments.get_or_try_resolve(|| {
            Ok::<_, Error>(Some(
                message
                    .attachments()
                    .into_iter()
                    .map(|part| Rc::new(Attachment::from_part(part)))
                    .collect(),
            ))
        })?;
        Ok(resolved.unwrap_or_default())
    }

    fn nested_attachments(&self) -> Result<Attachments, Error> {
        Ok(Rc::new(
            self.attachments()?
                .iter()
                .filter(|a| a.is_postacert())
                .cloned()
                .collect(),
        ))
    }
}

/// A read-only projection of the commonly needed facts about a `Message`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub uid: Uid,
    pub subject: Option<String>,
    pub from: Option<String>,
    pub to: Vec<String>,
    #[serde(serialize_with = "serialize_rfc2822")]
    pub date: Option<DateTime<FixedOffset>>,
    pub original_subject: Option<String>,
    pub original_from: Option<String>,
    pub original_to: Vec<String>,
    #[serde(serialize_with = "serialize_rfc2822")]
    pub original_date: Option<DateTime<FixedOffset>>,
    pub has_postacert: bool,
    pub attachments: usize,
    pub regular_attachments: usize,
    pub nested_postacerts: usize,
    pub has_nested_postacerts: bool,
    pub all_postacert_messages: usize,
}

fn serialize_rfc2822<S: Serializer>(
    date: &Option<DateTime<FixedOffset>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match *date {
        Some(ref date) => serializer.serialize_some(&date.to_rfc2822()),
        None => serializer.serialize_none(),
    }
}
