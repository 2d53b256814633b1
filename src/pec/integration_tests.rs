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

//! End-to-end tests of the PEC views over whole messages.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use super::bodystructure::{BodyStructureNode, PartPath};
use super::fetch::PartFetcher;
use super::mailbox::LocalMailbox;
use super::message::{Message, PostacertView};
use super::model::Uid;
use super::nested::PostacertKind;
use crate::mime::envelope::Envelope;
use crate::support::config::PecConfig;
use crate::support::error::Error;
use crate::test_data::*;

/// Wraps a `LocalMailbox`, recording every fetch.
struct CountingFetcher {
    mailbox: LocalMailbox,
    fetches: RefCell<Vec<String>>,
}

impl CountingFetcher {
    fn new(data: &[u8]) -> Self {
        crate::init_test_log();

        let mut mailbox = LocalMailbox::new();
        mailbox.insert(Uid::u(1), data);
        CountingFetcher {
            mailbox,
            fetches: RefCell::new(vec![]),
        }
    }

    fn message(&self) -> Message<'_> {
        let uid = Uid::u(1);
        Message::with_config(
            self,
            uid,
            self.mailbox.envelope(uid).unwrap(),
            self.mailbox.bodystructure(uid).unwrap(),
            Rc::new(PecConfig::default()),
        )
    }

    fn fetches(&self) -> Vec<String> {
        self.fetches.borrow().clone()
    }
}

impl PartFetcher for CountingFetcher {
    fn fetch_part_bytes(
        &self,
        uid: Uid,
        path: &PartPath,
    ) -> Result<Vec<u8>, Error> {
        self.fetches.borrow_mut().push(path.to_string());
        self.mailbox.fetch_part_bytes(uid, path)
    }
}

/// Serves parts from a fixed map, for body structures that no real message
/// backs.
#[derive(Default)]
struct MapFetcher {
    parts: BTreeMap<String, Vec<u8>>,
    dead: RefCell<BTreeSet<String>>,
}

impl MapFetcher {
    fn with(mut self, path: &str, data: &[u8]) -> Self {
        self.parts.insert(path.to_owned(), data.to_vec());
        self
    }
}

impl PartFetcher for MapFetcher {
    fn fetch_part_bytes(
        &self,
        uid: Uid,
        path: &PartPath,
    ) -> Result<Vec<u8>, Error> {
        let key = path.to_string();
        if self.dead.borrow().contains(&key) {
            return Err(Error::ConnectionUnavailable("reset by peer".to_owned()));
        }

        self.parts
            .get(&key)
            .cloned()
            .ok_or_else(|| Error::PartUnavailable {
                uid,
                path: path.clone(),
            })
    }
}

fn small_message(subject: &str) -> Vec<u8> {
    format!(
        "Subject: {}\r\nFrom: someone@example.it\r\n\r\nbody of {}\r\n",
        subject, subject
    )
    .into_bytes()
}

/// A message with a text part, then four postacert parts (2 through 5).
fn four_postacerts() -> BodyStructureNode {
    BodyStructureNode::composite(vec![
        BodyStructureNode::leaf("TEXT", "PLAIN"),
        BodyStructureNode::message(Some("postacert.eml"), None),
        BodyStructureNode::message(Some("postacert.eml"), None),
        BodyStructureNode::message(Some("POSTACERT.EML"), None),
        BodyStructureNode::message(Some("postacert.eml"), None),
    ])
}

fn map_message(fetcher: &MapFetcher) -> Message<'_> {
    crate::init_test_log();
    Message::new(
        fetcher,
        Uid::u(42),
        Envelope::default(),
        Some(four_postacerts()),
    )
}

fn subjects<V: PostacertView + ?Sized>(views: &[Rc<V>]) -> Vec<String> {
    views
        .iter()
        .map(|v| v.subject().unwrap().unwrap_or_default())
        .collect()
}

#[test]
fn simple_pec_resolves_to_postacert() {
    let fetcher = CountingFetcher::new(PEC_SIMPLE);
    let message = fetcher.message();

    assert!(message.has_postacert().unwrap());
    assert_eq!(
        Some("Fattura n. 4 \u{2013} marzo".to_owned()),
        message.subject().unwrap()
    );
    assert_eq!(
        Some("Fattura n. 4".to_owned()),
        message.original_subject()
    );
    assert_eq!(
        Some("mario.rossi@pec.example.it".to_owned()),
        message.from().unwrap()
    );
    assert_eq!(
        Some("mario.rossi@pec.example.it".to_owned()),
        message.original_from()
    );
    assert_eq!(
        vec!["ufficio@pec.comune.example.it".to_owned()],
        message.to().unwrap()
    );
    assert_eq!(
        "2024-03-12T10:15:30+01:00",
        message.date().unwrap().unwrap().to_rfc3339()
    );
    assert_eq!(
        "2024-03-12T10:15:42+01:00",
        message.original_date().unwrap().to_rfc3339()
    );

    let body = message.postacert_body().unwrap().unwrap();
    assert_eq!("In allegato la fattura di marzo.", body.content);
    assert_eq!("text/plain", body.content_type);
    assert_eq!("UTF-8", body.charset);
    assert_eq!(body, message.raw_body().unwrap().unwrap());
    assert!(message.postacert_body_html().unwrap().is_none());

    let attachments = message.attachments().unwrap();
    assert_eq!(1, attachments.len());
    assert_eq!("fattura_4.pdf", attachments[0].filename());
    assert_eq!("application/pdf", attachments[0].mime_type());
    assert_eq!(b"%PDF-1.4\n", attachments[0].content());
    assert!(!message.has_nested_postacerts().unwrap());
    assert_eq!(1, message.all_postacert_messages().unwrap().len());

    assert_eq!(vec!["1.3".to_owned()], fetcher.fetches());
}

#[test]
fn accessors_are_idempotent() {
    let fetcher = CountingFetcher::new(PEC_SIMPLE);
    let message = fetcher.message();

    let first = (
        message.subject().unwrap(),
        message.from().unwrap(),
        message.to().unwrap(),
        message.date().unwrap(),
        message.postacert_body().unwrap(),
    );
    for _ in 0..3 {
        assert_eq!(
            first,
            (
                message.subject().unwrap(),
                message.from().unwrap(),
                message.to().unwrap(),
                message.date().unwrap(),
                message.postacert_body().unwrap(),
            )
        );
        assert!(Rc::ptr_eq(
            &message.attachments().unwrap(),
            &message.attachments().unwrap()
        ));
    }

    assert_eq!(vec!["1.3".to_owned()], fetcher.fetches());
}

#[test]
fn plain_message_falls_back_to_envelope() {
    let fetcher = CountingFetcher::new(SENT_PLAIN);
    let message = fetcher.message();

    assert!(!message.has_postacert().unwrap());
    assert!(fetcher.fetches().is_empty());

    assert_eq!(message.original_subject(), message.subject().unwrap());
    assert_eq!(message.original_from(), message.from().unwrap());
    assert_eq!(message.original_to(), message.to().unwrap());
    assert_eq!(message.original_date(), message.date().unwrap());
    assert_eq!(
        Some("Riunione di luned\u{ec}".to_owned()),
        message.subject().unwrap()
    );
    assert_eq!(Some("Luca Verdi".to_owned()), message.from().unwrap());
    assert_eq!(
        vec!["anna@example.com".to_owned(), "bruno@example.com".to_owned()],
        message.to().unwrap()
    );
    assert_eq!(
        "2024-03-14T16:45:00+00:00",
        message.date().unwrap().unwrap().to_rfc3339()
    );
    assert!(message.postacert_body().unwrap().is_none());
    assert!(message.attachments().unwrap().is_empty());
    assert!(message.nested_postacerts().unwrap().is_empty());
    assert!(message.all_postacert_messages().unwrap().is_empty());
    assert!(fetcher.fetches().is_empty());

    let body = message.raw_body().unwrap().unwrap();
    assert_eq!("Ci vediamo luned\u{ec} alle 10.", body.content);
    assert_eq!("ISO-8859-1", body.charset);
    assert_eq!(body, message.raw_body_text().unwrap().unwrap());
    assert_eq!(
        "<p>Ci vediamo luned&igrave; alle 10.</p>",
        message.raw_body_html().unwrap().unwrap().content
    );

    assert_eq!(vec!["".to_owned()], fetcher.fetches());
}

#[test]
fn nested_pecs_are_flattened() {
    let fetcher = CountingFetcher::new(PEC_NESTED);
    let message = fetcher.message();

    assert_eq!(
        Some("I: Fattura n. 4".to_owned()),
        message.subject().unwrap()
    );
    assert_eq!(
        Some("giulia.bianchi@pec.example.it".to_owned()),
        message.original_from()
    );

    let names = message
        .attachments()
        .unwrap()
        .iter()
        .map(|a| a.filename().to_owned())
        .collect::<Vec<_>>();
    assert_eq!(vec!["Fattura n. 4.eml", "postacert.eml"], names);
    assert!(message.regular_attachments().unwrap().is_empty());

    let nested = message.nested_postacerts().unwrap();
    assert_eq!(vec!["Fattura n. 4".to_owned()], subjects(&nested));
    assert_eq!(
        Some("mario.rossi@pec.example.it".to_owned()),
        nested[0].from().unwrap()
    );
    assert_eq!(
        "In allegato la fattura e il sollecito.",
        nested[0].postacert_body().unwrap().unwrap().content
    );

    let entries = message.all_postacert_messages().unwrap();
    let flat = entries
        .iter()
        .map(|e| {
            (
                e.level,
                e.kind,
                e.index_path.clone(),
                e.view.subject().unwrap().unwrap(),
            )
        })
        .collect::<Vec<_>>();
    assert_eq!(
        vec![
            (0, PostacertKind::Main, vec![], "I: Fattura n. 4".to_owned()),
            (1, PostacertKind::Nested, vec![0], "Fattura n. 4".to_owned()),
            (
                2,
                PostacertKind::Nested,
                vec![0, 0],
                "Sollecito di pagamento".to_owned()
            ),
        ],
        flat
    );

    let mut fetches = fetcher.fetches();
    fetches.sort();
    assert_eq!(vec!["3".to_owned(), "3.2.2".to_owned()], fetches);
}

#[test]
fn failed_nested_candidate_is_skipped() {
    let fetcher = MapFetcher::default()
        .with("2", &small_message("Principale"))
        .with("3", &small_message("Primo"))
        .with("5", &small_message("Terzo"));
    let message = map_message(&fetcher);

    assert_eq!(
        Some("Principale".to_owned()),
        message.subject().unwrap()
    );
    assert_eq!(
        vec!["Primo".to_owned(), "Terzo".to_owned()],
        subjects(&message.nested_postacerts().unwrap())
    );
    assert_eq!(2, message.attachments().unwrap().len());
    assert!(message.attachments().unwrap().iter().all(|a| a.is_postacert()));
}

#[test]
fn one_nested_postacert_gives_two_levels() {
    let fetcher = MapFetcher::default()
        .with("2", &small_message("Principale"))
        .with("3", &small_message("Primo"));
    crate::init_test_log();
    let message = Message::new(
        &fetcher,
        Uid::u(7),
        Envelope::default(),
        Some(BodyStructureNode::composite(vec![
            BodyStructureNode::leaf("TEXT", "PLAIN"),
            BodyStructureNode::message(Some("postacert.eml"), None),
            BodyStructureNode::message(Some("postacert.eml"), None),
        ])),
    );

    let entries = message.all_postacert_messages().unwrap();
    assert_eq!(
        vec![(0, PostacertKind::Main), (1, PostacertKind::Nested)],
        entries.iter().map(|e| (e.level, e.kind)).collect::<Vec<_>>()
    );
}

#[test]
fn malformed_nested_candidate_is_skipped() {
    let fetcher = MapFetcher::default()
        .with("2", &small_message("Principale"))
        .with("3", b"")
        .with("4", &small_message("Secondo"))
        .with("5", b"\r\n\r\n");
    let message = map_message(&fetcher);

    assert_eq!(
        vec!["Secondo".to_owned()],
        subjects(&message.nested_postacerts().unwrap())
    );
}

#[test]
fn lost_connection_aborts_nested_discovery() {
    let fetcher = MapFetcher::default()
        .with("2", &small_message("Principale"))
        .with("3", &small_message("Primo"))
        .with("4", &small_message("Secondo"))
        .with("5", &small_message("Terzo"));
    fetcher.dead.borrow_mut().insert("4".to_owned());
    let message = map_message(&fetcher);

    assert!(message.has_postacert().unwrap());
    assert_matches!(
        Err(Error::ConnectionUnavailable(..)),
        message.nested_attachments()
    );
    assert_matches!(
        Err(Error::ConnectionUnavailable(..)),
        message.all_postacert_messages()
    );

    // Nothing was cached, so a later attempt sees everything
    fetcher.dead.borrow_mut().clear();
    assert_eq!(
        vec!["Primo".to_owned(), "Secondo".to_owned(), "Terzo".to_owned()],
        subjects(&message.nested_postacerts().unwrap())
    );
}

#[test]
fn failed_primary_postacert_is_an_error() {
    let fetcher = MapFetcher::default();
    let message = map_message(&fetcher);

    match message.subject() {
        Err(Error::Extraction {
            ref path,
            ref source,
            ..
        }) => {
            assert_eq!("2", path.to_string());
            assert_matches!(&Error::PartUnavailable { .. }, &**source);
        }
        r => panic!("Unexpected result: {:?}", r),
    }
    assert!(message.attachments().is_err());
}

#[test]
fn summary_of_nested_pec() {
    let fetcher = CountingFetcher::new(PEC_NESTED);
    let message = fetcher.message();
    let summary = message.summary().unwrap();

    assert_eq!(Uid::u(1), summary.uid);
    assert_eq!(Some("I: Fattura n. 4".to_owned()), summary.subject);
    assert_eq!(Some("I: Fattura n. 4".to_owned()), summary.original_subject);
    assert_eq!(
        Some("giulia.bianchi@pec.example.it".to_owned()),
        summary.from
    );
    assert!(summary.has_postacert);
    assert_eq!(2, summary.attachments);
    assert_eq!(0, summary.regular_attachments);
    assert_eq!(1, summary.nested_postacerts);
    assert!(summary.has_nested_postacerts);
    assert_eq!(3, summary.all_postacert_messages);

    let text = toml::to_string(&summary).unwrap();
    assert!(text.contains("date = \"Wed, 13 Mar 2024 09:00:00 +0100\""));
    assert!(text.contains("has_postacert = true"));

    // Everything the summary needs is fetched once and then cached
    assert_eq!(summary, message.summary().unwrap());
    let mut fetches = fetcher.fetches();
    fetches.sort();
    assert_eq!(vec!["3".to_owned(), "3.2.2".to_owned()], fetches);
}

#[test]
fn attachments_save_to_disk() {
    let fetcher = CountingFetcher::new(PEC_SIMPLE);
    let message = fetcher.message();
    let dir = tempfile::TempDir::new().unwrap();

    let attachments = message.attachments().unwrap();
    let path = attachments[0].save_to_dir(dir.path()).unwrap();
    assert_eq!(dir.path().join("fattura_4.pdf"), path);
    assert_eq!(b"%PDF-1.4\n", &std::fs::read(&path).unwrap()[..]);
}

#[test]
fn messages_from_local_mailbox() {
    crate::init_test_log();

    let mut mailbox = LocalMailbox::new();
    mailbox.insert(Uid::u(1), PEC_SIMPLE);
    mailbox.insert(Uid::u(2), SENT_PLAIN);

    let subjects = mailbox
        .uids()
        .map(|uid| mailbox.message(uid).unwrap().subject().unwrap().unwrap())
        .collect::<Vec<_>>();
    assert_eq!(
        vec![
            "Fattura n. 4 \u{2013} marzo".to_owned(),
            "Riunione di luned\u{ec}".to_owned()
        ],
        subjects
    );
}
