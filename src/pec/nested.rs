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

//! Discovery of postacert messages beyond the primary one.

use std::rc::Rc;

use log::warn;

use super::attachment::Attachment;
use super::bodystructure::{find_postacert_parts, BodyStructureNode, PartPath};
use super::extract::{fetch_message, primary_postacert_path};
use super::fetch::PartFetcher;
use super::message::{NestedMessageView, PostacertView};
use super::model::Uid;
use crate::support::error::Error;

/// The paths of every postacert part except the primary one, in document
/// order.
///
/// This includes any further top-level postacert parts as well as those
/// inside embedded messages.
pub fn nested_postacert_paths(
    bodystructure: Option<&BodyStructureNode>,
) -> Vec<PartPath> {
    let primary = primary_postacert_path(bodystructure);
    find_postacert_parts(bodystructure, &PartPath::root(), true)
        .into_iter()
        .filter(|path| Some(path) != primary.as_ref())
        .collect()
}

/// Fetch and parse every nested postacert of message `uid`, strictly in
/// order.
///
/// A candidate which cannot be fetched or parsed is logged and skipped,
/// unless the connection itself is gone, in which case the error is
/// returned since no later candidate could succeed either.
pub fn resolve_nested_attachments(
    fetcher: &dyn PartFetcher,
    uid: Uid,
    bodystructure: Option<&BodyStructureNode>,
) -> Result<Vec<Rc<Attachment>>, Error> {
    let mut attachments = Vec::new();
    for path in nested_postacert_paths(bodystructure) {
        match fetch_message(fetcher, uid, &path) {
            Ok((data, message)) => {
                attachments.push(Rc::new(Attachment::postacert(data, message)))
            }
            Err(e) if e.is_connection_loss() => return Err(e),
            Err(e) => {
                warn!("{} Skipping nested postacert [{}]: {}", uid, path, e)
            }
        }
    }

    Ok(attachments)
}

/// Where a postacert message was found.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PostacertKind {
    /// The primary postacert of the message itself.
    Main,
    /// A postacert nested within the message.
    Nested,
}

/// One entry of `PostacertView::all_postacert_messages`.
#[derive(Clone, Debug)]
pub struct PostacertEntry {
    /// 0 for the primary postacert, 1 for those nested in the message, 2
    /// for those nested in a level 1 entry.
    pub level: u32,
    pub kind: PostacertKind,
    /// Indices of the entry among the nested postacerts of each level above
    /// it. Empty for the primary postacert.
    pub index_path: Vec<usize>,
    pub view: Rc<NestedMessageView>,
}

/// Deepest level `all_postacert_messages` flattens to.
///
/// Anything deeper is still reachable through `nested_postacerts()` of the
/// returned views.
const MAX_FLATTENED_LEVEL: u32 = 2;

/// Flatten the primary postacert of `view` and its nested postacerts, down
/// to `MAX_FLATTENED_LEVEL`.
///
/// Each level 1 entry is immediately followed by its own level 2 entries.
/// A view without a primary postacert has no entries at all.
pub fn all_postacert_messages<V: PostacertView + ?Sized>(
    view: &V,
) -> Result<Vec<PostacertEntry>, Error> {
    let main = match view.postacert()? {
        Some(main) => main,
        None => return Ok(vec![]),
    };

    let mut entries = vec![PostacertEntry {
        level: 0,
        kind: PostacertKind::Main,
        index_path: vec![],
        view: Rc::new(NestedMessageView::new(main, view.shared_config())),
    }];
    flatten_nested(
        view.nested_postacerts()?,
        1,
        &[],
        &mut entries,
    )?;
    Ok(entries)
}

fn flatten_nested(
    views: Vec<Rc<NestedMessageView>>,
    level: u32,
    parent_path: &[usize],
    entries: &mut Vec<PostacertEntry>,
) -> Result<(), Error> {
    for (ix, view) in views.into_iter().enumerate() {
        let mut index_path = parent_path.to_vec();
        index_path.push(ix);

        entries.push(PostacertEntry {
            level,
            kind: PostacertKind::Nested,
            index_path: index_path.clone(),
            view: Rc::clone(&view),
        });

        if level < MAX_FLATTENED_LEVEL {
            flatten_nested(
                view.nested_postacerts()?,
                level + 1,
                &index_path,
                entries,
            )?;
        }
    }

    Ok(())
}
