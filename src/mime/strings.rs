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

//! Flattening of header syntax trees into plain strings.

use std::borrow::Cow;

use crate::mime::encoded_word;

fn to_utf8(cow: Cow<[u8]>) -> Cow<str> {
    match cow {
        Cow::Owned(owned) => Cow::Owned(match String::from_utf8(owned) {
            Ok(s) => s,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        }),
        Cow::Borrowed(borrowed) => String::from_utf8_lossy(borrowed),
    }
}

/// Join the words of a display name with single spaces.
///
/// Encoded words are left alone; RFC 2047 decoding of names happens where the
/// name is actually consumed. Stray `.` words from the obsolete phrase syntax
/// attach to the preceding word, so `J. Doe` survives as written.
pub fn decode_phrase(phrase: Vec<Cow<[u8]>>) -> String {
    let mut accum = Vec::new();
    for word in phrase {
        if !accum.is_empty() && b"." != &word[..] {
            accum.push(b' ');
        }
        accum.extend_from_slice(&word);
    }

    to_utf8(Cow::Owned(accum)).into_owned()
}

pub fn decode_dotted(dotted: Vec<Cow<[u8]>>) -> String {
    let mut accum = Vec::new();
    for (ix, word) in dotted.into_iter().enumerate() {
        if ix > 0 {
            accum.push(b'.');
        }
        match word {
            Cow::Owned(mut owned) => accum.append(&mut owned),
            Cow::Borrowed(borrowed) => accum.extend_from_slice(borrowed),
        }
    }

    to_utf8(Cow::Owned(accum)).into_owned()
}

/// Remove header folding without decoding anything.
pub fn unfold(mut s: Cow<[u8]>) -> String {
    if memchr::memchr(b'\n', &s).is_some() {
        let mut unfolded = Vec::with_capacity(s.len());
        let mut is_unfolding = false;
        for ch in s.iter().copied() {
            if is_unfolding {
                if b' ' == ch || b'\t' == ch || b'\r' == ch || b'\n' == ch {
                    continue;
                } else {
                    is_unfolding = false;
                    unfolded.push(ch);
                }
            } else if b'\r' == ch || b'\n' == ch {
                unfolded.push(b' ');
                is_unfolding = true;
            } else {
                unfolded.push(ch);
            }
        }

        *s.to_mut() = unfolded;
    }

    to_utf8(s).trim().to_owned()
}

/// Unfold, trim, and RFC 2047-decode an unstructured header value.
pub fn decode_unstructured(s: Cow<[u8]>) -> String {
    let s = unfold(s);
    encoded_word::ew_decode_unstructured(&s).into_owned()
}
