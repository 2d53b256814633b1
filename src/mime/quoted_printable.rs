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

use memchr::memchr;

/// What follows an `=` in quoted-printable text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Escape {
    /// `=XX`, an encoded byte.
    Byte(u8),
    /// A soft line break; the value is the length of the line ending.
    SoftBreak(usize),
    /// Could still become a valid escape given more input.
    Incomplete,
    /// Not an escape. The `=` stands for itself.
    Invalid,
}

impl Escape {
    fn classify(after: &[u8]) -> Self {
        match *after {
            [] | [b'\r'] => Escape::Incomplete,
            [b'\n', ..] => Escape::SoftBreak(1),
            [b'\r', b'\n', ..] => Escape::SoftBreak(2),
            [hi] if hex_digit(hi).is_some() => Escape::Incomplete,
            [hi, lo, ..] => match (hex_digit(hi), hex_digit(lo)) {
                (Some(hi), Some(lo)) => Escape::Byte(hi << 4 | lo),
                _ => Escape::Invalid,
            },
            _ => Escape::Invalid,
        }
    }
}

fn hex_digit(b: u8) -> Option<u8> {
    (b as char).to_digit(16).map(|d| d as u8)
}

/// Decodes quoted-printable text (RFC 2045).
///
/// Either case is accepted for hex digits, and soft line breaks may use UNIX
/// or DOS line endings. This never fails: malformed escapes, trailing
/// whitespace and 8-bit bytes (valid UTF-8 or not) all pass through as-is.
///
/// An escape cut off by the end of `s` is not decoded but returned as the
/// second element, so a caller working in chunks can put it in front of the
/// next one.
pub fn qp_decode(s: &[u8]) -> (Cow<[u8]>, &[u8]) {
    if memchr(b'=', s).is_none() {
        return (Cow::Borrowed(s), &[]);
    }

    let mut decoded = Vec::with_capacity(s.len());
    let mut pos = 0;
    while let Some(eq) = memchr(b'=', &s[pos..]).map(|ix| pos + ix) {
        decoded.extend_from_slice(&s[pos..eq]);

        pos = match Escape::classify(&s[eq + 1..]) {
            Escape::Byte(b) => {
                decoded.push(b);
                eq + 3
            }
            Escape::SoftBreak(len) => eq + 1 + len,
            Escape::Invalid => {
                decoded.push(b'=');
                eq + 1
            }
            Escape::Incomplete => return (Cow::Owned(decoded), &s[eq..]),
        };
    }

    decoded.extend_from_slice(&s[pos..]);
    (Cow::Owned(decoded), &[])
}
