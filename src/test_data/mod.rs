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

/// A PEC transport message as delivered by the provider: a signed
/// multipart with the provider's notice, `daticert.xml` and the original
/// message as `postacert.eml` at part 1.3.
pub static PEC_SIMPLE: &[u8] = include_bytes!("pec_simple.eml");

/// A PEC whose `postacert.eml` forwards another PEC as an attachment, whose
/// own `postacert.eml` in turn carries an attached message.
///
/// The primary postacert is at part 3; the forwarded one at 3.2.2.
pub static PEC_NESTED: &[u8] = include_bytes!("pec_nested.eml");

/// An ordinary non-PEC message with plain and HTML alternatives.
pub static SENT_PLAIN: &[u8] = include_bytes!("sent_plain.eml");
