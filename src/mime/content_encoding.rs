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

//! Incremental decoding of `Content-Transfer-Encoding`.
//!
//! Content may be pushed in arbitrary chunks, so both decoders carry
//! partial input over between pushes.

use std::borrow::Cow;

use super::header::ContentTransferEncoding;
use super::quoted_printable::qp_decode;

/// Streaming decoder for one part's transfer encoding.
///
/// Invalid input is skipped rather than rejected; charset problems are
/// detected later when text is actually decoded.
#[derive(Debug)]
pub struct TransferDecoder {
    content_transfer_encoding: ContentTransferEncoding,
    input_buffer: Vec<u8>,
    cte_buffer: Vec<u8>,
}

impl TransferDecoder {
    pub fn new(content_transfer_encoding: ContentTransferEncoding) -> Self {
        TransferDecoder {
            content_transfer_encoding,
            input_buffer: Vec::new(),
            cte_buffer: Vec::new(),
        }
    }

    /// Push the next chunk of raw content, returning whatever could be
    /// decoded so far.
    pub fn push<'a, 'b: 'a>(&'b mut self, data: &'a [u8]) -> &'a [u8] {
        use ContentTransferEncoding as CTE;

        match self.content_transfer_encoding {
            CTE::SevenBit | CTE::EightBit | CTE::Binary => data,
            CTE::Base64 => {
                self.decode_base64(data);
                &self.cte_buffer
            }
            CTE::QuotedPrintable => {
                self.decode_qp(data);
                &self.cte_buffer
            }
        }
    }

    /// Flush any trailing input.
    ///
    /// A dangling QP escape is emitted verbatim. Leftover base64 that does not
    /// form a full quantum is decoded as far as it goes.
    pub fn finish(&mut self) -> &[u8] {
        use ContentTransferEncoding as CTE;

        self.cte_buffer.clear();
        match self.content_transfer_encoding {
            CTE::Base64 if !self.input_buffer.is_empty() => {
                let unpadded: Vec<u8> = self
                    .input_buffer
                    .iter()
                    .copied()
                    .filter(|&b| b'=' != b)
                    .collect();
                let _ = base64::decode_config_buf(
                    &unpadded,
                    base64::STANDARD_NO_PAD,
                    &mut self.cte_buffer,
                );
            }
            CTE::QuotedPrintable => {
                self.cte_buffer.extend_from_slice(&self.input_buffer);
            }
            _ => (),
        }
        self.input_buffer.clear();
        &self.cte_buffer
    }

    fn decode_base64(&mut self, data: &[u8]) {
        self.cte_buffer.clear();

        let mut pushed_any = false;
        for &byte in data {
            match byte {
                b'0'..=b'9'
                | b'a'..=b'z'
                | b'A'..=b'Z'
                | b'+'
                | b'/'
                | b'=' => {
                    self.input_buffer.push(byte);
                    pushed_any = true;
                }
                _ => (),
            }
        }

        if pushed_any {
            let usable_length = self.input_buffer.len() / 4 * 4;
            let _ = base64::decode_config_buf(
                &self.input_buffer[..usable_length],
                base64::STANDARD,
                &mut self.cte_buffer,
            );

            self.input_buffer.copy_within(usable_length.., 0);
            self.input_buffer
                .truncate(self.input_buffer.len() - usable_length);
        }
    }

    fn decode_qp(&mut self, data: &[u8]) {
        self.cte_buffer.clear();

        if self.input_buffer.is_empty() {
            let (decoded, dangling) = qp_decode(data);
            self.input_buffer.extend_from_slice(dangling);

            match decoded {
                Cow::Owned(v) => self.cte_buffer = v,
                Cow::Borrowed(v) => self.cte_buffer.extend_from_slice(v),
            }
        } else {
            self.input_buffer.extend_from_slice(data);
            let consumed_len = {
                let (decoded, dangling) = qp_decode(&self.input_buffer);
                match decoded {
                    Cow::Owned(v) => self.cte_buffer = v,
                    Cow::Borrowed(v) => self.cte_buffer.extend_from_slice(v),
                }
                self.input_buffer.len() - dangling.len()
            };

            self.input_buffer.copy_within(consumed_len.., 0);
            self.input_buffer
                .truncate(self.input_buffer.len() - consumed_len);
        }
    }
}

/// Decode a complete body in one go.
pub fn decode_transfer_encoding(
    content_transfer_encoding: ContentTransferEncoding,
    data: &[u8],
) -> Vec<u8> {
    let mut decoder = TransferDecoder::new(content_transfer_encoding);
    let mut out = decoder.push(data).to_vec();
    out.extend_from_slice(decoder.finish());
    out
}
