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

//! Utilities for working with individual RFC 2822 and RFC 2045 headers.
//!
//! The grammar is written against complete input, since a header value is
//! always fully buffered by the time it gets here. Values are passed in raw,
//! including any folding and the trailing line ending.

use std::borrow::Cow;
use std::str;

use chrono::prelude::*;
use nom::{
    branch::alt,
    bytes::complete::{
        is_a, is_not, tag_no_case, take, take_while1, take_while_m_n,
    },
    character::complete::char,
    combinator::{map, opt},
    multi::{
        fold_many0, many0, many0_count, many1_count, separated_nonempty_list,
    },
    sequence::{delimited, pair, preceded, separated_pair, terminated, tuple},
    IResult,
};

pub use super::model::*;
use super::encoded_word;

fn ascii_digit(b: u8) -> bool {
    b.is_ascii_digit()
}

/// Value of a run of ASCII digits already validated by the grammar.
fn digits_value(s: &[u8]) -> u32 {
    s.iter()
        .fold(0u32, |acc, &d| acc.saturating_mul(10) + u32::from(d - b'0'))
}

// RFC 2822 3.2.2 "quoted-pair", including the 8-bit clean "obsolete" syntax
fn quoted_pair(i: &[u8]) -> IResult<&[u8], &[u8]> {
    preceded(char('\\'), take(1usize))(i)
}

// RFC 2822 3.2.3 "Folding white space".
// Unfolding is partially performed before we get here, so the line-ending
// characters are just treated as simple whitespace.
fn fws(i: &[u8]) -> IResult<&[u8], &[u8]> {
    map(is_a(" \t\r\n"), |_| &b" "[..])(i)
}

// RFC 2822 3.2.3 "Comment text".
fn ctext(i: &[u8]) -> IResult<&[u8], &[u8]> {
    is_not("()\\ \t\r\n")(i)
}

// RFC 2822 3.2.3 "Comment content", with FWS moved in here.
fn ccontent(i: &[u8]) -> IResult<&[u8], ()> {
    alt((
        map(ctext, |_| ()),
        map(quoted_pair, |_| ()),
        map(fws, |_| ()),
        comment,
    ))(i)
}

// RFC 2822 3.2.3 "Comment". Note it is recursive.
fn comment(i: &[u8]) -> IResult<&[u8], ()> {
    map(delimited(char('('), many0_count(ccontent), char(')')), |_| ())(i)
}

// RFC 2822 3.2.3 "Comment or folding white space".
// Always consumes something; use `opt(cfws)` where it may be absent.
fn cfws(i: &[u8]) -> IResult<&[u8], ()> {
    map(many1_count(alt((map(fws, |_| ()), comment))), |_| ())(i)
}

// RFC 2822 3.2.4 "Atom text"
// Amended by RFC 6532 to include all non-ASCII characters
fn is_atext(ch: u8) -> bool {
    ch.is_ascii_alphanumeric()
        || b"!#$%&'*+-/=?^_`{|}~".contains(&ch)
        || ch >= 0x80
}

fn atext(i: &[u8]) -> IResult<&[u8], &[u8]> {
    take_while1(is_atext)(i)
}

// RFC 2822 3.2.4 "Atom"
fn atom(i: &[u8]) -> IResult<&[u8], &[u8]> {
    delimited(opt(cfws), atext, opt(cfws))(i)
}

// RFC 2822 3.2.5 "Quoted [string] text"
// Amended by RFC 6532 to include all non-ASCII characters
fn qtext(i: &[u8]) -> IResult<&[u8], &[u8]> {
    is_not(" \t\r\n\\\"")(i)
}

// RFC 2822 3.2.5 "Quoted [string] content", with FWS moved in here.
fn qcontent(i: &[u8]) -> IResult<&[u8], &[u8]> {
    alt((qtext, quoted_pair, fws))(i)
}

fn append_cow<'a>(mut acc: Cow<'a, [u8]>, item: &'a [u8]) -> Cow<'a, [u8]> {
    if acc.is_empty() {
        acc = Cow::Borrowed(item);
    } else {
        acc.to_mut().extend_from_slice(item);
    }
    acc
}

// RFC 2822 3.2.5 "Quoted string"
fn quoted_string(i: &[u8]) -> IResult<&[u8], Cow<[u8]>> {
    delimited(
        pair(opt(cfws), char('"')),
        fold_many0(qcontent, Cow::Borrowed(&[] as &[u8]), append_cow),
        pair(char('"'), opt(cfws)),
    )(i)
}

// RFC 2822 3.2.6 "word"
fn word(i: &[u8]) -> IResult<&[u8], Cow<[u8]>> {
    alt((map(atom, Cow::Borrowed), quoted_string))(i)
}

// The `.` that many agents put unquoted into display names, from the
// `obs-phrase` grammar.
fn obs_dot(i: &[u8]) -> IResult<&[u8], Cow<[u8]>> {
    terminated(map(char('.'), |_| Cow::Borrowed(&b"."[..])), opt(cfws))(i)
}

// RFC 2822 3.2.6 "phrase", plus "obsolete phrase" syntax.
fn phrase(i: &[u8]) -> IResult<&[u8], Vec<Cow<[u8]>>> {
    map(pair(word, many0(alt((word, obs_dot)))), |(head, mut tail)| {
        tail.insert(0, head);
        tail
    })(i)
}

// RFC 2822 3.3 date/time syntax, including obsolete forms, which allow CFWS
// between all terms.
fn year(i: &[u8]) -> IResult<&[u8], u32> {
    map(take_while_m_n(2, 4, ascii_digit), |s: &[u8]| {
        let y = digits_value(s);
        // Y2K compliance workarounds described by RFC 2822 4.3
        if s.len() == 2 && y < 50 {
            y + 2000
        } else if s.len() < 4 {
            y + 1900
        } else {
            y
        }
    })(i)
}

fn month(i: &[u8]) -> IResult<&[u8], u32> {
    alt((
        map(tag_no_case("jan"), |_| 1),
        map(tag_no_case("feb"), |_| 2),
        map(tag_no_case("mar"), |_| 3),
        map(tag_no_case("apr"), |_| 4),
        map(tag_no_case("may"), |_| 5),
        map(tag_no_case("jun"), |_| 6),
        map(tag_no_case("jul"), |_| 7),
        map(tag_no_case("aug"), |_| 8),
        map(tag_no_case("sep"), |_| 9),
        map(tag_no_case("oct"), |_| 10),
        map(tag_no_case("nov"), |_| 11),
        map(tag_no_case("dec"), |_| 12),
    ))(i)
}

fn day(i: &[u8]) -> IResult<&[u8], u32> {
    map(take_while_m_n(1, 2, ascii_digit), digits_value)(i)
}

fn date(i: &[u8]) -> IResult<&[u8], (u32, u32, u32)> {
    map(
        tuple((
            terminated(day, opt(cfws)),
            terminated(month, opt(cfws)),
            terminated(year, opt(cfws)),
        )),
        |(d, m, y)| (y, m, d),
    )(i)
}

fn two_digit(i: &[u8]) -> IResult<&[u8], u32> {
    map(take_while_m_n(2, 2, ascii_digit), digits_value)(i)
}

fn colon(i: &[u8]) -> IResult<&[u8], ()> {
    map(tuple((opt(cfws), char(':'), opt(cfws))), |_| ())(i)
}

// Seconds are optional in RFC 2822 too.
fn time_of_day(i: &[u8]) -> IResult<&[u8], (u32, u32, u32)> {
    map(
        tuple((
            terminated(two_digit, colon),
            two_digit,
            opt(preceded(colon, two_digit)),
            opt(cfws),
        )),
        |(h, m, s, _)| (h, m, s.unwrap_or(0)),
    )(i)
}

/// Offset east of UTC in seconds.
fn numeric_zone(i: &[u8]) -> IResult<&[u8], i32> {
    map(
        pair(
            alt((char('+'), char('-'))),
            take_while_m_n(4, 4, ascii_digit),
        ),
        |(sign, s)| {
            let hhmm = digits_value(s) as i32;
            let secs = hhmm / 100 * 3600 + hhmm % 100 * 60;
            if '-' == sign {
                -secs
            } else {
                secs
            }
        },
    )(i)
}

fn zone(i: &[u8]) -> IResult<&[u8], i32> {
    alt((
        numeric_zone,
        map(alt((tag_no_case("ut"), tag_no_case("gmt"))), |_| 0),
        // US time zones
        map(tag_no_case("edt"), |_| -4 * 3600),
        map(alt((tag_no_case("est"), tag_no_case("cdt"))), |_| -5 * 3600),
        map(alt((tag_no_case("cst"), tag_no_case("mdt"))), |_| -6 * 3600),
        map(alt((tag_no_case("mst"), tag_no_case("pdt"))), |_| -7 * 3600),
        map(tag_no_case("pst"), |_| -8 * 3600),
        // Military and unrecognised zones must be treated as 0 per RFC 2822
        map(atext, |_| 0),
    ))(i)
}

fn day_of_week(i: &[u8]) -> IResult<&[u8], ()> {
    map(tuple((atom, char(','), opt(cfws))), |_| ())(i)
}

fn date_time(i: &[u8]) -> IResult<&[u8], Option<DateTime<FixedOffset>>> {
    map(
        preceded(
            pair(opt(cfws), opt(day_of_week)),
            tuple((date, time_of_day, zone)),
        ),
        |((year, month, day), (hour, minute, second), zone)| {
            FixedOffset::east_opt(zone).and_then(|off| {
                off.with_ymd_and_hms(
                    year as i32,
                    month,
                    day,
                    hour,
                    minute,
                    second,
                )
                .single()
            })
        },
    )(i)
}

// RFC 2822 3.4.1 local part of address
// Formally, this is `dot-atom / quoted-string / obs-local-part`, with
// `obs-local-part` being `word *("." word)`, which covers the other two.
fn local_part(i: &[u8]) -> IResult<&[u8], Vec<Cow<[u8]>>> {
    separated_nonempty_list(char('.'), word)(i)
}

// RFC 2822 4.4 obsolete domain format, which covers dot-atom
fn obs_domain(i: &[u8]) -> IResult<&[u8], Vec<Cow<[u8]>>> {
    separated_nonempty_list(char('.'), map(atom, Cow::Borrowed))(i)
}

// RFC 2822 3.4.1 domain name text
fn dtext(i: &[u8]) -> IResult<&[u8], &[u8]> {
    is_not("[]\\ \t\r\n")(i)
}

fn dcontent(i: &[u8]) -> IResult<&[u8], &[u8]> {
    alt((dtext, quoted_pair, fws))(i)
}

// RFC 2822 3.4.1 domain literal
fn domain_literal(i: &[u8]) -> IResult<&[u8], Vec<u8>> {
    map(
        delimited(
            pair(opt(cfws), char('[')),
            fold_many0(dcontent, vec![b'['], |mut acc: Vec<u8>, item| {
                acc.extend_from_slice(item);
                acc
            }),
            pair(char(']'), opt(cfws)),
        ),
        |mut res| {
            res.push(b']');
            res
        },
    )(i)
}

fn domain(i: &[u8]) -> IResult<&[u8], Vec<Cow<[u8]>>> {
    alt((
        obs_domain,
        map(domain_literal, |v| vec![Cow::Owned(v)]),
    ))(i)
}

// RFC 2822 3.4.1 address specification
fn addr_spec(i: &[u8]) -> IResult<&[u8], AddrSpec> {
    map(
        separated_pair(local_part, char('@'), domain),
        |(local, domain)| AddrSpec { local, domain },
    )(i)
}

// RFC 2822 3.4 angle-delimited address
fn angle_addr(i: &[u8]) -> IResult<&[u8], AddrSpec> {
    delimited(
        pair(opt(cfws), char('<')),
        addr_spec,
        pair(char('>'), opt(cfws)),
    )(i)
}

// RFC 2822 3.4 mailbox
fn mailbox(i: &[u8]) -> IResult<&[u8], MailboxSpec> {
    map(
        alt((
            pair(opt(phrase), angle_addr),
            map(addr_spec, |a| (None, a)),
        )),
        |(name, addr)| MailboxSpec {
            name: name.unwrap_or_default(),
            addr,
        },
    )(i)
}

// Used in obsolete list syntax
fn obs_list_delim(i: &[u8]) -> IResult<&[u8], ()> {
    map(
        many1_count(tuple((opt(cfws), char(','), opt(cfws)))),
        |_| (),
    )(i)
}

// RFC 2822 3.4 mailbox list, including 4.4 obsolete syntax
fn mailbox_list(i: &[u8]) -> IResult<&[u8], Vec<MailboxSpec>> {
    delimited(
        opt(obs_list_delim),
        separated_nonempty_list(obs_list_delim, mailbox),
        opt(obs_list_delim),
    )(i)
}

// RFC 2822 3.4 group
fn group(i: &[u8]) -> IResult<&[u8], GroupSpec> {
    map(
        pair(
            terminated(phrase, char(':')),
            terminated(
                opt(mailbox_list),
                tuple((opt(cfws), char(';'), opt(cfws))),
            ),
        ),
        |(name, boxes)| GroupSpec {
            name,
            boxes: boxes.unwrap_or_default(),
        },
    )(i)
}

fn address(i: &[u8]) -> IResult<&[u8], Address> {
    alt((map(mailbox, Address::Mailbox), map(group, Address::Group)))(i)
}

// RFC 2822 3.4 address list, including 4.4 obsolete syntax
fn address_list(i: &[u8]) -> IResult<&[u8], Vec<Address>> {
    delimited(
        opt(obs_list_delim),
        separated_nonempty_list(obs_list_delim, address),
        opt(obs_list_delim),
    )(i)
}

// RFC 2045 5.1 "token"
// 8-bit characters are let through since unquoted UTF-8 file names are
// common enough in the wild.
fn is_token_char(ch: u8) -> bool {
    ch >= 0x80
        || (ch > b' ' && ch < 0x7F && !b"()<>@,;:\\\"/[]?=".contains(&ch))
}

fn token(i: &[u8]) -> IResult<&[u8], &[u8]> {
    delimited(opt(cfws), take_while1(is_token_char), opt(cfws))(i)
}

fn parm_value(i: &[u8]) -> IResult<&[u8], Cow<[u8]>> {
    alt((map(token, Cow::Borrowed), quoted_string))(i)
}

// RFC 2045 5.1 "parameter"
fn parameter(i: &[u8]) -> IResult<&[u8], (Cow<[u8]>, Cow<[u8]>)> {
    map(separated_pair(token, char('='), parm_value), |(name, value)| {
        (Cow::Borrowed(name), value)
    })(i)
}

fn parameters(i: &[u8]) -> IResult<&[u8], Vec<(Cow<[u8]>, Cow<[u8]>)>> {
    many0(preceded(char(';'), parameter))(i)
}

fn content_type(i: &[u8]) -> IResult<&[u8], ContentType> {
    map(
        tuple((token, char('/'), token, parameters)),
        |(typ, _, subtype, parms)| ContentType {
            typ: Cow::Borrowed(typ),
            subtype: Cow::Borrowed(subtype),
            parms,
        },
    )(i)
}

fn content_disposition(i: &[u8]) -> IResult<&[u8], ContentDisposition> {
    map(pair(token, parameters), |(disposition, parms)| {
        ContentDisposition {
            disposition: Cow::Borrowed(disposition),
            parms,
        }
    })(i)
}

/// Parse an RFC 2822 date-time, such as the value of a `Date` header.
pub fn parse_datetime(s: &str) -> Option<DateTime<FixedOffset>> {
    date_time(s.as_bytes()).ok().and_then(|(_, dt)| dt)
}

/// Parse an address list, such as the value of a `From` or `To` header.
pub fn parse_address_list(value: &[u8]) -> Option<Vec<Address>> {
    address_list(value).ok().map(|(_, list)| list)
}

pub fn parse_content_type(value: &[u8]) -> Option<ContentType> {
    content_type(value).ok().map(|(_, ct)| ct)
}

pub fn parse_content_disposition(value: &[u8]) -> Option<ContentDisposition> {
    content_disposition(value).ok().map(|(_, cd)| cd)
}

pub fn parse_content_transfer_encoding(
    value: &[u8],
) -> Option<ContentTransferEncoding> {
    use ContentTransferEncoding as CTE;

    let (_, cte) = token(value).ok()?;
    if cte.eq_ignore_ascii_case(b"7bit") {
        Some(CTE::SevenBit)
    } else if cte.eq_ignore_ascii_case(b"8bit") {
        Some(CTE::EightBit)
    } else if cte.eq_ignore_ascii_case(b"binary") {
        Some(CTE::Binary)
    } else if cte.eq_ignore_ascii_case(b"quoted-printable") {
        Some(CTE::QuotedPrintable)
    } else if cte.eq_ignore_ascii_case(b"base64") {
        Some(CTE::Base64)
    } else {
        None
    }
}

/// Turn raw `Content-Type` or `Content-Disposition` parameters into
/// `(lowercase name, value)` pairs.
///
/// RFC 2231 continuations (`name*0`, `name*1`, ...) are reassembled in index
/// order, extended values (`name*=charset'lang'%xx`) are percent- and
/// charset-decoded, and plain values carrying RFC 2047 encoded words (which
/// many agents use for file names despite it being forbidden) are decoded
/// too. The result is in order of each name's first appearance.
pub fn decode_parms(parms: &[(Cow<[u8]>, Cow<[u8]>)]) -> Vec<(String, String)> {
    struct Segment<'a> {
        index: u32,
        extended: bool,
        value: &'a [u8],
    }

    let mut grouped: Vec<(String, Vec<Segment>)> = Vec::new();
    for &(ref name, ref value) in parms {
        let name = String::from_utf8_lossy(name).to_ascii_lowercase();
        let (base, index, extended) = match name.find('*') {
            None => (name.clone(), 0, false),
            Some(star) => {
                let section = &name[star + 1..];
                let extended = name.ends_with('*');
                let digits = section.trim_end_matches('*');
                let index = if digits.is_empty() {
                    Some(0)
                } else {
                    digits.parse::<u32>().ok()
                };

                match index {
                    Some(index) => (name[..star].to_owned(), index, extended),
                    // Not RFC 2231 after all; keep it verbatim.
                    None => (name.clone(), 0, false),
                }
            }
        };

        let segment = Segment {
            index,
            extended,
            value: &value[..],
        };
        match grouped.iter().position(|g| g.0 == base) {
            Some(ix) => grouped[ix].1.push(segment),
            None => grouped.push((base, vec![segment])),
        }
    }

    grouped
        .into_iter()
        .map(|(name, mut segments)| {
            segments.sort_by_key(|s| s.index);
            let value = if segments.iter().any(|s| s.extended) {
                decode_extended_value(
                    segments.iter().map(|s| (s.extended, s.value)),
                )
            } else {
                let mut joined = Vec::new();
                for segment in &segments {
                    joined.extend_from_slice(segment.value);
                }
                let joined = String::from_utf8_lossy(&joined);
                encoded_word::ew_decode_unstructured(&joined).into_owned()
            };
            (name, value)
        })
        .collect()
}

fn decode_extended_value<'a>(
    segments: impl Iterator<Item = (bool, &'a [u8])>,
) -> String {
    let mut charset: Option<Vec<u8>> = None;
    let mut raw = Vec::new();

    for (extended, value) in segments {
        let mut value = value;
        if extended && charset.is_none() {
            // First extended segment carries charset'language'
            let mut split = value.splitn(3, |&b| b'\'' == b);
            if let (Some(cs), Some(_lang), Some(rest)) =
                (split.next(), split.next(), split.next())
            {
                charset = Some(cs.to_vec());
                value = rest;
            } else {
                charset = Some(Vec::new());
            }
        }

        if extended {
            percent_decode_into(value, &mut raw);
        } else {
            raw.extend_from_slice(value);
        }
    }

    let encoding = charset
        .filter(|cs| !cs.is_empty())
        .and_then(|cs| encoding_rs::Encoding::for_label_no_replacement(&cs))
        .unwrap_or(encoding_rs::UTF_8);
    encoding.decode_without_bom_handling(&raw).0.into_owned()
}

fn percent_decode_into(value: &[u8], dst: &mut Vec<u8>) {
    let mut i = 0;
    while i < value.len() {
        if b'%' == value[i] && i + 2 < value.len() {
            if let Some(byte) = str::from_utf8(&value[i + 1..i + 3])
                .ok()
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
            {
                dst.push(byte);
                i += 3;
                continue;
            }
        }

        dst.push(value[i]);
        i += 1;
    }
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;

    fn dt(s: &str) -> String {
        parse_datetime(s).unwrap().to_rfc3339()
    }

    #[test]
    fn datetime_parsing() {
        assert_eq!(
            "2001-05-14T19:36:00-07:00",
            dt("Mon, 14 May 2001 19:36:00 -0700 (PDT)")
        );
        assert_eq!("2024-03-05T09:07:00+01:00", dt("5 Mar 2024 09:07 +0100"));
        assert_eq!("1995-01-01T12:00:00-05:00", dt("1 jan 95 12:00:00 EST"));
        assert_eq!(
            "2024-04-12T16:45:10+00:00",
            dt("Fri, 12 Apr 2024 16:45:10 GMT")
        );
        assert_eq!(
            "2024-04-12T16:45:10+00:00",
            dt("  Fri,\r\n 12 Apr 2024 16:45:10 Z\r\n")
        );
        assert_eq!(None, parse_datetime("yesterday"));
        assert_eq!(None, parse_datetime("31 Feb 2024 10:00:00 +0000"));
    }

    fn single_mailbox(value: &str) -> (Vec<String>, String, String) {
        let mut list = parse_address_list(value.as_bytes()).unwrap();
        assert_eq!(1, list.len());
        match list.pop().unwrap() {
            Address::Mailbox(mbox) => (
                mbox.name
                    .iter()
                    .map(|w| String::from_utf8_lossy(w).into_owned())
                    .collect(),
                mbox.addr
                    .local
                    .iter()
                    .map(|w| String::from_utf8_lossy(w).into_owned())
                    .collect::<Vec<_>>()
                    .join("."),
                mbox.addr
                    .domain
                    .iter()
                    .map(|w| String::from_utf8_lossy(w).into_owned())
                    .collect::<Vec<_>>()
                    .join("."),
            ),
            a => panic!("Unexpected address: {:?}", a),
        }
    }

    #[test]
    fn address_parsing() {
        assert_eq!(
            (vec![], "foo".to_owned(), "bar.com".to_owned()),
            single_mailbox("foo@bar.com\r\n")
        );
        assert_eq!(
            (
                vec!["Per conto di: mario.rossi@aruba.it".to_owned()],
                "posta-certificata".to_owned(),
                "pec.aruba.it".to_owned()
            ),
            single_mailbox(
                " \"Per conto di: mario.rossi@aruba.it\" \
                 <posta-certificata@pec.aruba.it>\r\n"
            )
        );
        assert_eq!(
            (
                vec!["Mario".to_owned(), "Rossi".to_owned()],
                "mario.rossi".to_owned(),
                "example.it".to_owned()
            ),
            single_mailbox("Mario Rossi (ufficio) <mario.rossi@example.it>")
        );
        assert_eq!(
            (
                vec!["J".to_owned(), ".".to_owned(), "Doe".to_owned()],
                "jdoe".to_owned(),
                "example.com".to_owned()
            ),
            single_mailbox("J. Doe <jdoe@example.com>")
        );
    }

    #[test]
    fn address_list_parsing() {
        let list = parse_address_list(
            b"a@example.com, , Team: b@example.com, c@example.com;, \
              \"Dee\" <d@example.com>\r\n",
        )
        .unwrap();
        assert_eq!(3, list.len());
        assert_matches!(Address::Mailbox(_), &list[0]);
        match list[1] {
            Address::Group(ref g) => assert_eq!(2, g.boxes.len()),
            ref a => panic!("Unexpected address: {:?}", a),
        }
        assert_matches!(Address::Mailbox(_), &list[2]);
    }

    #[test]
    fn content_type_parsing() {
        let ct = parse_content_type(
            b" message/rfc822;\r\n\tname=\"postacert.eml\"\r\n",
        )
        .unwrap();
        assert!(ct.is_type("MESSAGE"));
        assert!(ct.is_subtype("rfc822"));
        assert_eq!(Some(&b"postacert.eml"[..]), ct.parm("NAME"));

        let ct = parse_content_type(
            b"multipart/mixed; boundary=\"----=_Part_1\"; charset=utf-8;",
        )
        .unwrap();
        assert!(ct.is_type("multipart"));
        assert_eq!(Some(&b"----=_Part_1"[..]), ct.parm("boundary"));
        assert_eq!(Some(&b"utf-8"[..]), ct.parm("charset"));

        assert_eq!(None, parse_content_type(b"text"));
    }

    #[test]
    fn content_disposition_parsing() {
        let cd = parse_content_disposition(
            b"attachment; filename=\"Fattura 4.pdf\"; size=1024\r\n",
        )
        .unwrap();
        assert_eq!(&b"attachment"[..], &cd.disposition[..]);
        assert_eq!(
            vec![
                ("filename".to_owned(), "Fattura 4.pdf".to_owned()),
                ("size".to_owned(), "1024".to_owned()),
            ],
            decode_parms(&cd.parms)
        );
    }

    #[test]
    fn rfc2231_parms() {
        let cd = parse_content_disposition(
            b"attachment;\r\n filename*0*=UTF-8''perch%C3%A9%20;\r\n \
              filename*2=.txt;\r\n filename*1*=non\r\n",
        )
        .unwrap();
        assert_eq!(
            vec![("filename".to_owned(), "perché non.txt".to_owned())],
            decode_parms(&cd.parms)
        );

        let cd = parse_content_disposition(
            b"attachment; filename*=iso-8859-1'it'citt%E0.pdf",
        )
        .unwrap();
        assert_eq!(
            vec![("filename".to_owned(), "città.pdf".to_owned())],
            decode_parms(&cd.parms)
        );
    }

    #[test]
    fn encoded_word_parms() {
        let ct = parse_content_type(
            b"application/pdf; name=\"=?UTF-8?Q?Ricevuta_citt=C3=A0.pdf?=\"",
        )
        .unwrap();
        assert_eq!(
            vec![("name".to_owned(), "Ricevuta città.pdf".to_owned())],
            decode_parms(&ct.parms)
        );
    }

    #[test]
    fn cte_parsing() {
        assert_eq!(
            Some(ContentTransferEncoding::Base64),
            parse_content_transfer_encoding(b" BASE64\r\n")
        );
        assert_eq!(
            Some(ContentTransferEncoding::QuotedPrintable),
            parse_content_transfer_encoding(b"quoted-printable")
        );
        assert_eq!(
            Some(ContentTransferEncoding::EightBit),
            parse_content_transfer_encoding(b"8bit")
        );
        assert_eq!(None, parse_content_transfer_encoding(b"x-uuencode"));
    }

    proptest! {
        #[test]
        fn header_parsers_never_panic(s in "[ -~\t\r\n\u{80}-\u{ff}]{0,80}") {
            parse_datetime(&s);
            parse_address_list(s.as_bytes());
            if let Some(ct) = parse_content_type(s.as_bytes()) {
                decode_parms(&ct.parms);
            }
            parse_content_disposition(s.as_bytes());
            parse_content_transfer_encoding(s.as_bytes());
        }
    }
}
