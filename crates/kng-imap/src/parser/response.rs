//! Structured IMAP responses.

#![allow(clippy::missing_errors_doc)]

use super::lexer::Lexer;
use crate::types::{SeqNum, Status, Tag};
use crate::{Error, Result};

/// A parsed IMAP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Tagged response (command completion).
    Tagged {
        /// The command tag.
        tag: Tag,
        /// Response status.
        status: Status,
        /// Bracketed response code, verbatim.
        code: Option<String>,
        /// Human-readable text.
        text: String,
    },
    /// Untagged response (server data).
    Untagged(UntaggedResponse),
    /// Continuation request.
    Continuation {
        /// Optional text.
        text: Option<String>,
    },
}

/// Untagged server data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UntaggedResponse {
    /// Status response (`* OK`, `* NO`, `* BAD`, `* PREAUTH`, `* BYE`).
    Status {
        /// Response status.
        status: Status,
        /// Bracketed response code, verbatim.
        code: Option<String>,
        /// Human-readable text.
        text: String,
    },
    /// CAPABILITY listing.
    Capability(Vec<String>),
    /// SEARCH results.
    Search(Vec<SeqNum>),
    /// Number of messages in the mailbox.
    Exists(u32),
    /// Number of recent messages.
    Recent(u32),
    /// A message was expunged.
    Expunge(u32),
    /// FETCH data for one message.
    Fetch {
        /// Message sequence number.
        seq: SeqNum,
        /// Returned data items.
        items: Vec<FetchItem>,
    },
    /// Any other untagged data, kept by keyword.
    Other(String),
}

/// A single FETCH data item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchItem {
    /// Body section contents (`BODY[...]`), `None` when the server sent NIL.
    Body {
        /// Section specifier between the brackets (empty for the whole message).
        section: String,
        /// Raw section bytes.
        data: Option<Vec<u8>>,
    },
    /// Message UID.
    Uid(u32),
    /// Message flags.
    Flags(Vec<String>),
    /// Message size in octets.
    Rfc822Size(u32),
    /// Any other item, by name; its value is skipped.
    Other(String),
}

/// One message from a FETCH response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedMessage {
    /// Sequence number.
    pub seq: SeqNum,
    /// Returned data items.
    pub items: Vec<FetchItem>,
}

impl FetchedMessage {
    /// Returns the first body section with data.
    #[must_use]
    pub fn body(&self) -> Option<&[u8]> {
        self.items.iter().find_map(|item| match item {
            FetchItem::Body {
                data: Some(data), ..
            } => Some(data.as_slice()),
            _ => None,
        })
    }

    /// Consumes the message, returning the first body section with data.
    #[must_use]
    pub fn into_body(self) -> Option<Vec<u8>> {
        self.items.into_iter().find_map(|item| match item {
            FetchItem::Body { data, .. } => data,
            _ => None,
        })
    }

    /// Returns the UID if it was fetched.
    #[must_use]
    pub fn uid(&self) -> Option<u32> {
        self.items.iter().find_map(|item| match item {
            FetchItem::Uid(uid) => Some(*uid),
            _ => None,
        })
    }
}

/// Response parser.
pub struct ResponseParser;

impl ResponseParser {
    /// Parses a complete response.
    pub fn parse(input: &[u8]) -> Result<Response> {
        let mut lexer = Lexer::new(input);

        match lexer.peek() {
            Some(b'*') => {
                lexer.advance();
                lexer.expect_space()?;
                Self::parse_untagged(&mut lexer).map(Response::Untagged)
            }
            Some(b'+') => {
                lexer.advance();
                lexer.skip_spaces();
                let text = lexer.read_text_until_crlf();
                Ok(Response::Continuation {
                    text: (!text.is_empty()).then_some(text),
                })
            }
            Some(_) => {
                let tag = lexer.read_atom()?;
                lexer.expect_space()?;
                let status = Self::parse_status(&mut lexer)?;
                let (code, text) = Self::parse_resp_text(&mut lexer)?;
                Ok(Response::Tagged {
                    tag: Tag::new(tag),
                    status,
                    code,
                    text,
                })
            }
            None => Err(Error::Parse {
                position: 0,
                message: "empty response".to_string(),
            }),
        }
    }

    fn parse_status(lexer: &mut Lexer<'_>) -> Result<Status> {
        let atom = lexer.read_atom()?;
        Status::parse(atom).ok_or_else(|| lexer.error(format!("unknown status {atom}")))
    }

    /// Parses `[code] text` after a status keyword.
    fn parse_resp_text(lexer: &mut Lexer<'_>) -> Result<(Option<String>, String)> {
        lexer.skip_spaces();
        let code = if lexer.peek() == Some(b'[') {
            lexer.advance();
            let code = lexer.read_until(b']')?.to_string();
            lexer.skip_spaces();
            Some(code)
        } else {
            None
        };
        Ok((code, lexer.read_text_until_crlf()))
    }

    fn parse_untagged(lexer: &mut Lexer<'_>) -> Result<UntaggedResponse> {
        if lexer.at_digit() {
            let n = lexer.read_number()?;
            lexer.expect_space()?;
            let keyword = lexer.read_atom()?.to_ascii_uppercase();
            return match keyword.as_str() {
                "EXISTS" => Ok(UntaggedResponse::Exists(n)),
                "RECENT" => Ok(UntaggedResponse::Recent(n)),
                "EXPUNGE" => Ok(UntaggedResponse::Expunge(n)),
                "FETCH" => {
                    let seq = SeqNum::new(n)
                        .ok_or_else(|| lexer.error("FETCH for sequence number 0"))?;
                    lexer.expect_space()?;
                    let items = Self::parse_fetch_items(lexer)?;
                    Ok(UntaggedResponse::Fetch { seq, items })
                }
                _ => Ok(UntaggedResponse::Other(keyword)),
            };
        }

        let keyword = lexer.read_atom()?.to_ascii_uppercase();
        if let Some(status) = Status::parse(&keyword) {
            let (code, text) = Self::parse_resp_text(lexer)?;
            return Ok(UntaggedResponse::Status { status, code, text });
        }

        match keyword.as_str() {
            "CAPABILITY" => {
                let mut caps = Vec::new();
                lexer.skip_spaces();
                while !lexer.at_line_end() {
                    caps.push(lexer.read_atom()?.to_string());
                    lexer.skip_spaces();
                }
                Ok(UntaggedResponse::Capability(caps))
            }
            "SEARCH" => {
                let mut ids = Vec::new();
                lexer.skip_spaces();
                while lexer.at_digit() {
                    if let Some(seq) = SeqNum::new(lexer.read_number()?) {
                        ids.push(seq);
                    }
                    lexer.skip_spaces();
                }
                Ok(UntaggedResponse::Search(ids))
            }
            _ => Ok(UntaggedResponse::Other(keyword)),
        }
    }

    fn parse_fetch_items(lexer: &mut Lexer<'_>) -> Result<Vec<FetchItem>> {
        lexer.expect(b'(')?;
        let mut items = Vec::new();

        loop {
            lexer.skip_spaces();
            if lexer.peek() == Some(b')') {
                lexer.advance();
                return Ok(items);
            }

            let name = lexer.read_atom()?.to_ascii_uppercase();
            let item = match name.as_str() {
                "UID" => {
                    lexer.expect_space()?;
                    FetchItem::Uid(lexer.read_number()?)
                }
                "RFC822.SIZE" => {
                    lexer.expect_space()?;
                    FetchItem::Rfc822Size(lexer.read_number()?)
                }
                "FLAGS" => {
                    lexer.expect_space()?;
                    FetchItem::Flags(Self::parse_flag_list(lexer)?)
                }
                "BODY" | "BINARY" if lexer.peek() == Some(b'[') => {
                    lexer.advance();
                    let section = lexer.read_until(b']')?.to_string();
                    // Partial fetches carry an origin octet: BODY[]<0>
                    if lexer.peek() == Some(b'<') {
                        lexer.advance();
                        lexer.read_until(b'>')?;
                    }
                    lexer.expect_space()?;
                    let data = lexer.read_nstring()?;
                    FetchItem::Body { section, data }
                }
                "RFC822" => {
                    lexer.expect_space()?;
                    let data = lexer.read_nstring()?;
                    FetchItem::Body {
                        section: String::new(),
                        data,
                    }
                }
                _ => {
                    lexer.expect_space()?;
                    lexer.skip_value()?;
                    FetchItem::Other(name)
                }
            };
            items.push(item);
        }
    }

    fn parse_flag_list(lexer: &mut Lexer<'_>) -> Result<Vec<String>> {
        lexer.expect(b'(')?;
        let mut flags = Vec::new();
        loop {
            lexer.skip_spaces();
            if lexer.peek() == Some(b')') {
                lexer.advance();
                return Ok(flags);
            }
            flags.push(lexer.read_atom()?.to_string());
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tagged_ok() {
        let response = ResponseParser::parse(b"A0001 OK [READ-WRITE] SELECT completed\r\n").unwrap();
        assert_eq!(
            response,
            Response::Tagged {
                tag: Tag::new("A0001"),
                status: Status::Ok,
                code: Some("READ-WRITE".to_string()),
                text: "SELECT completed".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_tagged_no() {
        let response = ResponseParser::parse(b"A0002 NO [AUTHENTICATIONFAILED] Invalid\r\n").unwrap();
        match response {
            Response::Tagged { status, text, .. } => {
                assert_eq!(status, Status::No);
                assert_eq!(text, "Invalid");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_greeting() {
        let response = ResponseParser::parse(b"* OK Gimap ready\r\n").unwrap();
        assert_eq!(
            response,
            Response::Untagged(UntaggedResponse::Status {
                status: Status::Ok,
                code: None,
                text: "Gimap ready".to_string(),
            })
        );
    }

    #[test]
    fn test_parse_search() {
        let response = ResponseParser::parse(b"* SEARCH 3 17 42\r\n").unwrap();
        let Response::Untagged(UntaggedResponse::Search(ids)) = response else {
            panic!("expected search");
        };
        let ids: Vec<u32> = ids.into_iter().map(SeqNum::get).collect();
        assert_eq!(ids, vec![3, 17, 42]);
    }

    #[test]
    fn test_parse_empty_search() {
        let response = ResponseParser::parse(b"* SEARCH\r\n").unwrap();
        assert_eq!(response, Response::Untagged(UntaggedResponse::Search(vec![])));
    }

    #[test]
    fn test_parse_exists_and_recent() {
        assert_eq!(
            ResponseParser::parse(b"* 172 EXISTS\r\n").unwrap(),
            Response::Untagged(UntaggedResponse::Exists(172))
        );
        assert_eq!(
            ResponseParser::parse(b"* 1 RECENT\r\n").unwrap(),
            Response::Untagged(UntaggedResponse::Recent(1))
        );
    }

    #[test]
    fn test_parse_capability() {
        let response = ResponseParser::parse(b"* CAPABILITY IMAP4rev1 IDLE AUTH=PLAIN\r\n").unwrap();
        assert_eq!(
            response,
            Response::Untagged(UntaggedResponse::Capability(vec![
                "IMAP4rev1".to_string(),
                "IDLE".to_string(),
                "AUTH=PLAIN".to_string(),
            ]))
        );
    }

    #[test]
    fn test_parse_fetch_body_literal() {
        let input = b"* 12 FETCH (UID 88 BODY[] {5}\r\nhello FLAGS (\\Seen))\r\n";
        let Response::Untagged(UntaggedResponse::Fetch { seq, items }) =
            ResponseParser::parse(input).unwrap()
        else {
            panic!("expected fetch");
        };
        let message = FetchedMessage { seq, items };
        assert_eq!(message.seq.get(), 12);
        assert_eq!(message.uid(), Some(88));
        assert_eq!(message.body(), Some(&b"hello"[..]));
        assert!(message.items.contains(&FetchItem::Flags(vec!["\\Seen".to_string()])));
    }

    #[test]
    fn test_parse_fetch_body_nil() {
        let input = b"* 1 FETCH (BODY[] NIL)\r\n";
        let Response::Untagged(UntaggedResponse::Fetch { items, .. }) =
            ResponseParser::parse(input).unwrap()
        else {
            panic!("expected fetch");
        };
        assert_eq!(
            items,
            vec![FetchItem::Body {
                section: String::new(),
                data: None
            }]
        );
    }

    #[test]
    fn test_parse_fetch_skips_unknown_items() {
        let input = b"* 2 FETCH (INTERNALDATE \"17-Jul-1996 02:44:25 -0700\" BODY[TEXT] \"hi\")\r\n";
        let Response::Untagged(UntaggedResponse::Fetch { items, .. }) =
            ResponseParser::parse(input).unwrap()
        else {
            panic!("expected fetch");
        };
        assert_eq!(items[0], FetchItem::Other("INTERNALDATE".to_string()));
        assert_eq!(
            items[1],
            FetchItem::Body {
                section: "TEXT".to_string(),
                data: Some(b"hi".to_vec())
            }
        );
    }

    #[test]
    fn test_parse_continuation() {
        assert_eq!(
            ResponseParser::parse(b"+ Ready\r\n").unwrap(),
            Response::Continuation {
                text: Some("Ready".to_string())
            }
        );
    }

    #[test]
    fn test_parse_garbage() {
        assert!(ResponseParser::parse(b"").is_err());
        assert!(ResponseParser::parse(b"A1 MAYBE things\r\n").is_err());
    }
}
