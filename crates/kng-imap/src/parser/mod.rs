//! IMAP response parser.
//!
//! A sans-I/O parser for the server responses this client needs to
//! understand. Responses arrive from the framed stream as complete byte
//! buffers, literals included.
//!
//! # Example
//!
//! ```
//! use kng_imap::parser::{ResponseParser, Response, UntaggedResponse};
//!
//! let input = b"* SEARCH 2 4 9\r\n";
//! let response = ResponseParser::parse(input).unwrap();
//!
//! match response {
//!     Response::Untagged(UntaggedResponse::Search(ids)) => assert_eq!(ids.len(), 3),
//!     _ => panic!("Expected SEARCH"),
//! }
//! ```

pub mod lexer;
mod response;

pub use lexer::Lexer;
pub use response::{FetchItem, FetchedMessage, Response, ResponseParser, UntaggedResponse};
