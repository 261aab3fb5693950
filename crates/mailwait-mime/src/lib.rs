//! # mailwait-mime
//!
//! Just enough MIME decoding to inspect test mail.
//!
//! ## Features
//!
//! - **Message parsing**: lenient header and multipart parsing into a part
//!   tree, walked depth-first
//! - **Decoding**: Base64, Quoted-Printable, RFC 2047 encoded-words,
//!   RFC 2231 parameters, charset decoding with lossy fallback
//! - **Extraction**: concatenated text body and attachment parts with
//!   their filenames
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailwait_mime::Message;
//!
//! let message = Message::parse(raw_bytes);
//! println!("Subject: {}", message.subject().unwrap_or_default());
//! println!("Body: {}", message.text_body());
//! for part in message.attachment_parts() {
//!     println!("Attachment: {:?}", part.filename());
//! }
//! ```
//!
//! ### Encoded-words
//!
//! ```ignore
//! use mailwait_mime::encoding::{decode_header_value, encode_encoded_word};
//!
//! let encoded = encode_encoded_word("Willkommen an Bord", "UTF-8");
//! assert_eq!(decode_header_value(&encoded), "Willkommen an Bord");
//! ```

#![forbid(unsafe_code)]

mod address;
mod content_type;
mod error;
mod header;
mod message;

pub mod encoding;

pub use address::{Address, parse_address_list};
pub use content_type::{ContentDisposition, ContentType, Parameters};
pub use error::{Error, Result};
pub use header::Headers;
pub use message::{MAX_DEPTH, Message, Part, TransferEncoding, Walk};
