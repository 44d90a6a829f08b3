//! Protocol Module
//!
//! Defines the wire protocol spoken with the server.
//!
//! The semantic layers above (`primitive`, `outcome`, `facade`) work on
//! [`Request`] and [`Reply`] values only. Byte encoding is used by the
//! socket transport and by anything that wants to speak to a real server.
//!
//! ### Commands
//! - 0x101: GET      - Payload: key
//! - 0x102: SET      - Payload: key + value
//! - 0x103: DEL      - Payload: key
//! - 0x104: CAS      - Payload: key + old + new
//! - 0x105: INCR     - Payload: key + delta
//! - 0x106: STATS    - Payload: empty
//! - 0x107: FIRSTKEY - Payload: empty
//! - 0x108: NEXTKEY  - Payload: key
//!
//! ### Flags
//! - 0x1: CACHE_ONLY
//! - 0x2: SYNC
//!
//! ### Reply Codes
//! - 0x800: ERR
//! - 0x801: CACHE_HIT
//! - 0x802: CACHE_MISS
//! - 0x803: OK
//! - 0x804: NOTIN
//! - 0x805: NOMATCH

mod request;
mod reply;
mod codec;

pub use request::{Command, CommandType, Flags, Request};
pub use reply::{Reply, ReplyCode, ServerError};
pub use codec::{
    decode_reply, decode_request, encode_reply, encode_request, read_frame, read_reply,
    read_request, write_frame, write_reply, write_request, LENGTH_PREFIX_SIZE,
    MAX_DATAGRAM_SIZE, PROTO_VERSION, REPLY_HEADER_SIZE, REQUEST_HEADER_SIZE,
};
