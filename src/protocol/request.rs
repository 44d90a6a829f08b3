//! Request definitions
//!
//! Represents requests sent to the server.

/// Command types (on-wire values)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum CommandType {
    Get = 0x101,
    Set = 0x102,
    Delete = 0x103,
    Cas = 0x104,
    Incr = 0x105,
    Stats = 0x106,
    FirstKey = 0x107,
    NextKey = 0x108,
}

impl CommandType {
    /// Parse an on-wire command value
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0x101 => Some(CommandType::Get),
            0x102 => Some(CommandType::Set),
            0x103 => Some(CommandType::Delete),
            0x104 => Some(CommandType::Cas),
            0x105 => Some(CommandType::Incr),
            0x106 => Some(CommandType::Stats),
            0x107 => Some(CommandType::FirstKey),
            0x108 => Some(CommandType::NextKey),
            _ => None,
        }
    }
}

/// Request flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Flags(u16);

impl Flags {
    /// Best-effort request against cache and database
    pub const NONE: Flags = Flags(0);

    /// Only touch the cache tier (get, set, del, cas, incr)
    pub const CACHE_ONLY: Flags = Flags(1);

    /// Reply only after the database write completed (set, del)
    pub const SYNC: Flags = Flags(2);

    pub fn from_bits(bits: u16) -> Self {
        Flags(bits)
    }

    pub fn bits(&self) -> u16 {
        self.0
    }

    pub fn cache_only(&self) -> bool {
        self.0 & Self::CACHE_ONLY.0 != 0
    }

    pub fn sync(&self) -> bool {
        self.0 & Self::SYNC.0 != 0
    }
}

/// A request command with its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Get a value by key
    Get { key: Vec<u8> },

    /// Set a key-value pair
    Set { key: Vec<u8>, value: Vec<u8> },

    /// Delete a key
    Delete { key: Vec<u8> },

    /// Replace `old` with `new` if the stored value is `old`
    Cas {
        key: Vec<u8>,
        old: Vec<u8>,
        new: Vec<u8>,
    },

    /// Add `delta` to a value stored as a NUL-terminated decimal string
    Incr { key: Vec<u8>, delta: i64 },

    /// Server counters
    Stats,

    /// First key of the database
    FirstKey,

    /// Key following `key` in the database
    NextKey { key: Vec<u8> },
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Get { .. } => CommandType::Get,
            Command::Set { .. } => CommandType::Set,
            Command::Delete { .. } => CommandType::Delete,
            Command::Cas { .. } => CommandType::Cas,
            Command::Incr { .. } => CommandType::Incr,
            Command::Stats => CommandType::Stats,
            Command::FirstKey => CommandType::FirstKey,
            Command::NextKey { .. } => CommandType::NextKey,
        }
    }

    /// The key the command operates on (empty for key-less commands)
    pub fn key(&self) -> &[u8] {
        match self {
            Command::Get { key }
            | Command::Set { key, .. }
            | Command::Delete { key }
            | Command::Cas { key, .. }
            | Command::Incr { key, .. }
            | Command::NextKey { key } => key,
            Command::Stats | Command::FirstKey => &[],
        }
    }

    /// Total size of keys and values carried
    pub fn payload_len(&self) -> usize {
        match self {
            Command::Set { key, value } => key.len() + value.len(),
            Command::Cas { key, old, new } => key.len() + old.len() + new.len(),
            other => other.key().len(),
        }
    }
}

/// A request as sent on the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Request id (28 bits), echoed in the reply
    pub id: u32,

    /// Cache-only / synchronous flags
    pub flags: Flags,

    /// The command
    pub command: Command,
}

impl Request {
    /// Largest request id representable in the header
    pub const MAX_ID: u32 = 0x0FFF_FFFF;

    pub fn new(id: u32, flags: Flags, command: Command) -> Self {
        Self {
            id: id & Self::MAX_ID,
            flags,
            command,
        }
    }
}
