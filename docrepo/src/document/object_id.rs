use crate::errors::{DocRepoError, DocRepoResult, ErrorKind};
use crate::ID_GENERATOR;
use chrono::{DateTime, TimeZone, Utc};
use log::info;
use rand::rngs::OsRng;
use rand::Rng;
use std::fmt::{Debug, Display};
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};

const OBJECT_ID_LEN: usize = 12;
const COUNTER_MASK: u32 = 0x00FF_FFFF;

/// A 12 byte, roughly time ordered identifier native to the document store.
///
/// The layout is a 4 byte big-endian timestamp in seconds, 5 bytes unique to the
/// process and a 3 byte counter. Its string form is 24 lowercase hex characters,
/// which is how entities with string identifiers see it.
#[derive(PartialEq, Eq, Ord, PartialOrd, Hash, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ObjectId {
    bytes: [u8; OBJECT_ID_LEN],
}

impl ObjectId {
    /// Generates a new identifier unique within this process.
    pub fn new() -> Self {
        ID_GENERATOR.next_id()
    }

    pub fn from_bytes(bytes: [u8; OBJECT_ID_LEN]) -> Self {
        ObjectId { bytes }
    }

    pub fn bytes(&self) -> [u8; OBJECT_ID_LEN] {
        self.bytes
    }

    /// Parses the 24 character hex representation.
    pub fn parse_str(value: &str) -> DocRepoResult<ObjectId> {
        if value.len() != OBJECT_ID_LEN * 2 || !value.is_ascii() {
            log::error!("Invalid object id string '{}'", value);
            return Err(DocRepoError::new(
                &format!(
                    "Invalid object id '{}': expected {} hex characters",
                    value,
                    OBJECT_ID_LEN * 2
                ),
                ErrorKind::InvalidId,
            ));
        }

        let mut bytes = [0u8; OBJECT_ID_LEN];
        for (i, byte) in bytes.iter_mut().enumerate() {
            let pair = &value[i * 2..i * 2 + 2];
            *byte = u8::from_str_radix(pair, 16).map_err(|err| {
                log::error!("Invalid hex pair '{}' in object id '{}'", pair, value);
                DocRepoError::new(
                    &format!("Invalid object id '{}': {}", value, err),
                    ErrorKind::InvalidId,
                )
            })?;
        }
        Ok(ObjectId { bytes })
    }

    pub fn to_hex(&self) -> String {
        self.bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Creation time encoded in the identifier, to second precision.
    pub fn timestamp(&self) -> DateTime<Utc> {
        let secs = u32::from_be_bytes([self.bytes[0], self.bytes[1], self.bytes[2], self.bytes[3]]);
        Utc.timestamp_opt(secs as i64, 0)
            .single()
            .unwrap_or_default()
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        ObjectId::new()
    }
}

impl FromStr for ObjectId {
    type Err = DocRepoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObjectId::parse_str(s)
    }
}

impl Debug for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ObjectId(\"{}\")", self.to_hex())
    }
}

impl Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Process wide generator behind [ObjectId::new].
pub(crate) struct ObjectIdGenerator {
    process_unique: [u8; 5],
    counter: AtomicU32,
}

impl ObjectIdGenerator {
    pub(crate) fn new() -> Self {
        let uuid = uuid::Uuid::new_v4();
        let uid = uuid.as_bytes();
        let mut process_unique = [0u8; 5];
        OsRng.fill(&mut process_unique[..]);
        // mix in the uuid tail so forked processes sharing an rng state still diverge
        for (i, byte) in process_unique.iter_mut().enumerate() {
            *byte ^= uid[uid.len() - 1 - i];
        }

        let counter = OsRng.gen::<u32>() & COUNTER_MASK;
        info!("Initialized object id generator with counter seed {}", counter);

        ObjectIdGenerator {
            process_unique,
            counter: AtomicU32::new(counter),
        }
    }

    pub(crate) fn next_id(&self) -> ObjectId {
        let timestamp = Utc::now().timestamp().clamp(0, u32::MAX as i64) as u32;
        let counter = self.counter.fetch_add(1, Ordering::Relaxed) & COUNTER_MASK;

        let mut bytes = [0u8; OBJECT_ID_LEN];
        bytes[0..4].copy_from_slice(&timestamp.to_be_bytes());
        bytes[4..9].copy_from_slice(&self.process_unique);
        bytes[9..12].copy_from_slice(&counter.to_be_bytes()[1..4]);
        ObjectId { bytes }
    }
}
