//! Replication message layouts.
//!
//! Each payload is a fixed-width prefix followed by trailing byte regions
//! whose lengths are recorded in the prefix: a key of `key_size` bytes,
//! sometimes followed by a value of `value_size` bytes. There is no padding
//! anywhere. A value may arrive split across the chunks of a multipart
//! message, so decoding accepts a value fragment shorter than `value_size`;
//! the key is always complete.

use crate::replication::wire::{WireError, WireReader, WireWriter};

pub type Cas = u64;
pub type ReplTimestamp = u32;
pub type McFlags = u32;
pub type Exptime = u32;

/// How a frame relates to the logical message it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MultipartAspect {
    Small = 0x81,
    First = 0x82,
    Middle = 0x83,
    Last = 0x84,
}

impl TryFrom<u8> for MultipartAspect {
    type Error = WireError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x81 => Ok(Self::Small),
            0x82 => Ok(Self::First),
            0x83 => Ok(Self::Middle),
            0x84 => Ok(Self::Last),
            _ => Err(WireError::UnknownAspect(value)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageCode {
    Nil = 0,
    Introduce = 1,
    Backfill = 2,
    BackfillComplete = 3,
    BackfillDeleteEverything = 4,
    BackfillSet = 5,
    BackfillDelete = 6,
    GetCas = 7,
    Sarc = 8,
    Incr = 9,
    Decr = 10,
    Append = 11,
    Prepend = 12,
    Delete = 13,
    Nop = 14,
}

impl TryFrom<u8> for MessageCode {
    type Error = WireError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::Nil,
            1 => Self::Introduce,
            2 => Self::Backfill,
            3 => Self::BackfillComplete,
            4 => Self::BackfillDeleteEverything,
            5 => Self::BackfillSet,
            6 => Self::BackfillDelete,
            7 => Self::GetCas,
            8 => Self::Sarc,
            9 => Self::Incr,
            10 => Self::Decr,
            11 => Self::Append,
            12 => Self::Prepend,
            13 => Self::Delete,
            14 => Self::Nop,
            _ => return Err(WireError::UnknownCode(value)),
        })
    }
}

/// A packed structure with an explicit byte layout.
pub trait NetStruct: Sized {
    /// Width of the fixed prefix, before any key or value bytes.
    const FIXED_SIZE: usize;

    /// Append the encoding of `self` to `w`.
    fn encode(&self, w: &mut WireWriter) -> Result<(), WireError>;

    /// Read one structure starting at the reader's position.
    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError>;

    /// Bytes `encode` will produce.
    fn encoded_len(&self) -> usize {
        Self::FIXED_SIZE
    }

    fn to_bytes(&self) -> Result<Vec<u8>, WireError> {
        let mut w = WireWriter::with_capacity(self.encoded_len());
        self.encode(&mut w)?;
        Ok(w.into_bytes())
    }

    /// Decode `bytes`, which must hold exactly one structure.
    fn from_bytes(bytes: &[u8]) -> Result<Self, WireError> {
        let mut r = WireReader::new(bytes);
        let value = Self::decode(&mut r)?;
        r.finish()?;
        Ok(value)
    }
}

/// A payload that travels in a frame under a message code.
pub trait NetMessage: NetStruct {
    const CODE: MessageCode;
}

fn key_size(key: &[u8]) -> Result<u16, WireError> {
    u16::try_from(key.len()).map_err(|_| WireError::TooLarge {
        field: "key",
        len: key.len(),
    })
}

fn read_key(r: &mut WireReader<'_>, key_size: u16) -> Result<Vec<u8>, WireError> {
    Ok(r.bytes(usize::from(key_size))?.to_vec())
}

fn check_fragment(value_size: u32, available: usize) -> Result<(), WireError> {
    if available > value_size as usize {
        return Err(WireError::ValueOverrun {
            value_size,
            available,
        });
    }
    Ok(())
}

fn read_value_fragment(r: &mut WireReader<'_>, value_size: u32) -> Result<Vec<u8>, WireError> {
    check_fragment(value_size, r.remaining())?;
    Ok(r.rest().to_vec())
}

fn value_size(value: &[u8]) -> Result<u32, WireError> {
    u32::try_from(value.len()).map_err(|_| WireError::TooLarge {
        field: "value",
        len: value.len(),
    })
}

// Framing headers.

/// Header of a single-frame message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetHeader {
    pub aspect: MultipartAspect,
    pub code: MessageCode,
    /// Payload bytes following the header.
    pub msgsize: u16,
}

impl NetStruct for NetHeader {
    const FIXED_SIZE: usize = 4;

    fn encode(&self, w: &mut WireWriter) -> Result<(), WireError> {
        w.put_u8(self.aspect as u8);
        w.put_u8(self.code as u8);
        w.put_u16(self.msgsize);
        Ok(())
    }

    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            aspect: MultipartAspect::try_from(r.u8()?)?,
            code: MessageCode::try_from(r.u8()?)?,
            msgsize: r.u16()?,
        })
    }
}

/// Header of one chunk of a multipart message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetMultipartHeader {
    pub aspect: MultipartAspect,
    pub code: MessageCode,
    /// Payload bytes in this chunk.
    pub msgsize: u16,
    /// Shared by every chunk of one logical message.
    pub ident: u32,
}

impl NetStruct for NetMultipartHeader {
    const FIXED_SIZE: usize = 8;

    fn encode(&self, w: &mut WireWriter) -> Result<(), WireError> {
        w.put_u8(self.aspect as u8);
        w.put_u8(self.code as u8);
        w.put_u16(self.msgsize);
        w.put_u32(self.ident);
        Ok(())
    }

    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            aspect: MultipartAspect::try_from(r.u8()?)?,
            code: MessageCode::try_from(r.u8()?)?,
            msgsize: r.u16()?,
            ident: r.u32()?,
        })
    }
}

/// Either header, chosen by the aspect byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameHeader {
    Small(NetHeader),
    Multipart(NetMultipartHeader),
}

impl FrameHeader {
    /// Decode the header at the start of `r`.
    pub fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        let aspect = MultipartAspect::try_from(r.u8()?)?;
        let code = MessageCode::try_from(r.u8()?)?;
        let msgsize = r.u16()?;

        Ok(match aspect {
            MultipartAspect::Small => Self::Small(NetHeader {
                aspect,
                code,
                msgsize,
            }),
            MultipartAspect::First | MultipartAspect::Middle | MultipartAspect::Last => {
                Self::Multipart(NetMultipartHeader {
                    aspect,
                    code,
                    msgsize,
                    ident: r.u32()?,
                })
            }
        })
    }

    #[must_use]
    pub const fn aspect(&self) -> MultipartAspect {
        match self {
            Self::Small(h) => h.aspect,
            Self::Multipart(h) => h.aspect,
        }
    }

    #[must_use]
    pub const fn code(&self) -> MessageCode {
        match self {
            Self::Small(h) => h.code,
            Self::Multipart(h) => h.code,
        }
    }

    #[must_use]
    pub const fn msgsize(&self) -> u16 {
        match self {
            Self::Small(h) => h.msgsize,
            Self::Multipart(h) => h.msgsize,
        }
    }

    /// Width of this header on the wire.
    #[must_use]
    pub const fn encoded_len(&self) -> usize {
        match self {
            Self::Small(_) => NetHeader::FIXED_SIZE,
            Self::Multipart(_) => NetMultipartHeader::FIXED_SIZE,
        }
    }
}

/// Frame `payload` as a single `SMALL` message.
pub fn frame_small<T: NetMessage>(payload: &T) -> Result<Vec<u8>, WireError> {
    let len = payload.encoded_len();
    let msgsize = u16::try_from(len).map_err(|_| WireError::TooLarge {
        field: "payload",
        len,
    })?;

    let mut w = WireWriter::with_capacity(NetHeader::FIXED_SIZE + len);
    NetHeader {
        aspect: MultipartAspect::Small,
        code: T::CODE,
        msgsize,
    }
    .encode(&mut w)?;
    payload.encode(&mut w)?;
    Ok(w.into_bytes())
}

/// Decode a complete `SMALL` frame carrying a `T`.
pub fn decode_small<T: NetMessage>(frame: &[u8]) -> Result<T, WireError> {
    let mut r = WireReader::new(frame);
    let header = match FrameHeader::decode(&mut r)? {
        FrameHeader::Small(header) => header,
        FrameHeader::Multipart(header) => return Err(WireError::NotSmall(header.aspect as u8)),
    };
    if header.code != T::CODE {
        return Err(WireError::CodeMismatch {
            expected: T::CODE as u8,
            actual: header.code as u8,
        });
    }
    if usize::from(header.msgsize) != r.remaining() {
        return Err(WireError::SizeMismatch {
            msgsize: header.msgsize,
            actual: r.remaining(),
        });
    }

    let payload = T::decode(&mut r)?;
    r.finish()?;
    Ok(payload)
}

// Fixed-size payloads.

/// Connection handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetHello {
    pub hello_magic: [u8; 16],
    pub protocol_version: u32,
}

impl NetStruct for NetHello {
    const FIXED_SIZE: usize = 20;

    fn encode(&self, w: &mut WireWriter) -> Result<(), WireError> {
        w.put_bytes(&self.hello_magic);
        w.put_u32(self.protocol_version);
        Ok(())
    }

    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            hello_magic: r.array()?,
            protocol_version: r.u32()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetIntroduce {
    pub database_creation_timestamp: u32,
    /// From a primary: id of the last replica seen. Unused from a replica.
    pub other_id: u32,
}

impl NetStruct for NetIntroduce {
    const FIXED_SIZE: usize = 8;

    fn encode(&self, w: &mut WireWriter) -> Result<(), WireError> {
        w.put_u32(self.database_creation_timestamp);
        w.put_u32(self.other_id);
        Ok(())
    }

    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            database_creation_timestamp: r.u32()?,
            other_id: r.u32()?,
        })
    }
}

impl NetMessage for NetIntroduce {
    const CODE: MessageCode = MessageCode::Introduce;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetCastime {
    pub proposed_cas: Cas,
    pub timestamp: ReplTimestamp,
}

impl NetStruct for NetCastime {
    const FIXED_SIZE: usize = 12;

    fn encode(&self, w: &mut WireWriter) -> Result<(), WireError> {
        w.put_u64(self.proposed_cas);
        w.put_u32(self.timestamp);
        Ok(())
    }

    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            proposed_cas: r.u64()?,
            timestamp: r.u32()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetBackfill {
    pub timestamp: ReplTimestamp,
}

impl NetStruct for NetBackfill {
    const FIXED_SIZE: usize = 4;

    fn encode(&self, w: &mut WireWriter) -> Result<(), WireError> {
        w.put_u32(self.timestamp);
        Ok(())
    }

    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            timestamp: r.u32()?,
        })
    }
}

impl NetMessage for NetBackfill {
    const CODE: MessageCode = MessageCode::Backfill;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetBackfillComplete {
    pub time_barrier_timestamp: ReplTimestamp,
}

impl NetStruct for NetBackfillComplete {
    const FIXED_SIZE: usize = 4;

    fn encode(&self, w: &mut WireWriter) -> Result<(), WireError> {
        w.put_u32(self.time_barrier_timestamp);
        Ok(())
    }

    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            time_barrier_timestamp: r.u32()?,
        })
    }
}

impl NetMessage for NetBackfillComplete {
    const CODE: MessageCode = MessageCode::BackfillComplete;
}

/// Carries no information. The padding keeps `msgsize` at least as large as
/// a multipart header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetBackfillDeleteEverything {
    pub padding: u32,
}

impl NetStruct for NetBackfillDeleteEverything {
    const FIXED_SIZE: usize = 4;

    fn encode(&self, w: &mut WireWriter) -> Result<(), WireError> {
        w.put_u32(self.padding);
        Ok(())
    }

    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        Ok(Self { padding: r.u32()? })
    }
}

impl NetMessage for NetBackfillDeleteEverything {
    const CODE: MessageCode = MessageCode::BackfillDeleteEverything;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetNop {
    pub timestamp: ReplTimestamp,
}

impl NetStruct for NetNop {
    const FIXED_SIZE: usize = 4;

    fn encode(&self, w: &mut WireWriter) -> Result<(), WireError> {
        w.put_u32(self.timestamp);
        Ok(())
    }

    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            timestamp: r.u32()?,
        })
    }
}

impl NetMessage for NetNop {
    const CODE: MessageCode = MessageCode::Nop;
}

// Payloads with a trailing key.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetGetCas {
    pub proposed_cas: Cas,
    pub timestamp: ReplTimestamp,
    pub key: Vec<u8>,
}

impl NetStruct for NetGetCas {
    const FIXED_SIZE: usize = 14;

    fn encode(&self, w: &mut WireWriter) -> Result<(), WireError> {
        let key_size = key_size(&self.key)?;
        w.put_u64(self.proposed_cas);
        w.put_u32(self.timestamp);
        w.put_u16(key_size);
        w.put_bytes(&self.key);
        Ok(())
    }

    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        let proposed_cas = r.u64()?;
        let timestamp = r.u32()?;
        let key_size = r.u16()?;
        Ok(Self {
            proposed_cas,
            timestamp,
            key: read_key(r, key_size)?,
        })
    }

    fn encoded_len(&self) -> usize {
        Self::FIXED_SIZE + self.key.len()
    }
}

impl NetMessage for NetGetCas {
    const CODE: MessageCode = MessageCode::GetCas;
}

/// Counter adjustment, shared by `NetIncr` and `NetDecr`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterChange {
    pub timestamp: ReplTimestamp,
    pub proposed_cas: Cas,
    pub amount: u64,
    pub key: Vec<u8>,
}

impl CounterChange {
    const FIXED_SIZE: usize = 22;

    fn encode(&self, w: &mut WireWriter) -> Result<(), WireError> {
        let key_size = key_size(&self.key)?;
        w.put_u32(self.timestamp);
        w.put_u64(self.proposed_cas);
        w.put_u64(self.amount);
        w.put_u16(key_size);
        w.put_bytes(&self.key);
        Ok(())
    }

    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        let timestamp = r.u32()?;
        let proposed_cas = r.u64()?;
        let amount = r.u64()?;
        let key_size = r.u16()?;
        Ok(Self {
            timestamp,
            proposed_cas,
            amount,
            key: read_key(r, key_size)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetIncr(pub CounterChange);

impl NetStruct for NetIncr {
    const FIXED_SIZE: usize = CounterChange::FIXED_SIZE;

    fn encode(&self, w: &mut WireWriter) -> Result<(), WireError> {
        self.0.encode(w)
    }

    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        CounterChange::decode(r).map(Self)
    }

    fn encoded_len(&self) -> usize {
        Self::FIXED_SIZE + self.0.key.len()
    }
}

impl NetMessage for NetIncr {
    const CODE: MessageCode = MessageCode::Incr;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetDecr(pub CounterChange);

impl NetStruct for NetDecr {
    const FIXED_SIZE: usize = CounterChange::FIXED_SIZE;

    fn encode(&self, w: &mut WireWriter) -> Result<(), WireError> {
        self.0.encode(w)
    }

    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        CounterChange::decode(r).map(Self)
    }

    fn encoded_len(&self) -> usize {
        Self::FIXED_SIZE + self.0.key.len()
    }
}

impl NetMessage for NetDecr {
    const CODE: MessageCode = MessageCode::Decr;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetDelete {
    pub timestamp: ReplTimestamp,
    pub key: Vec<u8>,
}

impl NetStruct for NetDelete {
    const FIXED_SIZE: usize = 6;

    fn encode(&self, w: &mut WireWriter) -> Result<(), WireError> {
        let key_size = key_size(&self.key)?;
        w.put_u32(self.timestamp);
        w.put_u16(key_size);
        w.put_bytes(&self.key);
        Ok(())
    }

    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        let timestamp = r.u32()?;
        let key_size = r.u16()?;
        Ok(Self {
            timestamp,
            key: read_key(r, key_size)?,
        })
    }

    fn encoded_len(&self) -> usize {
        Self::FIXED_SIZE + self.key.len()
    }
}

impl NetMessage for NetDelete {
    const CODE: MessageCode = MessageCode::Delete;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetBackfillDelete {
    /// Keeps the fixed prefix at four bytes.
    pub padding: u16,
    pub key: Vec<u8>,
}

impl NetStruct for NetBackfillDelete {
    const FIXED_SIZE: usize = 4;

    fn encode(&self, w: &mut WireWriter) -> Result<(), WireError> {
        let key_size = key_size(&self.key)?;
        w.put_u16(self.padding);
        w.put_u16(key_size);
        w.put_bytes(&self.key);
        Ok(())
    }

    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        let padding = r.u16()?;
        let key_size = r.u16()?;
        Ok(Self {
            padding,
            key: read_key(r, key_size)?,
        })
    }

    fn encoded_len(&self) -> usize {
        Self::FIXED_SIZE + self.key.len()
    }
}

impl NetMessage for NetBackfillDelete {
    const CODE: MessageCode = MessageCode::BackfillDelete;
}

// Payloads with a trailing key and value.

/// Set/add/replace/cas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetSarc {
    pub timestamp: ReplTimestamp,
    pub proposed_cas: Cas,
    pub flags: McFlags,
    pub exptime: Exptime,
    pub add_policy: u8,
    pub replace_policy: u8,
    pub old_cas: Cas,
    pub key: Vec<u8>,
    /// Full length of the value, which may exceed `value.len()`.
    pub value_size: u32,
    /// The value bytes present in this chunk.
    pub value: Vec<u8>,
}

impl NetStruct for NetSarc {
    const FIXED_SIZE: usize = 36;

    fn encode(&self, w: &mut WireWriter) -> Result<(), WireError> {
        let key_size = key_size(&self.key)?;
        check_fragment(self.value_size, self.value.len())?;
        w.put_u32(self.timestamp);
        w.put_u64(self.proposed_cas);
        w.put_u32(self.flags);
        w.put_u32(self.exptime);
        w.put_u16(key_size);
        w.put_u32(self.value_size);
        w.put_u8(self.add_policy);
        w.put_u8(self.replace_policy);
        w.put_u64(self.old_cas);
        w.put_bytes(&self.key);
        w.put_bytes(&self.value);
        Ok(())
    }

    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        let timestamp = r.u32()?;
        let proposed_cas = r.u64()?;
        let flags = r.u32()?;
        let exptime = r.u32()?;
        let key_size = r.u16()?;
        let value_size = r.u32()?;
        let add_policy = r.u8()?;
        let replace_policy = r.u8()?;
        let old_cas = r.u64()?;
        let key = read_key(r, key_size)?;
        let value = read_value_fragment(r, value_size)?;
        Ok(Self {
            timestamp,
            proposed_cas,
            flags,
            exptime,
            add_policy,
            replace_policy,
            old_cas,
            key,
            value_size,
            value,
        })
    }

    fn encoded_len(&self) -> usize {
        Self::FIXED_SIZE + self.key.len() + self.value.len()
    }
}

impl NetMessage for NetSarc {
    const CODE: MessageCode = MessageCode::Sarc;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetBackfillSet {
    pub timestamp: ReplTimestamp,
    pub flags: McFlags,
    pub exptime: Exptime,
    pub cas_or_zero: Cas,
    pub key: Vec<u8>,
    pub value_size: u32,
    pub value: Vec<u8>,
}

impl NetStruct for NetBackfillSet {
    const FIXED_SIZE: usize = 26;

    fn encode(&self, w: &mut WireWriter) -> Result<(), WireError> {
        let key_size = key_size(&self.key)?;
        check_fragment(self.value_size, self.value.len())?;
        w.put_u32(self.timestamp);
        w.put_u32(self.flags);
        w.put_u32(self.exptime);
        w.put_u64(self.cas_or_zero);
        w.put_u16(key_size);
        w.put_u32(self.value_size);
        w.put_bytes(&self.key);
        w.put_bytes(&self.value);
        Ok(())
    }

    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        let timestamp = r.u32()?;
        let flags = r.u32()?;
        let exptime = r.u32()?;
        let cas_or_zero = r.u64()?;
        let key_size = r.u16()?;
        let value_size = r.u32()?;
        let key = read_key(r, key_size)?;
        let value = read_value_fragment(r, value_size)?;
        Ok(Self {
            timestamp,
            flags,
            exptime,
            cas_or_zero,
            key,
            value_size,
            value,
        })
    }

    fn encoded_len(&self) -> usize {
        Self::FIXED_SIZE + self.key.len() + self.value.len()
    }
}

impl NetMessage for NetBackfillSet {
    const CODE: MessageCode = MessageCode::BackfillSet;
}

/// Value concatenation, shared by `NetAppend` and `NetPrepend`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueSplice {
    pub timestamp: ReplTimestamp,
    pub proposed_cas: Cas,
    pub key: Vec<u8>,
    pub value_size: u32,
    pub value: Vec<u8>,
}

impl ValueSplice {
    const FIXED_SIZE: usize = 18;

    /// A splice carrying its whole value.
    pub fn complete(
        timestamp: ReplTimestamp,
        proposed_cas: Cas,
        key: Vec<u8>,
        value: Vec<u8>,
    ) -> Result<Self, WireError> {
        Ok(Self {
            timestamp,
            proposed_cas,
            key,
            value_size: value_size(&value)?,
            value,
        })
    }

    fn encode(&self, w: &mut WireWriter) -> Result<(), WireError> {
        let key_size = key_size(&self.key)?;
        check_fragment(self.value_size, self.value.len())?;
        w.put_u32(self.timestamp);
        w.put_u64(self.proposed_cas);
        w.put_u16(key_size);
        w.put_u32(self.value_size);
        w.put_bytes(&self.key);
        w.put_bytes(&self.value);
        Ok(())
    }

    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        let timestamp = r.u32()?;
        let proposed_cas = r.u64()?;
        let key_size = r.u16()?;
        let value_size = r.u32()?;
        let key = read_key(r, key_size)?;
        let value = read_value_fragment(r, value_size)?;
        Ok(Self {
            timestamp,
            proposed_cas,
            key,
            value_size,
            value,
        })
    }

    fn encoded_len(&self) -> usize {
        Self::FIXED_SIZE + self.key.len() + self.value.len()
    }

    /// Whether every value byte is present.
    #[must_use]
    pub fn is_value_complete(&self) -> bool {
        self.value.len() == self.value_size as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetAppend(pub ValueSplice);

impl NetStruct for NetAppend {
    const FIXED_SIZE: usize = ValueSplice::FIXED_SIZE;

    fn encode(&self, w: &mut WireWriter) -> Result<(), WireError> {
        self.0.encode(w)
    }

    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        ValueSplice::decode(r).map(Self)
    }

    fn encoded_len(&self) -> usize {
        self.0.encoded_len()
    }
}

impl NetMessage for NetAppend {
    const CODE: MessageCode = MessageCode::Append;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetPrepend(pub ValueSplice);

impl NetStruct for NetPrepend {
    const FIXED_SIZE: usize = ValueSplice::FIXED_SIZE;

    fn encode(&self, w: &mut WireWriter) -> Result<(), WireError> {
        self.0.encode(w)
    }

    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        ValueSplice::decode(r).map(Self)
    }

    fn encoded_len(&self) -> usize {
        self.0.encoded_len()
    }
}

impl NetMessage for NetPrepend {
    const CODE: MessageCode = MessageCode::Prepend;
}
