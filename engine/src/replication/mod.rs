//! Replication protocol wire format.
//!
//! # Framing
//!
//! Every frame starts with a header: aspect byte, message code byte, then a
//! `u16` `msgsize` counting the payload bytes after the header. `SMALL`
//! frames carry a whole message behind a 4-byte header. `FIRST`, `MIDDLE`
//! and `LAST` frames carry chunks of one message behind an 8-byte header
//! whose `ident` ties the chunks together.
//!
//! All integers are little endian. This module only lays out bytes; routing
//! messages by code and reassembling chunks belong to the connection layer.

pub mod net_structs;
pub mod wire;

pub use net_structs::{
    Cas, CounterChange, Exptime, FrameHeader, McFlags, MessageCode, MultipartAspect, NetAppend,
    NetBackfill, NetBackfillComplete, NetBackfillDelete, NetBackfillDeleteEverything,
    NetBackfillSet, NetCastime, NetDecr, NetDelete, NetGetCas, NetHeader, NetHello, NetIncr,
    NetIntroduce, NetMessage, NetMultipartHeader, NetNop, NetPrepend, NetSarc, NetStruct,
    ReplTimestamp, ValueSplice, decode_small, frame_small,
};
pub use wire::{WireError, WireReader, WireWriter};
