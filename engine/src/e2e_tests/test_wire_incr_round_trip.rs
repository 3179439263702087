//! INCR payloads keep their key right after the fixed prefix.

use crate::replication::{
    CounterChange, FrameHeader, MessageCode, MultipartAspect, NetIncr, NetStruct, WireReader,
    decode_small, frame_small,
};

fn incr() -> NetIncr {
    NetIncr(CounterChange {
        timestamp: 0x0102_0304,
        proposed_cas: 0x1122_3344_5566_7788,
        amount: 5,
        key: b"abc".to_vec(),
    })
}

#[test]
fn test_incr_payload_layout() {
    let bytes = incr().to_bytes().expect("encode");

    assert_eq!(NetIncr::FIXED_SIZE, 22);
    assert_eq!(bytes.len(), 25);
    assert_eq!(&bytes[0..4], &0x0102_0304u32.to_le_bytes());
    assert_eq!(&bytes[4..12], &0x1122_3344_5566_7788u64.to_le_bytes());
    assert_eq!(&bytes[12..20], &5u64.to_le_bytes());
    assert_eq!(&bytes[20..22], &3u16.to_le_bytes());
    assert_eq!(&bytes[22..], b"abc");

    assert_eq!(NetIncr::from_bytes(&bytes), Ok(incr()));
}

#[test]
fn test_incr_small_frame() {
    let frame = frame_small(&incr()).expect("frame");
    assert_eq!(frame.len(), 4 + 25);

    let mut r = WireReader::new(&frame);
    let header = FrameHeader::decode(&mut r).expect("header");
    assert_eq!(header.aspect(), MultipartAspect::Small);
    assert_eq!(header.code(), MessageCode::Incr);
    assert_eq!(header.msgsize(), 25);
    assert_eq!(r.offset(), 4);

    assert_eq!(decode_small::<NetIncr>(&frame), Ok(incr()));
}
