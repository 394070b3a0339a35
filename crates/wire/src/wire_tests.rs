// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire format tests: length-prefix framing.

use super::*;

#[tokio::test]
async fn read_write_frame_roundtrip() {
    let original = b"hello world";

    let mut buffer = Vec::new();
    write_frame(&mut buffer, original).await.expect("write failed");

    // write_frame adds 4-byte length prefix
    assert_eq!(buffer.len(), 4 + original.len());

    let mut cursor = std::io::Cursor::new(buffer);
    let read_back = read_frame(&mut cursor).await.expect("read failed");

    assert_eq!(read_back, original);
}

#[test]
fn frame_prefixes_big_endian_length() {
    let framed = frame(b"test data").unwrap();
    let len = u32::from_be_bytes([framed[0], framed[1], framed[2], framed[3]]) as usize;
    assert_eq!(len, 9);
    assert_eq!(&framed[4..], b"test data");
}

#[test]
fn take_frame_waits_for_complete_frames() {
    let framed = frame(b"abcdef").unwrap();
    let mut buf = framed[..5].to_vec();
    assert_eq!(take_frame(&mut buf).unwrap(), None);
    assert_eq!(buf.len(), 5, "partial frame must be left in place");

    buf.extend_from_slice(&framed[5..]);
    buf.extend_from_slice(&frame(b"next").unwrap());
    assert_eq!(take_frame(&mut buf).unwrap().as_deref(), Some(&b"abcdef"[..]));
    assert_eq!(take_frame(&mut buf).unwrap().as_deref(), Some(&b"next"[..]));
    assert!(buf.is_empty());
}

#[test]
fn take_frame_rejects_oversized_prefix() {
    let mut buf = ((MAX_FRAME_LEN + 1) as u32).to_be_bytes().to_vec();
    assert!(matches!(take_frame(&mut buf), Err(ProtocolError::FrameTooLarge(_))));
}

#[tokio::test]
async fn read_frame_reports_closed_connection() {
    let mut cursor = std::io::Cursor::new(Vec::<u8>::new());
    assert!(matches!(read_frame(&mut cursor).await, Err(ProtocolError::ConnectionClosed)));
}
