use std::sync::Arc;
use std::thread;

use tandem_core::error::HandoffError;
use tandem_core::handoff::{BYTES_PER_PIXEL, FrameHandoff};

#[test]
fn test_new_frame_is_black() {
    let handoff = FrameHandoff::new(256, 384).unwrap();
    assert_eq!(handoff.dimensions(), (256, 384));
    assert_eq!(handoff.frame_len(), 256 * 384 * BYTES_PER_PIXEL);
    assert_eq!(handoff.generation(), 0);
    handoff.consume_latest(|pixels, generation| {
        assert_eq!(pixels.len(), 256 * 384 * 3);
        assert!(pixels.iter().all(|&b| b == 0));
        assert_eq!(generation, 0);
    });
}

#[test]
fn test_oversized_frame_is_an_error() {
    let err = FrameHandoff::new(u32::MAX, u32::MAX).err();
    assert!(matches!(err, Some(HandoffError::Allocation { .. })));
}

#[test]
fn test_publish_then_consume() {
    let handoff = FrameHandoff::new(2, 1).unwrap();
    let generation = handoff.publish(&[1, 2, 3, 4, 5, 6]).unwrap();
    assert_eq!(generation, 1);

    let copy = handoff.consume_latest(|pixels, generation| {
        assert_eq!(generation, 1);
        pixels.to_vec()
    });
    assert_eq!(copy, [1, 2, 3, 4, 5, 6]);
}

#[test]
fn test_publish_rejects_wrong_size() {
    let handoff = FrameHandoff::new(2, 1).unwrap();
    match handoff.publish(&[0; 5]) {
        Err(HandoffError::SizeMismatch { expected, actual }) => {
            assert_eq!(expected, 6);
            assert_eq!(actual, 5);
        }
        other => panic!("expected size mismatch, got {other:?}"),
    }
    assert_eq!(handoff.generation(), 0);
}

#[test]
fn test_only_latest_frame_is_kept() {
    let handoff = FrameHandoff::new(1, 1).unwrap();
    for value in 1..=5u8 {
        handoff.publish(&[value; 3]).unwrap();
    }
    assert_eq!(handoff.generation(), 5);
    handoff.consume_latest(|pixels, _| assert_eq!(pixels, [5; 3]));
}

#[test]
fn test_reader_never_sees_mixed_frame() {
    const FRAMES: u64 = 300;
    let handoff = Arc::new(FrameHandoff::new(64, 48).unwrap());

    let writer = {
        let handoff = Arc::clone(&handoff);
        thread::spawn(move || {
            for frame in 1..=FRAMES {
                let value = frame as u8;
                // Byte-by-byte so a torn read would be visible.
                handoff.publish_with(|pixels| {
                    for byte in pixels.iter_mut() {
                        *byte = value;
                    }
                });
            }
        })
    };

    let mut last_generation = 0;
    while last_generation < FRAMES {
        last_generation = handoff.consume_latest(|pixels, generation| {
            let first = pixels[0];
            assert!(
                pixels.iter().all(|&b| b == first),
                "mixed frame at generation {generation}"
            );
            assert_eq!(first, generation as u8);
            generation
        });
    }

    writer.join().unwrap();
}
