// Symphonia
// Copyright (c) 2019-2024 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use symphonia_codec_wavpack_dsd::{DsdStream, PackDsdConfig, ID_DSD_BLOCK, ID_LARGE};

fn pack(samples: &[u8], mono: bool, config: &PackDsdConfig) -> (Vec<u8>, Option<symphonia_codec_wavpack_dsd::PackedBlock>) {
    let mut stream = DsdStream::new();
    let mut dest = vec![0u8; samples.len() + 256];
    let packed = stream.pack_block(samples, mono, 6, &mut dest, config).expect("pack_block");
    (dest, packed)
}

#[test]
fn empty_block_writes_nothing() {
    let (_, packed) = pack(&[], true, &PackDsdConfig::default());
    assert!(packed.is_none());
}

#[test]
fn tiny_block_falls_back_to_verbatim() {
    let samples = vec![0u8; 50];
    let (dest, packed) = pack(&samples, true, &PackDsdConfig::default());
    let packed = packed.expect("non-empty block writes a chunk");

    assert_eq!(packed.tag_byte, ID_DSD_BLOCK | ID_LARGE);
    assert_eq!(dest[5], 0x00, "verbatim mode byte");
    assert_eq!(&dest[6..6 + samples.len()], &samples[..]);
}

#[test]
fn constant_byte_fast_block_compresses() {
    let samples = vec![0xaau8; 1000];
    let (_, packed) = pack(&samples, true, &PackDsdConfig::default());
    let packed = packed.expect("non-empty block writes a chunk");

    assert!(
        packed.chunk_bytes < samples.len() / 2,
        "a constant byte stream should compress to well under half its size, got {} bytes",
        packed.chunk_bytes
    );
}

#[test]
fn first_high_block_impulse_encodes_successfully() {
    let mut samples = vec![0u8; 1024];
    samples[0] = 0x80;
    let config = PackDsdConfig { high_mode: true };
    let (dest, packed) = pack(&samples, true, &config);
    let packed = packed.expect("non-empty block writes a chunk");

    assert_eq!(dest[5], 0x02, "high mode byte");
    assert!(packed.chunk_bytes > 0);
}

#[test]
fn second_high_block_reuses_stream_state() {
    let mut samples = vec![0u8; 1024];
    samples[0] = 0x80;
    let config = PackDsdConfig { high_mode: true };

    let mut stream = DsdStream::new();
    let mut dest1 = vec![0u8; samples.len() + 256];
    stream.pack_block(&samples, true, 6, &mut dest1, &config).unwrap().expect("first block");

    let mut dest2 = vec![0u8; samples.len() + 256];
    let packed2 =
        stream.pack_block(&samples, true, 6, &mut dest2, &config).unwrap().expect("second block");

    assert_eq!(dest2[5], 0x02, "high mode byte");
    assert_eq!(stream.sample_index(), 2048);
    assert!(packed2.chunk_bytes > 0);
}

#[test]
fn incompressible_fast_block_falls_back_with_exact_byte_count() {
    let mut samples = Vec::with_capacity(2000);
    let mut x: u32 = 0x2463_1941;
    for _ in 0..2000 {
        x = x.wrapping_mul(1_103_515_245).wrapping_add(12345);
        samples.push((x >> 16) as u8);
    }

    let mut stream = DsdStream::new();
    let mut dest = vec![0u8; samples.len() + 256];
    let packed = stream
        .pack_block(&samples, false, 6, &mut dest, &PackDsdConfig::default())
        .unwrap()
        .expect("non-empty block writes a chunk");

    // Verbatim fallback: 1 mode byte + num_samples payload bytes, plus the dsd_power byte,
    // i.e. num_samples + 2 total payload bytes (before any even-padding).
    assert_eq!(dest[5], 0x00, "expected the static fast-mode coder to overflow on noise");
    assert!(packed.data_count as usize >= samples.len() + 2);
    assert_eq!(&dest[6..6 + samples.len()], &samples[..]);
}
