// Symphonia
// Copyright (c) 2019-2024 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pure Rust WavPack DSD compression core (a part of project Symphonia).
//!
//! This crate compresses one block of DSD (Direct Stream Digital) audio samples (a stream of
//! bytes where each byte packs eight consecutive 1-bit samples, MSB first) into a self-contained
//! payload that a symmetric decoder can restore bit-exactly. Two modes are available: a fast,
//! static, context-adaptive arithmetic coder ([`fast`]), and a slower, adaptive, bit-level coder
//! driven by a noise-shaping predictor ([`high`]). Both are lossless.
//!
//! The enclosing block container (header, metadata queue, CRC, the rest of the WavPack format)
//! is out of scope: this crate's entry point, [`DsdStream::pack_block`], treats its destination
//! as a plain `&mut [u8]` with a known length and writes only the DSD metadata sub-chunk into it.

#[cfg(test)]
mod decode_for_tests;
pub mod error;
mod fast;
mod filter;
mod framer;
mod high;
pub mod ptable;
mod range_coder;

use log::{debug, trace};

pub use error::{Error, Result};
pub use framer::{PackedBlock, ID_DSD_BLOCK, ID_LARGE, ID_ODD_SIZE};

/// The non-error outcome of a mode encoder: either the number of bytes it wrote, or a signal
/// that the coded stream would not have fit and the caller must fall back to verbatim.
///
/// This is deliberately not folded into [`Error`]: overflow is an expected, recoverable, and
/// frequent outcome (e.g. on any sufficiently small or incompressible block), not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeOutcome {
    Coded(usize),
    Overflow,
}

/// Selects which DSD encoder `DsdStream::pack_block` drives.
#[derive(Debug, Clone, Copy, Default)]
pub struct PackDsdConfig {
    /// Mirrors `CONFIG_HIGH_FLAG`: `true` selects the adaptive high-mode encoder, `false` the
    /// static fast-mode encoder.
    pub high_mode: bool,
}

/// Persistent per-logical-stream encoder state: the cumulative sample count and, for high mode,
/// the adaptive p-table and per-channel noise-shaping filters.
///
/// A fresh `DsdStream` (or one that has been [`reset`](DsdStream::reset)) always yields the
/// documented cold-start behaviour for the next block it packs.
#[derive(Default)]
pub struct DsdStream {
    sample_index: u64,
    high: high::HighModeState,
}

impl DsdStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cumulative number of per-channel samples packed so far.
    pub fn sample_index(&self) -> u64 {
        self.sample_index
    }

    /// Restores cold-start state, as if this stream had just been constructed. Idempotent:
    /// calling it on an already-fresh stream is a no-op.
    pub fn reset(&mut self) {
        self.sample_index = 0;
        self.high.reset();
    }

    /// Packs one block of DSD samples into `dest`, writing a complete metadata sub-chunk
    /// (tag, length, `dsd_power`, mode byte, parameters, and coded or verbatim body).
    ///
    /// `samples` holds `N` bytes for a mono block or `2N` bytes of strictly-alternating L/R
    /// samples for a stereo block. An empty `samples` writes nothing and returns `Ok(None)`.
    ///
    /// Returns `Err(Error::DestinationTooSmall)` if `dest` cannot hold even the chunk's fixed
    /// overhead; this is the only failure path this crate can hit on its own (the encoders
    /// themselves only ever signal overflow, handled internally via verbatim fallback).
    pub fn pack_block(
        &mut self,
        samples: &[u8],
        mono: bool,
        dsd_power: u8,
        dest: &mut [u8],
        config: &PackDsdConfig,
    ) -> Result<Option<PackedBlock>> {
        if samples.is_empty() {
            return Ok(None);
        }

        const FIXED_OVERHEAD: usize = 4 /* tag + length */ + 1 /* dsd_power */ + 1 /* mode byte */;
        if dest.len() < FIXED_OVERHEAD {
            return error::destination_too_small_error(
                "destination cannot hold the chunk tag, length, dsd_power, and mode byte",
            );
        }

        dest[4] = dsd_power;

        let mode_region = &mut dest[5..];
        let outcome = if config.high_mode {
            self.high.encode_buffer_high(samples, mono, mode_region)
        }
        else {
            fast::encode_buffer_fast(samples, mono, mode_region)
        };

        let mode_len = match outcome {
            EncodeOutcome::Coded(len) => {
                trace!(
                    "pack_block: {} samples coded into {} bytes ({})",
                    samples.len(),
                    len,
                    if config.high_mode { "high" } else { "fast" }
                );
                len
            }
            EncodeOutcome::Overflow => {
                debug!(
                    "pack_block: {} samples overflowed {} mode, falling back to verbatim",
                    samples.len(),
                    if config.high_mode { "high" } else { "fast" }
                );
                let needed = 1 + samples.len();
                if mode_region.len() < needed {
                    return error::destination_too_small_error(
                        "destination cannot hold the verbatim fallback payload",
                    );
                }
                mode_region[0] = 0x00;
                mode_region[1..1 + samples.len()].copy_from_slice(samples);
                needed
            }
        };

        let total_payload_len = 1u32 + mode_len as u32; // + dsd_power byte
        let pad_offset = 5 + mode_len;

        if total_payload_len % 2 == 1 {
            if pad_offset >= dest.len() {
                return error::destination_too_small_error(
                    "destination cannot hold the odd-size padding byte",
                );
            }
            dest[pad_offset] = 0;
        }

        let packed = framer::write_chunk_header(dest, total_payload_len);

        if dest.len() < packed.chunk_bytes {
            return error::destination_too_small_error(
                "destination cannot hold the complete framed chunk",
            );
        }

        let frame_count = if mono { samples.len() } else { samples.len() / 2 };
        self.sample_index += frame_count as u64;

        Ok(Some(packed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_block_writes_nothing() {
        let mut stream = DsdStream::new();
        let mut dest = [0u8; 16];
        let result = stream.pack_block(&[], true, 2, &mut dest, &PackDsdConfig::default());
        assert!(matches!(result, Ok(None)));
        assert_eq!(stream.sample_index(), 0);
    }

    #[test]
    fn tiny_block_falls_back_to_verbatim() {
        let mut stream = DsdStream::new();
        let samples = vec![0u8; 100];
        let mut dest = vec![0u8; 256];

        let packed = stream
            .pack_block(&samples, true, 2, &mut dest, &PackDsdConfig::default())
            .expect("pack_block should succeed")
            .expect("non-empty block writes a chunk");

        // dsd_power(1) + mode(1) + 100 raw bytes = 102, even, no odd-size flag.
        assert_eq!(packed.data_count, 102);
        assert_eq!(packed.tag_byte, ID_DSD_BLOCK | ID_LARGE);
        assert_eq!(dest[4], 2); // dsd_power
        assert_eq!(dest[5], 0x00); // verbatim mode byte
        assert_eq!(&dest[6..106], &samples[..]);
        assert_eq!(stream.sample_index(), 100);
    }

    #[test]
    fn framing_advances_by_data_count_plus_four() {
        let mut stream = DsdStream::new();
        let samples = vec![0xaau8; 1000];
        let mut dest = vec![0u8; 2048];

        let packed = stream
            .pack_block(&samples, true, 3, &mut dest, &PackDsdConfig::default())
            .unwrap()
            .unwrap();

        assert_eq!(packed.chunk_bytes, packed.data_count as usize + 4);
        assert_eq!(packed.data_count % 2, 0);
    }

    #[test]
    fn destination_too_small_is_a_hard_error() {
        let mut stream = DsdStream::new();
        let samples = vec![0u8; 100];
        let mut dest = [0u8; 3];
        let result = stream.pack_block(&samples, true, 0, &mut dest, &PackDsdConfig::default());
        assert!(matches!(result, Err(Error::DestinationTooSmall(_))));
    }

    #[test]
    fn reset_restores_cold_start_behaviour() {
        let mut a = DsdStream::new();
        let mut b = DsdStream::new();

        let mut samples = vec![0u8; 1024];
        samples[0] = 0x80;
        let config = PackDsdConfig { high_mode: true };

        // Warm a up with one block, then reset it: its next block must be indistinguishable
        // from a fresh stream's very first block, not from a fresh stream's second block.
        let mut dest_warmup = vec![0u8; 2048];
        a.pack_block(&samples, true, 2, &mut dest_warmup, &config).unwrap();
        a.reset();

        let mut dest_a = vec![0u8; 2048];
        let packed_a = a.pack_block(&samples, true, 2, &mut dest_a, &config).unwrap().unwrap();
        let mut dest_b = vec![0u8; 2048];
        let packed_b = b.pack_block(&samples, true, 2, &mut dest_b, &config).unwrap().unwrap();

        assert_eq!(packed_a.data_count, packed_b.data_count);
        assert_eq!(dest_a[..packed_a.chunk_bytes], dest_b[..packed_b.chunk_bytes]);
    }
}
