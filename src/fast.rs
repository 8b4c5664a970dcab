// Symphonia
// Copyright (c) 2019-2024 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fast-mode DSD encoding: order-N context-adaptive arithmetic coding of whole DSD bytes using a
//! static probability table estimated from the block's own histogram.

use log::{debug, trace};

use crate::range_coder::RangeEncoder;
use crate::EncodeOutcome;

pub const MAX_HISTORY_BITS: u32 = 5;
pub const MAX_PROBABILITY: u16 = 0xa0;

/// Minimum number of (possibly channel-doubled) samples required before fast mode is attempted.
const MIN_SAMPLES: usize = 280;

/// Target ceiling, per history bin, for the sum of a context row's cumulative probabilities.
/// Keeping this bounded caps the memory (and therefore the cache footprint) of the three decode
/// tables to roughly 2 KiB per history bin.
const MAX_SUMMED_PROBABILITY_PER_BIN: u32 = 1280;

fn history_bits_for(num_samples: usize) -> Option<u32> {
    let bits = if num_samples < MIN_SAMPLES {
        return None;
    }
    else if num_samples < 560 {
        0
    }
    else if num_samples < 1725 {
        1
    }
    else if num_samples < 5000 {
        2
    }
    else if num_samples < 14000 {
        3
    }
    else if num_samples < 28000 {
        4
    }
    else if num_samples < 76000 {
        5
    }
    else if num_samples < 130000 {
        6
    }
    else if num_samples < 300000 {
        7
    }
    else {
        8
    };

    Some(bits.min(MAX_HISTORY_BITS))
}

/// One context row's worth of derived coding tables.
struct ProbabilityRow {
    probs: [u8; 256],
    sums: [u16; 256],
}

/// Computes `probs`/`sums` for a single context row from its sample histogram, per the
/// calculate_probabilities algorithm: normalize hit counts into `[0, MAX_PROBABILITY]`, retrying
/// with a larger divisor until nothing overflows.
fn calculate_probabilities(hist: &[u32; 256]) -> ProbabilityRow {
    let max_hits = hist.iter().max().copied().unwrap_or(0);

    let mut row = ProbabilityRow { probs: [0; 256], sums: [0; 256] };

    if max_hits == 0 {
        return row;
    }

    let mut divisor =
        if max_hits > MAX_PROBABILITY as u32 {
            ((max_hits << 8) + (MAX_PROBABILITY as u32 >> 1)) / MAX_PROBABILITY as u32
        }
        else {
            0
        };

    loop {
        let mut max_value = 0u32;
        let mut sum = 0u32;

        for i in 0..256 {
            let value = if hist[i] == 0 {
                0
            }
            else if divisor == 0 {
                hist[i]
            }
            else {
                (((hist[i] << 8) + (divisor >> 1)) / divisor).max(1)
            };

            max_value = max_value.max(value);
            sum += value;
            row.sums[i] = sum as u16;
            row.probs[i] = value as u8;
        }

        if max_value > MAX_PROBABILITY as u32 {
            divisor += 1;
            continue;
        }

        break;
    }

    row
}

/// Shrinks the combined probability tables until their total summed probability is bounded,
/// by repeatedly halving the row with the largest total (see table-shrinking in the spec).
fn shrink_tables(rows: &mut [ProbabilityRow]) {
    let history_bins = rows.len();
    let limit = history_bins as u32 * MAX_SUMMED_PROBABILITY_PER_BIN;

    let mut total: u32 = rows.iter().map(|r| r.sums[255] as u32).sum();

    while total > limit {
        let largest = rows
            .iter()
            .enumerate()
            .max_by_key(|(_, r)| r.sums[255])
            .map(|(i, _)| i)
            .expect("history_bins is always >= 1");

        let row = &mut rows[largest];
        total -= row.sums[255] as u32;

        let mut sum = 0u32;
        for i in 0..256 {
            row.probs[i] = (row.probs[i] + 1) >> 1;
            sum += row.probs[i] as u32;
            row.sums[i] = sum as u16;
        }

        total += row.sums[255] as u32;
    }
}

/// Run-length encodes the whole probability table, flattened to `history_bins * 256` bytes:
/// bytes in `[0, MAX_PROBABILITY]` pass through unchanged; runs of zero bytes become one or more
/// `MAX_PROBABILITY + k` bytes. Zero-runs span row boundaries. A single trailing `0` terminates
/// the whole stream, making it self-delimiting.
fn rle_encode_table(probs: &[u8], out: &mut Vec<u8>) {
    let max_run = 0xffu16 - MAX_PROBABILITY;
    let mut zero_run: u16 = 0;

    for &p in probs.iter() {
        if p != 0 {
            while zero_run > 0 {
                let chunk = zero_run.min(max_run);
                out.push((MAX_PROBABILITY + chunk) as u8);
                zero_run -= chunk;
            }
            out.push(p);
        }
        else {
            zero_run += 1;
        }
    }

    while zero_run > 0 {
        let chunk = zero_run.min(max_run);
        out.push((MAX_PROBABILITY + chunk) as u8);
        zero_run -= chunk;
    }

    out.push(0);
}

/// Decodes an RLE'd probability table back into `history_bins` rows of 256 bytes, reading the
/// whole flat `history_bins * 256`-byte stream in one pass up to its single trailing zero byte.
/// Used only by this crate's private round-trip test harness.
#[cfg(test)]
pub(crate) fn rle_decode(src: &[u8], history_bins: usize) -> (Vec<[u8; 256]>, usize) {
    let mut flat = vec![0u8; history_bins * 256];
    let mut pos = 0;
    let mut i = 0;

    loop {
        let b = src[pos];
        pos += 1;

        if b == 0 {
            break;
        }
        else if b as u16 > MAX_PROBABILITY {
            i += (b as u16 - MAX_PROBABILITY) as usize;
        }
        else {
            flat[i] = b;
            i += 1;
        }
    }

    let rows = flat.chunks_exact(256).map(|chunk| chunk.try_into().unwrap()).collect();

    (rows, pos)
}

/// Builds the per-context histogram over `samples`, walking contexts the same way the encoder
/// will: for stereo, the context is the previous sample on the *same* channel.
fn build_histogram(samples: &[u8], mono: bool, history_bins: usize) -> Vec<[u32; 256]> {
    let mask = (history_bins - 1) as u8;
    let mut histogram = vec![[0u32; 256]; history_bins];

    let mut ctx0 = 0u8;
    let mut ctx1 = 0u8;

    if mono {
        for &b in samples {
            histogram[ctx0 as usize][b as usize] += 1;
            ctx0 = b & mask;
        }
    }
    else {
        for &b in samples {
            histogram[ctx0 as usize][b as usize] += 1;
            ctx0 = ctx1;
            ctx1 = b & mask;
        }
    }

    histogram
}

/// Encodes `samples` (already channel-interleaved if stereo) in fast mode into `dest`, writing
/// the mode byte, `history_bits`, `MAX_PROBABILITY`, the RLE'd tables, then the coded body.
///
/// `dest` must have at least 10 bytes of slack past the coded payload; this mirrors the original
/// encoder's `ep = destination + num_samples - 10` hard stop and is what lets the caller always
/// have room for its own trailing framing bytes.
pub fn encode_buffer_fast(samples: &[u8], mono: bool, dest: &mut [u8]) -> EncodeOutcome {
    let num_samples = samples.len();

    let history_bits = match history_bits_for(num_samples) {
        Some(bits) => bits,
        None => {
            trace!("fast: block of {} samples is below the minimum, falling back", num_samples);
            return EncodeOutcome::Overflow;
        }
    };

    let history_bins = 1usize << history_bits;
    trace!("fast: encoding {} samples with history_bits={}", num_samples, history_bits);

    let histogram = build_histogram(samples, mono, history_bins);

    let mut rows: Vec<ProbabilityRow> = histogram.iter().map(calculate_probabilities).collect();
    shrink_tables(&mut rows);

    if dest.len() < 3 {
        return EncodeOutcome::Overflow;
    }

    let mut pos = 0;
    dest[pos] = 0x01;
    pos += 1;
    dest[pos] = history_bits as u8;
    pos += 1;
    dest[pos] = MAX_PROBABILITY as u8;
    pos += 1;

    let flat_probs: Vec<u8> = rows.iter().flat_map(|row| row.probs.iter().copied()).collect();
    let mut rle = Vec::new();
    rle_encode_table(&flat_probs, &mut rle);

    if dest.len() < pos + rle.len() {
        return EncodeOutcome::Overflow;
    }
    dest[pos..pos + rle.len()].copy_from_slice(&rle);
    pos += rle.len();

    let end = num_samples.saturating_sub(10);
    let mut rc = RangeEncoder::new();

    let mut ctx0 = 0u8;
    let mut ctx1 = 0u8;
    let mask = (history_bins - 1) as u8;

    for &b in samples {
        if pos >= end {
            debug!("fast: overflow before consuming all {} samples", num_samples);
            return EncodeOutcome::Overflow;
        }

        let row = &rows[ctx0 as usize];
        let cum_low = if b == 0 { 0 } else { row.sums[b as usize - 1] as u32 };
        let freq = row.probs[b as usize] as u32;
        let total = row.sums[255] as u32;

        if !rc.code_symbol(cum_low, freq, total, dest, &mut pos) {
            return EncodeOutcome::Overflow;
        }

        if mono {
            ctx0 = b & mask;
        }
        else {
            ctx0 = ctx1;
            ctx1 = b & mask;
        }
    }

    if !rc.flush(dest, &mut pos) {
        return EncodeOutcome::Overflow;
    }

    if pos < end || end == 0 {
        EncodeOutcome::Coded(pos)
    }
    else {
        EncodeOutcome::Overflow
    }
}
