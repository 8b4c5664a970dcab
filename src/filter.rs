// Symphonia
// Copyright (c) 2019-2024 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The per-channel six-tap noise-shaping IIR filter used by high-mode encoding.

use crate::ptable::PTABLE_BITS;

pub const PRECISION: u32 = 24;
pub const VALUE_ONE: i32 = 1 << PRECISION;
pub const PRECISION_USE: u32 = 12;

/// Per-channel filter state: six 32-bit accumulators plus a 16-bit signed `factor`.
#[derive(Clone, Copy)]
pub struct DsdFilterState {
    pub filter1: i32,
    pub filter2: i32,
    pub filter3: i32,
    pub filter4: i32,
    pub filter5: i32,
    pub filter6: i32,
    /// Logically 16-bit signed; kept widened to `i32` to match the arithmetic it participates in.
    pub factor: i32,
}

impl Default for DsdFilterState {
    /// Cold-start state for the first block of a stream.
    fn default() -> Self {
        DsdFilterState {
            filter1: VALUE_ONE / 2,
            filter2: VALUE_ONE / 2,
            filter3: VALUE_ONE / 2,
            filter4: VALUE_ONE / 2,
            filter5: VALUE_ONE / 2,
            filter6: 0,
            factor: 0,
        }
    }
}

impl DsdFilterState {
    /// Quantises the filter to the byte-wide anchors that will be written to the block header,
    /// so the encoder's state exactly matches what a decoder reconstructs from that header.
    ///
    /// Returns the five high-byte filter anchors and the sign-extended 16-bit `factor`, in the
    /// order they must be written: `(f1, f2, f3, f4, f5, factor)`.
    pub fn quantize_for_header(&mut self) -> ([u8; 5], i16) {
        let anchor = |f: i32| -> u8 { ((f + 32768) >> 16) as u8 };

        let anchors = [
            anchor(self.filter1),
            anchor(self.filter2),
            anchor(self.filter3),
            anchor(self.filter4),
            anchor(self.filter5),
        ];

        let factor = self.factor as i16;

        self.filter1 = (anchors[0] as i32) << 16;
        self.filter2 = (anchors[1] as i32) << 16;
        self.filter3 = (anchors[2] as i32) << 16;
        self.filter4 = (anchors[3] as i32) << 16;
        self.filter5 = (anchors[4] as i32) << 16;
        self.filter6 = 0;
        self.factor = factor as i32;

        (anchors, factor)
    }

    /// Computes this bit's p-table index from the current filter state, before the bit itself
    /// is known.
    #[inline(always)]
    pub fn ptable_index(&self) -> usize {
        let value = self.raw_value();
        ((value >> (PRECISION - PRECISION_USE)) & ((1 << PTABLE_BITS) - 1)) as usize
    }

    /// `filter1 - filter5 + filter6 * (factor >> 2)`, the shared predictor value. Wrapping, as
    /// the original's 32-bit `int` arithmetic is expected to silently overflow here.
    #[inline(always)]
    fn raw_value(&self) -> i32 {
        self.filter1.wrapping_sub(self.filter5).wrapping_add(self.filter6.wrapping_mul(self.factor >> 2))
    }

    /// Applies the per-bit filter and `factor` update once `bit` is known, then the shared
    /// post-step that advances filter3 through filter6.
    #[inline(always)]
    pub fn update(&mut self, bit: bool) {
        let value = self.raw_value().wrapping_add(self.filter6 << 3);

        let crossed = (value ^ value.wrapping_sub(self.filter6 << 4)) < 0;

        if bit {
            self.filter1 = self.filter1.wrapping_add((VALUE_ONE - self.filter1) >> 6);
            self.filter2 = self.filter2.wrapping_add((VALUE_ONE - self.filter2) >> 4);
            if crossed {
                self.factor = self.factor.wrapping_sub((value >> 31) | 1);
            }
        }
        else {
            self.filter1 -= self.filter1 >> 6;
            self.filter2 -= self.filter2 >> 4;
            if crossed {
                self.factor = self.factor.wrapping_add((value >> 31) | 1);
            }
        }

        self.filter3 += (self.filter2 - self.filter3) >> 4;
        self.filter4 += (self.filter3 - self.filter4) >> 4;
        let t = (self.filter4 - self.filter5) >> 4;
        self.filter5 += t;
        self.filter6 += (t - self.filter6) >> 3;
    }
}
