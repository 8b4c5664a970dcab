// Symphonia
// Copyright (c) 2019-2024 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `error` module defines the error type returned by this crate's fallible entry points.

use std::fmt;
use std::result;

/// `Error` enumerates the ways packing a DSD block can fail.
///
/// Encoder overflow is *not* one of these: it is a deterministic, expected outcome (see
/// [`crate::EncodeOutcome`]) handled internally by falling back to verbatim, never surfaced here.
#[derive(Debug)]
pub enum Error {
    /// The caller-supplied destination buffer cannot hold even the framer's fixed overhead
    /// (the metadata tag, length, and `dsd_power` byte), so no payload of any kind could be
    /// written.
    DestinationTooSmall(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Error::DestinationTooSmall(desc) => write!(f, "destination buffer too small: {}", desc),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = result::Result<T, Error>;

/// Convenience function to create a destination-too-small error.
pub fn destination_too_small_error<T>(desc: &'static str) -> Result<T> {
    Err(Error::DestinationTooSmall(desc))
}
