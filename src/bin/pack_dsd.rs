// Symphonia
// Copyright (c) 2019-2024 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![forbid(unsafe_code)]

//! A small demonstration harness for `symphonia-codec-wavpack-dsd`: packs a raw DSD byte stream
//! (or a synthesized impulse test buffer) block-by-block and reports the compression ratio
//! achieved in each mode. Not part of the crate's public API.

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use log::info;

use symphonia_codec_wavpack_dsd::{DsdStream, PackDsdConfig};

#[derive(Parser)]
#[command(name = "pack-dsd", about = "Pack a raw DSD byte stream and report compression ratio")]
struct Cli {
    /// Raw DSD input file (one byte per 8 samples, MSB-first). If omitted, a synthetic impulse
    /// test buffer is used instead.
    input: Option<PathBuf>,

    /// Samples per block.
    #[arg(long, default_value_t = 4096)]
    block_samples: usize,

    /// Treat the input as interleaved stereo (L, R, L, R, ...) rather than mono.
    #[arg(long)]
    stereo: bool,

    /// Use the adaptive high-mode encoder instead of the static fast-mode encoder.
    #[arg(long)]
    high: bool,
}

fn synthetic_impulse_buffer(len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    if let Some(first) = buf.first_mut() {
        *first = 0x80;
    }
    buf
}

fn main() {
    pretty_env_logger::init();

    let cli = Cli::parse();

    let samples = match &cli.input {
        Some(path) => fs::read(path).unwrap_or_else(|err| {
            eprintln!("failed to read {}: {}", path.display(), err);
            std::process::exit(1);
        }),
        None => synthetic_impulse_buffer(cli.block_samples * if cli.stereo { 2 } else { 1 }),
    };

    let config = PackDsdConfig { high_mode: cli.high };
    let mut stream = DsdStream::new();

    let frame_stride = cli.block_samples * if cli.stereo { 2 } else { 1 };
    let mut total_in = 0usize;
    let mut total_out = 0usize;
    let mut blocks = 0usize;

    for block in samples.chunks(frame_stride) {
        let mut dest = vec![0u8; block.len() + 64];

        match stream.pack_block(block, !cli.stereo, 6, &mut dest, &config) {
            Ok(Some(packed)) => {
                total_in += block.len();
                total_out += packed.chunk_bytes;
                blocks += 1;
                info!(
                    "block {}: {} samples -> {} bytes (chunk {} bytes)",
                    blocks,
                    block.len(),
                    packed.data_count,
                    packed.chunk_bytes
                );
            }
            Ok(None) => {}
            Err(err) => {
                eprintln!("pack_block failed: {}", err);
                std::process::exit(1);
            }
        }
    }

    if total_in == 0 {
        println!("no samples packed");
        return;
    }

    println!(
        "{} blocks, {} input bytes -> {} output bytes (ratio {:.3})",
        blocks,
        total_in,
        total_out,
        total_out as f64 / total_in as f64
    );
}
