//! Mux a raw H.264 Annex-B file into a playable FLV file.
//!
//! Usage: flv_file_writer <input.h264> <output.flv> [width height]
//!
//! Runs the full publish path over the in-memory transport, then prepends
//! the FLV file header and writes the collected tag stream to disk.

use std::fs;
use std::path::PathBuf;

use flvpipe::publish::{nal_units, NaluType, Publisher};
use flvpipe::transport::MemoryTransport;

const FRAME_INTERVAL_MS: u32 = 40; // 25 fps

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("flvpipe=info".parse()?),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let input: PathBuf = args.next().ok_or("missing input path")?.into();
    let output: PathBuf = args.next().ok_or("missing output path")?.into();
    let width: u32 = args.next().map(|a| a.parse()).transpose()?.unwrap_or(0);
    let height: u32 = args.next().map(|a| a.parse()).transpose()?.unwrap_or(0);

    let stream = fs::read(&input)?;

    let handle = MemoryTransport::new();
    let mut publisher = Publisher::new(handle.clone());
    publisher.connect("mem://file").await?;
    publisher.send_metadata(width, height, false).await?;

    let mut sps: Option<Vec<u8>> = None;
    let mut pps: Option<Vec<u8>> = None;
    let mut pts = 0u32;
    let mut frames = 0u64;

    for unit in nal_units(&stream) {
        if unit.is_empty() {
            continue;
        }
        match NaluType::from_byte(unit[0]) {
            NaluType::Sps => sps = Some(unit.to_vec()),
            NaluType::Pps => pps = Some(unit.to_vec()),
            NaluType::Sei => {}
            kind => {
                if !publisher.header_sent() {
                    match (&sps, &pps) {
                        (Some(sps), Some(pps)) => {
                            publisher.send_avc_sequence_header(sps, pps).await?;
                        }
                        _ => continue, // no parameter sets seen yet
                    }
                }
                publisher.send_video(unit, pts, kind.is_keyframe()).await?;
                pts += FRAME_INTERVAL_MS;
                frames += 1;
            }
        }
    }
    publisher.disconnect().await;

    // FLV file header: signature, version 1, video-only flags, header size,
    // then the zero previous-tag-size that precedes the first tag.
    let mut out = Vec::with_capacity(13);
    out.extend_from_slice(b"FLV\x01\x01\x00\x00\x00\x09");
    out.extend_from_slice(&0u32.to_be_bytes());
    out.extend_from_slice(&handle.written_stream());
    fs::write(&output, &out)?;

    println!(
        "{} -> {}: {} frames, {} bytes",
        input.display(),
        output.display(),
        frames,
        out.len()
    );
    Ok(())
}
