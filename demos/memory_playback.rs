//! Drive the playback pipeline against a scripted in-memory stream.
//!
//! Usage: memory_playback [packet_count]

use std::time::Duration;

use flvpipe::player::{Player, PlayerState};
use flvpipe::transport::{MemoryTransport, PACKET_TYPE_VIDEO};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("flvpipe=debug".parse()?),
        )
        .init();

    let count: u32 = std::env::args()
        .nth(1)
        .map(|a| a.parse())
        .transpose()?
        .unwrap_or(50);

    let handle = MemoryTransport::new();
    for i in 0..count {
        handle.push_packet(PACKET_TYPE_VIDEO, i * 40, &[0x27, 0x01, i as u8]);
    }
    handle.push_eof();

    let mut player = Player::new(handle);
    player.set_packet_callback(|pkt| {
        println!("packet kind={:?} pts={} len={}", pkt.kind, pkt.pts, pkt.len());
    });
    player.set_event_callback(|event, status| {
        println!("event {:?}: {:?}", event, status);
    });

    player.open("mem://demo").await?;
    player.play();

    while player.state() != PlayerState::Stopped {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    player.stop().await;
    player.close().await;
    Ok(())
}
