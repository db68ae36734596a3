//! In-process loopback demo
//!
//! Run with: cargo run --example loopback [CHUNK_DIR]
//!
//! Creates a stream, joins one listener, and has a producer task append a
//! synthetic tone for a few seconds with a one-second rollover. The listener
//! prints every push it receives and fetches each chunk as it is announced.
//! Chunks are written under CHUNK_DIR (default: ./audio_chunks).

use std::sync::Arc;
use std::time::Duration;

use audio_relay::server::RelayConfig;
use audio_relay::{ChannelTransport, ListenerId, PushEvent, Relay};
use bytes::Bytes;

/// 20 ms of 16-bit mono PCM at 44.1 kHz
const FRAME_SAMPLES: usize = 882;

fn tone_frame(index: usize) -> Bytes {
    let mut data = Vec::with_capacity(FRAME_SAMPLES * 2);
    for n in 0..FRAME_SAMPLES {
        let t = (index * FRAME_SAMPLES + n) as f32 / 44_100.0;
        let sample = ((t * 440.0 * std::f32::consts::TAU).sin() * 8_000.0) as i16;
        data.extend_from_slice(&sample.to_le_bytes());
    }
    Bytes::from(data)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("audio_relay=info".parse()?)
                .add_directive("loopback=info".parse()?),
        )
        .init();

    let chunk_dir = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "audio_chunks".to_string());

    let transport = Arc::new(ChannelTransport::new());
    let config = RelayConfig::default()
        .rollover_threshold(Duration::from_secs(1))
        .local_storage(&chunk_dir);
    let relay = Relay::open(config, transport.clone()).await?;

    let stream_id = relay.create_stream().await;
    println!("Created stream {}", stream_id);

    let listener = ListenerId::new("loopback-listener");
    let mut events = transport.connect(listener.clone()).await;
    let backfill = relay.join(&stream_id, listener.clone()).await?;
    println!(
        "Joined stream. Live: {}, Chunks: {}",
        backfill.is_live,
        backfill.chunks.len()
    );

    let consumer = {
        let relay = relay.clone();
        tokio::spawn(async move {
            let mut live_bytes = 0usize;
            while let Some(event) = events.recv().await {
                match event {
                    PushEvent::AudioFrame { data, .. } => live_bytes += data.len(),
                    PushEvent::ChunkReady { chunk } => match relay.fetch(&chunk.key).await {
                        Ok(bytes) => println!(
                            "chunk_ready {} ({} bytes fetched, {} live bytes so far)",
                            chunk,
                            bytes.len(),
                            live_bytes
                        ),
                        Err(e) => eprintln!("Failed to fetch {}: {}", chunk, e),
                    },
                    PushEvent::JoinError { message } => eprintln!("join_error: {}", message),
                }
            }
        })
    };

    let mut ticker = tokio::time::interval(Duration::from_millis(20));
    for index in 0..150 {
        ticker.tick().await;
        relay.append_audio(&stream_id, tone_frame(index)).await?;
    }
    relay.end_stream(&stream_id).await?;

    let stats = relay.stream_stats(&stream_id).await?;
    println!(
        "Stream ended: {} appends, {} bytes, {} chunks persisted",
        stats.appends, stats.bytes_appended, stats.chunks_persisted
    );

    relay.disconnect(&listener).await;
    consumer.await?;

    Ok(())
}
