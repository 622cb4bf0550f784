//! Split a synthetic H.264 stream across several consumers
//!
//! Run with: cargo run --example split_stream -- [CHANNELS] [GOPS] [GOP_LEN]
//!
//! Examples:
//!   cargo run --example split_stream                # 3 channels, 10 GOPs of 30 frames
//!   cargo run --example split_stream -- 5 2         # undersupplied: 3 channels stay idle
//!   RUST_LOG=gopsplit=debug cargo run --example split_stream
//!
//! Each channel is backed by a bounded mpsc queue and drained by its own task,
//! standing in for an independent decode pipeline. When the stream ends, every
//! consumer prints the contiguous PTS range it received.

use bytes::Bytes;
use gopsplit::{AccessUnit, ChannelEvent, GopSplitter, MpscSink, SplitterConfig};

const FRAME_DURATION_NS: u64 = 33_333_333;

fn parse_arg(args: &[String], pos: usize, default: usize) -> usize {
    args.get(pos).and_then(|s| s.parse().ok()).unwrap_or(default)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();
    let channels = parse_arg(&args, 1, 3);
    let gops = parse_arg(&args, 2, 10);
    let gop_len = parse_arg(&args, 3, 30).max(1);

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("gopsplit=info".parse()?)
                .add_directive("split_stream=info".parse()?),
        )
        .init();

    let config = SplitterConfig::default().channel_capacity(16);
    let sink = MpscSink::with_config(&config);
    let splitter = GopSplitter::with_config(sink, config);

    let mut consumers = Vec::with_capacity(channels);
    for _ in 0..channels {
        let index = splitter.request_channel(None).await?;
        let name = index.name(&splitter.config().channel_prefix);
        let mut rx = splitter.sink().attach(index).await;

        consumers.push(tokio::spawn(async move {
            let mut frames = 0usize;
            let mut keyframes = 0usize;
            let mut range: Option<(u64, u64)> = None;

            while let Some(event) = rx.recv().await {
                let ChannelEvent::Unit(unit) = event else {
                    break;
                };
                frames += 1;
                if unit.is_keyframe {
                    keyframes += 1;
                }
                range = Some(match range {
                    Some((first, _)) => (first, unit.pts),
                    None => (unit.pts, unit.pts),
                });
            }

            match range {
                Some((first, last)) => println!(
                    "{}: {} frames, {} GOPs, pts {:.3}s..{:.3}s",
                    name,
                    frames,
                    keyframes,
                    first as f64 / 1e9,
                    last as f64 / 1e9
                ),
                None => println!("{}: no data", name),
            }
        }));
    }

    // Synthetic stream: a keyframe every `gop_len` frames
    for frame in 0..gops * gop_len {
        let pts = frame as u64 * FRAME_DURATION_NS;
        let unit = if frame % gop_len == 0 {
            AccessUnit::keyframe(pts, Bytes::from(vec![0x65; 1200]))
        } else {
            AccessUnit::delta(pts, Bytes::from(vec![0x41; 300]))
        };
        splitter.on_unit_arrived(unit).await?;
    }

    match splitter.on_stream_end().await {
        Ok(report) => tracing::info!(
            gops = report.gop_count(),
            units = report.units_pushed(),
            idle = report.idle_channels,
            "Stream split"
        ),
        Err(e) => {
            tracing::error!(error = %e, "Split failed");
            // NoData sends no end of stream, close the queues so consumers exit
            for index in splitter.live_channels().await {
                splitter.sink().detach(index).await;
            }
        }
    }

    for consumer in consumers {
        consumer.await?;
    }

    let stats = splitter.stats().await;
    println!(
        "ingested {} units, pushed {}, dropped {}",
        stats.units_ingested, stats.units_pushed, stats.units_dropped
    );

    Ok(())
}
