use anyhow::Result;
use clap::Parser;

use voxwire_audio::DEFAULT_QUEUE_CAPACITY;
use voxwire_foundation::{
    AudioFormat, DEFAULT_BITS_PER_SAMPLE, DEFAULT_CHANNELS, DEFAULT_SAMPLE_RATE_HZ,
};

mod runtime;
use runtime::RuntimeOptions;

#[derive(Parser, Debug)]
#[command(
    name = "voxwire",
    about = "Microphone capture bridged to a telephony media stream",
    version
)]
struct Cli {
    /// Input device name (system default input when omitted)
    #[arg(long)]
    device: Option<String>,

    #[arg(long, default_value_t = DEFAULT_SAMPLE_RATE_HZ)]
    sample_rate_hz: u32,

    #[arg(long, default_value_t = DEFAULT_BITS_PER_SAMPLE)]
    bits_per_sample: u16,

    #[arg(long, default_value_t = DEFAULT_CHANNELS)]
    channels: u16,

    /// Frame queue capacity for the capture session
    #[arg(long, default_value_t = DEFAULT_QUEUE_CAPACITY)]
    queue_capacity: usize,

    /// Session identifier bound into outbound envelopes
    #[arg(long, default_value = "voxwire-local")]
    stream_sid: String,

    /// Write outbound media envelopes as JSON lines on stdout
    #[arg(long)]
    emit_envelopes: bool,
}

fn init_logging() {
    // Envelopes go to stdout, so logs go to stderr
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    tracing::info!("Starting voxwire");

    let opts = RuntimeOptions {
        device: cli.device,
        format: AudioFormat::new(cli.sample_rate_hz, cli.bits_per_sample, cli.channels),
        queue_capacity: cli.queue_capacity,
        stream_sid: cli.stream_sid,
        emit_envelopes: cli.emit_envelopes,
    };
    runtime::run(opts).await
}
