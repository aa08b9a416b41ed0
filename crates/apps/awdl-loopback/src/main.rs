use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use styrene_awdl::{AwdlConfig, AwdlInterface, AwdlManager, LoopbackLinks};

#[derive(Parser, Debug)]
#[command(
    name = "awdl-loopback",
    about = "Push frames through AWDL interfaces backed by loopback links"
)]
struct Args {
    /// TOML config declaring the interfaces to bring up.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Interface created when the config declares none.
    #[arg(long, default_value = "awdl0")]
    name: String,

    #[arg(long, default_value = "aa:bb")]
    local: String,

    #[arg(long, default_value = "cc:dd")]
    remote: String,

    /// Frames pushed through each interface.
    #[arg(long, default_value_t = 8)]
    frames: usize,

    #[arg(long, default_value_t = 256)]
    frame_len: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => AwdlConfig::from_path(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => AwdlConfig::default(),
    };
    if args.frame_len > config.effective_mtu() {
        bail!("frame_len {} exceeds mtu {}", args.frame_len, config.effective_mtu());
    }

    let links = Arc::new(LoopbackLinks::from_config(&config));
    let manager = AwdlManager::new(config, links);

    let mut interfaces =
        manager.create_configured().context("failed to create configured interfaces")?;
    if interfaces.is_empty() {
        interfaces.push(
            manager
                .create(&args.name, &args.local, &args.remote)
                .with_context(|| format!("failed to create interface {}", args.name))?,
        );
    }

    let mut result = Ok(());
    for interface in &interfaces {
        match exercise(interface, args.frames, args.frame_len).await {
            Ok(()) => {
                let peer = interface.peer().map(|peer| peer.to_string()).unwrap_or_default();
                println!("{}: {} frames echoed, peer {}", interface.name(), args.frames, peer);
            }
            Err(err) => {
                log::error!("{}: {:#}", interface.name(), err);
                result = Err(err);
                break;
            }
        }
    }

    let stopped = manager.shutdown_all().await;
    log::info!("stopped {} interface(s)", stopped);

    result
}

async fn exercise(
    interface: &AwdlInterface,
    frames: usize,
    frame_len: usize,
) -> anyhow::Result<()> {
    for seq in 0..frames {
        let frame: Vec<u8> = (0..frame_len).map(|i| (seq + i) as u8).collect();

        interface.send_inbound(&frame).await.context("inbound write")?;
        let echoed = interface.recv_outbound().await.context("outbound read")?;

        if echoed != frame {
            bail!("frame {} came back altered ({} bytes)", seq, echoed.len());
        }
    }
    Ok(())
}
