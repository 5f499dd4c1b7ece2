//! Точка входа `zone-replay`.
//!
//! Жизненный цикл:
//! - парсинг CLI и резолвинг адреса zone-relay
//! - генерация раундов трафика и отправка по UDP, пакет за пакетом
//! - корректная остановка по `Ctrl+C`

mod cli;
mod generator;

use std::net::{SocketAddr, UdpSocket};
use std::sync::{Arc, atomic::AtomicBool, atomic::Ordering};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use log::{debug, info};

use crate::generator::TrafficGenerator;

const TICK_RATE_MS: u64 = 200;

fn main() -> anyhow::Result<()> {
    // Логи через RUST_LOG=info/trace
    env_logger::init();

    let shutdown = Arc::new(AtomicBool::new(false));

    // Ctrl+C => ставим shutdown=true
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || {
            shutdown.store(true, Ordering::Relaxed);
            info!("shutting down...");
        })?;
    }

    let args = cli::Args::parse();
    args.validate()?;

    let target = args
        .target_socket_addr()
        .with_context(|| format!("resolve {}", args.target))?;
    let local = if target.is_ipv4() {
        SocketAddr::from(([0, 0, 0, 0], 0))
    } else {
        SocketAddr::from(([0u16; 8], 0))
    };
    let sock = UdpSocket::bind(local).context("bind replay socket")?;

    info!(
        "Starting zone-replay: target={}, items={}, rounds={}, malformed_ratio={}",
        target, args.items, args.rounds, args.malformed_ratio
    );

    let mut generator = TrafficGenerator::new(args.generator_config(), args.seed);
    let interval = Duration::from_millis(args.interval_ms);

    let mut round: u64 = 0;
    let mut sent: usize = 0;
    while !shutdown.load(Ordering::Relaxed) && (args.rounds == 0 || round < args.rounds) {
        for raw in generator.next_round() {
            if shutdown.load(Ordering::Relaxed) {
                break;
            }
            sock.send_to(&raw, target)?;
            sent += 1;
            sleep_interruptible(interval, &shutdown);
        }
        round += 1;
        debug!("round {round} done");
    }

    info!("sent {sent} packets in {round} rounds");
    Ok(())
}

fn sleep_interruptible(interval: Duration, shutdown: &AtomicBool) {
    let tick = Duration::from_millis(TICK_RATE_MS);
    let mut slept = Duration::ZERO;
    while slept < interval && !shutdown.load(Ordering::Relaxed) {
        let step = (interval - slept).min(tick);
        std::thread::sleep(step);
        slept += step;
    }
}
