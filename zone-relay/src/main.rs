//! Точка входа `zone-relay`.
//!
//! Жизненный цикл:
//! - парсинг CLI, выбор потребителей (UDP-загрузка или dry run, уведомления в stdout)
//! - запуск пула воркеров доставки
//! - цикл приёма захваченных пакетов; диспетчер живёт в главном потоке
//! - по `Ctrl+C` цикл выходит, очередь закрывается, воркеры дорабатывают и выходят

mod capture;
mod cli;
mod config;
mod dispatch;
mod forward;
mod names;
mod sinks;

use std::net::UdpSocket;
use std::sync::{Arc, atomic::AtomicBool, atomic::Ordering};

use anyhow::Context;
use clap::Parser;
use log::{info, warn};

use crate::dispatch::Dispatcher;
use crate::forward::Sinks;
use crate::names::{ContentNames, NoContentNames};
use crate::sinks::{LogNotifier, LogUploader, UdpUploader, UploadSink};

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

    let names: Arc<dyn ContentNames> = match &args.content_names {
        Some(path) => {
            let table = names::read_content_names_from_path(path)
                .with_context(|| format!("read content names {:?}", path))?;
            info!("loaded {} content names", table.len());
            Arc::new(table)
        }
        None => Arc::new(NoContentNames),
    };

    let uploader: Arc<dyn UploadSink> = match args.upload_target {
        Some(target) => Arc::new(
            UdpUploader::bind(target).with_context(|| format!("bind uploader for {target}"))?,
        ),
        None => Arc::new(LogUploader),
    };

    let sinks = Sinks {
        uploader,
        notifier: Arc::new(LogNotifier),
        names,
    };

    info!(
        "Starting zone-relay: listen={}, upload_target={:?}, market_uploads={}, workers={}",
        args.listen,
        args.upload_target,
        !args.opt_out_uploads,
        args.workers
    );

    let (tx, rx) = crossbeam_channel::bounded(args.queue_capacity);
    let workers = forward::spawn_workers(usize::from(args.workers), rx, sinks)?;

    let sock = UdpSocket::bind(args.listen)
        .with_context(|| format!("bind capture socket {}", args.listen))?;

    let mut dispatcher = Dispatcher::new(args.dispatcher_config(), tx);
    let result = capture::run_capture_receiver(sock, &mut dispatcher, shutdown.clone());

    shutdown.store(true, Ordering::Relaxed);
    info!(
        "dispatch stats: {}; {} requests still pending",
        dispatcher.stats(),
        dispatcher.pending_requests()
    );
    // закрываем очередь: воркеры доработают остаток и выйдут
    drop(dispatcher);

    for h in workers {
        if let Err(panic) = h.join() {
            warn!("forward worker panicked: {:?}", panic);
        }
    }

    result
}
