use std::net::UdpSocket;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::Instant;

use log::{debug, info};

use crate::config::{MAX_DATAGRAM, RECV_TICK};
use crate::dispatch::Dispatcher;

/// Приём захваченных пакетов: одна датаграмма = один сырой зонный пакет.
///
/// Диспетчер живёт в этом потоке, других писателей у его состояния нет.
pub(crate) fn run_capture_receiver(
    sock: UdpSocket,
    dispatcher: &mut Dispatcher,
    shutdown: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    sock.set_read_timeout(Some(RECV_TICK))?;
    info!("capture feed listening on {}", sock.local_addr()?);

    let mut buf = vec![0u8; MAX_DATAGRAM];

    loop {
        if shutdown.load(Ordering::Relaxed) {
            info!("shutting down capture receiver...");
            break Ok(());
        }

        match sock.recv_from(&mut buf) {
            Ok((n, src)) => {
                debug!("{n} bytes from {src}");
                dispatcher.handle_raw(&buf[..n]);
            }
            Err(e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                // тик: заодно чистим брошенные запросы
                dispatcher.maybe_sweep(Instant::now());
            }
            Err(e) => break Err(e.into()),
        }
    }
}
