use std::time::Duration;

pub(crate) const LISTEN_ADDR: &str = "127.0.0.1:7755";

/// Тик чтения сокета захвата: с этой частотой проверяем shutdown
pub(crate) const RECV_TICK: Duration = Duration::from_millis(200);

/// Максимальный размер UDP датаграммы
pub(crate) const MAX_DATAGRAM: usize = 65_536;

/// Как часто диспетчер чистит брошенные запросы
pub(crate) const SWEEP_INTERVAL: Duration = Duration::from_secs(5);

pub(crate) const DEFAULT_WORKERS: &str = "2";
pub(crate) const DEFAULT_QUEUE_CAPACITY: &str = "256";
pub(crate) const DEFAULT_REQUEST_TTL_SECS: &str = "120";
pub(crate) const DEFAULT_MAX_REQUESTS: &str = "256";
