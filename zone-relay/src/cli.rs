use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use zone_core::CorrelatorConfig;

use crate::config;
use crate::dispatch::DispatcherConfig;

/// Zone Relay - разбирает захваченный зонный трафик, собирает ответы
/// маркетборда и шлёт их дальше; уведомляет о поп-апах и бонусах рулеток.
#[derive(Parser, Debug, Clone)]
#[command(name = "zone-relay", version, about)]
pub(crate) struct Args {
    /// UDP адрес, на который приходят сырые пакеты (один пакет = одна датаграмма)
    #[arg(long, default_value = config::LISTEN_ADDR)]
    pub(crate) listen: SocketAddr,

    /// Куда слать загрузки маркетборда (UDP). Без него загрузки только логируются
    #[arg(long)]
    pub(crate) upload_target: Option<SocketAddr>,

    /// Полностью отключить сборку и загрузку данных маркетборда
    #[arg(long)]
    pub(crate) opt_out_uploads: bool,

    /// Число потоков доставки
    #[arg(long, default_value = config::DEFAULT_WORKERS,
          value_parser = clap::value_parser!(u16).range(1..=64))]
    pub(crate) workers: u16,

    /// Ёмкость очереди эффектов; при переполнении эффекты отбрасываются
    #[arg(long, default_value = config::DEFAULT_QUEUE_CAPACITY)]
    pub(crate) queue_capacity: usize,

    /// Через сколько секунд простоя запрос маркетборда считается брошенным
    #[arg(long, default_value = config::DEFAULT_REQUEST_TTL_SECS)]
    pub(crate) request_ttl_secs: u64,

    /// Сколько запросов маркетборда держать одновременно
    #[arg(long, default_value = config::DEFAULT_MAX_REQUESTS)]
    pub(crate) max_requests: usize,

    /// Файл имён контента (`id = name`, по одному на строку)
    #[arg(long)]
    pub(crate) content_names: Option<PathBuf>,
}

impl Args {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            bail!("--queue-capacity must be at least 1");
        }
        if self.max_requests == 0 {
            bail!("--max-requests must be at least 1");
        }
        if self.request_ttl_secs == 0 {
            bail!("--request-ttl-secs must be at least 1");
        }
        if let Some(path) = &self.content_names {
            let md = std::fs::metadata(path)
                .with_context(|| format!("content names file not found: {:?}", path))?;
            if !md.is_file() {
                bail!("--content-names must point to a file: {:?}", path);
            }
        }
        Ok(())
    }

    pub(crate) fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            market_uploads: !self.opt_out_uploads,
            correlator: CorrelatorConfig {
                max_requests: self.max_requests,
                idle_timeout: Duration::from_secs(self.request_ttl_secs),
            },
        }
    }
}
