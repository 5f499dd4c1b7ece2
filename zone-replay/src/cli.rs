use std::net::{SocketAddr, ToSocketAddrs};

use anyhow::{Result, bail};
use clap::Parser;

use crate::generator::GeneratorConfig;

/// Zone Replay - генерирует правдоподобный зонный трафик и шлёт его в zone-relay.
///
/// Каждый раунд: налоги, снапшот ролей, иногда поп-ап, и по запросу
/// маркетборда на каждый предмет (старт, история, лоты).
#[derive(Parser, Debug, Clone)]
#[command(name = "zone-replay", version, about)]
pub(crate) struct Args {
    /// UDP адрес zone-relay, например 127.0.0.1:7755
    #[arg(long, default_value = "127.0.0.1:7755")]
    pub(crate) target: String,

    /// Сколько предметов запрашивать за раунд
    #[arg(long, default_value = "5", value_parser = clap::value_parser!(u32).range(1..=1000))]
    pub(crate) items: u32,

    /// Пауза между пакетами, мс
    #[arg(long, default_value = "20")]
    pub(crate) interval_ms: u64,

    /// Число раундов; 0 = до Ctrl+C
    #[arg(long, default_value = "1")]
    pub(crate) rounds: u64,

    /// Доля предметов, по которым отправляются битые или лишние фрагменты (0.0..=1.0)
    #[arg(long, default_value = "0.0")]
    pub(crate) malformed_ratio: f64,

    /// Seed для воспроизводимого трафика
    #[arg(long)]
    pub(crate) seed: Option<u64>,
}

impl Args {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.target.trim().is_empty() {
            bail!("--target is empty");
        }
        if !self.target.contains(':') {
            bail!("--target must look like HOST:PORT (got: {})", self.target);
        }
        if !(0.0..=1.0).contains(&self.malformed_ratio) {
            bail!(
                "--malformed-ratio must be within 0.0..=1.0 (got: {})",
                self.malformed_ratio
            );
        }
        Ok(())
    }

    pub(crate) fn target_socket_addr(&self) -> std::io::Result<SocketAddr> {
        // Берём первый результат резолвинга
        self.target
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses resolved")
            })
    }

    pub(crate) fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            items_per_round: self.items,
            malformed_ratio: self.malformed_ratio,
            ..GeneratorConfig::default()
        }
    }
}
