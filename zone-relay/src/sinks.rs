//! Внешние потребители: сервис загрузки и уведомления пользователю.
//!
//! Все вызовы идут из потоков [`crate::forward`], никогда из диспетчера.

use std::io;
use std::net::{SocketAddr, UdpSocket};

use log::{debug, info};
use thiserror::Error;
use zone_core::wire::{UploadPacketV1, encode_v1};
use zone_core::{MarketUpload, TaxSnapshot, WireError};

#[derive(Debug, Error)]
pub(crate) enum SinkError {
    #[error("sink io error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Wire(#[from] WireError),

    /// Потребитель ответил отказом
    #[error("sink rejected: {0}")]
    Rejected(String),
}

pub(crate) trait UploadSink: Send + Sync {
    fn upload_listings(&self, upload: &MarketUpload) -> Result<(), SinkError>;

    fn upload_tax(&self, tax: &TaxSnapshot) -> Result<(), SinkError>;
}

pub(crate) trait Notifier: Send + Sync {
    fn notify(&self, message: &str) -> Result<(), SinkError>;
}

/// Шлёт каждую загрузку отдельной датаграммой `[version][postcard]`
pub(crate) struct UdpUploader {
    sock: UdpSocket,
    target: SocketAddr,
}

impl UdpUploader {
    pub(crate) fn bind(target: SocketAddr) -> io::Result<Self> {
        let local: SocketAddr = if target.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };
        let sock = UdpSocket::bind(local)?;
        Ok(Self { sock, target })
    }

    fn send(&self, pkt: &UploadPacketV1) -> Result<(), SinkError> {
        let bytes = encode_v1(pkt)?;
        let sent = self.sock.send_to(&bytes, self.target)?;
        if sent != bytes.len() {
            return Err(SinkError::Rejected(format!(
                "short datagram: {sent} of {} bytes",
                bytes.len()
            )));
        }
        debug!("uploaded {} bytes to {}", sent, self.target);
        Ok(())
    }
}

impl UploadSink for UdpUploader {
    fn upload_listings(&self, upload: &MarketUpload) -> Result<(), SinkError> {
        self.send(&UploadPacketV1::Listings(upload.clone()))
    }

    fn upload_tax(&self, tax: &TaxSnapshot) -> Result<(), SinkError> {
        self.send(&UploadPacketV1::Tax(*tax))
    }
}

/// Без адреса загрузки: только пишем в лог, что ушло бы наружу
pub(crate) struct LogUploader;

impl UploadSink for LogUploader {
    fn upload_listings(&self, upload: &MarketUpload) -> Result<(), SinkError> {
        info!("market board upload (dry run): {upload}");
        Ok(())
    }

    fn upload_tax(&self, tax: &TaxSnapshot) -> Result<(), SinkError> {
        info!("tax rates upload (dry run): {tax}");
        Ok(())
    }
}

/// Печатает уведомления в stdout
pub(crate) struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) -> Result<(), SinkError> {
        debug!("notify: {message}");
        println!("{message}");
        Ok(())
    }
}
