use serde::{Deserialize, Serialize};

use crate::error::WireError;
use crate::types::{MarketUpload, TaxSnapshot};

/// Текущая версия формата загрузки
pub const WIRE_VERSION: u8 = 1;

/// Датаграмма к сервису загрузки
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UploadPacketV1 {
    /// Собранный ответ маркетборда
    Listings(MarketUpload),
    /// Снапшот налогов
    Tax(TaxSnapshot),
}

/// `[версия][postcard]`
pub fn encode_v1(pkt: &UploadPacketV1) -> Result<Vec<u8>, WireError> {
    let mut out = Vec::new();
    out.push(WIRE_VERSION);
    out.extend_from_slice(&postcard::to_allocvec(pkt)?);
    Ok(out)
}

/// Проверяет версию и разбирает payload
pub fn decode(buf: &[u8]) -> Result<UploadPacketV1, WireError> {
    let (&ver, payload) = buf.split_first().ok_or(WireError::PacketTooShort)?;
    if ver != WIRE_VERSION {
        return Err(WireError::UnsupportedWireVersion(ver));
    }
    Ok(postcard::from_bytes(payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tax_packet_survives_the_wire() {
        let pkt = UploadPacketV1::Tax(TaxSnapshot {
            limsa_lominsa: 5,
            gridania: 5,
            uldah: 3,
            ishgard: 0,
            kugane: 5,
            crystarium: 3,
        });
        let bytes = encode_v1(&pkt).unwrap();
        assert_eq!(bytes[0], WIRE_VERSION);
        assert_eq!(decode(&bytes).unwrap(), pkt);
    }

    #[test]
    fn decode_rejects_empty_and_foreign_versions() {
        assert!(matches!(decode(&[]), Err(WireError::PacketTooShort)));
        assert!(matches!(
            decode(&[9, 0, 0]),
            Err(WireError::UnsupportedWireVersion(9))
        ));
    }

    #[test]
    fn decode_rejects_garbage_payload() {
        assert!(matches!(decode(&[WIRE_VERSION]), Err(WireError::Postcard(_))));
    }
}
