use crate::constants::{HEADER_LEN, OPCODE_OFFSET};
use crate::error::DecodeError;

/// Один пакет из захвата: опкод заголовка и payload после него.
///
/// Живёт ровно один вызов `Dispatcher::handle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketEvent<'a> {
    /// Сырой код; неизвестные коды допустимы
    pub opcode: u16,
    /// Байты после заголовка
    pub payload: &'a [u8],
}

impl<'a> PacketEvent<'a> {
    /// Событие из уже разделённых кода и payload
    pub fn new(opcode: u16, payload: &'a [u8]) -> Self {
        Self { opcode, payload }
    }

    /// Делит сырой пакет на заголовок и payload
    pub fn from_raw(raw: &'a [u8]) -> Result<Self, DecodeError> {
        if raw.len() < HEADER_LEN {
            return Err(DecodeError::PacketTooShort {
                need: HEADER_LEN,
                got: raw.len(),
            });
        }
        let opcode = u16::from_le_bytes([raw[OPCODE_OFFSET], raw[OPCODE_OFFSET + 1]]);
        Ok(Self {
            opcode,
            payload: &raw[HEADER_LEN..],
        })
    }
}
