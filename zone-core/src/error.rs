use thiserror::Error;

use crate::opcode::Opcode;

/// Ошибки разбора сырых пакетов и payload'ов
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Пакет короче заголовка
    #[error("packet too short: need {need} header bytes, got {got}")]
    PacketTooShort {
        /// Длина заголовка
        need: usize,
        /// Сколько байт пришло
        got: usize,
    },

    /// Payload короче фиксированной раскладки опкода
    #[error("{opcode} payload too short: need {need} bytes, got {got}")]
    PayloadTooShort {
        /// Опкод пакета
        opcode: Opcode,
        /// Минимальная длина payload
        need: usize,
        /// Фактическая длина
        got: usize,
    },

    /// Опкод есть в перечислении, но не в таблице декодеров
    #[error("no decoder registered for {opcode}")]
    NoDecoder {
        /// Опкод без строки в таблице
        opcode: Opcode,
    },

    /// Все слоты фрагмента пустые, ключ предмета взять неоткуда
    #[error("{opcode} fragment carries no entries")]
    EmptyFragment {
        /// Опкод пустого фрагмента
        opcode: Opcode,
    },
}

/// Фрагмент отклонён коррелятором; состояние запроса не менялось
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorrelateError {
    /// Нет подходящего незавершённого запроса
    #[error("market board data arrived without a corresponding request: item#{item_id}")]
    Orphan {
        /// Предмет из фрагмента
        item_id: u32,
    },

    /// Лотов стало бы больше, чем обещано
    #[error("too many market board listings for request: {total} > {expected} item#{item_id}")]
    Overflow {
        /// Предмет
        item_id: u32,
        /// Сколько было бы после слияния
        total: usize,
        /// Сколько обещал сервер
        expected: usize,
    },

    /// Фрагмент из чужого ответа
    #[error("non-matching request ids for item#{item_id}: {established} != {got}")]
    CorrelationMismatch {
        /// Предмет
        item_id: u32,
        /// `request_id`, зафиксированный первым фрагментом
        established: u16,
        /// `request_id` отклонённого фрагмента
        got: u16,
    },

    /// Фрагмент пришёл в недопустимом для протокола порядке
    #[error(
        "market board sequence break for item#{item_id}: \
         request id {request_id:?}, {listings} listings"
    )]
    SequenceBreak {
        /// Предмет
        item_id: u32,
        /// `request_id` запроса на момент отказа
        request_id: Option<u16>,
        /// Сколько лотов уже собрано
        listings: usize,
    },
}

/// Ошибки сериализации
#[derive(Debug, Error)]
pub enum WireError {
    /// Пакет слишком короткий (нет байта версии)
    #[error("packet too short")]
    PacketTooShort,

    /// Неверная версия протокола
    #[error("unsupported wire version: {0}")]
    UnsupportedWireVersion(u8),

    /// Ошибка сериализации/десериализации
    #[error("postcard encode/decode error: {0}")]
    Postcard(#[from] postcard::Error),
}
