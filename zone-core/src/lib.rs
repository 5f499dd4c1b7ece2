//! # zone-core
//!
//! Разбор зонного протокола и сборка событий маркетборда для `zone-relay`.
//!
//! Этот крейт содержит:
//!
//! - [`opcode`] — закрытое перечисление опкодов, которые мы понимаем
//! - [`packet`] — разделение сырого пакета на опкод и payload
//! - [`decode`] — декодеры фрагментов и таблица opcode -> декодер
//! - [`correlator`] — журнал запросов к маркетборду и их сборка из фрагментов
//! - [`roles`] — сравнение снапшотов бонусов ролей в рулетках
//! - [`encode`] — сборка пакетов (генератор трафика, тесты)
//! - [`wire`] — формат датаграмм к сервису загрузки
//! - [`types`] — доменные типы
//! - [`error`] — типы ошибок
//!
//! ## Пример: запрос, собранный из одного фрагмента
//!
//! ```rust
//! use std::time::Instant;
//! use zone_core::decode::{decode_fragment, Fragment};
//! use zone_core::{encode, Correlator, Opcode, PacketEvent, RequestStart};
//!
//! let start = RequestStart { item_id: 7, expected_count: 0 };
//! let raw = encode::zone_packet(
//!     Opcode::MarketBoardItemRequestStart,
//!     &encode::request_start_payload(&start),
//! );
//!
//! let ev = PacketEvent::from_raw(&raw).unwrap();
//! let op = Opcode::from_u16(ev.opcode).unwrap();
//! let Fragment::RequestStart(decoded) = decode_fragment(op, ev.payload).unwrap() else {
//!     panic!("expected request start");
//! };
//! assert_eq!(decoded, start);
//!
//! let mut log = Correlator::default();
//! log.begin_request(decoded, Instant::now());
//! assert!(log.get(7).unwrap().is_complete());
//! ```
//!
//! ## Дизайн
//!
//! Здесь нет потоков, сокетов и логирования: только раскладка протокола,
//! чистые декодеры и однопоточные структуры состояния. Владеет ими
//! диспетчер в `zone-relay`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Опкоды зонного протокола.
pub mod opcode;

/// Сырой пакет: опкод + payload.
pub mod packet;

/// Декодеры фрагментов.
pub mod decode;

/// Сборка запросов маркетборда.
pub mod correlator;

/// Диф бонусов ролей.
pub mod roles;

/// Сборка пакетов.
pub mod encode;

/// Wire-формат загрузок.
pub mod wire;

/// Доменные типы.
pub mod types;

/// Ошибки `zone-core`.
pub mod error;

mod reader;

/// Константы раскладки протокола
pub mod constants;

// --- Re-exports (публичный фасад API) ---

pub use crate::correlator::{Correlator, CorrelatorConfig, Evicted, MarketRequest, RequestState};
pub use crate::decode::Fragment;
pub use crate::error::{CorrelateError, DecodeError, WireError};
pub use crate::opcode::Opcode;
pub use crate::packet::PacketEvent;
pub use crate::roles::{RoleChange, RoleDiffer};
pub use crate::types::{
    DutyPop, HistoryBatch, HistoryEntry, Listing, ListingBatch, MarketUpload, Materia,
    RequestStart, RoleSnapshot, TaxSnapshot,
};
pub use crate::reader::UnexpectedEnd;
