//! Константы раскладки зонного протокола (наблюдаемая версия).

/// Размер заголовка сырого пакета
pub const HEADER_LEN: usize = 0x10;

/// Смещение опкода (`u16` LE) внутри заголовка
pub const OPCODE_OFFSET: usize = 2;

/// Сколько слотов под роли в снапшоте рулеток
pub const ROLE_SLOTS: usize = 10;

/// Слотов лотов в одном фрагменте `MarketBoardOfferings`
pub const LISTINGS_PER_FRAGMENT: usize = 10;

/// Размер одного слота лота
pub const LISTING_SLOT_LEN: usize = 152;

/// Слотов истории в одном фрагменте `MarketBoardHistory`
pub const HISTORY_PER_FRAGMENT: usize = 10;

/// Размер одного слота истории
pub const HISTORY_SLOT_LEN: usize = 52;

// Минимальные длины payload по опкодам

/// `CfNotifyPop`
pub const DUTY_POP_LEN: usize = 22;
/// `CfPreferredRole`: байт-префикс и слоты
pub const ROLE_BONUS_LEN: usize = 1 + ROLE_SLOTS;
/// `MarketTaxRates`: восемь байт заголовка и шесть ставок
pub const TAX_RATES_LEN: usize = 8 + 6 * 4;
/// `MarketBoardItemRequestStart`
pub const REQUEST_START_LEN: usize = 0x0C;
/// `MarketBoardOfferings`: слоты и хвост из индексов и `request_id`
pub const OFFERINGS_LEN: usize = LISTINGS_PER_FRAGMENT * LISTING_SLOT_LEN + 4;
/// `MarketBoardHistory`: два `item_id` и слоты
pub const HISTORY_LEN: usize = 8 + HISTORY_PER_FRAGMENT * HISTORY_SLOT_LEN;

/// `notify_type`, при котором очередь действительно подошла
pub const DUTY_POP_READY: u8 = 3;

// Строковые поля: UTF-8 с NUL-дополнением

/// Имена ретейнера и крафтера
pub const NAME_LEN: usize = 32;
/// Имя покупателя в истории
pub const BUYER_NAME_LEN: usize = 33;

/// Сокетов под материю в лоте
pub const MATERIA_SOCKETS: usize = 5;
