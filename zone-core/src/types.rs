use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::ROLE_SLOTS;

/// Материя в сокете лота
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Materia {
    /// Id материи
    pub materia_id: u16,
    /// Грейд, младшие четыре бита
    pub grade: u8,
}

impl Materia {
    /// `0` означает пустой сокет
    pub fn from_raw(raw: u16) -> Option<Self> {
        if raw == 0 {
            return None;
        }
        Some(Self {
            materia_id: (raw & 0xFF0) >> 4,
            grade: (raw & 0xF) as u8,
        })
    }
}

/// Один лот на маркетборде
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    /// Id лота на сервере
    pub listing_id: u64,
    /// Ретейнер, который выставил лот
    pub retainer_id: u64,
    /// Владелец ретейнера
    pub retainer_owner_id: u64,
    /// Крафтер, `0` если неизвестен
    pub artisan_id: u64,
    /// Цена за штуку
    pub price_per_unit: u32,
    /// Налог за весь лот
    pub total_tax: u32,
    /// Количество в стаке
    pub quantity: u32,
    /// Предмет; `0` означает пустой слот
    pub item_id: u32,
    /// Секунд с последнего просмотра лота
    pub last_review_secs: u16,
    /// Контейнер ретейнера
    pub container_id: u16,
    /// Слот внутри контейнера
    pub slot_id: u32,
    /// Прочность
    pub durability: u16,
    /// Spiritbond
    pub spiritbond: u16,
    /// Непустые сокеты, не больше пяти
    pub materia: Vec<Materia>,
    /// Имя ретейнера
    pub retainer_name: String,
    /// Подпись крафтера, может быть пустой
    pub creator_name: String,
    /// HQ-качество
    pub is_hq: bool,
    /// Сколько сокетов занято по словам сервера
    pub materia_count: u8,
    /// Выставлен на манекене
    pub on_mannequin: bool,
    /// Город, где сидит ретейнер
    pub retainer_city_id: u8,
    /// Краска
    pub stain_id: u16,
}

/// Одна запись истории продаж
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Цена продажи за штуку
    pub sale_price: u32,
    /// unix-время покупки, секунды
    pub purchase_time: u32,
    /// Сколько продано
    pub quantity: u32,
    /// HQ-качество
    pub is_hq: bool,
    /// Продано с манекена
    pub on_mannequin: bool,
    /// Имя покупателя
    pub buyer_name: String,
    /// Проданный предмет
    pub item_id: u32,
}

/// Фрагмент с лотами одного ответа сервера
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingBatch {
    /// Ключ запроса, берётся из первого непустого слота
    pub item_id: u32,
    /// Id ответа, которым сервер связывает фрагменты между собой
    pub request_id: u16,
    /// Индекс первого лота фрагмента в общем ответе
    pub index_start: u8,
    /// Индекс после последнего лота
    pub index_end: u8,
    /// Только непустые слоты
    pub listings: Vec<Listing>,
}

/// Фрагмент истории продаж по одному предмету
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryBatch {
    /// Ключ запроса из заголовка фрагмента
    pub item_id: u32,
    /// Только непустые записи
    pub history: Vec<HistoryEntry>,
}

/// Начало запроса к маркетборду
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestStart {
    /// Предмет, который запросили
    pub item_id: u32,
    /// Сколько лотов сервер обещает прислать
    pub expected_count: u8,
}

/// Налоги по городам, проценты
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxSnapshot {
    /// Limsa Lominsa
    pub limsa_lominsa: u32,
    /// Gridania
    pub gridania: u32,
    /// Ul'dah
    pub uldah: u32,
    /// Ishgard
    pub ishgard: u32,
    /// Kugane
    pub kugane: u32,
    /// Crystarium
    pub crystarium: u32,
}

impl fmt::Display for TaxSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "limsa#{} grid#{} uldah#{} ish#{} kugane#{} cr#{}",
            self.limsa_lominsa,
            self.gridania,
            self.uldah,
            self.ishgard,
            self.kugane,
            self.crystarium
        )
    }
}

/// Уведомление от поиска группы
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DutyPop {
    /// Тип уведомления, готовность это `3`
    pub notify_type: u8,
    /// Контент, на который подошла очередь
    pub content_id: u16,
}

impl DutyPop {
    /// Очередь действительно подошла и известен контент
    pub fn is_ready(&self) -> bool {
        self.notify_type == crate::constants::DUTY_POP_READY && self.content_id != 0
    }
}

/// Роли с бонусом по каждой рулетке, слот `i` это рулетка `i + 1`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleSnapshot {
    /// Ключ роли по каждой рулетке
    pub slots: [u8; ROLE_SLOTS],
}

/// Готовый ответ маркетборда по одному предмету
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketUpload {
    /// Предмет
    pub item_id: u32,
    /// Id ответа, общий для всех фрагментов
    pub request_id: u16,
    /// Все лоты в порядке прихода
    pub listings: Vec<Listing>,
    /// История продаж, пришедшая до лотов
    pub history: Vec<HistoryEntry>,
}

impl fmt::Display for MarketUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "item#{} request#{} listings={} history={}",
            self.item_id,
            self.request_id,
            self.listings.len(),
            self.history.len()
        )
    }
}
