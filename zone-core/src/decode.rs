//! Декодеры фрагментов: по одной чистой функции на опкод.
//!
//! Каждая функция сначала проверяет, что payload не короче фиксированной
//! раскладки, и только потом читает поля. Частичного разбора не бывает.

use crate::constants::{
    BUYER_NAME_LEN, DUTY_POP_LEN, HISTORY_LEN, HISTORY_PER_FRAGMENT, LISTING_SLOT_LEN,
    LISTINGS_PER_FRAGMENT, MATERIA_SOCKETS, NAME_LEN, OFFERINGS_LEN, REQUEST_START_LEN,
    ROLE_BONUS_LEN, ROLE_SLOTS, TAX_RATES_LEN,
};
use crate::error::DecodeError;
use crate::opcode::Opcode;
use crate::reader::{ByteReader, UnexpectedEnd};
use crate::types::{
    DutyPop, HistoryBatch, HistoryEntry, Listing, ListingBatch, Materia, RequestStart,
    RoleSnapshot, TaxSnapshot,
};

/// Разобранный payload, по варианту на опкод
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// `CfNotifyPop`
    DutyPop(DutyPop),
    /// `CfPreferredRole`
    RoleBonus(RoleSnapshot),
    /// `MarketTaxRates`
    TaxRates(TaxSnapshot),
    /// `MarketBoardItemRequestStart`
    RequestStart(RequestStart),
    /// `MarketBoardOfferings`
    Offerings(ListingBatch),
    /// `MarketBoardHistory`
    History(HistoryBatch),
}

/// Чистая функция payload -> фрагмент
pub type DecodeFn = fn(&[u8]) -> Result<Fragment, DecodeError>;

/// Строка таблицы диспетчеризации
#[derive(Clone, Copy)]
pub struct DecoderEntry {
    /// Опкод, которому принадлежит строка
    pub opcode: Opcode,
    /// Минимальная длина payload
    pub min_len: usize,
    /// Сам декодер
    pub decode: DecodeFn,
}

/// opcode -> декодер. Новое сообщение протокола = новая строка здесь
/// и вариант в [`Fragment`].
pub static DECODERS: [DecoderEntry; 6] = [
    DecoderEntry {
        opcode: Opcode::CfNotifyPop,
        min_len: DUTY_POP_LEN,
        decode: duty_pop_fragment,
    },
    DecoderEntry {
        opcode: Opcode::CfPreferredRole,
        min_len: ROLE_BONUS_LEN,
        decode: role_bonus_fragment,
    },
    DecoderEntry {
        opcode: Opcode::MarketTaxRates,
        min_len: TAX_RATES_LEN,
        decode: tax_rates_fragment,
    },
    DecoderEntry {
        opcode: Opcode::MarketBoardItemRequestStart,
        min_len: REQUEST_START_LEN,
        decode: request_start_fragment,
    },
    DecoderEntry {
        opcode: Opcode::MarketBoardOfferings,
        min_len: OFFERINGS_LEN,
        decode: offerings_fragment,
    },
    DecoderEntry {
        opcode: Opcode::MarketBoardHistory,
        min_len: HISTORY_LEN,
        decode: history_fragment,
    },
];

fn duty_pop_fragment(p: &[u8]) -> Result<Fragment, DecodeError> {
    decode_duty_pop(p).map(Fragment::DutyPop)
}

fn role_bonus_fragment(p: &[u8]) -> Result<Fragment, DecodeError> {
    decode_role_bonus(p).map(Fragment::RoleBonus)
}

fn tax_rates_fragment(p: &[u8]) -> Result<Fragment, DecodeError> {
    decode_tax_rates(p).map(Fragment::TaxRates)
}

fn request_start_fragment(p: &[u8]) -> Result<Fragment, DecodeError> {
    decode_request_start(p).map(Fragment::RequestStart)
}

fn offerings_fragment(p: &[u8]) -> Result<Fragment, DecodeError> {
    decode_offerings(p).map(Fragment::Offerings)
}

fn history_fragment(p: &[u8]) -> Result<Fragment, DecodeError> {
    decode_history(p).map(Fragment::History)
}

/// Строка таблицы для опкода, если есть
pub fn decoder_for(opcode: Opcode) -> Option<&'static DecoderEntry> {
    DECODERS.iter().find(|e| e.opcode == opcode)
}

/// Разбирает payload известного опкода
pub fn decode_fragment(opcode: Opcode, payload: &[u8]) -> Result<Fragment, DecodeError> {
    match decoder_for(opcode) {
        Some(entry) => (entry.decode)(payload),
        None => Err(DecodeError::NoDecoder { opcode }),
    }
}

fn ensure_len(opcode: Opcode, payload: &[u8], need: usize) -> Result<(), DecodeError> {
    if payload.len() < need {
        return Err(DecodeError::PayloadTooShort {
            opcode,
            need,
            got: payload.len(),
        });
    }
    Ok(())
}

fn truncated(opcode: Opcode, need: usize, got: usize) -> impl Fn(UnexpectedEnd) -> DecodeError {
    move |_| DecodeError::PayloadTooShort { opcode, need, got }
}

/// `notify_type` в нулевом байте, `content_id` по смещению 20
pub fn decode_duty_pop(payload: &[u8]) -> Result<DutyPop, DecodeError> {
    let op = Opcode::CfNotifyPop;
    ensure_len(op, payload, DUTY_POP_LEN)?;
    let err = truncated(op, DUTY_POP_LEN, payload.len());

    let mut r = ByteReader::new(payload);
    let notify_type = r.read_u8().map_err(&err)?;
    r.seek(20).map_err(&err)?;
    let content_id = r.read_u16().map_err(&err)?;

    Ok(DutyPop {
        notify_type,
        content_id,
    })
}

/// Слоты ролей лежат в байтах `1..=10`
pub fn decode_role_bonus(payload: &[u8]) -> Result<RoleSnapshot, DecodeError> {
    ensure_len(Opcode::CfPreferredRole, payload, ROLE_BONUS_LEN)?;

    let mut slots = [0u8; ROLE_SLOTS];
    slots.copy_from_slice(&payload[1..=ROLE_SLOTS]);
    Ok(RoleSnapshot { slots })
}

/// Первые восемь байт пропускаются, дальше ставки по городам
pub fn decode_tax_rates(payload: &[u8]) -> Result<TaxSnapshot, DecodeError> {
    let op = Opcode::MarketTaxRates;
    ensure_len(op, payload, TAX_RATES_LEN)?;
    let err = truncated(op, TAX_RATES_LEN, payload.len());

    let mut r = ByteReader::new(payload);
    r.skip(8).map_err(&err)?;
    Ok(TaxSnapshot {
        limsa_lominsa: r.read_u32().map_err(&err)?,
        gridania: r.read_u32().map_err(&err)?,
        uldah: r.read_u32().map_err(&err)?,
        ishgard: r.read_u32().map_err(&err)?,
        kugane: r.read_u32().map_err(&err)?,
        crystarium: r.read_u32().map_err(&err)?,
    })
}

/// `item_id` в начале, `expected_count` по смещению `0x0B`
pub fn decode_request_start(payload: &[u8]) -> Result<RequestStart, DecodeError> {
    let op = Opcode::MarketBoardItemRequestStart;
    ensure_len(op, payload, REQUEST_START_LEN)?;
    let err = truncated(op, REQUEST_START_LEN, payload.len());

    let mut r = ByteReader::new(payload);
    let item_id = r.read_u32().map_err(&err)?;
    r.seek(0x0B).map_err(&err)?;
    let expected_count = r.read_u8().map_err(&err)?;

    Ok(RequestStart {
        item_id,
        expected_count,
    })
}

fn read_listing(r: &mut ByteReader<'_>) -> Result<Listing, UnexpectedEnd> {
    let listing_id = r.read_u64()?;
    let retainer_id = r.read_u64()?;
    let retainer_owner_id = r.read_u64()?;
    let artisan_id = r.read_u64()?;
    let price_per_unit = r.read_u32()?;
    let total_tax = r.read_u32()?;
    let quantity = r.read_u32()?;
    let item_id = r.read_u32()?;
    let last_review_secs = r.read_u16()?;
    let container_id = r.read_u16()?;
    let slot_id = r.read_u32()?;
    let durability = r.read_u16()?;
    let spiritbond = r.read_u16()?;

    let mut materia = Vec::new();
    for _ in 0..MATERIA_SOCKETS {
        if let Some(m) = Materia::from_raw(r.read_u16()?) {
            materia.push(m);
        }
    }
    r.skip(2 + 4)?;

    let retainer_name = r.read_fixed_str(NAME_LEN)?;
    let creator_name = r.read_fixed_str(NAME_LEN)?;
    let is_hq = r.read_bool()?;
    let materia_count = r.read_u8()?;
    let on_mannequin = r.read_bool()?;
    let retainer_city_id = r.read_u8()?;
    let stain_id = r.read_u16()?;
    r.skip(2 + 4)?;

    Ok(Listing {
        listing_id,
        retainer_id,
        retainer_owner_id,
        artisan_id,
        price_per_unit,
        total_tax,
        quantity,
        item_id,
        last_review_secs,
        container_id,
        slot_id,
        durability,
        spiritbond,
        materia,
        retainer_name,
        creator_name,
        is_hq,
        materia_count,
        on_mannequin,
        retainer_city_id,
        stain_id,
    })
}

/// Пустые слоты (item_id == 0) пропускаются; ключ предмета берётся из первого лота
pub fn decode_offerings(payload: &[u8]) -> Result<ListingBatch, DecodeError> {
    let op = Opcode::MarketBoardOfferings;
    ensure_len(op, payload, OFFERINGS_LEN)?;
    let err = truncated(op, OFFERINGS_LEN, payload.len());

    let mut r = ByteReader::new(payload);
    let mut listings = Vec::with_capacity(LISTINGS_PER_FRAGMENT);
    for slot in 0..LISTINGS_PER_FRAGMENT {
        debug_assert_eq!(r.position(), slot * LISTING_SLOT_LEN);
        let listing = read_listing(&mut r).map_err(&err)?;
        if listing.item_id != 0 {
            listings.push(listing);
        }
    }
    let index_end = r.read_u8().map_err(&err)?;
    let index_start = r.read_u8().map_err(&err)?;
    let request_id = r.read_u16().map_err(&err)?;

    let item_id = match listings.first() {
        Some(l) => l.item_id,
        None => return Err(DecodeError::EmptyFragment { opcode: op }),
    };

    Ok(ListingBatch {
        item_id,
        request_id,
        index_start,
        index_end,
        listings,
    })
}

fn read_history(r: &mut ByteReader<'_>) -> Result<HistoryEntry, UnexpectedEnd> {
    let sale_price = r.read_u32()?;
    let purchase_time = r.read_u32()?;
    let quantity = r.read_u32()?;
    let is_hq = r.read_bool()?;
    r.skip(1)?;
    let on_mannequin = r.read_bool()?;
    let buyer_name = r.read_fixed_str(BUYER_NAME_LEN)?;
    let item_id = r.read_u32()?;

    Ok(HistoryEntry {
        sale_price,
        purchase_time,
        quantity,
        is_hq,
        on_mannequin,
        buyer_name,
        item_id,
    })
}

/// Ключ предмета берётся из заголовка фрагмента; пустая история допустима
pub fn decode_history(payload: &[u8]) -> Result<HistoryBatch, DecodeError> {
    let op = Opcode::MarketBoardHistory;
    ensure_len(op, payload, HISTORY_LEN)?;
    let err = truncated(op, HISTORY_LEN, payload.len());

    let mut r = ByteReader::new(payload);
    let item_id = r.read_u32().map_err(&err)?;
    r.skip(4).map_err(&err)?;

    let mut history = Vec::with_capacity(HISTORY_PER_FRAGMENT);
    for _ in 0..HISTORY_PER_FRAGMENT {
        let entry = read_history(&mut r).map_err(&err)?;
        if entry.item_id != 0 {
            history.push(entry);
        }
    }

    Ok(HistoryBatch { item_id, history })
}
