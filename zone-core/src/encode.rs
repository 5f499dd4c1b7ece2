//! Сборка пакетов зонного протокола.
//!
//! Обратная сторона декодеров: нужна генератору трафика `zone-replay` и тестам.
//! Раскладка та же, что в [`crate::decode`]; лишние записи сверх вместимости
//! фрагмента отбрасываются, поэтому длинные списки режьте через `chunks`.

use crate::constants::{
    BUYER_NAME_LEN, DUTY_POP_LEN, HEADER_LEN, HISTORY_LEN, HISTORY_PER_FRAGMENT, LISTING_SLOT_LEN,
    LISTINGS_PER_FRAGMENT, MATERIA_SOCKETS, NAME_LEN, OFFERINGS_LEN, OPCODE_OFFSET,
    REQUEST_START_LEN, ROLE_BONUS_LEN, TAX_RATES_LEN,
};
use crate::opcode::Opcode;
use crate::types::{
    DutyPop, HistoryEntry, Listing, Materia, RequestStart, RoleSnapshot, TaxSnapshot,
};

struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    fn with_len(len: usize) -> Self {
        Self {
            buf: Vec::with_capacity(len),
        }
    }

    fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn bool(&mut self, v: bool) {
        self.buf.push(u8::from(v));
    }

    fn u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn zeros(&mut self, n: usize) {
        self.buf.resize(self.buf.len() + n, 0);
    }

    /// Строка с NUL-дополнением; длинная обрезается по ширине поля
    fn fixed_str(&mut self, s: &str, width: usize) {
        let bytes = s.as_bytes();
        let n = bytes.len().min(width);
        self.buf.extend_from_slice(&bytes[..n]);
        self.zeros(width - n);
    }

    /// Дополняет нулями до `len` (минимальная длина payload)
    fn finish(mut self, len: usize) -> Vec<u8> {
        if self.buf.len() < len {
            self.buf.resize(len, 0);
        }
        self.buf
    }
}

/// Сырой пакет: 16-байтный заголовок с опкодом + payload
pub fn raw_packet(opcode: u16, payload: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; HEADER_LEN];
    out[OPCODE_OFFSET..OPCODE_OFFSET + 2].copy_from_slice(&opcode.to_le_bytes());
    out.extend_from_slice(payload);
    out
}

/// То же, что [`raw_packet`], для известного опкода
pub fn zone_packet(opcode: Opcode, payload: &[u8]) -> Vec<u8> {
    raw_packet(opcode.code(), payload)
}

/// Payload `CfNotifyPop`
pub fn duty_pop_payload(pop: &DutyPop) -> Vec<u8> {
    let mut w = ByteWriter::with_len(DUTY_POP_LEN);
    w.u8(pop.notify_type);
    w.zeros(19);
    w.u16(pop.content_id);
    w.finish(DUTY_POP_LEN)
}

/// Payload `CfPreferredRole`, нулевой байт-префикс
pub fn role_bonus_payload(snapshot: &RoleSnapshot) -> Vec<u8> {
    let mut w = ByteWriter::with_len(ROLE_BONUS_LEN);
    w.u8(0);
    for &slot in &snapshot.slots {
        w.u8(slot);
    }
    w.finish(ROLE_BONUS_LEN)
}

/// Payload `MarketTaxRates`, заголовок заполняется нулями
pub fn tax_rates_payload(tax: &TaxSnapshot) -> Vec<u8> {
    let mut w = ByteWriter::with_len(TAX_RATES_LEN);
    w.zeros(8);
    for rate in [
        tax.limsa_lominsa,
        tax.gridania,
        tax.uldah,
        tax.ishgard,
        tax.kugane,
        tax.crystarium,
    ] {
        w.u32(rate);
    }
    w.finish(TAX_RATES_LEN)
}

/// Payload `MarketBoardItemRequestStart`
pub fn request_start_payload(start: &RequestStart) -> Vec<u8> {
    let mut w = ByteWriter::with_len(REQUEST_START_LEN);
    w.u32(start.item_id);
    w.zeros(7);
    w.u8(start.expected_count);
    w.finish(REQUEST_START_LEN)
}

fn materia_raw(m: &Materia) -> u16 {
    ((m.materia_id & 0xFF) << 4) | u16::from(m.grade & 0xF)
}

fn put_listing(w: &mut ByteWriter, l: &Listing) {
    w.u64(l.listing_id);
    w.u64(l.retainer_id);
    w.u64(l.retainer_owner_id);
    w.u64(l.artisan_id);
    w.u32(l.price_per_unit);
    w.u32(l.total_tax);
    w.u32(l.quantity);
    w.u32(l.item_id);
    w.u16(l.last_review_secs);
    w.u16(l.container_id);
    w.u32(l.slot_id);
    w.u16(l.durability);
    w.u16(l.spiritbond);
    for i in 0..MATERIA_SOCKETS {
        w.u16(l.materia.get(i).map(materia_raw).unwrap_or(0));
    }
    w.zeros(2 + 4);
    w.fixed_str(&l.retainer_name, NAME_LEN);
    w.fixed_str(&l.creator_name, NAME_LEN);
    w.bool(l.is_hq);
    w.u8(l.materia_count);
    w.bool(l.on_mannequin);
    w.u8(l.retainer_city_id);
    w.u16(l.stain_id);
    w.zeros(2 + 4);
}

/// Фрагмент `MarketBoardOfferings`; берутся первые 10 лотов, остальные слоты пустые
pub fn offerings_payload(request_id: u16, index_start: u8, listings: &[Listing]) -> Vec<u8> {
    let mut w = ByteWriter::with_len(OFFERINGS_LEN);
    let n = listings.len().min(LISTINGS_PER_FRAGMENT);
    for l in &listings[..n] {
        put_listing(&mut w, l);
    }
    w.zeros((LISTINGS_PER_FRAGMENT - n) * LISTING_SLOT_LEN);
    w.u8(index_start.saturating_add(n as u8));
    w.u8(index_start);
    w.u16(request_id);
    w.finish(OFFERINGS_LEN)
}

fn put_history(w: &mut ByteWriter, h: &HistoryEntry) {
    w.u32(h.sale_price);
    w.u32(h.purchase_time);
    w.u32(h.quantity);
    w.bool(h.is_hq);
    w.u8(0);
    w.bool(h.on_mannequin);
    w.fixed_str(&h.buyer_name, BUYER_NAME_LEN);
    w.u32(h.item_id);
}

/// Фрагмент `MarketBoardHistory`; берутся первые 10 записей
pub fn history_payload(item_id: u32, history: &[HistoryEntry]) -> Vec<u8> {
    let mut w = ByteWriter::with_len(HISTORY_LEN);
    w.u32(item_id);
    w.u32(item_id);
    for h in history.iter().take(HISTORY_PER_FRAGMENT) {
        put_history(&mut w, h);
    }
    w.finish(HISTORY_LEN)
}
