use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use zone_core::constants::{HISTORY_PER_FRAGMENT, LISTINGS_PER_FRAGMENT, ROLE_SLOTS};
use zone_core::{
    DutyPop, HistoryEntry, Listing, Materia, Opcode, RequestStart, RoleSnapshot, TaxSnapshot,
    encode,
};

#[derive(Debug, Clone)]
pub(crate) struct GeneratorConfig {
    pub(crate) items_per_round: u32,
    /// Максимум лотов на запрос
    pub(crate) max_listings: u8,
    /// Максимум записей истории на запрос
    pub(crate) max_history: usize,
    /// Вероятность поп-апа за раунд
    pub(crate) duty_pop_chance: f64,
    /// Вероятность смены бонуса в каждом слоте рулетки
    pub(crate) role_change_chance: f64,
    /// Доля предметов с битыми фрагментами
    pub(crate) malformed_ratio: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            items_per_round: 5,
            max_listings: 25,
            max_history: 20,
            duty_pop_chance: 0.2,
            role_change_chance: 0.1,
            malformed_ratio: 0.0,
        }
    }
}

/// Как испортить ответ по предмету
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fault {
    /// Обрезанный фрагмент лотов
    Truncated,
    /// Второй фрагмент с чужим request_id
    ForeignRequestId,
    /// Лоты без старта запроса
    MissingStart,
    /// История после лотов
    LateHistory,
}

pub(crate) struct TrafficGenerator {
    cfg: GeneratorConfig,
    rng: StdRng,
    roles: [u8; ROLE_SLOTS],
    next_request_id: u16,
}

impl TrafficGenerator {
    pub(crate) fn new(cfg: GeneratorConfig, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_os_rng(),
        };
        Self {
            cfg,
            rng,
            roles: [0; ROLE_SLOTS],
            next_request_id: 1,
        }
    }

    /// Сырые пакеты одного раунда в порядке отправки
    pub(crate) fn next_round(&mut self) -> Vec<Vec<u8>> {
        let mut out = Vec::new();

        out.push(encode::zone_packet(
            Opcode::MarketTaxRates,
            &encode::tax_rates_payload(&self.tax_rates()),
        ));

        for slot in self.roles.iter_mut() {
            if self.rng.random_bool(self.cfg.role_change_chance) {
                *slot = self.rng.random_range(0..=4);
            }
        }
        out.push(encode::zone_packet(
            Opcode::CfPreferredRole,
            &encode::role_bonus_payload(&RoleSnapshot { slots: self.roles }),
        ));

        if self.rng.random_bool(self.cfg.duty_pop_chance) {
            let pop = DutyPop {
                notify_type: 3,
                content_id: self.rng.random_range(1..900),
            };
            out.push(encode::zone_packet(
                Opcode::CfNotifyPop,
                &encode::duty_pop_payload(&pop),
            ));
        }

        for _ in 0..self.cfg.items_per_round {
            let item_id = self.rng.random_range(1..40_000);
            let fault = if self.rng.random_bool(self.cfg.malformed_ratio) {
                Some(self.pick_fault())
            } else {
                None
            };
            self.push_item(&mut out, item_id, fault);
        }

        out
    }

    fn pick_fault(&mut self) -> Fault {
        match self.rng.random_range(0..4) {
            0 => Fault::Truncated,
            1 => Fault::ForeignRequestId,
            2 => Fault::MissingStart,
            _ => Fault::LateHistory,
        }
    }

    fn push_item(&mut self, out: &mut Vec<Vec<u8>>, item_id: u32, fault: Option<Fault>) {
        let expected_count = self.rng.random_range(1..=self.cfg.max_listings.max(1));
        let request_id = self.next_request_id;
        self.next_request_id = self.next_request_id.wrapping_add(1).max(1);

        if fault != Some(Fault::MissingStart) {
            out.push(encode::zone_packet(
                Opcode::MarketBoardItemRequestStart,
                &encode::request_start_payload(&RequestStart {
                    item_id,
                    expected_count,
                }),
            ));
        }

        let history_len = self.rng.random_range(0..=self.cfg.max_history);
        let history: Vec<_> = (0..history_len).map(|_| self.sale(item_id)).collect();
        let history_packets: Vec<_> = history
            .chunks(HISTORY_PER_FRAGMENT)
            .map(|chunk| {
                encode::zone_packet(
                    Opcode::MarketBoardHistory,
                    &encode::history_payload(item_id, chunk),
                )
            })
            .collect();
        if fault != Some(Fault::LateHistory) {
            out.extend(history_packets.iter().cloned());
        }

        let listings: Vec<_> = (0..u64::from(expected_count))
            .map(|n| self.listing(item_id, n))
            .collect();
        for (i, chunk) in listings.chunks(LISTINGS_PER_FRAGMENT).enumerate() {
            let rid = match fault {
                Some(Fault::ForeignRequestId) if i > 0 => request_id.wrapping_add(1000),
                _ => request_id,
            };
            let index_start = (i * LISTINGS_PER_FRAGMENT) as u8;
            let mut payload = encode::offerings_payload(rid, index_start, chunk);
            if fault == Some(Fault::Truncated) && i == 0 {
                payload.truncate(payload.len() / 2);
            }
            out.push(encode::zone_packet(Opcode::MarketBoardOfferings, &payload));
        }

        if fault == Some(Fault::LateHistory) {
            out.extend(history_packets);
        }
    }

    fn tax_rates(&mut self) -> TaxSnapshot {
        let mut rate = || self.rng.random_range(0..=5);
        TaxSnapshot {
            limsa_lominsa: rate(),
            gridania: rate(),
            uldah: rate(),
            ishgard: rate(),
            kugane: rate(),
            crystarium: rate(),
        }
    }

    fn listing(&mut self, item_id: u32, n: u64) -> Listing {
        let price_per_unit = self.rng.random_range(10..200_000);
        let materia_count = self.rng.random_range(0..=2u8);
        let materia = (0..materia_count)
            .map(|_| Materia {
                materia_id: self.rng.random_range(1..40),
                grade: self.rng.random_range(0..10),
            })
            .collect();

        Listing {
            listing_id: self.rng.random(),
            retainer_id: self.rng.random(),
            retainer_owner_id: self.rng.random(),
            artisan_id: 0,
            price_per_unit,
            total_tax: price_per_unit / 20,
            quantity: self.rng.random_range(1..=99),
            item_id,
            last_review_secs: self.rng.random_range(0..3600),
            container_id: 10_000,
            slot_id: n as u32,
            durability: 30_000,
            spiritbond: 0,
            materia,
            retainer_name: format!("Retainer{}", self.rng.random_range(1..500)),
            creator_name: String::new(),
            is_hq: self.rng.random_bool(0.3),
            materia_count,
            on_mannequin: false,
            retainer_city_id: self.rng.random_range(1..=7),
            stain_id: 0,
        }
    }

    fn sale(&mut self, item_id: u32) -> HistoryEntry {
        HistoryEntry {
            sale_price: self.rng.random_range(10..200_000),
            purchase_time: 1_600_000_000 + self.rng.random_range(0..10_000_000),
            quantity: self.rng.random_range(1..=99),
            is_hq: self.rng.random_bool(0.3),
            on_mannequin: false,
            buyer_name: format!("Buyer {}", self.rng.random_range(1..10_000)),
            item_id,
        }
    }
}
