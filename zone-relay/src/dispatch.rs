//! Единственная точка входа для пакетов из захвата.
//!
//! `handle` вызывается строго по порядку прихода и только из одного потока.
//! Разбор и изменение состояния (журнал запросов, снапшот ролей) происходят
//! синхронно внутри вызова; всё, что должно выйти наружу, уходит как [`Effect`]
//! в очередь к воркерам через `try_send` и не тормозит следующий пакет.

use std::fmt;
use std::time::Instant;

use crossbeam_channel::{Sender, TrySendError};
use log::{debug, error, info, trace, warn};
use zone_core::decode::decode_fragment;
use zone_core::{
    CorrelateError, Correlator, CorrelatorConfig, Evicted, Fragment, MarketUpload, Opcode,
    PacketEvent, RoleChange, RoleDiffer, TaxSnapshot,
};

use crate::config::SWEEP_INTERVAL;

/// Единица работы для воркеров
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Effect {
    UploadListings(MarketUpload),
    UploadTax(TaxSnapshot),
    DutyPop { content_id: u16 },
    RoleBonus(Vec<RoleChange>),
}

#[derive(Debug, Clone)]
pub(crate) struct DispatcherConfig {
    /// `false` = opt-out: весь маркетборд (лоты, история, налоги) игнорируется
    pub(crate) market_uploads: bool,
    pub(crate) correlator: CorrelatorConfig,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            market_uploads: true,
            correlator: CorrelatorConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct DispatchStats {
    pub(crate) handled: u64,
    pub(crate) ignored: u64,
    pub(crate) decode_errors: u64,
    pub(crate) rejected: u64,
    pub(crate) effects_queued: u64,
    pub(crate) effects_dropped: u64,
}

impl fmt::Display for DispatchStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "handled={} ignored={} decode_errors={} rejected={} effects_queued={} effects_dropped={}",
            self.handled,
            self.ignored,
            self.decode_errors,
            self.rejected,
            self.effects_queued,
            self.effects_dropped
        )
    }
}

pub(crate) struct Dispatcher {
    correlator: Correlator,
    roles: RoleDiffer,
    market_uploads: bool,
    effects: Sender<Effect>,
    stats: DispatchStats,
    last_sweep: Instant,
}

impl Dispatcher {
    pub(crate) fn new(cfg: DispatcherConfig, effects: Sender<Effect>) -> Self {
        Self {
            correlator: Correlator::new(cfg.correlator),
            roles: RoleDiffer::new(),
            market_uploads: cfg.market_uploads,
            effects,
            stats: DispatchStats::default(),
            last_sweep: Instant::now(),
        }
    }

    pub(crate) fn stats(&self) -> DispatchStats {
        self.stats
    }

    pub(crate) fn pending_requests(&self) -> usize {
        self.correlator.len()
    }

    /// Сырой пакет из захвата
    pub(crate) fn handle_raw(&mut self, raw: &[u8]) {
        match PacketEvent::from_raw(raw) {
            Ok(ev) => self.handle(ev),
            Err(e) => {
                self.stats.decode_errors += 1;
                warn!("dropping packet: {e}");
            }
        }
    }

    pub(crate) fn handle(&mut self, ev: PacketEvent<'_>) {
        self.handle_at(ev, Instant::now());
    }

    pub(crate) fn handle_at(&mut self, ev: PacketEvent<'_>, now: Instant) {
        self.maybe_sweep(now);

        let Some(opcode) = Opcode::from_u16(ev.opcode) else {
            self.stats.ignored += 1;
            trace!("ignoring opcode 0x{:04X}", ev.opcode);
            return;
        };

        if opcode.is_market() && !self.market_uploads {
            self.stats.ignored += 1;
            return;
        }

        let fragment = match decode_fragment(opcode, ev.payload) {
            Ok(f) => f,
            Err(e) => {
                self.stats.decode_errors += 1;
                warn!("dropping fragment: {e}");
                return;
            }
        };
        self.stats.handled += 1;

        match self.apply(fragment, now) {
            Ok(Some(effect)) => self.enqueue(effect),
            Ok(None) => {}
            Err(e) => {
                self.stats.rejected += 1;
                error!("{e}");
            }
        }
    }

    /// Синхронная часть: меняет состояние и решает, нужен ли внешний эффект
    fn apply(
        &mut self,
        fragment: Fragment,
        now: Instant,
    ) -> Result<Option<Effect>, CorrelateError> {
        match fragment {
            Fragment::DutyPop(pop) => {
                if !pop.is_ready() {
                    trace!(
                        "duty finder notify type {} content {}",
                        pop.notify_type, pop.content_id
                    );
                    return Ok(None);
                }
                Ok(Some(Effect::DutyPop {
                    content_id: pop.content_id,
                }))
            }
            Fragment::RoleBonus(snapshot) => {
                let changes = self.roles.diff(snapshot);
                for c in &changes {
                    debug!(
                        "CfPreferredRole: {} - {} => {}",
                        c.roulette_index(),
                        c.previous,
                        c.current
                    );
                }
                if changes.is_empty() {
                    return Ok(None);
                }
                Ok(Some(Effect::RoleBonus(changes)))
            }
            Fragment::TaxRates(tax) => {
                debug!("MarketTaxRates: {tax}");
                Ok(Some(Effect::UploadTax(tax)))
            }
            Fragment::RequestStart(start) => {
                debug!(
                    "new market board request: item#{} amount#{}",
                    start.item_id, start.expected_count
                );
                match self.correlator.begin_request(start, now) {
                    Some(Evicted::Superseded(old)) => debug!(
                        "request for item#{} superseded with {}/{} listings",
                        old.item_id(),
                        old.listings().len(),
                        old.expected_count()
                    ),
                    Some(Evicted::Capacity(old)) => warn!(
                        "request log full; evicted stale request for item#{}",
                        old.item_id()
                    ),
                    None => {}
                }
                Ok(None)
            }
            Fragment::Offerings(batch) => {
                let (item_id, request_id) = (batch.item_id, batch.request_id);
                let count = batch.listings.len();
                let done = self.correlator.merge_listings(batch, now)?;
                trace!("added {count} listings to request#{request_id}, item#{item_id}");
                match done {
                    Some(upload) => {
                        info!("market board request finished, starting upload: {upload}");
                        Ok(Some(Effect::UploadListings(upload)))
                    }
                    None => {
                        if let Some(r) = self.correlator.get(item_id) {
                            debug!(
                                "request#{request_id} item#{item_id}: {}/{}",
                                r.listings().len(),
                                r.expected_count()
                            );
                        }
                        Ok(None)
                    }
                }
            }
            Fragment::History(batch) => {
                let item_id = batch.item_id;
                self.correlator.merge_history(batch, now)?;
                debug!("added history for item#{item_id}");
                Ok(None)
            }
        }
    }

    fn enqueue(&mut self, effect: Effect) {
        match self.effects.try_send(effect) {
            Ok(()) => self.stats.effects_queued += 1,
            Err(TrySendError::Full(e)) => {
                self.stats.effects_dropped += 1;
                warn!("forwarding queue full; dropping {}", effect_kind(&e));
            }
            Err(TrySendError::Disconnected(e)) => {
                self.stats.effects_dropped += 1;
                warn!("forwarding workers gone; dropping {}", effect_kind(&e));
            }
        }
    }

    /// Чистка брошенных запросов, не чаще раза в `SWEEP_INTERVAL`
    pub(crate) fn maybe_sweep(&mut self, now: Instant) {
        if now.saturating_duration_since(self.last_sweep) < SWEEP_INTERVAL {
            return;
        }
        self.sweep(now);
    }

    pub(crate) fn sweep(&mut self, now: Instant) {
        self.last_sweep = now;
        let evicted = self.correlator.evict_idle(now);
        if evicted > 0 {
            debug!("evicted {evicted} idle market board requests");
        }
    }
}

fn effect_kind(effect: &Effect) -> &'static str {
    match effect {
        Effect::UploadListings(_) => "listings upload",
        Effect::UploadTax(_) => "tax upload",
        Effect::DutyPop { .. } => "duty pop",
        Effect::RoleBonus(_) => "role bonus change",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::Receiver;
    use std::time::Duration;
    use zone_core::encode;
    use zone_core::{DutyPop, Listing, RequestStart, RoleSnapshot};

    fn listing(item_id: u32, n: u64) -> Listing {
        Listing {
            listing_id: n,
            retainer_id: 10,
            retainer_owner_id: 11,
            artisan_id: 0,
            price_per_unit: 500,
            total_tax: 25,
            quantity: 2,
            item_id,
            last_review_secs: 30,
            container_id: 0,
            slot_id: n as u32,
            durability: 0,
            spiritbond: 0,
            materia: Vec::new(),
            retainer_name: "Seller".into(),
            creator_name: String::new(),
            is_hq: n % 2 == 0,
            materia_count: 0,
            on_mannequin: false,
            retainer_city_id: 1,
            stain_id: 0,
        }
    }

    fn mk(cfg: DispatcherConfig, capacity: usize) -> (Dispatcher, Receiver<Effect>) {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        (Dispatcher::new(cfg, tx), rx)
    }

    fn start_packet(item_id: u32, expected_count: u8) -> Vec<u8> {
        encode::zone_packet(
            Opcode::MarketBoardItemRequestStart,
            &encode::request_start_payload(&RequestStart {
                item_id,
                expected_count,
            }),
        )
    }

    fn offerings_packet(item_id: u32, request_id: u16, count: u64) -> Vec<u8> {
        let listings: Vec<_> = (0..count).map(|n| listing(item_id, n)).collect();
        encode::zone_packet(
            Opcode::MarketBoardOfferings,
            &encode::offerings_payload(request_id, 0, &listings),
        )
    }

    fn role_packet(slots: [u8; 10]) -> Vec<u8> {
        encode::zone_packet(
            Opcode::CfPreferredRole,
            &encode::role_bonus_payload(&RoleSnapshot { slots }),
        )
    }

    #[test]
    fn start_then_full_fragment_forwards_exactly_once() {
        let (mut d, rx) = mk(DispatcherConfig::default(), 16);

        d.handle_raw(&start_packet(7, 3));
        d.handle_raw(&offerings_packet(7, 42, 3));
        // повтор уже завершённого ответа
        d.handle_raw(&offerings_packet(7, 42, 3));

        let effects: Vec<_> = rx.try_iter().collect();
        assert_eq!(effects.len(), 1);
        match &effects[0] {
            Effect::UploadListings(upload) => {
                assert_eq!(upload.item_id, 7);
                assert_eq!(upload.request_id, 42);
                assert_eq!(upload.listings.len(), 3);
            }
            other => panic!("expected listings upload, got {other:?}"),
        }
        assert_eq!(d.stats().rejected, 1);
        assert_eq!(d.pending_requests(), 0);
    }

    #[test]
    fn rejected_fragment_does_not_disturb_later_ones() {
        let (mut d, rx) = mk(DispatcherConfig::default(), 16);

        d.handle_raw(&start_packet(9, 4));
        d.handle_raw(&offerings_packet(9, 1, 2));
        d.handle_raw(&offerings_packet(9, 2, 2)); // чужой request_id
        d.handle_raw(&offerings_packet(9, 1, 2));

        let effects: Vec<_> = rx.try_iter().collect();
        assert_eq!(effects.len(), 1);
        assert!(matches!(&effects[0], Effect::UploadListings(u) if u.listings.len() == 4));
        assert_eq!(d.stats().rejected, 1);
    }

    #[test]
    fn history_before_listings_travels_with_upload() {
        let (mut d, rx) = mk(DispatcherConfig::default(), 16);
        let sale = zone_core::HistoryEntry {
            sale_price: 1,
            purchase_time: 2,
            quantity: 3,
            is_hq: false,
            on_mannequin: false,
            buyer_name: "B".into(),
            item_id: 5,
        };

        d.handle_raw(&start_packet(5, 1));
        d.handle_raw(&encode::zone_packet(
            Opcode::MarketBoardHistory,
            &encode::history_payload(5, &[sale.clone(), sale]),
        ));
        d.handle_raw(&offerings_packet(5, 8, 1));

        match rx.try_recv().unwrap() {
            Effect::UploadListings(u) => assert_eq!(u.history.len(), 2),
            other => panic!("expected listings upload, got {other:?}"),
        }
    }

    #[test]
    fn unknown_and_truncated_packets_are_dropped() {
        let (mut d, rx) = mk(DispatcherConfig::default(), 16);

        d.handle_raw(&encode::raw_packet(0x0FFF, &[1, 2, 3]));
        d.handle_raw(&[0u8; 4]);
        d.handle_raw(&encode::zone_packet(Opcode::MarketBoardOfferings, &[0u8; 100]));

        assert!(rx.try_recv().is_err());
        let st = d.stats();
        assert_eq!(st.ignored, 1);
        assert_eq!(st.decode_errors, 2);
        assert_eq!(st.handled, 0);
    }

    #[test]
    fn tax_rates_are_forwarded_as_their_own_upload() {
        let (mut d, rx) = mk(DispatcherConfig::default(), 16);
        let tax = TaxSnapshot {
            limsa_lominsa: 5,
            gridania: 3,
            uldah: 5,
            ishgard: 0,
            kugane: 3,
            crystarium: 5,
        };

        d.handle_raw(&encode::zone_packet(
            Opcode::MarketTaxRates,
            &encode::tax_rates_payload(&tax),
        ));

        assert_eq!(rx.try_recv().unwrap(), Effect::UploadTax(tax));
        assert!(rx.try_recv().is_err());
        assert_eq!(d.stats().effects_queued, 1);
        // налоги мимо коррелятора
        assert_eq!(d.pending_requests(), 0);
    }

    #[test]
    fn opt_out_disables_market_but_keeps_duty_pop() {
        let cfg = DispatcherConfig {
            market_uploads: false,
            ..DispatcherConfig::default()
        };
        let (mut d, rx) = mk(cfg, 16);

        d.handle_raw(&start_packet(7, 1));
        d.handle_raw(&offerings_packet(7, 1, 1));
        d.handle_raw(&encode::zone_packet(
            Opcode::MarketTaxRates,
            &encode::tax_rates_payload(&TaxSnapshot {
                limsa_lominsa: 5,
                gridania: 5,
                uldah: 5,
                ishgard: 5,
                kugane: 5,
                crystarium: 5,
            }),
        ));
        d.handle_raw(&encode::zone_packet(
            Opcode::CfNotifyPop,
            &encode::duty_pop_payload(&DutyPop {
                notify_type: 3,
                content_id: 4,
            }),
        ));

        let effects: Vec<_> = rx.try_iter().collect();
        assert_eq!(effects, vec![Effect::DutyPop { content_id: 4 }]);
        assert_eq!(d.stats().ignored, 3);
        assert_eq!(d.pending_requests(), 0);
    }

    #[test]
    fn duty_pop_only_when_ready() {
        let (mut d, rx) = mk(DispatcherConfig::default(), 16);
        for (notify_type, content_id) in [(2, 4), (3, 0), (3, 4)] {
            d.handle_raw(&encode::zone_packet(
                Opcode::CfNotifyPop,
                &encode::duty_pop_payload(&DutyPop {
                    notify_type,
                    content_id,
                }),
            ));
        }
        let effects: Vec<_> = rx.try_iter().collect();
        assert_eq!(effects, vec![Effect::DutyPop { content_id: 4 }]);
    }

    #[test]
    fn role_bonus_diff_skips_baseline() {
        let (mut d, rx) = mk(DispatcherConfig::default(), 16);

        d.handle_raw(&role_packet([0; 10]));
        d.handle_raw(&role_packet([0, 1, 0, 0, 2, 0, 0, 0, 0, 0]));
        d.handle_raw(&role_packet([0, 1, 0, 0, 2, 0, 0, 0, 0, 0]));

        let effects: Vec<_> = rx.try_iter().collect();
        assert_eq!(effects.len(), 1);
        match &effects[0] {
            Effect::RoleBonus(changes) => {
                let slots: Vec<_> = changes
            .iter()
            .map(|c| (c.slot, c.previous, c.current))
            .collect();
                assert_eq!(slots, vec![(1, 0, 1), (4, 0, 2)]);
            }
            other => panic!("expected role bonus, got {other:?}"),
        }
    }

    #[test]
    fn role_and_market_paths_do_not_interfere() {
        let (mut d, rx) = mk(DispatcherConfig::default(), 16);

        d.handle_raw(&start_packet(3, 2));
        d.handle_raw(&role_packet([1; 10]));
        d.handle_raw(&offerings_packet(3, 5, 1));
        d.handle_raw(&role_packet([1, 1, 1, 1, 1, 1, 1, 1, 1, 4]));
        d.handle_raw(&offerings_packet(3, 5, 1));

        let effects: Vec<_> = rx.try_iter().collect();
        assert_eq!(effects.len(), 2);
        assert!(matches!(&effects[0], Effect::RoleBonus(c) if c.len() == 1 && c[0].slot == 9));
        assert!(matches!(&effects[1], Effect::UploadListings(u) if u.item_id == 3));
    }

    #[test]
    fn full_queue_drops_effect_without_blocking() {
        let (mut d, rx) = mk(DispatcherConfig::default(), 1);
        for item in [1, 2] {
            d.handle_raw(&start_packet(item, 1));
            d.handle_raw(&offerings_packet(item, 1, 1));
        }
        let st = d.stats();
        assert_eq!(st.effects_queued, 1);
        assert_eq!(st.effects_dropped, 1);
        assert_eq!(rx.try_iter().count(), 1);
    }

    #[test]
    fn disconnected_workers_count_as_dropped() {
        let (mut d, rx) = mk(DispatcherConfig::default(), 4);
        drop(rx);
        d.handle_raw(&start_packet(1, 1));
        d.handle_raw(&offerings_packet(1, 1, 1));
        assert_eq!(d.stats().effects_dropped, 1);
    }

    #[test]
    fn idle_requests_are_swept_on_later_packets() {
        let cfg = DispatcherConfig {
            market_uploads: true,
            correlator: CorrelatorConfig {
                max_requests: 16,
                idle_timeout: Duration::from_secs(1),
            },
        };
        let (mut d, _rx) = mk(cfg, 4);
        let t0 = Instant::now();

        let raw = start_packet(1, 5);
        d.handle_at(PacketEvent::from_raw(&raw).unwrap(), t0);
        assert_eq!(d.pending_requests(), 1);

        let later = t0 + SWEEP_INTERVAL + Duration::from_secs(2);
        let unknown = encode::raw_packet(0x0001, &[]);
        d.handle_at(PacketEvent::from_raw(&unknown).unwrap(), later);
        assert_eq!(d.pending_requests(), 0);
    }
}
