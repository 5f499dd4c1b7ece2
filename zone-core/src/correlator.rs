//! Сборка ответов маркетборда из фрагментов.
//!
//! Сервер отвечает на запрос по предмету пачкой пакетов: сначала
//! `MarketBoardItemRequestStart` с числом ожидаемых лотов, затем история
//! продаж и один или несколько фрагментов лотов с общим `request_id`.
//! Фрагменты сопоставляются по `item_id`, а не по порядку транспорта.
//!
//! На каждый предмет в журнале не больше одного запроса: новый старт
//! вытесняет старый. Завершённый запрос сразу уходит из журнала к вызывающему,
//! брошенные вычищаются по таймауту простоя и по лимиту размера.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::time::{Duration, Instant};

use crate::error::CorrelateError;
use crate::types::{HistoryBatch, HistoryEntry, Listing, ListingBatch, MarketUpload, RequestStart};

/// Лимиты журнала запросов
#[derive(Debug, Clone)]
pub struct CorrelatorConfig {
    /// Сколько запросов держим одновременно
    pub max_requests: usize,
    /// Запрос без изменений дольше этого считается брошенным
    pub idle_timeout: Duration,
}

impl Default for CorrelatorConfig {
    fn default() -> Self {
        Self {
            max_requests: 256,
            idle_timeout: Duration::from_secs(120),
        }
    }
}

/// Фаза жизни запроса
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    /// Лотов ещё не было, история принимается
    Created,
    /// Пошли лоты, `request_id` зафиксирован
    Accumulating,
    /// Набрано `expected_count` лотов
    Complete,
}

/// Запрос к маркетборду в процессе сборки
#[derive(Debug, Clone)]
pub struct MarketRequest {
    item_id: u32,
    expected_count: usize,
    request_id: Option<u16>,
    listings: Vec<Listing>,
    history: Vec<HistoryEntry>,
    touched_at: Instant,
}

impl MarketRequest {
    fn new(start: RequestStart, now: Instant) -> Self {
        Self {
            item_id: start.item_id,
            expected_count: usize::from(start.expected_count),
            request_id: None,
            listings: Vec::new(),
            history: Vec::new(),
            touched_at: now,
        }
    }

    /// Предмет, по которому открыт запрос
    pub fn item_id(&self) -> u32 {
        self.item_id
    }

    /// Сколько лотов обещал сервер
    pub fn expected_count(&self) -> usize {
        self.expected_count
    }

    /// `None`, пока не пришёл первый фрагмент лотов
    pub fn request_id(&self) -> Option<u16> {
        self.request_id
    }

    /// Собранные лоты
    pub fn listings(&self) -> &[Listing] {
        &self.listings
    }

    /// История, принятая до первых лотов
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Лотов не меньше, чем обещано
    pub fn is_complete(&self) -> bool {
        self.listings.len() >= self.expected_count
    }

    /// Стадия, выведенная из собранных данных
    pub fn state(&self) -> RequestState {
        if self.is_complete() {
            RequestState::Complete
        } else if self.request_id.is_some() {
            RequestState::Accumulating
        } else {
            RequestState::Created
        }
    }
}

/// Почему запрос выпал из журнала при старте нового
#[derive(Debug, Clone)]
pub enum Evicted {
    /// Новый старт по тому же предмету
    Superseded(MarketRequest),
    /// Журнал полон, ушёл самый давно не обновлявшийся
    Capacity(MarketRequest),
}

/// Журнал запросов, индекс по `item_id`
#[derive(Debug, Default)]
pub struct Correlator {
    requests: HashMap<u32, MarketRequest>,
    cfg: CorrelatorConfig,
}

impl Correlator {
    /// Пустой журнал с заданными лимитами
    pub fn new(cfg: CorrelatorConfig) -> Self {
        Self {
            requests: HashMap::new(),
            cfg,
        }
    }

    /// Сколько запросов в журнале
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// Журнал пуст
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Текущий запрос по предмету
    pub fn get(&self, item_id: u32) -> Option<&MarketRequest> {
        self.requests.get(&item_id)
    }

    /// Заводит новый запрос. Всегда успешно; вытесненный запрос возвращается
    pub fn begin_request(&mut self, start: RequestStart, now: Instant) -> Option<Evicted> {
        let fresh = MarketRequest::new(start, now);

        match self.requests.entry(start.item_id) {
            Entry::Occupied(mut e) => {
                let old = e.insert(fresh);
                return Some(Evicted::Superseded(old));
            }
            Entry::Vacant(_) => {}
        }

        let evicted = if self.requests.len() >= self.cfg.max_requests.max(1) {
            self.evict_stalest().map(Evicted::Capacity)
        } else {
            None
        };
        self.requests.insert(start.item_id, fresh);
        evicted
    }

    fn evict_stalest(&mut self) -> Option<MarketRequest> {
        let stalest = self
            .requests
            .iter()
            .min_by_key(|(_, r)| r.touched_at)
            .map(|(&id, _)| id)?;
        self.requests.remove(&stalest)
    }

    /// Добавляет фрагмент лотов.
    ///
    /// `Ok(Some(upload))` ровно один раз на запрос, в момент перехода в
    /// `Complete`; сам запрос при этом покидает журнал. При любой ошибке
    /// запрос остаётся нетронутым.
    pub fn merge_listings(
        &mut self,
        batch: ListingBatch,
        now: Instant,
    ) -> Result<Option<MarketUpload>, CorrelateError> {
        let item_id = batch.item_id;

        let request = match self.requests.get_mut(&item_id) {
            Some(r) if !r.is_complete() => r,
            _ => return Err(CorrelateError::Orphan { item_id }),
        };

        let total = request.listings.len() + batch.listings.len();
        if total > request.expected_count {
            return Err(CorrelateError::Overflow {
                item_id,
                total,
                expected: request.expected_count,
            });
        }

        match request.request_id {
            Some(established) if established != batch.request_id => {
                return Err(CorrelateError::CorrelationMismatch {
                    item_id,
                    established,
                    got: batch.request_id,
                });
            }
            None if !request.listings.is_empty() => {
                return Err(CorrelateError::SequenceBreak {
                    item_id,
                    request_id: None,
                    listings: request.listings.len(),
                });
            }
            _ => {}
        }

        request.request_id = Some(batch.request_id);
        request.listings.extend(batch.listings);
        request.touched_at = now;

        if !request.is_complete() {
            return Ok(None);
        }

        Ok(self.requests.remove(&item_id).map(|done| MarketUpload {
            item_id: done.item_id,
            request_id: batch.request_id,
            listings: done.listings,
            history: done.history,
        }))
    }

    /// Добавляет историю продаж. Подходит любой запрос по предмету, но только
    /// пока лоты не начались.
    pub fn merge_history(
        &mut self,
        batch: HistoryBatch,
        now: Instant,
    ) -> Result<(), CorrelateError> {
        let item_id = batch.item_id;

        let request = self
            .requests
            .get_mut(&item_id)
            .ok_or(CorrelateError::Orphan { item_id })?;

        if request.request_id.is_some() {
            return Err(CorrelateError::SequenceBreak {
                item_id,
                request_id: request.request_id,
                listings: request.listings.len(),
            });
        }

        request.history.extend(batch.history);
        request.touched_at = now;
        Ok(())
    }

    /// Выкидывает запросы, простоявшие дольше `idle_timeout`; возвращает их число
    pub fn evict_idle(&mut self, now: Instant) -> usize {
        let ttl = self.cfg.idle_timeout;
        let before = self.requests.len();
        self.requests
            .retain(|_, r| now.saturating_duration_since(r.touched_at) <= ttl);
        before - self.requests.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(item_id: u32, n: u64) -> Listing {
        Listing {
            listing_id: n,
            retainer_id: 1,
            retainer_owner_id: 2,
            artisan_id: 0,
            price_per_unit: 100 + n as u32,
            total_tax: 5,
            quantity: 1,
            item_id,
            last_review_secs: 0,
            container_id: 0,
            slot_id: 0,
            durability: 0,
            spiritbond: 0,
            materia: Vec::new(),
            retainer_name: "Retainer".into(),
            creator_name: String::new(),
            is_hq: false,
            materia_count: 0,
            on_mannequin: false,
            retainer_city_id: 1,
            stain_id: 0,
        }
    }

    fn batch(item_id: u32, request_id: u16, count: usize) -> ListingBatch {
        ListingBatch {
            item_id,
            request_id,
            index_start: 0,
            index_end: count as u8,
            listings: (0..count as u64).map(|n| listing(item_id, n)).collect(),
        }
    }

    fn history(item_id: u32, count: usize) -> HistoryBatch {
        HistoryBatch {
            item_id,
            history: (0..count)
                .map(|i| HistoryEntry {
                    sale_price: 10 * i as u32,
                    purchase_time: 1_600_000_000,
                    quantity: 1,
                    is_hq: false,
                    on_mannequin: false,
                    buyer_name: "Buyer".into(),
                    item_id,
                })
                .collect(),
        }
    }

    fn start(item_id: u32, expected_count: u8) -> RequestStart {
        RequestStart {
            item_id,
            expected_count,
        }
    }

    #[test]
    fn exact_count_completes_once_across_fragments() {
        let now = Instant::now();
        for n in [1usize, 3, 10, 20, 25] {
            let mut c = Correlator::default();
            c.begin_request(start(7, n as u8), now);

            let mut completions = 0;
            let mut sent = 0;
            while sent < n {
                let chunk = (n - sent).min(10);
                if let Some(upload) = c.merge_listings(batch(7, 42, chunk), now).unwrap() {
                    completions += 1;
                    assert_eq!(upload.listings.len(), n);
                }
                sent += chunk;
            }
            assert_eq!(completions, 1, "n={n}");
            assert!(c.get(7).is_none(), "completed request leaves the log");
        }
    }

    #[test]
    fn overflow_leaves_listings_untouched() {
        let now = Instant::now();
        let mut c = Correlator::default();
        c.begin_request(start(7, 3), now);
        assert_eq!(c.merge_listings(batch(7, 42, 2), now).unwrap(), None);

        let err = c.merge_listings(batch(7, 42, 2), now).unwrap_err();
        assert_eq!(
            err,
            CorrelateError::Overflow {
                item_id: 7,
                total: 4,
                expected: 3,
            }
        );
        let req = c.get(7).unwrap();
        assert_eq!(req.listings().len(), 2);
        assert_eq!(req.state(), RequestState::Accumulating);
    }

    #[test]
    fn single_fragment_over_count_is_overflow() {
        let now = Instant::now();
        let mut c = Correlator::default();
        c.begin_request(start(7, 3), now);
        let err = c.merge_listings(batch(7, 1, 4), now).unwrap_err();
        assert!(matches!(err, CorrelateError::Overflow { total: 4, .. }));
        assert_eq!(c.get(7).unwrap().state(), RequestState::Created);
        assert_eq!(c.get(7).unwrap().request_id(), None);
    }

    #[test]
    fn history_accepted_before_listings_only() {
        let now = Instant::now();
        let mut c = Correlator::default();
        c.begin_request(start(5, 4), now);

        c.merge_history(history(5, 3), now).unwrap();
        c.merge_history(history(5, 2), now).unwrap();
        assert_eq!(c.get(5).unwrap().history().len(), 5);

        c.merge_listings(batch(5, 9, 1), now).unwrap();
        let err = c.merge_history(history(5, 1), now).unwrap_err();
        assert_eq!(
            err,
            CorrelateError::SequenceBreak {
                item_id: 5,
                request_id: Some(9),
                listings: 1,
            }
        );
        assert_eq!(c.get(5).unwrap().history().len(), 5);
    }

    #[test]
    fn history_travels_with_completed_upload() {
        let now = Instant::now();
        let mut c = Correlator::default();
        c.begin_request(start(5, 2), now);
        c.merge_history(history(5, 3), now).unwrap();
        let upload = c.merge_listings(batch(5, 1, 2), now).unwrap().unwrap();
        assert_eq!(upload.history.len(), 3);
        assert_eq!(upload.request_id, 1);
    }

    #[test]
    fn mismatched_request_id_is_rejected() {
        let now = Instant::now();
        let mut c = Correlator::default();
        c.begin_request(start(3, 10), now);
        c.merge_listings(batch(3, 100, 4), now).unwrap();

        let err = c.merge_listings(batch(3, 101, 4), now).unwrap_err();
        assert_eq!(
            err,
            CorrelateError::CorrelationMismatch {
                item_id: 3,
                established: 100,
                got: 101,
            }
        );
        let req = c.get(3).unwrap();
        assert_eq!(req.listings().len(), 4);
        assert_eq!(req.request_id(), Some(100));
    }

    #[test]
    fn orphan_fragments_mutate_nothing() {
        let now = Instant::now();
        let mut c = Correlator::default();
        assert_eq!(
            c.merge_listings(batch(11, 1, 1), now).unwrap_err(),
            CorrelateError::Orphan { item_id: 11 }
        );
        assert_eq!(
            c.merge_history(history(11, 1), now).unwrap_err(),
            CorrelateError::Orphan { item_id: 11 }
        );
        assert!(c.is_empty());

        c.begin_request(start(12, 1), now);
        assert!(c.merge_listings(batch(11, 1, 1), now).is_err());
        assert_eq!(c.get(12).unwrap().state(), RequestState::Created);
    }

    #[test]
    fn fragment_after_completion_is_orphan() {
        let now = Instant::now();
        let mut c = Correlator::default();
        c.begin_request(start(8, 1), now);
        assert!(c.merge_listings(batch(8, 1, 1), now).unwrap().is_some());
        assert_eq!(
            c.merge_listings(batch(8, 1, 1), now).unwrap_err(),
            CorrelateError::Orphan { item_id: 8 }
        );
    }

    #[test]
    fn newer_request_receives_fragments_after_older_completed() {
        let now = Instant::now();
        let mut c = Correlator::default();

        c.begin_request(start(20, 1), now);
        let first = c.merge_listings(batch(20, 1, 1), now).unwrap();
        assert!(first.is_some());

        c.begin_request(start(20, 2), now);
        assert_eq!(c.merge_listings(batch(20, 2, 1), now).unwrap(), None);
        let req = c.get(20).unwrap();
        assert_eq!(req.expected_count(), 2);
        assert_eq!(req.request_id(), Some(2));
    }

    #[test]
    fn new_start_shadows_stale_incomplete_request() {
        let now = Instant::now();
        let mut c = Correlator::default();
        c.begin_request(start(20, 5), now);
        c.merge_listings(batch(20, 1, 2), now).unwrap();

        let evicted = c.begin_request(start(20, 3), now);
        match evicted {
            Some(Evicted::Superseded(old)) => assert_eq!(old.listings().len(), 2),
            other => panic!("expected superseded request, got {other:?}"),
        }

        // новый запрос ещё без request_id, id=2 принимается
        let upload = c.merge_listings(batch(20, 2, 3), now).unwrap().unwrap();
        assert_eq!(upload.request_id, 2);
        assert_eq!(c.len(), 0);
    }

    #[test]
    fn zero_expected_count_is_complete_at_start() {
        let now = Instant::now();
        let mut c = Correlator::default();
        c.begin_request(start(4, 0), now);
        assert_eq!(c.get(4).unwrap().state(), RequestState::Complete);

        // история всё ещё сопоставляется с завершённым запросом
        c.merge_history(history(4, 2), now).unwrap();
        assert_eq!(
            c.merge_listings(batch(4, 1, 1), now).unwrap_err(),
            CorrelateError::Orphan { item_id: 4 }
        );
    }

    #[test]
    fn idle_requests_are_evicted() {
        let t0 = Instant::now();
        let mut c = Correlator::new(CorrelatorConfig {
            max_requests: 16,
            idle_timeout: Duration::from_secs(10),
        });
        c.begin_request(start(1, 5), t0);
        c.begin_request(start(2, 5), t0);
        c.merge_history(history(2, 1), t0 + Duration::from_secs(8)).unwrap();

        assert_eq!(c.evict_idle(t0 + Duration::from_secs(5)), 0);
        assert_eq!(c.evict_idle(t0 + Duration::from_secs(12)), 1);
        assert!(c.get(1).is_none());
        assert!(c.get(2).is_some());
    }

    #[test]
    fn capacity_evicts_least_recently_touched() {
        let t0 = Instant::now();
        let mut c = Correlator::new(CorrelatorConfig {
            max_requests: 2,
            idle_timeout: Duration::from_secs(60),
        });
        c.begin_request(start(1, 5), t0);
        c.begin_request(start(2, 5), t0 + Duration::from_secs(1));
        c.merge_history(history(1, 1), t0 + Duration::from_secs(2)).unwrap();

        match c.begin_request(start(3, 5), t0 + Duration::from_secs(3)) {
            Some(Evicted::Capacity(old)) => assert_eq!(old.item_id(), 2),
            other => panic!("expected capacity eviction, got {other:?}"),
        }
        assert_eq!(c.len(), 2);
        assert!(c.get(1).is_some());
        assert!(c.get(3).is_some());
    }
}
