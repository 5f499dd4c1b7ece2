//! Пул воркеров, которые доставляют эффекты внешним потребителям.
//!
//! Порядок между воркерами не гарантируется. Ошибка или паника потребителя
//! ловится здесь, логируется и дальше не идёт: состояние диспетчера от
//! доступности потребителей не зависит.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::Receiver;
use log::{debug, info, warn};

use crate::dispatch::Effect;
use crate::names::{ContentNames, display_name};
use crate::sinks::{Notifier, SinkError, UploadSink};

#[derive(Clone)]
pub(crate) struct Sinks {
    pub(crate) uploader: Arc<dyn UploadSink>,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) names: Arc<dyn ContentNames>,
}

/// Воркеры живут, пока жив хотя бы один `Sender<Effect>`
pub(crate) fn spawn_workers(
    count: usize,
    rx: Receiver<Effect>,
    sinks: Sinks,
) -> std::io::Result<Vec<thread::JoinHandle<()>>> {
    let count = count.max(1);
    let mut handles = Vec::with_capacity(count);
    for id in 0..count {
        let rx = rx.clone();
        let sinks = sinks.clone();
        let h = thread::Builder::new()
            .name(format!("forward-{id}"))
            .spawn(move || run_worker(id, rx, sinks))?;
        handles.push(h);
    }
    Ok(handles)
}

fn run_worker(id: usize, rx: Receiver<Effect>, sinks: Sinks) {
    debug!("forward worker {id} started");
    // разгребаем очередь до закрытия канала
    for effect in rx.iter() {
        deliver_guarded(&effect, &sinks);
    }
    debug!("forward worker {id} stopped");
}

/// Доставка одного эффекта; ничего не пробрасывает наружу
pub(crate) fn deliver_guarded(effect: &Effect, sinks: &Sinks) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(|| deliver(effect, sinks))) {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            warn!("forwarding failed: {e}");
            false
        }
        Err(_) => {
            warn!("sink panicked while forwarding; effect dropped");
            false
        }
    }
}

pub(crate) fn deliver(effect: &Effect, sinks: &Sinks) -> Result<(), SinkError> {
    match effect {
        Effect::UploadListings(upload) => {
            sinks.uploader.upload_listings(upload)?;
            info!("market board upload done: {upload}");
            Ok(())
        }
        Effect::UploadTax(tax) => sinks.uploader.upload_tax(tax),
        Effect::DutyPop { content_id } => {
            let name = display_name(sinks.names.as_ref(), *content_id);
            sinks.notifier.notify(&format!("Duty pop: {name}"))
        }
        Effect::RoleBonus(changes) => {
            // каждая смена роли доставляется отдельно, сбой одной не глушит остальные
            let mut first_err = None;
            for change in changes {
                if let Err(e) = sinks.notifier.notify(&change.to_string()) {
                    warn!("role bonus notification failed for slot {}: {e}", change.slot);
                    first_err.get_or_insert(e);
                }
            }
            first_err.map_or(Ok(()), Err)
        }
    }
}
