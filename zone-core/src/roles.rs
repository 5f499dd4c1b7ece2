//! Отслеживание бонусов ролей в рулетках.

use std::fmt;

use crate::types::RoleSnapshot;

/// Изменение одного слота между двумя снапшотами
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleChange {
    /// Индекс слота, с нуля
    pub slot: usize,
    /// Ключ роли в прошлом снапшоте
    pub previous: u8,
    /// Ключ роли сейчас
    pub current: u8,
}

impl RoleChange {
    /// Номер рулетки в игре
    pub fn roulette_index(&self) -> usize {
        self.slot + 1
    }
}

impl fmt::Display for RoleChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Roulette bonus for {} changed: {} => {}",
            roulette_name(self.roulette_index()),
            role_name(self.previous),
            role_name(self.current)
        )
    }
}

/// Хранит предыдущий снапшот и сравнивает с ним каждый новый.
///
/// Первый снапшот после старта становится базой и изменений не даёт.
#[derive(Debug, Default)]
pub struct RoleDiffer {
    previous: Option<RoleSnapshot>,
}

impl RoleDiffer {
    /// Дифер без базы
    pub fn new() -> Self {
        Self::default()
    }

    /// Был ли уже хоть один снапшот
    pub fn has_baseline(&self) -> bool {
        self.previous.is_some()
    }

    /// Изменившиеся слоты по возрастанию индекса; снапшот всегда становится новой базой
    pub fn diff(&mut self, current: RoleSnapshot) -> Vec<RoleChange> {
        let changes = match &self.previous {
            None => Vec::new(),
            Some(prev) => prev
                .slots
                .iter()
                .zip(current.slots.iter())
                .enumerate()
                .filter(|(_, (p, c))| p != c)
                .map(|(slot, (&previous, &current))| RoleChange {
                    slot,
                    previous,
                    current,
                })
                .collect(),
        };
        self.previous = Some(current);
        changes
    }
}

/// Название рулетки по игровому номеру
pub fn roulette_name(index: usize) -> &'static str {
    match index {
        1 => "Duty Roulette: Leveling",
        2 => "Duty Roulette: Level 50/60/70 Dungeons",
        3 => "Duty Roulette: Main Scenario",
        4 => "Duty Roulette: Guildhests",
        5 => "Duty Roulette: Expert",
        6 => "Duty Roulette: Trials",
        8 => "Duty Roulette: Mentor",
        9 => "Duty Roulette: Alliance Raids",
        10 => "Duty Roulette: Normal Raids",
        _ => "Unknown ContentRoulette",
    }
}

/// Название роли по ключу, `0` значит без бонуса
pub fn role_name(key: u8) -> &'static str {
    match key {
        1 => "Tank",
        2 | 3 => "DPS",
        4 => "Healer",
        _ => "No Bonus",
    }
}
