use std::fmt;

use serde::{Deserialize, Serialize};

/// Опкоды зонного протокола, которые мы разбираем.
///
/// Закрытое перечисление: всё, чего здесь нет, диспетчер молча пропускает.
/// Значения соответствуют наблюдаемой версии протокола.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum Opcode {
    /// Очередь в контент подошла
    CfNotifyPop = 0x02B0,
    /// Бонусы ролей в рулетках
    CfPreferredRole = 0x02C7,
    /// Ставки налогов по городам
    MarketTaxRates = 0x0185,
    /// Начало запроса по предмету на маркетборде
    MarketBoardItemRequestStart = 0x023A,
    /// Фрагмент с текущими лотами
    MarketBoardOfferings = 0x0390,
    /// Фрагмент с историей продаж
    MarketBoardHistory = 0x01C2,
}

impl Opcode {
    /// Все известные опкоды
    pub const ALL: [Opcode; 6] = [
        Opcode::CfNotifyPop,
        Opcode::CfPreferredRole,
        Opcode::MarketTaxRates,
        Opcode::MarketBoardItemRequestStart,
        Opcode::MarketBoardOfferings,
        Opcode::MarketBoardHistory,
    ];

    /// `None` для кодов вне перечисления
    pub fn from_u16(code: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.code() == code)
    }

    /// Числовой код
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Относится ли опкод к маркетплейсу (отключается через opt-out)
    pub fn is_market(self) -> bool {
        matches!(
            self,
            Opcode::MarketTaxRates
                | Opcode::MarketBoardItemRequestStart
                | Opcode::MarketBoardOfferings
                | Opcode::MarketBoardHistory
        )
    }

    /// Имя опкода для логов
    pub fn name(self) -> &'static str {
        match self {
            Opcode::CfNotifyPop => "CfNotifyPop",
            Opcode::CfPreferredRole => "CfPreferredRole",
            Opcode::MarketTaxRates => "MarketTaxRates",
            Opcode::MarketBoardItemRequestStart => "MarketBoardItemRequestStart",
            Opcode::MarketBoardOfferings => "MarketBoardOfferings",
            Opcode::MarketBoardHistory => "MarketBoardHistory",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:04X})", self.name(), self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_u16_knows_every_opcode() {
        for op in Opcode::ALL {
            assert_eq!(Opcode::from_u16(op.code()), Some(op));
        }
    }

    #[test]
    fn from_u16_ignores_unknown_codes() {
        assert_eq!(Opcode::from_u16(0x0000), None);
        assert_eq!(Opcode::from_u16(0xFFFF), None);
        assert_eq!(Opcode::from_u16(0x0391), None);
    }

    #[test]
    fn market_opcodes_are_the_opt_out_set() {
        let market: Vec<_> = Opcode::ALL.into_iter().filter(|op| op.is_market()).collect();
        assert_eq!(market.len(), 4);
        assert!(!Opcode::CfNotifyPop.is_market());
        assert!(!Opcode::CfPreferredRole.is_market());
    }

    #[test]
    fn display_shows_name_and_hex_code() {
        assert_eq!(Opcode::MarketBoardOfferings.to_string(), "MarketBoardOfferings(0x0390)");
    }
}
