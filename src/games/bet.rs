use crate::config::GameConfig;
use crate::errors::WagerError;
use crate::money::Money;

/// Bet limits, step size and the bet stepper controls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BetRules {
    pub min_bet: Money,
    pub max_bet: Money,
    pub step: Money,
}

impl BetRules {
    pub fn from_config(config: &GameConfig) -> Self {
        Self {
            min_bet: config.min_bet,
            max_bet: config.max_bet,
            step: config.bet_step,
        }
    }

    /// Reject bets that are zero or off the step grid.
    ///
    /// `max_bet` is not a ceiling here; it only bounds the MAX BET control.
    pub fn validate(&self, bet: Money) -> Result<(), WagerError> {
        let reject = |reason: String| Err(WagerError::InvalidBet { bet, reason });

        if bet.is_zero() {
            return reject("bet must be positive".to_string());
        }
        if !self.step.is_zero() && bet.cents() % self.step.cents() != 0 {
            return reject(format!("bet must be a multiple of {}", self.step));
        }
        Ok(())
    }

    fn snap_down(&self, amount: Money) -> Money {
        if self.step.is_zero() {
            return amount;
        }
        Money::from_cents(amount.cents() - amount.cents() % self.step.cents())
    }

    /// One step up, capped by what the balance covers
    pub fn increase(&self, bet: Money, balance: Money) -> Money {
        bet.saturating_add(self.step)
            .min(self.snap_down(balance))
            .max(self.min_bet)
    }

    /// One step down, floored at the table minimum
    pub fn decrease(&self, bet: Money) -> Money {
        bet.checked_sub(self.step).unwrap_or(Money::ZERO).max(self.min_bet)
    }

    /// The MAX BET control: the balance, capped at `max_bet` and snapped to
    /// the step. A balance below the minimum bet is returned as is.
    pub fn max_for_balance(&self, balance: Money) -> Money {
        if balance < self.min_bet {
            return balance;
        }
        self.snap_down(balance.min(self.max_bet))
    }
}

impl Default for BetRules {
    fn default() -> Self {
        Self::from_config(&GameConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        let rules = BetRules::default();
        assert!(rules.validate(Money::from_dollars(1)).is_ok());
        assert!(rules.validate(Money::from_cents(50)).is_ok());
        assert!(rules.validate(Money::from_dollars(10)).is_ok());
        assert!(rules.validate(Money::from_dollars(20)).is_ok());
        assert!(rules.validate(Money::from_cents(1050)).is_ok());

        assert!(rules.validate(Money::ZERO).is_err());
        assert!(rules.validate(Money::from_cents(25)).is_err());
        assert!(rules.validate(Money::from_cents(120)).is_err());
    }

    #[test]
    fn test_invalid_bet_carries_reason() {
        let rules = BetRules::default();
        match rules.validate(Money::from_cents(75)) {
            Err(WagerError::InvalidBet { bet, reason }) => {
                assert_eq!(bet, Money::from_cents(75));
                assert!(reason.contains("multiple of 0.50"));
            }
            other => panic!("expected InvalidBet, got {:?}", other),
        }
    }

    #[test]
    fn test_stepper() {
        let rules = BetRules::default();
        let rich = Money::from_dollars(100);

        assert_eq!(rules.increase(Money::from_dollars(1), rich), Money::from_cents(150));
        assert_eq!(rules.increase(Money::from_dollars(10), rich), Money::from_cents(1050));
        assert_eq!(rules.increase(Money::from_dollars(3), Money::from_dollars(3)), Money::from_dollars(3));
        assert_eq!(rules.increase(Money::from_dollars(2), Money::from_cents(230)), Money::from_dollars(2));

        assert_eq!(rules.decrease(Money::from_cents(150)), Money::from_dollars(1));
        assert_eq!(rules.decrease(Money::from_cents(50)), Money::from_cents(50));
    }

    #[test]
    fn test_max_for_balance() {
        let rules = BetRules::default();
        assert_eq!(rules.max_for_balance(Money::from_dollars(100)), Money::from_dollars(10));
        assert_eq!(rules.max_for_balance(Money::from_cents(730)), Money::from_dollars(7));
        assert_eq!(rules.max_for_balance(Money::from_cents(50)), Money::from_cents(50));
        assert_eq!(rules.max_for_balance(Money::from_cents(30)), Money::from_cents(30));
        assert_eq!(rules.max_for_balance(Money::ZERO), Money::ZERO);
    }
}
