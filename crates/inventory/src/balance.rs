//! Balance arithmetic over movement history.
//!
//! Quantity on hand is a pure function of an item's movements:
//! `Σ entry.quantity − Σ exit.quantity`. Nothing here is cached or stored.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use stockcare_core::{DomainError, DomainResult};

use crate::movement::{Movement, MovementKind};

/// Summed entry and exit quantities for one item.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementTotals {
    pub entries: i64,
    pub exits: i64,
}

impl MovementTotals {
    /// Sum a history. Fails when either total no longer fits in an `i64`.
    pub fn of<'a, I>(movements: I) -> DomainResult<Self>
    where
        I: IntoIterator<Item = &'a Movement>,
    {
        movements
            .into_iter()
            .try_fold(Self::default(), |acc, m| acc.with(m.kind, m.quantity))
    }

    /// Totals after one more movement of `kind`.
    pub fn with(self, kind: MovementKind, quantity: i64) -> DomainResult<Self> {
        let overflow = || DomainError::invariant(format!("{kind} total exceeds {}", i64::MAX));
        let mut next = self;
        match kind {
            MovementKind::Entry => {
                next.entries = next.entries.checked_add(quantity).ok_or_else(overflow)?;
            }
            MovementKind::Exit => {
                next.exits = next.exits.checked_add(quantity).ok_or_else(overflow)?;
            }
        }
        Ok(next)
    }

    /// Both totals are non-negative, so the difference cannot overflow.
    pub fn balance(&self) -> i64 {
        self.entries - self.exits
    }
}

/// Quantity on hand derived from a set of movements.
pub fn balance_of<'a, I>(movements: I) -> DomainResult<i64>
where
    I: IntoIterator<Item = &'a Movement>,
{
    Ok(MovementTotals::of(movements)?.balance())
}

/// Critical stock: strictly below the minimum (equality is not critical).
pub fn is_below_minimum(balance: i64, minimum: i64) -> bool {
    balance < minimum
}

/// Whole days from `today` until `expiry` (negative once expired).
pub fn days_remaining(expiry: NaiveDate, today: NaiveDate) -> i64 {
    (expiry - today).num_days()
}

/// True when `expiry` falls inside `[today, today + within_days]`.
pub fn expires_within(expiry: NaiveDate, today: NaiveDate, within_days: u32) -> bool {
    let days = days_remaining(expiry, today);
    days >= 0 && days <= i64::from(within_days)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movement::NewMovement;
    use chrono::Utc;
    use proptest::prelude::*;
    use stockcare_core::{MovementId, SupplyItemId, UserId};

    fn entry(item: SupplyItemId, quantity: i64) -> Movement {
        NewMovement::entry(item, quantity, None, UserId::new(), Utc::now())
            .unwrap()
            .into_movement(MovementId::new())
    }

    fn exit(item: SupplyItemId, quantity: i64) -> Movement {
        NewMovement::exit(item, quantity, None, UserId::new(), Utc::now())
            .unwrap()
            .into_movement(MovementId::new())
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn entry_of_100_and_exit_of_30_leaves_70() {
        let item = SupplyItemId::new();
        let history = vec![entry(item, 100), exit(item, 30)];
        assert_eq!(balance_of(&history).unwrap(), 70);

        let totals = MovementTotals::of(&history).unwrap();
        assert_eq!(totals, MovementTotals { entries: 100, exits: 30 });
    }

    #[test]
    fn empty_history_has_zero_balance() {
        assert_eq!(balance_of(&Vec::<Movement>::new()).unwrap(), 0);
    }

    #[test]
    fn totals_past_i64_max_are_an_error() {
        let item = SupplyItemId::new();
        let history = vec![entry(item, i64::MAX), entry(item, i64::MAX)];
        assert!(matches!(
            balance_of(&history),
            Err(DomainError::InvariantViolation(_))
        ));

        let full = MovementTotals { entries: i64::MAX, exits: 0 };
        assert!(full.with(MovementKind::Entry, 1).is_err());
        assert_eq!(
            full.with(MovementKind::Exit, i64::MAX).unwrap().balance(),
            0
        );
    }

    #[test]
    fn minimum_boundary_is_not_critical() {
        assert!(is_below_minimum(9, 10));
        assert!(!is_below_minimum(10, 10));
        assert!(!is_below_minimum(11, 10));
    }

    #[test]
    fn expiry_window_is_inclusive_on_both_ends() {
        let today = date(2026, 10, 17);
        assert!(expires_within(today, today, 30));
        assert!(expires_within(date(2026, 11, 16), today, 30));
        assert!(!expires_within(date(2026, 11, 17), today, 30));
        assert!(!expires_within(date(2026, 10, 16), today, 30));
        assert_eq!(days_remaining(date(2026, 11, 16), today), 30);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: balance equals the sum of entries minus the sum of exits,
        /// regardless of interleaving.
        #[test]
        fn balance_is_entries_minus_exits(
            moves in prop::collection::vec((any::<bool>(), 1i64..10_000i64), 0..64)
        ) {
            let item = SupplyItemId::new();
            let history: Vec<Movement> = moves
                .iter()
                .map(|(is_entry, q)| if *is_entry { entry(item, *q) } else { exit(item, *q) })
                .collect();

            let expected_entries: i64 = moves.iter().filter(|(e, _)| *e).map(|(_, q)| q).sum();
            let expected_exits: i64 = moves.iter().filter(|(e, _)| !*e).map(|(_, q)| q).sum();

            prop_assert_eq!(balance_of(&history).unwrap(), expected_entries - expected_exits);
            prop_assert_eq!(
                history.iter().map(Movement::signed_quantity).sum::<i64>(),
                balance_of(&history).unwrap()
            );
        }
    }
}
