//! Movement query filters.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::LedgerError;
use super::movement::{Movement, MovementStatus, MovementType};

/// Optional predicates applied to a movement query. All set fields must match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementFilter {
    /// Earliest movement date (inclusive).
    pub date_from: Option<NaiveDate>,
    /// Latest movement date (inclusive).
    pub date_to: Option<NaiveDate>,
    /// Exact status.
    pub status: Option<MovementStatus>,
    /// Direction.
    pub movement_type: Option<MovementType>,
    /// Minimum magnitude (inclusive).
    pub value_min: Option<Decimal>,
    /// Maximum magnitude (inclusive).
    pub value_max: Option<Decimal>,
}

impl MovementFilter {
    /// Rejects malformed filters before storage is touched.
    pub fn validate(&self) -> Result<(), LedgerError> {
        if let (Some(from), Some(to)) = (self.date_from, self.date_to) {
            if from > to {
                return Err(LedgerError::Validation(format!(
                    "date_from {from} is after date_to {to}"
                )));
            }
        }
        for bound in [self.value_min, self.value_max].into_iter().flatten() {
            if bound < Decimal::ZERO {
                return Err(LedgerError::Validation(format!(
                    "value bounds must not be negative (got {bound})"
                )));
            }
        }
        if let (Some(min), Some(max)) = (self.value_min, self.value_max) {
            if min > max {
                return Err(LedgerError::Validation(format!(
                    "value_min {min} is greater than value_max {max}"
                )));
            }
        }
        Ok(())
    }

    /// Returns true if the movement satisfies every set predicate.
    ///
    /// Value bounds compare against the movement's magnitude, so a 40.00 exit
    /// matches `value_min = 40`.
    #[must_use]
    pub fn matches(&self, movement: &Movement) -> bool {
        let magnitude = movement.signed_amount().abs();
        self.date_from.is_none_or(|from| movement.movement_date >= from)
            && self.date_to.is_none_or(|to| movement.movement_date <= to)
            && self.status.is_none_or(|status| movement.status == status)
            && self
                .movement_type
                .is_none_or(|kind| movement.movement_type() == kind)
            && self.value_min.is_none_or(|min| magnitude >= min)
            && self.value_max.is_none_or(|max| magnitude <= max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rstest::rstest;
    use rust_decimal_macros::dec;
    use saldo_shared::types::{AccountId, MovementId};

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
    }

    fn exit_of(amount: Decimal) -> Movement {
        Movement {
            id: MovementId::new(),
            account_id: AccountId::new(),
            movement_date: date(10),
            created_at: Utc::now(),
            entry_amount: Decimal::ZERO,
            exit_amount: amount,
            status: MovementStatus::Pending,
            running_balance: Decimal::ZERO,
            description: "rent".to_string(),
            notes: None,
        }
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = MovementFilter::default();
        assert!(filter.validate().is_ok());
        assert!(filter.matches(&exit_of(dec!(1))));
    }

    #[test]
    fn test_inverted_date_range_is_rejected() {
        let filter = MovementFilter {
            date_from: Some(date(5)),
            date_to: Some(date(4)),
            ..MovementFilter::default()
        };
        assert!(matches!(filter.validate(), Err(LedgerError::Validation(_))));
    }

    #[rstest]
    #[case(Some(dec!(-1)), None)]
    #[case(None, Some(dec!(-0.01)))]
    #[case(Some(dec!(10)), Some(dec!(5)))]
    fn test_bad_value_bounds_are_rejected(
        #[case] value_min: Option<Decimal>,
        #[case] value_max: Option<Decimal>,
    ) {
        let filter = MovementFilter {
            value_min,
            value_max,
            ..MovementFilter::default()
        };
        assert!(filter.validate().is_err());
    }

    #[rstest]
    #[case(Some(dec!(40)), None, true)]
    #[case(Some(dec!(40.01)), None, false)]
    #[case(None, Some(dec!(40)), true)]
    #[case(Some(dec!(10)), Some(dec!(39.99)), false)]
    fn test_value_bounds_use_magnitude(
        #[case] value_min: Option<Decimal>,
        #[case] value_max: Option<Decimal>,
        #[case] expected: bool,
    ) {
        let filter = MovementFilter {
            value_min,
            value_max,
            ..MovementFilter::default()
        };
        assert_eq!(filter.matches(&exit_of(dec!(40))), expected);
    }

    #[test]
    fn test_status_type_and_dates_combine() {
        let movement = exit_of(dec!(12));
        let filter = MovementFilter {
            date_from: Some(date(10)),
            date_to: Some(date(10)),
            status: Some(MovementStatus::Pending),
            movement_type: Some(MovementType::Exit),
            ..MovementFilter::default()
        };
        assert!(filter.matches(&movement));

        let entries_only = MovementFilter {
            movement_type: Some(MovementType::Entry),
            ..filter
        };
        assert!(!entries_only.matches(&movement));
    }
}
