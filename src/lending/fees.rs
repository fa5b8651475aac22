//! Late fee computation

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

/// Whole days past `due`, any started day counting as a full one
pub fn days_overdue(due: DateTime<Utc>, returned_at: DateTime<Utc>) -> i64 {
    if returned_at <= due {
        return 0;
    }
    let late = returned_at - due;
    let whole = late.num_days();
    if late > Duration::days(whole) {
        whole + 1
    } else {
        whole
    }
}

/// `rate * days_overdue`; None when returned on time
pub fn late_fee(rate_per_day: Decimal, due: DateTime<Utc>, returned_at: DateTime<Utc>) -> Option<Decimal> {
    match days_overdue(due, returned_at) {
        0 => None,
        days => Some(rate_per_day * Decimal::from(days)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn due() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 1, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_on_time_is_free() {
        assert_eq!(days_overdue(due(), due()), 0);
        assert_eq!(late_fee(Decimal::new(5, 0), due(), due() - Duration::hours(3)), None);
    }

    #[test]
    fn test_partial_day_rounds_up() {
        assert_eq!(days_overdue(due(), due() + Duration::minutes(1)), 1);
        assert_eq!(days_overdue(due(), due() + Duration::days(1)), 1);
        assert_eq!(days_overdue(due(), due() + Duration::days(1) + Duration::seconds(1)), 2);
    }

    #[test]
    fn test_fee_amount() {
        let fee = late_fee(Decimal::new(250, 2), due(), due() + Duration::hours(49)).unwrap();
        assert_eq!(fee, Decimal::new(750, 2));
    }
}
