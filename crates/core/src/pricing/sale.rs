//! Store-wide sale banner with a countdown.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::SalePromotionId;

/// A timed sale announced on the storefront.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalePromotion {
    pub id: SalePromotionId,
    pub title: String,
    pub end_date: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl SalePromotion {
    /// Time left until the sale ends.
    #[must_use]
    pub fn time_remaining(&self, now: DateTime<Utc>) -> Countdown {
        Countdown::until(self.end_date, now)
    }
}

/// The sale to show: enabled, not yet ended, ending soonest.
#[must_use]
pub fn active_sale_promotion(
    promotions: &[SalePromotion],
    now: DateTime<Utc>,
) -> Option<&SalePromotion> {
    promotions
        .iter()
        .filter(|p| p.is_active && p.end_date > now)
        .min_by_key(|p| p.end_date)
}

/// Remaining time broken down for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Countdown {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
    pub expired: bool,
}

impl Countdown {
    #[must_use]
    pub fn until(end: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let total = (end - now).num_seconds();
        if total <= 0 {
            return Self {
                days: 0,
                hours: 0,
                minutes: 0,
                seconds: 0,
                expired: true,
            };
        }
        Self {
            days: total / 86_400,
            hours: (total % 86_400) / 3_600,
            minutes: (total % 3_600) / 60,
            seconds: total % 60,
            expired: false,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 11, 20, 8, 0, 0).unwrap()
    }

    fn sale(title: &str, ends_in: Duration, active: bool) -> SalePromotion {
        SalePromotion {
            id: SalePromotionId::generate(),
            title: title.to_string(),
            end_date: now() + ends_in,
            is_active: active,
            created_at: now() - Duration::days(3),
        }
    }

    #[test]
    fn test_soonest_ending_active_sale_wins() {
        let all = vec![
            sale("Holiday", Duration::days(10), true),
            sale("Flash", Duration::hours(5), true),
            sale("Disabled", Duration::hours(1), false),
            sale("Over", -Duration::hours(1), true),
        ];
        assert_eq!(active_sale_promotion(&all, now()).unwrap().title, "Flash");
    }

    #[test]
    fn test_countdown_breakdown() {
        let s = sale("Flash", Duration::seconds(90_061), true);
        let left = s.time_remaining(now());
        assert_eq!((left.days, left.hours, left.minutes, left.seconds), (1, 1, 1, 1));
        assert!(!left.expired);
    }

    #[test]
    fn test_countdown_expired() {
        let left = Countdown::until(now() - Duration::seconds(1), now());
        assert!(left.expired);
        assert_eq!(left.days, 0);
    }
}
