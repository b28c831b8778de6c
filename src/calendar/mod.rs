//! Exchange business-day calendar
//!
//! Pure date arithmetic: weekends and the holidays in [`holidays`] are
//! excluded, everything else is a trading day. The only clock access is
//! [`exchange_today`], which resolves "now" in the exchange time zone.

pub mod holidays;

pub use holidays::{easter_sunday, is_holiday};

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc, Weekday};
use chrono_tz::America::Sao_Paulo;
use chrono_tz::Tz;

/// Time zone the exchange calendar is defined in
pub const EXCHANGE_TZ: Tz = Sao_Paulo;

/// Current calendar date at the exchange
pub fn exchange_today() -> NaiveDate {
    Utc::now().with_timezone(&EXCHANGE_TZ).date_naive()
}

/// Check whether `date` is a trading day
pub fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !is_holiday(date)
}

/// Most recent `n` business days up to and including the calendar date of
/// `reference`, most recent first.
///
/// Callers clamp `n` to their accepted range; this function does not.
pub fn last_n_business_days<T: TimeZone>(n: usize, reference: &DateTime<T>) -> Vec<NaiveDate> {
    business_days_ending(n, reference.date_naive())
}

/// Walk backward from `date` collecting `n` business days, most recent first.
///
/// Stops early only at the first representable date.
pub fn business_days_ending(n: usize, date: NaiveDate) -> Vec<NaiveDate> {
    let mut days = Vec::with_capacity(n);
    let mut current = date;

    while days.len() < n {
        if is_business_day(current) {
            days.push(current);
        }
        match current.pred_opt() {
            Some(prev) => current = prev,
            None => break,
        }
    }

    days
}
