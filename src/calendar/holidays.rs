//! National and movable exchange holidays
//!
//! Fixed holidays are keyed by month/day. Movable holidays are offsets from
//! Easter Sunday, which is computed arithmetically for any year.

use chrono::{Datelike, Duration, NaiveDate};

/// Fixed national holidays as (month, day, name)
pub const FIXED_HOLIDAYS: [(u32, u32, &str); 8] = [
    (1, 1, "New Year"),
    (4, 21, "Tiradentes"),
    (5, 1, "Labor Day"),
    (9, 7, "Independence Day"),
    (10, 12, "Our Lady of Aparecida"),
    (11, 2, "All Souls' Day"),
    (11, 15, "Proclamation of the Republic"),
    (12, 25, "Christmas"),
];

/// Easter Sunday for `year` (Meeus/Jones/Butcher, proleptic Gregorian).
///
/// Floor division keeps the arithmetic valid for years before 1 CE. `None`
/// only when the date falls outside chrono's representable range.
pub fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year.rem_euclid(19);
    let b = year.div_euclid(100);
    let c = year.rem_euclid(100);
    let d = b.div_euclid(4);
    let e = b.rem_euclid(4);
    let f = (b + 8).div_euclid(25);
    let g = (b - f + 1).div_euclid(3);
    let h = (19 * a + b - d - g + 15).rem_euclid(30);
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k).rem_euclid(7);
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;

    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
}

/// Carnival Monday, Carnival Tuesday, Good Friday and Corpus Christi for `year`
pub fn movable_holidays(year: i32) -> Vec<NaiveDate> {
    let Some(easter) = easter_sunday(year) else {
        return Vec::new();
    };
    [
        easter.checked_sub_signed(Duration::days(48)),
        easter.checked_sub_signed(Duration::days(47)),
        easter.checked_sub_signed(Duration::days(2)),
        easter.checked_add_signed(Duration::days(60)),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// Check whether `date` is a fixed or movable holiday
pub fn is_holiday(date: NaiveDate) -> bool {
    let fixed = FIXED_HOLIDAYS
        .iter()
        .any(|&(month, day, _)| date.month() == month && date.day() == day);

    fixed || movable_holidays(date.year()).contains(&date)
}

/// All holidays of `year`, sorted and deduplicated
pub fn holidays(year: i32) -> Vec<NaiveDate> {
    let mut days: Vec<NaiveDate> = FIXED_HOLIDAYS
        .iter()
        .filter_map(|&(month, day, _)| NaiveDate::from_ymd_opt(year, month, day))
        .chain(movable_holidays(year))
        .collect();
    days.sort();
    days.dedup();
    days
}
