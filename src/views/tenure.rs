//! Tenure in whole calendar months since the hire date.

use chrono::{Datelike, Local, NaiveDate};

/// Whole months from `hired` to `today`, never negative.
pub fn tenure_months(hired: NaiveDate, today: NaiveDate) -> u32 {
    let mut months = (today.year() - hired.year()) * 12
        + (today.month() as i32 - hired.month() as i32);
    if today.day() < hired.day() {
        months -= 1;
    }
    months.max(0) as u32
}

/// "Y yr. M mo.", dropping a zero component; "0 mo." when both are zero.
pub fn format_tenure(total_months: u32) -> String {
    let years = total_months / 12;
    let months = total_months % 12;

    let mut parts = Vec::with_capacity(2);
    if years > 0 {
        parts.push(format!("{} yr.", years));
    }
    if months > 0 {
        parts.push(format!("{} mo.", months));
    }

    if parts.is_empty() {
        "0 mo.".to_string()
    } else {
        parts.join(" ")
    }
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}
