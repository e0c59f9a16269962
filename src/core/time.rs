use time::macros::format_description;
use time::{format_description::well_known::Rfc3339, Duration, OffsetDateTime, PrimitiveDateTime};

pub(crate) fn primitive_now_utc() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_utc();
    PrimitiveDateTime::new(now.date(), now.time())
}

pub(crate) fn format_primitive(value: PrimitiveDateTime) -> String {
    value.assume_utc().format(&Rfc3339).unwrap_or_else(|_| value.assume_utc().to_string())
}

/// Short human form used on rendered pages, e.g. `2025-01-02 10:20 UTC`.
pub(crate) fn format_display(value: PrimitiveDateTime) -> String {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute] UTC");
    value.format(&format).unwrap_or_else(|_| format_primitive(value))
}

pub(crate) fn add_minutes(value: PrimitiveDateTime, minutes: i32) -> PrimitiveDateTime {
    value.saturating_add(Duration::minutes(i64::from(minutes)))
}

pub(crate) fn seconds_until(deadline: PrimitiveDateTime, now: PrimitiveDateTime) -> i64 {
    (deadline - now).whole_seconds().max(0)
}
