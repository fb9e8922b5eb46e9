use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Literal format the at-time stored function expects for each timestamp.
pub const STORE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Label a naive store instant with the site zone without moving its wall clock.
///
/// Ambiguous wall clocks (DST fall-back) take the earlier offset. Wall clocks
/// inside a DST gap keep their value and carry the pre-transition offset.
pub fn attach_timezone(tz: &Tz, naive: NaiveDateTime) -> DateTime<Tz> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(a, b) => {
            if a.naive_utc() <= b.naive_utc() {
                a
            } else {
                b
            }
        }
        LocalResult::None => attach_in_gap(tz, naive),
    }
}

fn attach_in_gap(tz: &Tz, naive: NaiveDateTime) -> DateTime<Tz> {
    const SEARCH_MINUTES: i64 = 180;

    let offset = find_prev_valid_local(tz, naive, SEARCH_MINUTES)
        .map(|prev| prev.offset().clone())
        .unwrap_or_else(|| tz.offset_from_utc_datetime(&naive));
    let utc = naive - Duration::seconds(i64::from(offset_seconds(&offset)));
    DateTime::from_naive_utc_and_offset(utc, offset)
}

fn offset_seconds(offset: &<Tz as TimeZone>::Offset) -> i32 {
    use chrono::Offset;
    offset.fix().local_minus_utc()
}

fn find_prev_valid_local(tz: &Tz, naive: NaiveDateTime, max_minutes: i64) -> Option<DateTime<Tz>> {
    for minutes in 1..=max_minutes {
        let candidate = naive - Duration::minutes(minutes);
        match tz.from_local_datetime(&candidate) {
            LocalResult::Single(dt) => return Some(dt),
            LocalResult::Ambiguous(a, b) => {
                return Some(if a.naive_utc() >= b.naive_utc() { a } else { b })
            }
            LocalResult::None => continue,
        }
    }
    None
}

/// A caller-supplied instant that can be expressed as site-local wall clock.
///
/// Naive values are taken to already be site-local. Zoned values are
/// converted into the site zone first.
pub trait StoreTime {
    fn to_store_local(&self, tz: &Tz) -> NaiveDateTime;

    /// The absolute instant, used to order values whose wall clocks repeat
    /// across a DST fall-back.
    fn to_utc(&self, tz: &Tz) -> DateTime<Utc>;
}

impl StoreTime for NaiveDateTime {
    fn to_store_local(&self, _tz: &Tz) -> NaiveDateTime {
        *self
    }

    fn to_utc(&self, tz: &Tz) -> DateTime<Utc> {
        attach_timezone(tz, *self).with_timezone(&Utc)
    }
}

impl<Z: TimeZone> StoreTime for DateTime<Z> {
    fn to_store_local(&self, tz: &Tz) -> NaiveDateTime {
        self.with_timezone(tz).naive_local()
    }

    fn to_utc(&self, _tz: &Tz) -> DateTime<Utc> {
        self.with_timezone(&Utc)
    }
}

impl<T: StoreTime + ?Sized> StoreTime for &T {
    fn to_store_local(&self, tz: &Tz) -> NaiveDateTime {
        (**self).to_store_local(tz)
    }

    fn to_utc(&self, tz: &Tz) -> DateTime<Utc> {
        (**self).to_utc(tz)
    }
}

pub fn format_store_timestamp(value: &NaiveDateTime) -> String {
    value.format(STORE_TIMESTAMP_FORMAT).to_string()
}

/// Parses the literal formats accepted on the command line.
pub fn parse_store_timestamp(raw: &str) -> Result<NaiveDateTime, String> {
    let trimmed = raw.trim();
    NaiveDateTime::parse_from_str(trimmed, STORE_TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S"))
        .map_err(|err| format!("invalid timestamp {trimmed:?}: {err}"))
}
