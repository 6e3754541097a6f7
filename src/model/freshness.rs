use chrono::{Duration, NaiveDateTime};

/// Every cache entity in the engine answers the same question with a
/// different rule: is the data we hold still worth serving? Each concrete
/// policy lives behind this one contract so components and tests treat them
/// uniformly.
pub trait Freshness {
    fn is_fresh(&self, last_update: NaiveDateTime, now: NaiveDateTime) -> bool;
}

/// Fresh while younger than a fixed age (live TTL, player-stats cooldown).
pub struct MaxAge(pub Duration);

impl Freshness for MaxAge {
    fn is_fresh(&self, last_update: NaiveDateTime, now: NaiveDateTime) -> bool {
        now.signed_duration_since(last_update) < self.0
    }
}

/// Fresh if updated since the start of the current reference day
/// (fixture-list markers, season-aggregate markers).
pub struct SinceDayStart(pub NaiveDateTime);

impl Freshness for SinceDayStart {
    fn is_fresh(&self, last_update: NaiveDateTime, _now: NaiveDateTime) -> bool {
        last_update >= self.0
    }
}

/// Fresh forever. Terminal live scores never expire.
pub struct Always;

impl Freshness for Always {
    fn is_fresh(&self, _last_update: NaiveDateTime, _now: NaiveDateTime) -> bool {
        true
    }
}
