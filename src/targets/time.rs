//! Calendar and time-zone contracts: RFC 3339 text, ISO week dates and
//! offset lookup in a transition table.

use chrono::{
    DateTime, Datelike, FixedOffset, NaiveDate, NaiveTime, Offset, SecondsFormat, TimeZone, Utc,
    Weekday,
};

use crate::diagnostics::{Abandoned, RegistryError};
use crate::generator::{Budget, DrawSource, Generator, int_range, just, near_zero, one_of, select};
use crate::oracle::{Oracle, TargetError, TargetResult};
use crate::property::Property;
use crate::registry::Registry;

pub const DATE_TAG: &str = "time.date";
pub const DATETIME_TAG: &str = "time.datetime";
pub const INSTANT_TAG: &str = "time.instant";

/// UTC offsets (seconds east) in effect from given instants on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneTable {
    initial: i32,
    transitions: Vec<(i64, i32)>,
}

impl ZoneTable {
    pub fn new(initial: i32, mut transitions: Vec<(i64, i32)>) -> Self {
        transitions.sort_by_key(|&(at, _)| at);
        Self { initial, transitions }
    }

    pub fn transitions(&self) -> &[(i64, i32)] {
        &self.transitions
    }

    /// Offset in effect at `instant` (seconds since the epoch), by binary
    /// search over the transitions.
    pub fn offset_at(&self, instant: i64) -> i32 {
        match self.transitions.partition_point(|&(at, _)| at <= instant) {
            0 => self.initial,
            n => self.transitions[n - 1].1,
        }
    }

    /// Same lookup by a linear scan; the reference for `offset_at`.
    pub fn offset_at_scan(&self, instant: i64) -> i32 {
        let mut offset = self.initial;
        for &(at, next) in &self.transitions {
            if at > instant {
                break;
            }
            offset = next;
        }
        offset
    }
}

/// A zone whose last transition sits exactly at 2^31 seconds, where 32-bit
/// elapsed-second arithmetic wraps.
pub fn transition_zone() -> ZoneTable {
    ZoneTable::new(0, vec![(1_000_000_000, 3600), (2_147_483_648, 7200)])
}

/// North-American style daylight saving rules from 1970 to 2100: second
/// Sunday of March to first Sunday of November, switching at 07:00 and
/// 06:00 UTC.
pub fn daylight_saving_zone() -> ZoneTable {
    const STANDARD: i32 = -5 * 3600;
    const DAYLIGHT: i32 = -4 * 3600;
    let switch = |year: i32, month: u32, n: u8, hour: u32| {
        NaiveDate::from_weekday_of_month_opt(year, month, Weekday::Sun, n)
            .and_then(|d| d.and_hms_opt(hour, 0, 0))
            .map(|t| t.and_utc().timestamp())
    };
    let mut transitions = Vec::new();
    for year in 1970..=2100 {
        if let Some(at) = switch(year, 3, 2, 7) {
            transitions.push((at, DAYLIGHT));
        }
        if let Some(at) = switch(year, 11, 1, 6) {
            transitions.push((at, STANDARD));
        }
    }
    ZoneTable::new(STANDARD, transitions)
}

/// Instants within a few hours of one of the zone's transitions.
#[derive(Debug, Clone)]
pub struct NearTransition {
    instants: Vec<i64>,
}

impl Generator for NearTransition {
    type Value = i64;

    fn draw(&self, src: &mut DrawSource, budget: &mut Budget) -> Result<i64, Abandoned> {
        budget.consume(1);
        let base = match self.instants.len() {
            0 => 0,
            n => self.instants[src.draw_offset(n as u64 - 1)? as usize],
        };
        Ok(base.saturating_add(near_zero(4 * 3600).draw(src, budget)?))
    }
}

/// Instants that are either near a transition of `zone` or anywhere in the
/// unsigned 32-bit range of elapsed seconds.
pub fn instants(zone: &ZoneTable) -> impl Generator<Value = i64> + use<> {
    let near = NearTransition { instants: zone.transitions.iter().map(|&(at, _)| at).collect() };
    one_of(vec![(1, near.boxed()), (1, int_range(0, i64::from(u32::MAX)).boxed())])
}

/// Dates biased toward the first and last days of years near calendar
/// edges.
fn dates() -> impl Generator<Value = NaiveDate> {
    let year = one_of(vec![
        (1, select(vec![2000, 1970, 1, 9999, 0, 10000, 1900, 2038, 2100, -1]).boxed()),
        (1, int_range(-1000, 11000).map(|y| y as i32).boxed()),
    ]);
    (year, int_range(1, 366)).map(|(year, ordinal)| {
        NaiveDate::from_yo_opt(year, ordinal as u32)
            .or_else(|| NaiveDate::from_yo_opt(year, 365))
            .unwrap_or_default()
    })
}

fn datetimes() -> impl Generator<Value = DateTime<FixedOffset>> {
    let nanos = one_of(vec![
        (2, just(0i64).boxed()),
        (1, int_range(0, 999).map(|ms| ms * 1_000_000).boxed()),
        (1, int_range(0, 999_999_999).boxed()),
    ]);
    let offset = one_of(vec![
        (
            2,
            select(vec![0, 3600, -5 * 3600, 19800, 20700, -12 * 3600, 14 * 3600, 86340, -86340])
                .boxed(),
        ),
        (1, int_range(-86399, 86399).map(|s| s as i32).boxed()),
    ]);
    (dates(), int_range(0, 86399), nanos, offset).map(|(date, secs, nanos, offset)| {
        let time = NaiveTime::from_num_seconds_from_midnight_opt(secs as u32, nanos as u32)
            .unwrap_or_default();
        let offset = FixedOffset::east_opt(offset).unwrap_or_else(|| Utc.fix());
        offset.from_utc_datetime(&date.and_time(time))
    })
}

fn to_rfc3339(dt: &DateTime<FixedOffset>) -> TargetResult<String> {
    if !(1..=9999).contains(&dt.year()) {
        let reason = format!("year {} has no four-digit form", dt.year());
        return Err(TargetError::out_of_domain(reason));
    }
    if dt.offset().local_minus_utc() % 60 != 0 {
        let reason = format!("offset {} is not a whole minute", dt.offset());
        return Err(TargetError::out_of_domain(reason));
    }
    Ok(dt.to_rfc3339_opts(SecondsFormat::AutoSi, false))
}

fn from_rfc3339(text: &String) -> TargetResult<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(text).map_err(TargetError::failed)
}

pub fn register(registry: &mut Registry) -> Result<(), RegistryError> {
    registry.generators.register(DATE_TAG, dates().boxed())?;
    registry.generators.register(DATETIME_TAG, datetimes().boxed())?;
    let zone = daylight_saving_zone();
    registry.generators.register(INSTANT_TAG, instants(&zone).boxed())?;

    registry.properties.register(Property::new(
        "time.rfc3339_round_trip",
        "parse_from_rfc3339(to_rfc3339(t)) keeps both the instant and the offset",
        registry.generators.get::<DateTime<FixedOffset>>(DATETIME_TAG)?,
        Oracle::round_trip_by(
            to_rfc3339,
            from_rfc3339,
            |a: &DateTime<FixedOffset>, b: &DateTime<FixedOffset>| {
                a == b && a.offset() == b.offset()
            },
        ),
    ))?;

    registry.properties.register(Property::new(
        "time.iso_week_round_trip",
        "from_isoywd(iso_week(d), weekday(d)) == d",
        registry.generators.get::<NaiveDate>(DATE_TAG)?,
        Oracle::round_trip(
            |d: &NaiveDate| {
                let week = d.iso_week();
                Ok((week.year(), week.week(), d.weekday()))
            },
            |&(year, week, weekday): &(i32, u32, Weekday)| {
                NaiveDate::from_isoywd_opt(year, week, weekday).ok_or_else(|| {
                    TargetError::failed(format!("no date for {year}-W{week:02}-{weekday}"))
                })
            },
        ),
    ))?;

    let scan = zone.clone();
    registry.properties.register(Property::new(
        "time.zone_offset_differential",
        "binary-search offset lookup agrees with a linear scan near daylight saving transitions",
        registry.generators.get::<i64>(INSTANT_TAG)?,
        Oracle::differential(
            "search",
            move |t: &i64| Ok(zone.offset_at(*t)),
            "scan",
            move |t: &i64| Ok(scan.offset_at_scan(*t)),
        ),
    ))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{GenConfig, Trace, generate, replay};

    #[test]
    fn lookup_at_and_around_transitions() {
        let zone = transition_zone();
        let cases = [
            (0, 0),
            (999_999_999, 0),
            (1_000_000_000, 3600),
            (2_147_483_647, 3600),
            (2_147_483_648, 7200),
        ];
        for (t, expected) in cases {
            assert_eq!(zone.offset_at(t), expected, "{t}");
            assert_eq!(zone.offset_at_scan(t), expected, "{t}");
        }
    }

    #[test]
    fn daylight_saving_table_is_ordered() {
        let zone = daylight_saving_zone();
        assert_eq!(zone.transitions().len(), 2 * 131);
        assert!(zone.transitions().windows(2).all(|w| w[0].0 < w[1].0));
        // 2021-03-14T07:00:00Z
        assert_eq!(zone.offset_at(1_615_705_199), -5 * 3600);
        assert_eq!(zone.offset_at(1_615_705_200), -4 * 3600);
    }

    #[test]
    fn uniform_branch_replays_exact_instant() {
        let trace = Trace::new(vec![1, 2_147_483_648]);
        let v = replay(&instants(&transition_zone()), &trace, &GenConfig::default());
        assert_eq!(v.unwrap().value, 2_147_483_648);
    }

    #[test]
    fn near_branch_lands_on_transition() {
        let trace = Trace::new(vec![0, 1]);
        let v = replay(&instants(&transition_zone()), &trace, &GenConfig::default());
        assert_eq!(v.unwrap().value, 2_147_483_648);
    }

    #[test]
    fn rfc3339_rejects_unrepresentable_values() {
        let utc = FixedOffset::east_opt(0).unwrap();
        let far = utc.with_ymd_and_hms(10000, 1, 1, 0, 0, 0).unwrap();
        assert!(to_rfc3339(&far).unwrap_err().is_out_of_domain());
        let odd = FixedOffset::east_opt(61).unwrap().with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();
        assert!(to_rfc3339(&odd).unwrap_err().is_out_of_domain());
    }

    #[test]
    fn rfc3339_keeps_offset_and_fraction() {
        let ist = FixedOffset::east_opt(19800).unwrap();
        let t = ist.with_ymd_and_hms(1999, 12, 31, 23, 59, 59).unwrap()
            + chrono::Duration::nanoseconds(120);
        let text = to_rfc3339(&t).unwrap();
        assert_eq!(text, "1999-12-31T23:59:59.000000120+05:30");
        let back = from_rfc3339(&text).unwrap();
        assert_eq!(back, t);
        assert_eq!(back.offset(), t.offset());
    }

    #[test]
    fn dates_hit_year_edges() {
        let config = GenConfig::default();
        let mut edges = 0;
        for seed in 0..200 {
            let d = generate(&dates(), seed, &config).unwrap().value;
            if d.ordinal() == 1 || d.ordinal() >= 365 {
                edges += 1;
            }
        }
        assert!(edges > 0);
    }
}
