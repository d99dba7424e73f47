use chrono::{DateTime, Duration, Utc};

use crate::{config::StalenessThreshold, registry::Record};

/// The instant before which a status change counts as stale.
///
/// Saturates at the earliest representable instant for absurdly large
/// thresholds, which selects nothing.
pub fn cutoff(now: DateTime<Utc>, threshold: StalenessThreshold) -> DateTime<Utc> {
    Duration::try_milliseconds(threshold.as_millis())
        .and_then(|age| now.checked_sub_signed(age))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// True when the worker's last status change is strictly before `cutoff`.
///
/// A worker that never changed status is treated as having changed at the
/// Unix epoch.
pub fn is_stale(record: &Record, cutoff: DateTime<Utc>) -> bool {
    record
        .date_status_changed
        .unwrap_or(DateTime::UNIX_EPOCH)
        < cutoff
}

/// Keep the stale workers, in listing order.
pub fn filter_stale(records: Vec<Record>, cutoff: DateTime<Utc>) -> Vec<Record> {
    records
        .into_iter()
        .filter(|record| is_stale(record, cutoff))
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::sweep::tests::record;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn days(n: f64) -> StalenessThreshold {
        StalenessThreshold::new(n).unwrap()
    }

    #[test]
    fn test_cutoff() {
        assert_eq!(
            cutoff(now(), days(30.0)),
            Utc.with_ymd_and_hms(2024, 5, 2, 12, 0, 0).unwrap()
        );
        assert_eq!(
            cutoff(now(), days(0.5)),
            Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(cutoff(now(), days(0.0)), now());
    }

    #[test]
    fn test_cutoff_saturates() {
        assert_eq!(cutoff(now(), days(1e12)), DateTime::<Utc>::MIN_UTC);
    }

    #[test]
    fn test_forty_days_stale_five_days_not() {
        let cutoff = cutoff(now(), days(30.0));
        let records = vec![
            record("WK_OLD", now() - Duration::days(40), "{}"),
            record("WK_NEW", now() - Duration::days(5), "{}"),
        ];

        let stale = filter_stale(records, cutoff);
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].sid, "WK_OLD");
    }

    #[test]
    fn test_equal_to_cutoff_is_not_stale() {
        let cutoff = cutoff(now(), days(30.0));
        assert!(!is_stale(&record("WK1", cutoff, "{}"), cutoff));
        assert!(is_stale(
            &record("WK2", cutoff - Duration::milliseconds(1), "{}"),
            cutoff
        ));
    }

    #[test]
    fn test_missing_status_change_is_stale() {
        let mut worker = record("WK1", now(), "{}");
        worker.date_status_changed = None;
        assert!(is_stale(&worker, cutoff(now(), days(30.0))));
    }

    #[test]
    fn test_preserves_listing_order() {
        let old = now() - Duration::days(100);
        let records = vec![
            record("WK3", old, "{}"),
            record("WK1", old + Duration::days(10), "{}"),
            record("WK2", old - Duration::days(10), "{}"),
        ];
        let sids: Vec<_> = filter_stale(records, cutoff(now(), days(30.0)))
            .into_iter()
            .map(|r| r.sid)
            .collect();
        assert_eq!(sids, vec!["WK3", "WK1", "WK2"]);
    }
}
