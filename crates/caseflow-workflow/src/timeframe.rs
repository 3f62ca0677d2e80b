//! 时间窗口过滤
//!
//! 按创建时间把病例集收窄到以 `now` 为终点的滑动窗口内

use caseflow_core::CaseRecord;
use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 时间窗口选择
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl Timeframe {
    /// 解析窗口键，未知键回落到一周
    pub fn from_key(key: &str) -> Self {
        match key.trim().to_ascii_lowercase().as_str() {
            "hour" => Timeframe::Hour,
            "day" => Timeframe::Day,
            "week" => Timeframe::Week,
            "month" => Timeframe::Month,
            "year" => Timeframe::Year,
            _ => Timeframe::Week,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Timeframe::Hour => "hour",
            Timeframe::Day => "day",
            Timeframe::Week => "week",
            Timeframe::Month => "month",
            Timeframe::Year => "year",
        }
    }

    /// 窗口起点。月和年按日历计算
    pub fn earliest(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let earliest = match self {
            Timeframe::Hour => now.checked_sub_signed(Duration::hours(1)),
            Timeframe::Day => now.checked_sub_signed(Duration::days(1)),
            Timeframe::Week => now.checked_sub_signed(Duration::days(7)),
            Timeframe::Month => now.checked_sub_months(Months::new(1)),
            Timeframe::Year => now.checked_sub_months(Months::new(12)),
        };
        earliest.unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

impl Default for Timeframe {
    fn default() -> Self {
        Timeframe::Week
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// 保留 `created_at >= now - window` 的病例，保持输入顺序
pub fn filter_by_timeframe(
    records: &[CaseRecord],
    timeframe: Timeframe,
    now: DateTime<Utc>,
) -> Vec<CaseRecord> {
    let earliest = timeframe.earliest(now);
    records
        .iter()
        .filter(|record| record.created_at >= earliest)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::case_created_at;
    use chrono::TimeZone;

    #[test]
    fn test_unknown_key_defaults_to_week() {
        assert_eq!(Timeframe::from_key("fortnight"), Timeframe::Week);
        assert_eq!(Timeframe::from_key("MONTH"), Timeframe::Month);
    }

    #[test]
    fn test_three_days_old_case_in_week_not_day() {
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
        let records = vec![case_created_at("c-1", now - Duration::days(3))];

        assert_eq!(filter_by_timeframe(&records, Timeframe::Week, now).len(), 1);
        assert!(filter_by_timeframe(&records, Timeframe::Day, now).is_empty());
    }

    #[test]
    fn test_window_boundary_is_inclusive() {
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
        let records = vec![
            case_created_at("edge", now - Duration::hours(1)),
            case_created_at("outside", now - Duration::hours(1) - Duration::seconds(1)),
        ];

        let kept = filter_by_timeframe(&records, Timeframe::Hour, now);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].case_id, "edge");
    }

    #[test]
    fn test_calendar_month_and_year() {
        let now = Utc.with_ymd_and_hms(2024, 3, 31, 8, 0, 0).unwrap();
        assert_eq!(
            Timeframe::Month.earliest(now),
            Utc.with_ymd_and_hms(2024, 2, 29, 8, 0, 0).unwrap()
        );
        assert_eq!(
            Timeframe::Year.earliest(now),
            Utc.with_ymd_and_hms(2023, 3, 31, 8, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_filter_is_idempotent_for_all_timeframes() {
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
        let records: Vec<CaseRecord> = [0i64, 2, 30, 200, 400, 800]
            .iter()
            .map(|days| case_created_at(&format!("c-{}", days), now - Duration::days(*days)))
            .collect();

        for timeframe in [
            Timeframe::Hour,
            Timeframe::Day,
            Timeframe::Week,
            Timeframe::Month,
            Timeframe::Year,
        ] {
            let once = filter_by_timeframe(&records, timeframe, now);
            let earliest = timeframe.earliest(now);
            assert!(once.iter().all(|r| r.created_at >= earliest));
            assert_eq!(filter_by_timeframe(&once, timeframe, now), once);
        }
    }
}
