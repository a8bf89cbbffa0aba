use std::collections::BTreeMap;

use serde::Serialize;
use time::{Date, OffsetDateTime};

use super::repo_types::{CalorieEntry, EntrySource, NewCalorieEntry};
use crate::recognition::RecognitionResult;

/// One draft entry per detected item of a successful result, stamped with
/// the conversion time. A failed result yields nothing.
///
/// Every draft is tagged [`EntrySource::Estimate`], label recognitions
/// included.
pub fn to_calorie_entries(result: &RecognitionResult, user_id: i64) -> Vec<NewCalorieEntry> {
    if !result.success() {
        return Vec::new();
    }
    let logged_at = OffsetDateTime::now_utc();
    result
        .detected_items()
        .iter()
        .map(|item| NewCalorieEntry {
            user_id,
            calories: item.calories,
            food_name: Some(item.food_name.clone()),
            food_type: item.food_type.clone(),
            quantity: Some(item.quantity),
            unit: Some(item.unit.clone()),
            source: EntrySource::Estimate,
            image_path: None,
            notes: item.notes.clone(),
            logged_at,
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DailyTotal {
    pub day: Date,
    pub total_calories: f64,
    pub entries: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CalorieSummary {
    pub days: Vec<DailyTotal>,
    pub total_calories: f64,
    pub daily_average: f64,
}

/// Totals per UTC day, ascending. Days without entries are left out and do
/// not count toward the average.
pub fn summarize_daily(entries: &[CalorieEntry]) -> CalorieSummary {
    let mut by_day: BTreeMap<Date, DailyTotal> = BTreeMap::new();
    for e in entries {
        let day = e.logged_at.to_offset(time::UtcOffset::UTC).date();
        let slot = by_day.entry(day).or_insert(DailyTotal {
            day,
            total_calories: 0.0,
            entries: 0,
        });
        slot.total_calories += e.calories;
        slot.entries += 1;
    }

    let days: Vec<DailyTotal> = by_day.into_values().collect();
    let total_calories: f64 = days.iter().map(|d| d.total_calories).sum();
    let daily_average = if days.is_empty() {
        0.0
    } else {
        total_calories / days.len() as f64
    };
    CalorieSummary {
        days,
        total_calories,
        daily_average,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognition::{RecognitionError, RecognitionMethod};
    use time::macros::datetime;

    fn result_with_items(method: &str, n: usize) -> RecognitionResult {
        let items: Vec<_> = (0..n)
            .map(|i| {
                serde_json::json!({
                    "calories": 100.0 * (i as f64 + 1.0),
                    "food_name": format!("Item {i}"),
                    "food_type": "snack",
                    "quantity": 2,
                    "unit": "piece",
                    "notes": format!("note {i}")
                })
            })
            .collect();
        serde_json::from_value(serde_json::json!({
            "success": true,
            "method": method,
            "detected_items": items,
            "estimated_calories": 600,
            "confidence_score": 0.6,
            "error_message": null,
            "raw_data": null
        }))
        .unwrap()
    }

    fn entry(calories: f64, logged_at: OffsetDateTime) -> CalorieEntry {
        CalorieEntry {
            id: 1,
            user_id: 1,
            calories,
            food_name: None,
            food_type: None,
            quantity: None,
            unit: None,
            source: EntrySource::Manual,
            image_path: None,
            notes: None,
            logged_at,
            created_at: logged_at,
            updated_at: logged_at,
        }
    }

    #[test]
    fn three_items_make_three_estimate_drafts() {
        let before = OffsetDateTime::now_utc();
        let result = result_with_items("visual_estimation", 3);

        let drafts = to_calorie_entries(&result, 42);
        assert_eq!(drafts.len(), 3);
        for (i, d) in drafts.iter().enumerate() {
            assert_eq!(d.user_id, 42);
            assert_eq!(d.source, EntrySource::Estimate);
            assert_eq!(d.calories, 100.0 * (i as f64 + 1.0));
            assert_eq!(d.food_name.as_deref(), Some(format!("Item {i}").as_str()));
            assert_eq!(d.food_type.as_deref(), Some("snack"));
            assert_eq!(d.quantity, Some(2.0));
            assert_eq!(d.unit.as_deref(), Some("piece"));
            assert_eq!(d.notes.as_deref(), Some(format!("note {i}").as_str()));
            assert!(d.logged_at >= before);
        }
    }

    #[test]
    fn label_results_are_still_tagged_estimate() {
        let result = result_with_items("label_recognition", 1);
        assert_eq!(result.method(), RecognitionMethod::LabelRecognition);
        let drafts = to_calorie_entries(&result, 1);
        assert_eq!(drafts[0].source, EntrySource::Estimate);
    }

    #[test]
    fn failed_result_yields_no_drafts() {
        let err = RecognitionError::Model(anyhow::anyhow!("boom"));
        let result = RecognitionResult::failed(RecognitionMethod::VisualEstimation, &err);
        assert!(to_calorie_entries(&result, 1).is_empty());
    }

    #[test]
    fn summary_groups_by_utc_day() {
        let entries = vec![
            entry(300.0, datetime!(2026-10-16 08:00 UTC)),
            entry(500.0, datetime!(2026-10-16 19:30 UTC)),
            entry(700.0, datetime!(2026-10-18 12:00 UTC)),
            // 23:30 at -02:00 is already the 18th in UTC
            entry(100.0, datetime!(2026-10-17 23:30 -2)),
        ];

        let summary = summarize_daily(&entries);
        assert_eq!(summary.days.len(), 2);
        assert_eq!(summary.days[0].day, time::macros::date!(2026-10-16));
        assert_eq!(summary.days[0].total_calories, 800.0);
        assert_eq!(summary.days[0].entries, 2);
        assert_eq!(summary.days[1].day, time::macros::date!(2026-10-18));
        assert_eq!(summary.days[1].total_calories, 800.0);
        assert_eq!(summary.total_calories, 1600.0);
        assert_eq!(summary.daily_average, 800.0);
    }

    #[test]
    fn empty_summary_has_zero_average() {
        let summary = summarize_daily(&[]);
        assert!(summary.days.is_empty());
        assert_eq!(summary.daily_average, 0.0);
    }
}
