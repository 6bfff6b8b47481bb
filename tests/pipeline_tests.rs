use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};
use pretty_assertions::assert_eq;
use recovery_flux::config::FluxConfig;
use recovery_flux::schema::InputReader;
use recovery_flux::store::ReportStore;
use recovery_flux::types::{
    Confidence, DailySample, GoalObservation, HrZone, Metric, PatternConfidence, RecoveryCategory,
};
use recovery_flux::{score_day, ComputeError, FluxProcessor};

fn day(n: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 4).unwrap() + Duration::days(n)
}

/// Four weeks of plausible data; training load alternates and recovery
/// follows it the next morning through HRV.
fn month_of_samples() -> Vec<DailySample> {
    (0..28)
        .map(|i| {
            let hard_day = i % 2 == 0;
            let mut s = DailySample::new(day(i));
            s.hrv_ms = Some(if hard_day { 58.0 } else { 68.0 } + (i % 3) as f64);
            s.resting_hr_bpm = Some(if hard_day { 56.0 } else { 52.0 });
            s.sleep_hours = Some(7.0 + (i % 4) as f64 * 0.25);
            s.sleep_efficiency = Some(0.88);
            s.bedtime = NaiveTime::from_hms_opt(22, 30 + (i % 3) as u32 * 10, 0);
            s.wake_time = NaiveTime::from_hms_opt(6, 30, 0);
            s.zone_minutes
                .insert(HrZone::Zone3, if hard_day { 60.0 } else { 10.0 });
            s.active_energy_kcal = if hard_day { 900.0 } else { 300.0 };
            s
        })
        .collect()
}

#[test]
fn test_end_to_end_from_ndjson() {
    let ndjson = r#"
{"record_type": "sample", "date": "2024-03-04", "hrv_ms": 62.0, "resting_hr_bpm": 54.0, "sleep_hours": 7.5, "sleep_efficiency": 0.9, "bedtime": "22:45:00", "wake_time": "06:15:00"}
{"record_type": "sample", "date": "2024-03-05", "hrv_ms": 60.0, "resting_hr_bpm": 55.0, "sleep_hours": 7.0, "sleep_efficiency": 0.85, "bedtime": "23:00:00", "wake_time": "06:00:00"}
{"record_type": "sample", "date": "2024-03-06", "hrv_ms": 64.0, "resting_hr_bpm": 53.0, "sleep_hours": 8.0, "sleep_efficiency": 0.92, "bedtime": "22:30:00", "wake_time": "06:30:00"}
{"record_type": "sample", "date": "2024-03-07", "hrv_ms": 70.0, "resting_hr_bpm": 51.0, "sleep_hours": 8.2, "sleep_efficiency": 0.94, "bedtime": "22:40:00", "wake_time": "06:40:00", "zone_minutes": {"zone2": 40.0}, "active_energy_kcal": 500.0}
{"record_type": "goal", "date": "2024-03-07", "goal_id": "meditation", "value": 1.0}
"#;
    let records = InputReader::parse_ndjson(ndjson).unwrap();
    let (samples, goals) = InputReader::split(records).unwrap();
    assert_eq!(samples.len(), 4);
    assert_eq!(goals.len(), 1);

    let mut processor = FluxProcessor::new(FluxConfig::default()).unwrap();
    let reports = processor.ingest_all(samples).unwrap();
    let last = reports.last().unwrap();

    // Three prior days make a valid baseline, and today beats all of them
    let hrv = last.hrv_deviation.unwrap();
    assert_eq!(hrv.confidence, Confidence::High);
    assert!(hrv.z_score > 1.0);
    assert!(!hrv.in_range);

    let recovery = last.recovery.as_ref().unwrap();
    assert_eq!(recovery.category, RecoveryCategory::Optimal);
    assert_eq!(recovery.confidence, Confidence::High);
    assert!(!last.consistency.insufficient_data);
    assert!(last.strain.value > 0.0);
    assert!(last.strain.value <= last.strain.scale_max);
}

#[test]
fn test_scores_stay_in_bounds() {
    let samples = month_of_samples();
    let mut processor = FluxProcessor::new(FluxConfig::default()).unwrap();
    for report in processor.ingest_all(samples).unwrap() {
        if let Some(recovery) = &report.recovery {
            assert!(recovery.score <= 100);
            let weights: f64 = recovery.components.iter().map(|c| c.weight).sum();
            assert!((weights - 1.0).abs() < 1e-9);
        }
        if let Some(sleep) = &report.sleep {
            assert!((0.0..=100.0).contains(&sleep.score));
        }
        assert!((0.0..=1.0).contains(&report.consistency.consistency_score));
        assert!((0.0..=21.0).contains(&report.strain.value));
        assert!((0.0..=100.0).contains(&report.strain.normalized()));
    }
}

#[test]
fn test_batch_and_incremental_agree_regardless_of_arrival_order() {
    let samples = month_of_samples();
    let mut reversed = samples.clone();
    reversed.reverse();

    let mut processor = FluxProcessor::new(FluxConfig::default()).unwrap();
    for sample in reversed {
        processor.ingest(sample).unwrap();
    }

    for sample in &samples {
        let stored = processor.store().report(sample.date).unwrap();
        let batch = score_day(&FluxConfig::default(), &samples, sample.date).unwrap();
        assert_eq!(stored, batch);
    }
}

#[test]
fn test_patterns_find_load_and_recovery_link() {
    let mut processor = FluxProcessor::new(FluxConfig::default()).unwrap();
    processor.ingest_all(month_of_samples()).unwrap();

    let goals: Vec<GoalObservation> = (0..28)
        .map(|i| GoalObservation {
            date: day(i),
            goal_id: "evening_walk".to_string(),
            value: if i % 2 == 0 { 0.0 } else { 1.0 },
        })
        .collect();
    let report = processor.detect_patterns(&goals).unwrap();
    assert!(!report.patterns.is_empty());

    // Sorted strongest first
    for pair in report.patterns.windows(2) {
        assert!(pair[0].correlation.abs() >= pair[1].correlation.abs());
    }

    let strain_recovery = report
        .patterns
        .iter()
        .find(|p| p.metric_a == Metric::Strain && p.metric_b == Metric::Recovery && p.lag_days == 0)
        .unwrap();
    assert!(strain_recovery.correlation < -0.7);
    assert_eq!(strain_recovery.confidence, PatternConfidence::High);

    let walk_hrv = report
        .patterns
        .iter()
        .find(|p| p.metric_a == Metric::Goal("evening_walk".to_string()) && p.metric_b == Metric::Hrv && p.lag_days == 0)
        .unwrap();
    assert!(walk_hrv.correlation > 0.7);
    assert!(!walk_hrv.recommendation.is_empty());
}

#[test]
fn test_weekly_rollup_with_sunday_start() {
    let mut config = FluxConfig::default();
    config.week.first_day = Weekday::Sun;
    let mut processor = FluxProcessor::new(config).unwrap();
    processor.ingest_all(month_of_samples()).unwrap();

    let weeks = processor.weekly_summaries().unwrap();
    // Monday 2024-03-04 through Sunday 2024-03-31 touches five Sunday weeks
    assert_eq!(weeks.len(), 5);
    assert_eq!(weeks[0].week_start, NaiveDate::from_ymd_opt(2024, 3, 3).unwrap());
    assert_eq!(weeks[0].records.len(), 6);
    assert_eq!(weeks[4].records.len(), 1);
    assert!(weeks.iter().all(|w| w.week_start.weekday() == Weekday::Sun));
}

#[test]
fn test_duplicate_sample_in_input_is_rejected() {
    let json = r#"[
        {"record_type": "sample", "date": "2024-03-04", "hrv_ms": 60.0},
        {"record_type": "sample", "date": "2024-03-04", "hrv_ms": 61.0}
    ]"#;
    let records = InputReader::parse_array(json).unwrap();
    assert!(matches!(
        InputReader::split(records),
        Err(ComputeError::DuplicateSample(_))
    ));
}

#[test]
fn test_config_file_round_trip_through_processor() {
    let json = r#"{"recovery_weights": {"hrv": 0.4, "rhr": 0.4, "sleep": 0.2}}"#;
    let config = FluxConfig::from_json(json).unwrap();
    assert_eq!(config.recovery_weights.rhr, 0.4);
    assert!(FluxProcessor::new(config).is_ok());

    let bad = r#"{"recovery_weights": {"hrv": 0.9, "rhr": 0.4, "sleep": 0.2}}"#;
    assert!(matches!(
        FluxConfig::from_json(bad),
        Err(ComputeError::InvalidConfig(_))
    ));
}
