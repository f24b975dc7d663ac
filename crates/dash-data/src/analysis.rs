//! End-to-end email analysis.
//!
//! Takes normalized email rows and a [`ComparisonSpec`], and returns an
//! [`EmailReport`] ready for the presentation layer: per-period aggregates,
//! per-campaign summaries, top-N lists and period-over-period changes.

use std::collections::BTreeMap;

use chrono::Utc;
use dash_core::models::{ComparisonSpec, DateRange, EmailCampaign, NormalizedRecord};
use serde::Serialize;

use crate::aggregator::{
    AggregateMetrics, CampaignAggregator, CampaignSummary, DailyPoint, DimensionTotal,
};
use crate::filter::{count_undated, filter_by_range, split_by_comparison};
use crate::ranker::{
    average_rate, compare_aggregates, compare_entities, top_n, AveragePopulation, ByTotal,
    CampaignMetric, EntityComparison, MetricsComparison, RankedList,
};
use crate::schema::{FieldKind, Platform, Schema};

// ── Public types ──────────────────────────────────────────────────────────────

/// Everything the email widgets show for one period.
#[derive(Debug, Clone, Serialize)]
pub struct PeriodReport {
    pub range: DateRange,
    pub metrics: AggregateMetrics,
    pub campaigns: Vec<CampaignSummary>,
    pub top_by_open_rate: RankedList<CampaignSummary>,
    pub top_by_click_rate: RankedList<CampaignSummary>,
    /// Unweighted per-campaign mean, over every campaign in the period.
    pub average_open_rate: f64,
    pub average_click_rate: f64,
}

/// Metadata produced alongside the report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    /// ISO-8601 timestamp when this report was generated.
    pub generated_at: String,
    pub records_received: usize,
    /// Rows whose date did not parse; they belong to no period.
    pub records_undated: usize,
    pub records_in_period: usize,
    pub records_in_comparison: Option<usize>,
}

/// The complete output of [`analyze_email`].
#[derive(Debug, Clone, Serialize)]
pub struct EmailReport {
    pub metadata: ReportMetadata,
    pub current: PeriodReport,
    pub prior: Option<PeriodReport>,
    pub comparison: Option<MetricsComparison>,
    /// Per-campaign open-rate change, paired by campaign name.
    pub campaign_changes: Vec<EntityComparison>,
}

/// Per-file roll-up for the non-email platforms.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FileSummary {
    pub platform: Option<Platform>,
    pub records_in_period: usize,
    /// Sum of each count field.
    pub totals: BTreeMap<String, u64>,
    /// Sum of each number field and mean of each rate field.
    pub measures: BTreeMap<String, f64>,
    /// Field the breakdown and daily series are built from: the schema's
    /// first count field, else its first number or rate field.
    pub headline: Option<&'static str>,
    /// Headline metric split by the schema's first text field.
    pub breakdown: Option<RankedList<DimensionTotal>>,
    pub daily: Vec<DailyPoint>,
}

// ── Public functions ──────────────────────────────────────────────────────────

/// Run the email pipeline.
///
/// 1. Convert normalized rows into campaigns.
/// 2. Filter them into the primary (and comparison) period.
/// 3. Aggregate and summarize each period.
/// 4. Rank the top `top` campaigns by open and click rate.
/// 5. Compare the periods when a comparison range is given.
pub fn analyze_email(records: &[NormalizedRecord], spec: &ComparisonSpec, top: usize) -> EmailReport {
    let campaigns: Vec<EmailCampaign> = records.iter().map(EmailCampaign::from_record).collect();

    let (current_rows, prior_rows) = split_by_comparison(&campaigns, spec);
    let current = period_report(spec.primary, &current_rows, top);
    let prior = spec
        .comparison
        .zip(prior_rows.as_ref())
        .map(|(range, rows)| period_report(range, rows, top));

    let comparison = prior
        .as_ref()
        .map(|p| compare_aggregates(&current.metrics, &p.metrics));
    let campaign_changes = prior
        .as_ref()
        .map(|p| compare_entities(&current.campaigns, &p.campaigns, CampaignMetric::OpenRate))
        .unwrap_or_default();

    let metadata = ReportMetadata {
        generated_at: Utc::now().to_rfc3339(),
        records_received: campaigns.len(),
        records_undated: count_undated(&campaigns),
        records_in_period: current_rows.len(),
        records_in_comparison: prior_rows.as_ref().map(Vec::len),
    };

    tracing::debug!(
        received = metadata.records_received,
        in_period = metadata.records_in_period,
        undated = metadata.records_undated,
        "email analysis complete"
    );

    EmailReport {
        metadata,
        current,
        prior,
        comparison,
        campaign_changes,
    }
}

/// Roll up the rows of one `schema` file dated within `range`.
///
/// The breakdown keeps the `top` largest dimension values.
pub fn summarize_file(
    records: &[NormalizedRecord],
    schema: &Schema,
    range: &DateRange,
    top: usize,
) -> FileSummary {
    let in_period = filter_by_range(records, range);
    let headline = headline_metric(schema);

    let breakdown = headline
        .zip(schema.keys_of_kind(FieldKind::Text).next())
        .map(|(metric, dimension)| {
            let totals = CampaignAggregator::breakdown(&in_period, dimension, metric);
            top_n(&totals, ByTotal, top)
        });
    let daily = headline
        .map(|metric| CampaignAggregator::daily_series(&in_period, metric))
        .unwrap_or_default();

    FileSummary {
        platform: Some(schema.platform),
        records_in_period: in_period.len(),
        totals: CampaignAggregator::count_totals(&in_period),
        measures: measures(&in_period, schema),
        headline,
        breakdown,
        daily,
    }
}

// ── Private helpers ───────────────────────────────────────────────────────────

fn headline_metric(schema: &Schema) -> Option<&'static str> {
    [FieldKind::Count, FieldKind::Number, FieldKind::Rate]
        .into_iter()
        .find_map(|kind| schema.keys_of_kind(kind).next())
}

fn measures(records: &[NormalizedRecord], schema: &Schema) -> BTreeMap<String, f64> {
    let mut out = BTreeMap::new();
    for key in schema.keys_of_kind(FieldKind::Number) {
        out.insert(key.to_string(), records.iter().map(|r| r.number(key)).sum());
    }
    // No mean over zero rows.
    if !records.is_empty() {
        for key in schema.keys_of_kind(FieldKind::Rate) {
            let sum: f64 = records.iter().map(|r| r.number(key)).sum();
            out.insert(key.to_string(), sum / records.len() as f64);
        }
    }
    out
}

fn period_report(range: DateRange, rows: &[EmailCampaign], top: usize) -> PeriodReport {
    let metrics = CampaignAggregator::aggregate(rows);
    let campaigns = CampaignAggregator::summarize(rows);
    PeriodReport {
        range,
        metrics,
        top_by_open_rate: top_n(&campaigns, CampaignMetric::OpenRate, top),
        top_by_click_rate: top_n(&campaigns, CampaignMetric::ClickRate, top),
        average_open_rate: average_rate(
            &campaigns,
            CampaignMetric::OpenRate,
            AveragePopulation::All,
        ),
        average_click_rate: average_rate(
            &campaigns,
            CampaignMetric::ClickRate,
            AveragePopulation::All,
        ),
        campaigns,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::normalize_csv;
    use crate::schema::{EMAIL_CAMPAIGNS, FB_REACH, WEB_TRAFFIC, YT_AGE};
    use chrono::NaiveDate;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn range(start: NaiveDate, end: NaiveDate) -> DateRange {
        DateRange::new(start, end).unwrap()
    }

    const HEADER: &str = "Campaign,Email open rate (MPP excluded),Email click rate,Emails sent,Email opened (MPP excluded),Email clicked,Email unsubscribes,Email bounces,Date";

    fn email_records(lines: &[&str]) -> Vec<NormalizedRecord> {
        let text = format!("{}\n{}\n", HEADER, lines.join("\n"));
        normalize_csv(&text, &EMAIL_CAMPAIGNS).unwrap()
    }

    #[test]
    fn test_end_to_end_three_campaigns() {
        let records = email_records(&[
            "Half,0.5,0.1,100,50,10,0,0,2024-01-05",
            "None,0,0,100,0,0,0,0,2024-01-10",
            "All,1,1,100,100,100,0,0,2024-01-15",
        ]);
        let spec = ComparisonSpec::single(range(ymd(2024, 1, 1), ymd(2024, 1, 31)));
        let report = analyze_email(&records, &spec, 5);

        let m = &report.current.metrics;
        assert_eq!(m.totals.sent, 300);
        assert_eq!(m.totals.opened, 150);
        assert_eq!(m.totals.clicked, 110);
        assert!((m.funnel.not_opened - 50.0).abs() < 1e-9);
        assert!((m.funnel.opened_not_clicked - 13.33).abs() < 0.01);
        assert!((m.funnel.clicked - 36.67).abs() < 0.01);

        assert_eq!(report.current.top_by_open_rate.items[0].name, "All");
        assert_eq!(report.current.top_by_open_rate.items[2].name, "None");
        assert!((report.current.average_open_rate - 50.0).abs() < 1e-9);
        assert!(report.prior.is_none());
        assert!(report.comparison.is_none());
        assert!(report.campaign_changes.is_empty());
    }

    #[test]
    fn test_oversized_counts_still_aggregate() {
        let records = email_records(&[
            "Huge,0,0,1e20,10,1,0,0,2024-01-05",
            "Huge,0,0,1e20,10,1,0,0,2024-01-06",
        ]);
        let spec = ComparisonSpec::single(range(ymd(2024, 1, 1), ymd(2024, 1, 31)));
        let report = analyze_email(&records, &spec, 5);
        assert_eq!(report.current.metrics.totals.sent, u64::MAX);
        assert_eq!(report.current.metrics.totals.opened, 20);
        assert_eq!(report.current.campaigns[0].totals.sent, u64::MAX);
    }

    #[test]
    fn test_undated_rows_belong_to_no_period() {
        let records = email_records(&[
            "Dated,0,0,100,40,4,0,0,2024-01-05",
            "Undated,0,0,100,90,9,0,0,N/A",
        ]);
        let spec = ComparisonSpec::single(range(ymd(2024, 1, 1), ymd(2024, 1, 31)));
        let report = analyze_email(&records, &spec, 5);

        assert_eq!(report.metadata.records_received, 2);
        assert_eq!(report.metadata.records_undated, 1);
        assert_eq!(report.metadata.records_in_period, 1);
        assert_eq!(report.current.metrics.totals.sent, 100);
    }

    #[test]
    fn test_comparison_periods() {
        let records = email_records(&[
            "Weekly,0,0,100,20,2,0,0,2023-12-10",
            "Weekly,0,0,100,40,4,0,0,2024-01-10",
            "Launch,0,0,100,60,6,0,0,2024-01-12",
        ]);
        let spec = ComparisonSpec::against(
            range(ymd(2024, 1, 1), ymd(2024, 1, 31)),
            range(ymd(2023, 12, 1), ymd(2023, 12, 31)),
        );
        let report = analyze_email(&records, &spec, 5);

        assert_eq!(report.metadata.records_in_comparison, Some(1));
        let prior = report.prior.as_ref().unwrap();
        assert_eq!(prior.metrics.totals.sent, 100);

        let cmp = report.comparison.as_ref().unwrap();
        assert!((cmp.sent.change - 100.0).abs() < 1e-9);
        // 100 / 200 opened now vs 20 / 100 before.
        assert!((cmp.open_rate.change - 150.0).abs() < 1e-9);

        assert_eq!(report.campaign_changes.len(), 2);
        assert_eq!(report.campaign_changes[0].name, "Weekly");
        assert!((report.campaign_changes[0].change.change - 100.0).abs() < 1e-9);
        assert_eq!(report.campaign_changes[1].name, "Launch");
        assert_eq!(report.campaign_changes[1].change.change, 0.0);
    }

    #[test]
    fn test_empty_period_is_zeroed() {
        let spec = ComparisonSpec::against_previous(range(ymd(2024, 1, 1), ymd(2024, 1, 31)));
        let report = analyze_email(&[], &spec, 5);
        assert_eq!(report.current.metrics, AggregateMetrics::default());
        assert!(report.current.top_by_open_rate.is_empty());
        assert_eq!(report.current.average_open_rate, 0.0);
        assert_eq!(report.comparison.unwrap().open_rate.change, 0.0);
    }

    #[test]
    fn test_top_n_is_truncated() {
        let lines: Vec<String> = (0..8)
            .map(|i| format!("C{i},0,0,100,{},0,0,0,2024-01-0{}", i * 10, i + 1))
            .collect();
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let records = email_records(&refs);
        let spec = ComparisonSpec::single(range(ymd(2024, 1, 1), ymd(2024, 1, 31)));
        let report = analyze_email(&records, &spec, 5);
        assert_eq!(report.current.campaigns.len(), 8);
        assert_eq!(report.current.top_by_open_rate.len(), 5);
        assert_eq!(report.current.top_by_open_rate.items[0].name, "C7");
    }

    #[test]
    fn test_report_serializes_to_json() {
        let records = email_records(&["A,0,0,10,5,1,0,0,2024-01-05"]);
        let spec = ComparisonSpec::against_previous(range(ymd(2024, 1, 1), ymd(2024, 1, 31)));
        let json = serde_json::to_value(analyze_email(&records, &spec, 5)).unwrap();
        assert_eq!(json["current"]["metrics"]["totals"]["sent"], 10);
        assert_eq!(json["current"]["metrics"]["open_rate"], 50.0);
        assert!(json["comparison"]["open_rate"]["change"].is_number());
    }

    #[test]
    fn test_summarize_file() {
        let text = "Date,Reach\n2024-01-01,10\n2024-01-02,15\n2024-02-01,99\nN/A,5\n";
        let records = normalize_csv(text, &FB_REACH).unwrap();
        let summary =
            summarize_file(&records, &FB_REACH, &range(ymd(2024, 1, 1), ymd(2024, 1, 31)), 5);
        assert_eq!(summary.platform, Some(Platform::Social));
        assert_eq!(summary.records_in_period, 2);
        assert_eq!(summary.totals.get("reach"), Some(&25));
        assert_eq!(summary.headline, Some("reach"));
        // No text field to split by.
        assert!(summary.breakdown.is_none());
        let daily: Vec<f64> = summary.daily.iter().map(|p| p.total).collect();
        assert_eq!(daily, vec![10.0, 15.0]);
    }

    #[test]
    fn test_summarize_file_breakdown_and_measures() {
        let text = "Date,Session source,Sessions,Users,Engaged sessions,Engagement rate,Bounce rate\n\
                    2024-01-01,google,100,80,60,0.6,0.4\n\
                    2024-01-01,direct,50,40,20,0.4,0.6\n\
                    2024-01-02,google,30,20,10,0.5,0.5\n\
                    2024-01-03,newsletter,10,10,5,0.5,0.5\n\
                    2024-03-01,google,999,999,999,0.1,0.9\n";
        let records = normalize_csv(text, &WEB_TRAFFIC).unwrap();
        let summary =
            summarize_file(&records, &WEB_TRAFFIC, &range(ymd(2024, 1, 1), ymd(2024, 1, 31)), 2);

        assert_eq!(summary.records_in_period, 4);
        assert_eq!(summary.headline, Some("sessions"));
        assert_eq!(summary.totals.get("sessions"), Some(&190));
        assert!((summary.measures["bounce_rate"] - 50.0).abs() < 1e-9);
        assert!((summary.measures["engagement_rate"] - 50.0).abs() < 1e-9);

        let breakdown = summary.breakdown.unwrap();
        assert_eq!(breakdown.metric, "total");
        let keys: Vec<&str> = breakdown.items.iter().map(|d| d.key.as_str()).collect();
        assert_eq!(keys, vec!["google", "direct"]);
        assert_eq!(breakdown.items[0].total, 130.0);

        let daily: Vec<(NaiveDate, f64)> = summary.daily.iter().map(|p| (p.date, p.total)).collect();
        assert_eq!(
            daily,
            vec![
                (ymd(2024, 1, 1), 150.0),
                (ymd(2024, 1, 2), 30.0),
                (ymd(2024, 1, 3), 10.0),
            ]
        );
    }

    #[test]
    fn test_summarize_file_sums_number_fields() {
        let text = "Date,Viewer age,Views (%),Watch time (hours) (%)\n\
                    2024-01-01,18-24,60,55\n\
                    2024-01-01,25-34,40,45\n";
        let records = normalize_csv(text, &YT_AGE).unwrap();
        let summary =
            summarize_file(&records, &YT_AGE, &range(ymd(2024, 1, 1), ymd(2024, 1, 31)), 5);

        assert!(summary.totals.is_empty());
        assert_eq!(summary.headline, Some("views_percent"));
        assert_eq!(summary.measures["views_percent"], 100.0);
        assert_eq!(summary.breakdown.unwrap().items[0].key, "18-24");
    }

    #[test]
    fn test_summarize_file_empty_period_has_no_rate_means() {
        let summary = summarize_file(&[], &WEB_TRAFFIC, &range(ymd(2024, 1, 1), ymd(2024, 1, 31)), 5);
        assert_eq!(summary.records_in_period, 0);
        assert!(!summary.measures.contains_key("bounce_rate"));
        assert!(summary.breakdown.unwrap().is_empty());
        assert!(summary.daily.is_empty());
    }
}
