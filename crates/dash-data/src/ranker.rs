//! Top-N ranking and period-over-period comparison.

use std::cmp::Ordering;

use dash_core::calculations::percent_change;
use serde::{Deserialize, Serialize};

use crate::aggregator::{AggregateMetrics, CampaignSummary, DimensionTotal};

// ── Metric keys ───────────────────────────────────────────────────────────────

/// Something that extracts a rankable value from an item.
pub trait MetricKey<T> {
    fn value(&self, item: &T) -> f64;
    fn name(&self) -> &'static str;
}

/// Campaign metrics the dashboards rank and compare by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignMetric {
    Sent,
    Opened,
    Clicked,
    Unsubscribes,
    Bounces,
    OpenRate,
    ClickRate,
    ClickToOpenRate,
    UnsubscribeRate,
    BounceRate,
}

impl MetricKey<CampaignSummary> for CampaignMetric {
    fn value(&self, s: &CampaignSummary) -> f64 {
        match self {
            CampaignMetric::Sent => s.totals.sent as f64,
            CampaignMetric::Opened => s.totals.opened as f64,
            CampaignMetric::Clicked => s.totals.clicked as f64,
            CampaignMetric::Unsubscribes => s.totals.unsubscribes as f64,
            CampaignMetric::Bounces => s.totals.bounces as f64,
            CampaignMetric::OpenRate => s.rates.open_rate,
            CampaignMetric::ClickRate => s.rates.click_rate,
            CampaignMetric::ClickToOpenRate => s.rates.click_to_open_rate,
            CampaignMetric::UnsubscribeRate => s.rates.unsubscribe_rate,
            CampaignMetric::BounceRate => s.rates.bounce_rate,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            CampaignMetric::Sent => "sent",
            CampaignMetric::Opened => "opened",
            CampaignMetric::Clicked => "clicked",
            CampaignMetric::Unsubscribes => "unsubscribes",
            CampaignMetric::Bounces => "bounces",
            CampaignMetric::OpenRate => "open_rate",
            CampaignMetric::ClickRate => "click_rate",
            CampaignMetric::ClickToOpenRate => "click_to_open_rate",
            CampaignMetric::UnsubscribeRate => "unsubscribe_rate",
            CampaignMetric::BounceRate => "bounce_rate",
        }
    }
}

/// Ranks [`DimensionTotal`]s by their summed total.
#[derive(Debug, Clone, Copy)]
pub struct ByTotal;

impl MetricKey<DimensionTotal> for ByTotal {
    fn value(&self, item: &DimensionTotal) -> f64 {
        item.total
    }

    fn name(&self) -> &'static str {
        "total"
    }
}

// ── Ranking ───────────────────────────────────────────────────────────────────

/// The top entries by one metric, highest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedList<T> {
    pub metric: &'static str,
    pub items: Vec<T>,
}

impl<T> RankedList<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Up to `n` items sorted descending by `key`. Equal values keep their input
/// order; NaN ranks last.
pub fn top_n<T: Clone, K: MetricKey<T>>(items: &[T], key: K, n: usize) -> RankedList<T> {
    let mut ranked: Vec<&T> = items.iter().collect();
    // `sort_by` is stable, which gives the tie-break.
    ranked.sort_by(|a, b| descending(key.value(a), key.value(b)));
    RankedList {
        metric: key.name(),
        items: ranked.into_iter().take(n).cloned().collect(),
    }
}

fn descending(a: f64, b: f64) -> Ordering {
    rank_value(b).total_cmp(&rank_value(a))
}

fn rank_value(v: f64) -> f64 {
    if v.is_nan() {
        f64::NEG_INFINITY
    } else {
        // Folds -0.0 into 0.0 so they tie.
        v + 0.0
    }
}

// ── Averages ──────────────────────────────────────────────────────────────────

/// Which campaigns an average is taken over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AveragePopulation {
    /// Every campaign in the period.
    All,
    /// Only the best `n` campaigns by the averaged metric.
    TopN(usize),
}

/// Unweighted mean of `metric` across the chosen population, `0.0` when the
/// population is empty.
///
/// This is the mean of per-campaign values; the volume-weighted rate for the
/// period lives on [`AggregateMetrics`].
pub fn average_rate(
    summaries: &[CampaignSummary],
    metric: CampaignMetric,
    population: AveragePopulation,
) -> f64 {
    let values: Vec<f64> = match population {
        AveragePopulation::All => summaries.iter().map(|s| metric.value(s)).collect(),
        AveragePopulation::TopN(n) => top_n(summaries, metric, n)
            .items
            .iter()
            .map(|s| metric.value(s))
            .collect(),
    };
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

// ── Comparison ────────────────────────────────────────────────────────────────

/// One metric in two periods.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricChange {
    pub current: f64,
    pub prior: f64,
    /// Percent change from `prior`; 0 when `prior` is 0.
    pub change: f64,
}

impl MetricChange {
    pub fn new(current: f64, prior: f64) -> Self {
        Self {
            current,
            prior,
            change: percent_change(current, prior),
        }
    }
}

/// Period-over-period view of the headline email metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsComparison {
    pub sent: MetricChange,
    pub opened: MetricChange,
    pub clicked: MetricChange,
    pub open_rate: MetricChange,
    pub click_rate: MetricChange,
    pub click_to_open_rate: MetricChange,
    pub unsubscribe_rate: MetricChange,
    pub bounce_rate: MetricChange,
}

/// Compare two period aggregates metric by metric.
pub fn compare_aggregates(
    current: &AggregateMetrics,
    prior: &AggregateMetrics,
) -> MetricsComparison {
    let (c, p) = (current, prior);
    MetricsComparison {
        sent: MetricChange::new(c.totals.sent as f64, p.totals.sent as f64),
        opened: MetricChange::new(c.totals.opened as f64, p.totals.opened as f64),
        clicked: MetricChange::new(c.totals.clicked as f64, p.totals.clicked as f64),
        open_rate: MetricChange::new(c.rates.open_rate, p.rates.open_rate),
        click_rate: MetricChange::new(c.rates.click_rate, p.rates.click_rate),
        click_to_open_rate: MetricChange::new(
            c.rates.click_to_open_rate,
            p.rates.click_to_open_rate,
        ),
        unsubscribe_rate: MetricChange::new(c.rates.unsubscribe_rate, p.rates.unsubscribe_rate),
        bounce_rate: MetricChange::new(c.rates.bounce_rate, p.rates.bounce_rate),
    }
}

/// One campaign's metric across two periods.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityComparison {
    pub name: String,
    #[serde(flatten)]
    pub change: MetricChange,
    pub in_current: bool,
    pub in_prior: bool,
}

/// Pair campaigns across periods by name.
///
/// Campaigns in `current` come first, in their order, followed by those only
/// in `prior`. A campaign missing from a period counts as zero there.
pub fn compare_entities(
    current: &[CampaignSummary],
    prior: &[CampaignSummary],
    metric: CampaignMetric,
) -> Vec<EntityComparison> {
    let find = |set: &[CampaignSummary], name: &str| -> Option<f64> {
        set.iter().find(|s| s.name == name).map(|s| metric.value(s))
    };

    let mut out: Vec<EntityComparison> = current
        .iter()
        .map(|s| {
            let prior_value = find(prior, &s.name);
            EntityComparison {
                name: s.name.clone(),
                change: MetricChange::new(metric.value(s), prior_value.unwrap_or(0.0)),
                in_current: true,
                in_prior: prior_value.is_some(),
            }
        })
        .collect();

    out.extend(
        prior
            .iter()
            .filter(|p| find(current, &p.name).is_none())
            .map(|p| EntityComparison {
                name: p.name.clone(),
                change: MetricChange::new(0.0, metric.value(p)),
                in_current: false,
                in_prior: true,
            }),
    );

    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────
