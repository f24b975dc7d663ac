//! Totals, rates and funnel breakdowns over filtered record sets.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use dash_core::calculations::{rate, FunnelBreakdown};
use dash_core::models::{Dated, EmailCampaign, FieldValue, NormalizedRecord};
use serde::Serialize;

// ── EmailTotals ───────────────────────────────────────────────────────────────

/// Plain sums across a set of campaign rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EmailTotals {
    pub sent: u64,
    pub opened: u64,
    pub clicked: u64,
    pub unsubscribes: u64,
    pub bounces: u64,
    /// Number of rows summed.
    pub count: u32,
}

impl EmailTotals {
    /// Add a single row's counts to the running totals. Sums saturate at
    /// `u64::MAX`.
    pub fn add_campaign(&mut self, campaign: &EmailCampaign) {
        self.sent = self.sent.saturating_add(campaign.sent);
        self.opened = self.opened.saturating_add(campaign.opened);
        self.clicked = self.clicked.saturating_add(campaign.clicked);
        self.unsubscribes = self.unsubscribes.saturating_add(campaign.unsubscribes);
        self.bounces = self.bounces.saturating_add(campaign.bounces);
        self.count = self.count.saturating_add(1);
    }
}

// ── Derived rates ─────────────────────────────────────────────────────────────

/// Rate fields derived from a set of counts, all percentages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct EmailRates {
    pub open_rate: f64,
    pub click_rate: f64,
    /// Clicks as a share of opens.
    pub click_to_open_rate: f64,
    pub unsubscribe_rate: f64,
    pub bounce_rate: f64,
}

impl EmailRates {
    pub fn from_totals(t: &EmailTotals) -> Self {
        Self {
            open_rate: rate(t.opened, t.sent),
            click_rate: rate(t.clicked, t.sent),
            click_to_open_rate: rate(t.clicked, t.opened),
            unsubscribe_rate: rate(t.unsubscribes, t.sent),
            bounce_rate: rate(t.bounces, t.sent),
        }
    }
}

// ── AggregateMetrics ──────────────────────────────────────────────────────────

/// Read-only snapshot of one period's email performance.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateMetrics {
    pub totals: EmailTotals,
    #[serde(flatten)]
    pub rates: EmailRates,
    pub funnel: FunnelBreakdown,
}

// ── CampaignSummary ───────────────────────────────────────────────────────────

/// One campaign's counts and its own rates, computed from its own counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampaignSummary {
    pub name: String,
    /// Latest date the campaign has a row for, when any row is dated.
    pub last_sent: Option<NaiveDate>,
    pub totals: EmailTotals,
    #[serde(flatten)]
    pub rates: EmailRates,
}

// ── Breakdowns ────────────────────────────────────────────────────────────────

/// Total of one metric for one value of a dimension.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimensionTotal {
    pub key: String,
    pub total: f64,
    /// Percentage of the grand total across all keys.
    pub share: f64,
}

/// Total of one metric on one day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub total: f64,
}

// ── CampaignAggregator ────────────────────────────────────────────────────────

/// Stateless helper for period aggregates and per-entity summaries.
pub struct CampaignAggregator;

impl CampaignAggregator {
    /// Totals, rates and funnel for `campaigns`. An empty slice yields an
    /// all-zero snapshot.
    pub fn aggregate(campaigns: &[EmailCampaign]) -> AggregateMetrics {
        let mut totals = EmailTotals::default();
        for c in campaigns {
            totals.add_campaign(c);
        }
        let rates = EmailRates::from_totals(&totals);
        let funnel = FunnelBreakdown::from_counts(totals.sent, totals.opened, totals.clicked);
        AggregateMetrics {
            totals,
            rates,
            funnel,
        }
    }

    /// One summary per campaign name, in order of first appearance.
    ///
    /// Rows sharing a name (a campaign re-sent on several days) are summed
    /// before the rates are computed.
    pub fn summarize(campaigns: &[EmailCampaign]) -> Vec<CampaignSummary> {
        let mut order: Vec<CampaignSummary> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();

        for c in campaigns {
            let slot = *index.entry(c.name.as_str()).or_insert_with(|| {
                order.push(CampaignSummary {
                    name: c.name.clone(),
                    last_sent: None,
                    totals: EmailTotals::default(),
                    rates: EmailRates::default(),
                });
                order.len() - 1
            });
            let summary = &mut order[slot];
            summary.totals.add_campaign(c);
            summary.last_sent = summary.last_sent.max(Dated::date(c));
        }

        for summary in &mut order {
            summary.rates = EmailRates::from_totals(&summary.totals);
        }
        order
    }

    /// Sum `metric` per distinct value of the `dimension` text field.
    ///
    /// Sorted by total, descending; ties keep first-seen order.
    pub fn breakdown(
        records: &[NormalizedRecord],
        dimension: &str,
        metric: &str,
    ) -> Vec<DimensionTotal> {
        let mut order: Vec<DimensionTotal> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for r in records {
            let key = r.text(dimension);
            let slot = match index.get(key) {
                Some(&i) => i,
                None => {
                    index.insert(key.to_string(), order.len());
                    order.push(DimensionTotal {
                        key: key.to_string(),
                        total: 0.0,
                        share: 0.0,
                    });
                    order.len() - 1
                }
            };
            order[slot].total += r.number(metric);
        }

        let grand_total: f64 = order.iter().map(|d| d.total).sum();
        for d in &mut order {
            d.share = if grand_total == 0.0 {
                0.0
            } else {
                d.total / grand_total * 100.0
            };
        }

        order.sort_by(|a, b| b.total.total_cmp(&a.total));
        order
    }

    /// Sum `metric` per calendar day, ascending. Undated records are skipped.
    pub fn daily_series(records: &[NormalizedRecord], metric: &str) -> Vec<DailyPoint> {
        let mut map: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for r in records {
            if let Some(date) = r.date() {
                *map.entry(date).or_insert(0.0) += r.number(metric);
            }
        }
        map.into_iter()
            .map(|(date, total)| DailyPoint { date, total })
            .collect()
    }

    /// Sum of every count field across `records`, keyed by field.
    pub fn count_totals(records: &[NormalizedRecord]) -> BTreeMap<String, u64> {
        let mut totals: BTreeMap<String, u64> = BTreeMap::new();
        for r in records {
            for (key, value) in r.fields() {
                if let FieldValue::Count(n) = value {
                    let total = totals.entry(key.to_string()).or_insert(0);
                    *total = total.saturating_add(*n);
                }
            }
        }
        totals
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
