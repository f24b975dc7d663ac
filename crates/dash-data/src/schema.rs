//! Platform export schemas.
//!
//! Each logical file the dashboards read has one [`Schema`] mapping the
//! platform's column headers onto stable internal field keys. Nothing past the
//! normalizer sees a raw header string.

use dash_core::models::{EmailCampaign, DATE_FIELD};
use serde::Serialize;

/// Marketing platform a file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Email,
    Social,
    Web,
    Video,
}

/// How a column's cells are coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Free text; empty becomes `"Unknown"`.
    Text,
    /// Date as written in the export; empty becomes `"Unknown"`.
    Date,
    /// Non-negative integer count; bad cells become 0.
    Count,
    /// Any float; bad cells become 0.
    Number,
    /// A 0-1 fraction stored as a 0-100 percentage.
    Rate,
}

/// One field of a schema.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Internal key the value is stored under.
    pub key: &'static str,
    /// Accepted column headers, in order of preference.
    pub headers: &'static [&'static str],
    pub kind: FieldKind,
}

impl FieldSpec {
    const fn new(key: &'static str, headers: &'static [&'static str], kind: FieldKind) -> Self {
        Self { key, headers, kind }
    }
}

/// Column layout of one logical export file.
#[derive(Debug)]
pub struct Schema {
    pub file_name: &'static str,
    pub platform: Platform,
    pub fields: &'static [FieldSpec],
}

impl Schema {
    pub fn field(&self, key: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.key == key)
    }

    /// Keys of every field with the given kind, in declaration order.
    pub fn keys_of_kind(&self, kind: FieldKind) -> impl Iterator<Item = &'static str> + '_ {
        self.fields
            .iter()
            .filter(move |f| f.kind == kind)
            .map(|f| f.key)
    }
}

use FieldKind::{Count, Date, Number, Rate, Text};

const DATE: FieldSpec = FieldSpec::new(DATE_FIELD, &["Date", "Day"], Date);

// ── Email ─────────────────────────────────────────────────────────────────────

pub const EMAIL_CAMPAIGNS_FILE: &str = "Email_Campaigns.csv";

pub static EMAIL_CAMPAIGNS: Schema = Schema {
    file_name: EMAIL_CAMPAIGNS_FILE,
    platform: Platform::Email,
    fields: &[
        FieldSpec::new(EmailCampaign::NAME, &["Campaign", "Campaign name"], Text),
        FieldSpec::new("open_rate", &["Email open rate (MPP excluded)"], Rate),
        FieldSpec::new("click_rate", &["Email click rate"], Rate),
        FieldSpec::new(EmailCampaign::SENT, &["Emails sent"], Count),
        FieldSpec::new(EmailCampaign::OPENED, &["Email opened (MPP excluded)"], Count),
        FieldSpec::new(EmailCampaign::CLICKED, &["Email clicked"], Count),
        FieldSpec::new(EmailCampaign::UNSUBSCRIBES, &["Email unsubscribes"], Count),
        FieldSpec::new(EmailCampaign::BOUNCES, &["Email bounces"], Count),
        DATE,
    ],
};

// ── Social ────────────────────────────────────────────────────────────────────

pub static FB_FOLLOWS: Schema = Schema {
    file_name: "FB_Follows.csv",
    platform: Platform::Social,
    fields: &[
        DATE,
        FieldSpec::new("follows", &["Follows", "Facebook follows"], Count),
        FieldSpec::new("unfollows", &["Unfollows", "Facebook unfollows"], Count),
    ],
};

pub static FB_REACH: Schema = Schema {
    file_name: "FB_Reach.csv",
    platform: Platform::Social,
    fields: &[
        DATE,
        FieldSpec::new("reach", &["Reach", "Facebook reach"], Count),
    ],
};

pub static FB_VISITS: Schema = Schema {
    file_name: "FB_Visits.csv",
    platform: Platform::Social,
    fields: &[
        DATE,
        FieldSpec::new("visits", &["Visits", "Facebook visits"], Count),
    ],
};

pub static FB_INTERACTIONS: Schema = Schema {
    file_name: "FB_Interactions.csv",
    platform: Platform::Social,
    fields: &[
        DATE,
        FieldSpec::new("content", &["Post", "Content", "Title"], Text),
        FieldSpec::new("reactions", &["Reactions"], Count),
        FieldSpec::new("comments", &["Comments"], Count),
        FieldSpec::new("shares", &["Shares"], Count),
        FieldSpec::new("interactions", &["Interactions", "Content interactions"], Count),
    ],
};

// ── Web ───────────────────────────────────────────────────────────────────────

pub static WEB_DEMOGRAPHICS: Schema = Schema {
    file_name: "Web_Demographics.csv",
    platform: Platform::Web,
    fields: &[
        DATE,
        FieldSpec::new("country", &["Country"], Text),
        FieldSpec::new("age_group", &["Age", "Age bracket"], Text),
        FieldSpec::new("gender", &["Gender"], Text),
        FieldSpec::new("users", &["Active users", "Users"], Count),
        FieldSpec::new("new_users", &["New users"], Count),
    ],
};

pub static WEB_TRAFFIC: Schema = Schema {
    file_name: "Web_Traffic.csv",
    platform: Platform::Web,
    fields: &[
        DATE,
        FieldSpec::new("source", &["Session source", "Source", "Channel"], Text),
        FieldSpec::new("sessions", &["Sessions"], Count),
        FieldSpec::new("users", &["Users", "Active users"], Count),
        FieldSpec::new("engaged_sessions", &["Engaged sessions"], Count),
        FieldSpec::new("engagement_rate", &["Engagement rate"], Rate),
        FieldSpec::new("bounce_rate", &["Bounce rate"], Rate),
    ],
};

pub static WEB_PAGES: Schema = Schema {
    file_name: "Web_Pages.csv",
    platform: Platform::Web,
    fields: &[
        DATE,
        FieldSpec::new("page", &["Page path", "Page title", "Page"], Text),
        FieldSpec::new("views", &["Views", "Pageviews"], Count),
        FieldSpec::new("users", &["Users", "Active users"], Count),
        FieldSpec::new(
            "avg_engagement_seconds",
            &["Average engagement time", "Avg. engagement time"],
            Number,
        ),
    ],
};

pub static WEB_UTM: Schema = Schema {
    file_name: "Web_UTM.csv",
    platform: Platform::Web,
    fields: &[
        DATE,
        FieldSpec::new("campaign", &["Session campaign", "UTM campaign", "Campaign"], Text),
        FieldSpec::new("source", &["Session source", "UTM source", "Source"], Text),
        FieldSpec::new("medium", &["Session medium", "UTM medium", "Medium"], Text),
        FieldSpec::new("sessions", &["Sessions"], Count),
        FieldSpec::new("conversions", &["Conversions", "Key events"], Count),
    ],
};

// ── Video ─────────────────────────────────────────────────────────────────────

pub static YT_AGE: Schema = Schema {
    file_name: "YT_Age.csv",
    platform: Platform::Video,
    fields: &[
        DATE,
        FieldSpec::new("age_group", &["Viewer age", "Age"], Text),
        FieldSpec::new("views_percent", &["Views (%)"], Number),
        FieldSpec::new("watch_time_percent", &["Watch time (hours) (%)"], Number),
    ],
};

pub static YT_GENDER: Schema = Schema {
    file_name: "YT_Gender.csv",
    platform: Platform::Video,
    fields: &[
        DATE,
        FieldSpec::new("gender", &["Viewer gender", "Gender"], Text),
        FieldSpec::new("views_percent", &["Views (%)"], Number),
        FieldSpec::new("watch_time_percent", &["Watch time (hours) (%)"], Number),
    ],
};

pub static YT_GEOGRAPHY: Schema = Schema {
    file_name: "YT_Geography.csv",
    platform: Platform::Video,
    fields: &[
        DATE,
        FieldSpec::new("country", &["Geography", "Country"], Text),
        FieldSpec::new("views", &["Views"], Count),
        FieldSpec::new("watch_time_hours", &["Watch time (hours)"], Number),
    ],
};

pub static YT_SUBSCRIPTION: Schema = Schema {
    file_name: "YT_Subscription.csv",
    platform: Platform::Video,
    fields: &[
        DATE,
        FieldSpec::new("status", &["Subscription status"], Text),
        FieldSpec::new("views", &["Views"], Count),
        FieldSpec::new("watch_time_hours", &["Watch time (hours)"], Number),
    ],
};

pub static YT_CONTENT: Schema = Schema {
    file_name: "YT_Content.csv",
    platform: Platform::Video,
    fields: &[
        FieldSpec::new(DATE_FIELD, &["Video publish time", "Date"], Date),
        FieldSpec::new("title", &["Video title", "Content", "Title"], Text),
        FieldSpec::new("views", &["Views"], Count),
        FieldSpec::new("watch_time_hours", &["Watch time (hours)"], Number),
        FieldSpec::new("subscribers", &["Subscribers"], Count),
        FieldSpec::new("impressions", &["Impressions"], Count),
        FieldSpec::new("impressions_ctr", &["Impressions click-through rate (%)"], Number),
    ],
};

// ── Registry ──────────────────────────────────────────────────────────────────

/// Every schema the pipeline knows about.
pub static SCHEMAS: &[&Schema] = &[
    &EMAIL_CAMPAIGNS,
    &FB_FOLLOWS,
    &FB_REACH,
    &FB_VISITS,
    &FB_INTERACTIONS,
    &WEB_DEMOGRAPHICS,
    &WEB_TRAFFIC,
    &WEB_PAGES,
    &WEB_UTM,
    &YT_AGE,
    &YT_GENDER,
    &YT_GEOGRAPHY,
    &YT_SUBSCRIPTION,
    &YT_CONTENT,
];

/// Look up the schema registered for a logical file name (case-insensitive).
pub fn schema_for(file_name: &str) -> Option<&'static Schema> {
    let wanted = file_name.trim();
    SCHEMAS
        .iter()
        .copied()
        .find(|s| s.file_name.eq_ignore_ascii_case(wanted))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_schema_lookup_is_case_insensitive() {
        let s = schema_for("fb_reach.csv").expect("registered");
        assert_eq!(s.file_name, "FB_Reach.csv");
        assert_eq!(s.platform, Platform::Social);
    }

    #[test]
    fn test_unknown_file_has_no_schema() {
        assert!(schema_for("Mystery.csv").is_none());
    }

    #[test]
    fn test_file_names_are_unique() {
        let names: HashSet<_> = SCHEMAS.iter().map(|s| s.file_name.to_lowercase()).collect();
        assert_eq!(names.len(), SCHEMAS.len());
    }

    #[test]
    fn test_every_schema_has_a_date_field() {
        for schema in SCHEMAS {
            let date = schema.field(DATE_FIELD);
            assert!(date.is_some(), "{} lacks a date field", schema.file_name);
            assert_eq!(date.unwrap().kind, FieldKind::Date);
        }
    }

    #[test]
    fn test_field_keys_unique_within_schema() {
        for schema in SCHEMAS {
            let keys: HashSet<_> = schema.fields.iter().map(|f| f.key).collect();
            assert_eq!(keys.len(), schema.fields.len(), "{}", schema.file_name);
        }
    }

    #[test]
    fn test_email_rate_fields() {
        let rates: Vec<_> = EMAIL_CAMPAIGNS.keys_of_kind(FieldKind::Rate).collect();
        assert_eq!(rates, vec!["open_rate", "click_rate"]);
    }
}
