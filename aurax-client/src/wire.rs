//! Response and payload shapes for the Aurax backend's Instagram surface.

use auraxsync_core::{EngagementMetrics, PostSummary, ProfileSummary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `GET /instagram/profile` — profile plus recent media with engagement
/// counts, assembled server-side from the Graph API.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileEnvelope {
    #[serde(default)]
    pub success: bool,
    pub profile: InstagramProfile,
    #[serde(default)]
    pub media: Vec<MediaPost>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstagramProfile {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub account_type: Option<String>,
    #[serde(default)]
    pub media_count: u64,
    #[serde(default)]
    pub followers_count: u64,
    #[serde(default)]
    pub follows_count: u64,
    #[serde(default)]
    pub profile_picture_url: Option<String>,
}

impl From<&InstagramProfile> for ProfileSummary {
    fn from(profile: &InstagramProfile) -> Self {
        Self {
            username: profile.username.clone(),
            followers_count: profile.followers_count,
            follows_count: profile.follows_count,
            media_count: profile.media_count,
            profile_picture_url: profile.profile_picture_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaPost {
    pub id: String,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub media_type: String,
    #[serde(default)]
    pub permalink: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub comments_count: u64,
}

/// `GET /instagram/insights` — per-metric values, either account-level or
/// for one media item when `mediaId` is passed.
#[derive(Debug, Clone, Deserialize)]
pub struct InsightsEnvelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub insights: Vec<InsightMetric>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InsightMetric {
    pub name: String,
    #[serde(default)]
    pub values: Vec<InsightValue>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InsightValue {
    #[serde(default)]
    pub value: u64,
}

impl InsightsEnvelope {
    /// First value reported for the named metric, zero when the metric is
    /// absent. Insights availability varies by account type.
    pub fn metric(&self, name: &str) -> u64 {
        self.insights
            .iter()
            .find(|m| m.name == name)
            .and_then(|m| m.values.first())
            .map(|v| v.value)
            .unwrap_or(0)
    }
}

/// `POST /analytics/instagram-sync` request body.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsPayload {
    pub platform: &'static str,
    pub user_id: String,
    pub sync_timestamp: DateTime<Utc>,
    pub profile_data: ProfileSummary,
    pub metrics: EngagementMetrics,
    pub recent_posts: Vec<PostSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_lookup_tolerates_missing_values() {
        let envelope: InsightsEnvelope = serde_json::from_value(serde_json::json!({
            "success": true,
            "insights": [
                { "name": "impressions", "values": [{ "value": 1200 }] },
                { "name": "reach", "values": [] },
            ]
        }))
        .unwrap();

        assert_eq!(envelope.metric("impressions"), 1200);
        assert_eq!(envelope.metric("reach"), 0);
        assert_eq!(envelope.metric("engagement"), 0);
    }

    #[test]
    fn profile_envelope_tolerates_sparse_media() {
        let envelope: ProfileEnvelope = serde_json::from_value(serde_json::json!({
            "success": true,
            "profile": { "id": "17841", "username": "creator" },
            "media": [{ "id": "m1" }]
        }))
        .unwrap();

        assert_eq!(envelope.profile.followers_count, 0);
        assert_eq!(envelope.media.len(), 1);
        assert_eq!(envelope.media[0].like_count, 0);

        let summary = ProfileSummary::from(&envelope.profile);
        assert_eq!(summary.username, "creator");
    }
}
