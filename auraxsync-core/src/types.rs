use crate::schedule::TimeOfDay;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User-facing sync preferences. Read once at startup to decide whether the
/// scheduler should be armed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    pub auto_sync_enabled: bool,
    pub scheduled_time: TimeOfDay,
    pub notifications_enabled: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            auto_sync_enabled: false,
            scheduled_time: TimeOfDay::new(9, 0),
            notifications_enabled: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncTrigger {
    Manual,
    Automated,
}

/// Outcome of the most recent sync attempt. At most one record is kept; it
/// is overwritten on every attempt, successful or not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastSyncRecord {
    pub timestamp: DateTime<Utc>,
    pub status: SyncStatus,
    pub error_message: Option<String>,
    pub trigger: SyncTrigger,
}

impl LastSyncRecord {
    pub fn success(trigger: SyncTrigger) -> Self {
        Self {
            timestamp: Utc::now(),
            status: SyncStatus::Success,
            error_message: None,
            trigger,
        }
    }

    pub fn error(trigger: SyncTrigger, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            status: SyncStatus::Error,
            error_message: Some(message.into()),
            trigger,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub username: String,
    pub followers_count: u64,
    pub follows_count: u64,
    pub media_count: u64,
    pub profile_picture_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngagementMetrics {
    pub total_impressions: u64,
    pub total_reach: u64,
    pub total_engagement: u64,
    pub total_likes: u64,
    pub total_comments: u64,
    pub total_shares: u64,
    pub total_saves: u64,
    pub avg_engagement_rate: f64,
    pub posts_analyzed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostSummary {
    pub id: String,
    pub media_type: String,
    pub permalink: String,
    pub timestamp: String,
    pub caption: String,
    pub impressions: u64,
    pub reach: u64,
    pub engagement: u64,
    pub likes: u64,
    pub comments: u64,
    pub engagement_rate: f64,
}

/// Snapshot assembled fresh on every sync from the remote responses and
/// forwarded to the analytics ingestion endpoint. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncInsights {
    pub profile: ProfileSummary,
    pub metrics: EngagementMetrics,
    pub recent_posts: Vec<PostSummary>,
    pub last_updated: DateTime<Utc>,
}

/// Answer to a scheduler status query. `next_sync_estimate` is local wall
/// clock, `None` when the scheduler is idle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncStatusReport {
    pub is_running: bool,
    pub scheduled_time: TimeOfDay,
    pub last_sync: Option<LastSyncRecord>,
    pub next_sync_estimate: Option<chrono::NaiveDateTime>,
}
