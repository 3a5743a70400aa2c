use crate::client::RemoteClient;
use crate::wire::{AnalyticsPayload, InsightsEnvelope, MediaPost, ProfileEnvelope};
use async_trait::async_trait;
use auraxsync_core::{
    CoreError, EngagementMetrics, PostSummary, ProfileSummary, RemoteError, SyncAction,
    SyncInsights,
};
use chrono::Utc;
use local_store::DiagnosticLog;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Posts pulled into one sync's aggregation window.
const DEFAULT_ANALYSIS_LIMIT: usize = 10;
/// Cap on concurrent per-post insight requests.
const DEFAULT_FANOUT_LIMIT: usize = 4;
/// Captions longer than this are truncated in post summaries.
const CAPTION_LIMIT: usize = 100;

/// Drives one full sync: profile fetch, per-post insight fan-out,
/// aggregation and the analytics forward, in that order.
#[derive(Debug)]
pub struct InsightsCollector {
    client: Arc<RemoteClient>,
    diagnostics: Arc<DiagnosticLog>,
    access_token: String,
    analysis_limit: usize,
    fanout_limit: usize,
}

struct EnrichedPost {
    post: MediaPost,
    impressions: u64,
    reach: u64,
    engagement: u64,
    likes: u64,
    comments: u64,
    shares: u64,
    saves: u64,
}

impl InsightsCollector {
    pub fn new(
        client: Arc<RemoteClient>,
        diagnostics: Arc<DiagnosticLog>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            client,
            diagnostics,
            access_token: access_token.into(),
            analysis_limit: DEFAULT_ANALYSIS_LIMIT,
            fanout_limit: DEFAULT_FANOUT_LIMIT,
        }
    }

    pub fn with_limits(mut self, analysis_limit: usize, fanout_limit: usize) -> Self {
        self.analysis_limit = analysis_limit;
        self.fanout_limit = fanout_limit.max(1);
        self
    }

    pub async fn collect(&self) -> Result<SyncInsights, CoreError> {
        if self.access_token.is_empty() {
            return Err(RemoteError::MissingToken {
                operation: "instagram sync".to_string(),
            }
            .into());
        }

        self.diagnostics
            .record("INSTAGRAM_SYNC_INITIATED", serde_json::json!({}));

        let token_param: &[(&str, &str)] = &[("accessToken", self.access_token.as_str())];
        let envelope: ProfileEnvelope = self
            .client
            .get("/instagram/profile", Some(token_param))
            .await?;

        let profile = ProfileSummary::from(&envelope.profile);
        self.diagnostics.record(
            "INSTAGRAM_PROFILE_FETCHED",
            serde_json::json!({
                "username": profile.username,
                "followers_count": profile.followers_count,
                "media_count": profile.media_count,
            }),
        );

        // Account-level insights need a business/creator account; absence
        // is tolerated and only journaled.
        match self
            .client
            .get::<InsightsEnvelope>("/instagram/insights", Some(token_param))
            .await
        {
            Ok(account) => {
                self.diagnostics.record(
                    "INSTAGRAM_ACCOUNT_INSIGHTS",
                    serde_json::json!({
                        "impressions": account.metric("impressions"),
                        "reach": account.metric("reach"),
                        "profile_views": account.metric("profile_views"),
                    }),
                );
            }
            Err(e) => debug!("Account-level insights unavailable: {}", e),
        }

        let posts: Vec<MediaPost> = envelope
            .media
            .into_iter()
            .take(self.analysis_limit)
            .collect();

        let semaphore = Arc::new(Semaphore::new(self.fanout_limit));
        let enriched = futures::future::join_all(posts.iter().map(|post| {
            let semaphore = semaphore.clone();
            async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .expect("Semaphore should not be closed");
                self.enrich_post(post).await
            }
        }))
        .await;

        let metrics = aggregate_metrics(&enriched);
        let recent_posts: Vec<PostSummary> =
            enriched.iter().take(5).map(post_summary).collect();

        self.diagnostics.record(
            "INSTAGRAM_MEDIA_INSIGHTS_FETCHED",
            serde_json::json!({
                "posts_analyzed": metrics.posts_analyzed,
                "total_impressions": metrics.total_impressions,
                "total_reach": metrics.total_reach,
            }),
        );

        let last_updated = Utc::now();
        let payload = AnalyticsPayload {
            platform: "instagram",
            user_id: profile.username.clone(),
            sync_timestamp: last_updated,
            profile_data: profile.clone(),
            metrics: metrics.clone(),
            recent_posts: recent_posts.clone(),
        };
        let _ack: serde_json::Value = self
            .client
            .post("/analytics/instagram-sync", &payload)
            .await?;

        self.diagnostics.record(
            "ANALYTICS_SYNC_SUCCESS",
            serde_json::json!({ "sync_timestamp": last_updated }),
        );
        info!(
            "Instagram sync completed for @{} ({} posts analyzed)",
            profile.username, metrics.posts_analyzed
        );

        Ok(SyncInsights {
            profile,
            metrics,
            recent_posts,
            last_updated,
        })
    }

    /// Per-post insight fetch with partial-failure tolerance: a failed
    /// fetch yields zeroed insight numbers for that post, never fails the
    /// batch.
    async fn enrich_post(&self, post: &MediaPost) -> EnrichedPost {
        let query: &[(&str, &str)] = &[
            ("accessToken", self.access_token.as_str()),
            ("mediaId", post.id.as_str()),
        ];

        match self
            .client
            .get::<InsightsEnvelope>("/instagram/insights", Some(query))
            .await
        {
            Ok(insights) => {
                // Likes and comments fall back to the media's own counts
                // when the metric is not reported for this account tier.
                let likes = match insights.metric("likes") {
                    0 => post.like_count,
                    n => n,
                };
                let comments = match insights.metric("comments") {
                    0 => post.comments_count,
                    n => n,
                };
                EnrichedPost {
                    post: post.clone(),
                    impressions: insights.metric("impressions"),
                    reach: insights.metric("reach"),
                    engagement: insights.metric("engagement"),
                    likes,
                    comments,
                    shares: insights.metric("shares"),
                    saves: insights.metric("saved"),
                }
            }
            Err(e) => {
                warn!("Failed to fetch insights for media {}: {}", post.id, e);
                EnrichedPost {
                    post: post.clone(),
                    impressions: 0,
                    reach: 0,
                    engagement: 0,
                    likes: post.like_count,
                    comments: post.comments_count,
                    shares: 0,
                    saves: 0,
                }
            }
        }
    }
}

#[async_trait]
impl SyncAction for InsightsCollector {
    async fn run_sync(&self) -> Result<SyncInsights, CoreError> {
        self.collect().await
    }
}

fn aggregate_metrics(posts: &[EnrichedPost]) -> EngagementMetrics {
    let total_impressions = posts.iter().map(|p| p.impressions).sum();
    let total_reach: u64 = posts.iter().map(|p| p.reach).sum();
    let total_engagement: u64 = posts.iter().map(|p| p.engagement).sum();

    EngagementMetrics {
        total_impressions,
        total_reach,
        total_engagement,
        total_likes: posts.iter().map(|p| p.likes).sum(),
        total_comments: posts.iter().map(|p| p.comments).sum(),
        total_shares: posts.iter().map(|p| p.shares).sum(),
        total_saves: posts.iter().map(|p| p.saves).sum(),
        avg_engagement_rate: engagement_rate(total_engagement, total_reach),
        posts_analyzed: posts.len(),
    }
}

fn post_summary(enriched: &EnrichedPost) -> PostSummary {
    PostSummary {
        id: enriched.post.id.clone(),
        media_type: enriched.post.media_type.clone(),
        permalink: enriched.post.permalink.clone(),
        timestamp: enriched.post.timestamp.clone(),
        caption: truncate_caption(&enriched.post.caption),
        impressions: enriched.impressions,
        reach: enriched.reach,
        engagement: enriched.engagement,
        likes: enriched.likes,
        comments: enriched.comments,
        engagement_rate: engagement_rate(enriched.engagement, enriched.reach),
    }
}

/// Engagement as a percentage of reach, rounded to two decimals; zero when
/// nothing was reached.
fn engagement_rate(engagement: u64, reach: u64) -> f64 {
    if reach == 0 {
        return 0.0;
    }
    ((engagement as f64 / reach as f64) * 100.0 * 100.0).round() / 100.0
}

fn truncate_caption(caption: &str) -> String {
    if caption.chars().count() <= CAPTION_LIMIT {
        caption.to_string()
    } else {
        let truncated: String = caption.chars().take(CAPTION_LIMIT).collect();
        format!("{truncated}...")
    }
}
