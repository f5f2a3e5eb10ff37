//! Feature and vote storage.
//!
//! Handlers talk to a [`FeatureStore`]; the process-local
//! [`InMemoryFeatureStore`] lets the service run without a database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub id: u64,
    pub title: String,
    pub link: Option<String>,
    pub price_estimate: Option<f64>,
    pub votes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated input for a new feature
#[derive(Debug, Clone, PartialEq)]
pub struct NewFeature {
    pub title: String,
    pub link: Option<String>,
    pub price_estimate: Option<f64>,
    pub votes: i64,
}

/// Validated partial update; `None` leaves the field untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureChanges {
    pub title: Option<String>,
    pub link: Option<String>,
    pub price_estimate: Option<f64>,
    pub votes: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub id: u64,
    pub user_id: u64,
    pub feature_id: u64,
    pub value: i64,
    pub created_at: DateTime<Utc>,
}

/// Filters for listing features
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureQuery {
    /// Only features with a price strictly below this bound
    pub price_lt: Option<f64>,
    pub skip: usize,
    pub limit: usize,
}

impl Default for FeatureQuery {
    fn default() -> Self {
        Self {
            price_lt: None,
            skip: 0,
            limit: 100,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Feature {0} not found")]
    FeatureNotFound(u64),

    #[error("User {user_id} already voted for feature {feature_id}")]
    DuplicateVote { user_id: u64, feature_id: u64 },

    #[error("Vote tally of feature {0} is out of range")]
    TallyOverflow(u64),
}

#[async_trait]
pub trait FeatureStore: Send + Sync {
    async fn list(&self, query: FeatureQuery) -> Vec<Feature>;

    /// Features ordered by vote tally, highest first; ties keep store order
    async fn top(&self, limit: usize) -> Vec<Feature>;

    async fn get(&self, id: u64) -> Result<Feature, StoreError>;

    async fn create(&self, feature: NewFeature) -> Feature;

    async fn update(&self, id: u64, changes: FeatureChanges) -> Result<Feature, StoreError>;

    async fn delete(&self, id: u64) -> Result<(), StoreError>;

    /// Records a vote and applies it to the tally as one atomic step.
    /// A second vote by the same user on the same feature is rejected.
    async fn record_vote(&self, user_id: u64, feature_id: u64, value: i64) -> Result<Vote, StoreError>;
}

#[derive(Debug, Default)]
struct StoreState {
    features: Vec<Feature>,
    votes: Vec<Vote>,
    next_vote_id: u64,
}

/// Store kept in process memory; all data is lost on restart
#[derive(Debug, Default)]
pub struct InMemoryFeatureStore {
    state: RwLock<StoreState>,
}

impl InMemoryFeatureStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store holding one sample feature, for local runs
    pub fn with_demo_data() -> Self {
        let now = Utc::now();
        let demo = Feature {
            id: 1,
            title: "Dark mode".to_string(),
            link: Some("https://example.com/dark-mode".to_string()),
            price_estimate: Some(1500.0),
            votes: 0,
            created_at: now,
            updated_at: now,
        };
        Self {
            state: RwLock::new(StoreState {
                features: vec![demo],
                ..StoreState::default()
            }),
        }
    }
}

#[async_trait]
impl FeatureStore for InMemoryFeatureStore {
    async fn list(&self, query: FeatureQuery) -> Vec<Feature> {
        let state = self.state.read().await;
        state
            .features
            .iter()
            .filter(|feature| match query.price_lt {
                Some(bound) => feature.price_estimate.map_or(false, |price| price < bound),
                None => true,
            })
            .skip(query.skip)
            .take(query.limit)
            .cloned()
            .collect()
    }

    async fn top(&self, limit: usize) -> Vec<Feature> {
        let mut features = self.state.read().await.features.clone();
        // sort_by is stable, so equal tallies stay in store order
        features.sort_by(|a, b| b.votes.cmp(&a.votes));
        features.truncate(limit);
        features
    }

    async fn get(&self, id: u64) -> Result<Feature, StoreError> {
        let state = self.state.read().await;
        state
            .features
            .iter()
            .find(|feature| feature.id == id)
            .cloned()
            .ok_or(StoreError::FeatureNotFound(id))
    }

    async fn create(&self, feature: NewFeature) -> Feature {
        let mut state = self.state.write().await;
        let id = state.features.iter().map(|f| f.id).max().unwrap_or(0) + 1;
        let now = Utc::now();
        let created = Feature {
            id,
            title: feature.title,
            link: feature.link,
            price_estimate: feature.price_estimate,
            votes: feature.votes,
            created_at: now,
            updated_at: now,
        };
        state.features.push(created.clone());
        created
    }

    async fn update(&self, id: u64, changes: FeatureChanges) -> Result<Feature, StoreError> {
        let mut state = self.state.write().await;
        let feature = state
            .features
            .iter_mut()
            .find(|feature| feature.id == id)
            .ok_or(StoreError::FeatureNotFound(id))?;

        if let Some(title) = changes.title {
            feature.title = title;
        }
        if let Some(link) = changes.link {
            feature.link = Some(link);
        }
        if let Some(price) = changes.price_estimate {
            feature.price_estimate = Some(price);
        }
        if let Some(votes) = changes.votes {
            feature.votes = votes;
        }
        feature.updated_at = Utc::now();
        Ok(feature.clone())
    }

    async fn delete(&self, id: u64) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let index = state
            .features
            .iter()
            .position(|feature| feature.id == id)
            .ok_or(StoreError::FeatureNotFound(id))?;
        state.features.remove(index);
        // ids are reused after the newest feature is deleted
        state.votes.retain(|vote| vote.feature_id != id);
        Ok(())
    }

    async fn record_vote(&self, user_id: u64, feature_id: u64, value: i64) -> Result<Vote, StoreError> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        let feature = state
            .features
            .iter_mut()
            .find(|feature| feature.id == feature_id)
            .ok_or(StoreError::FeatureNotFound(feature_id))?;
        if state
            .votes
            .iter()
            .any(|vote| vote.user_id == user_id && vote.feature_id == feature_id)
        {
            return Err(StoreError::DuplicateVote { user_id, feature_id });
        }
        let tally = feature
            .votes
            .checked_add(value)
            .ok_or(StoreError::TallyOverflow(feature_id))?;

        feature.votes = tally;
        state.next_vote_id += 1;
        let vote = Vote {
            id: state.next_vote_id,
            user_id,
            feature_id,
            value,
            created_at: Utc::now(),
        };
        state.votes.push(vote.clone());
        Ok(vote)
    }
}
