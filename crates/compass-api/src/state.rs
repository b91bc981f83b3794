//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers via
//! the `State` extractor.
//!
//! ## Architecture
//!
//! The in-memory stores are the system of record: reads are synchronous and
//! lock-bounded, never `.await`ed. When a Postgres pool is configured the
//! same records are mirrored to the database and reloaded on startup via
//! [`AppState::hydrate_from_db`]; when it is absent the API runs in
//! in-memory-only mode. Organizations, users, and policy documents are NOT
//! stored here — they belong to the surrounding platform, which references
//! them by id.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use utoipa::ToSchema;

use compass_core::{
    ControlId, CoverageLevel, Framework, FrameworkDefinition, FrameworkError, FrameworkId,
    MappingId, PolicyControlMapping, PolicyId, UserId, VerificationState,
};
use compass_engine::AnalysisRecord;

use crate::orchestrator::AnalysisQueue;

// -- Generic In-Memory Store --------------------------------------------------

/// Thread-safe, cloneable in-memory key-value store.
///
/// All operations are synchronous (the RwLock is `parking_lot`, not
/// `tokio::sync`) because the lock is never held across `.await` points.
/// `parking_lot::RwLock` is non-poisonable — a panicking writer does not
/// permanently corrupt the store.
#[derive(Debug)]
pub struct Store<K, T>
where
    K: Eq + Hash + Clone,
    T: Clone + Send + Sync,
{
    data: Arc<RwLock<HashMap<K, T>>>,
}

impl<K: Eq + Hash + Clone, T: Clone + Send + Sync> Clone for Store<K, T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<K: Eq + Hash + Clone, T: Clone + Send + Sync> Store<K, T> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert a record, returning the previous value if the key existed.
    pub fn insert(&self, id: K, value: T) -> Option<T> {
        self.data.write().insert(id, value)
    }

    /// Retrieve a record by ID.
    pub fn get(&self, id: &K) -> Option<T> {
        self.data.read().get(id).cloned()
    }

    /// List all records.
    pub fn list(&self) -> Vec<T> {
        self.data.read().values().cloned().collect()
    }

    /// Atomically read-validate-update a record.
    ///
    /// The closure receives `&mut T` under a single write lock and may
    /// validate preconditions before mutating, eliminating TOCTOU races
    /// between read and update. Returns `None` if the record doesn't exist,
    /// or `Some(result)` with the closure's `Result`.
    pub fn try_update<R, E>(
        &self,
        id: &K,
        f: impl FnOnce(&mut T) -> Result<R, E>,
    ) -> Option<Result<R, E>> {
        self.data.write().get_mut(id).map(f)
    }

    /// Remove a record by ID.
    pub fn remove(&self, id: &K) -> Option<T> {
        self.data.write().remove(id)
    }

    /// Check if a record exists.
    pub fn contains(&self, id: &K) -> bool {
        self.data.read().contains_key(id)
    }

    /// Return the number of records.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Eq + Hash + Clone, T: Clone + Send + Sync> Default for Store<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

// -- Compass-Owned Record Types -----------------------------------------------

/// A registered framework: the stored definition plus registration metadata.
///
/// The frozen [`Framework`] model is deliberately not stored — it is rebuilt
/// from the definition on demand, and id derivation is deterministic, so the
/// rebuilt model is identical every time.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FrameworkRecord {
    /// Framework identifier.
    #[schema(value_type = uuid::Uuid)]
    pub id: FrameworkId,
    /// Reference code (e.g. "SOC2").
    pub code: String,
    /// Display name.
    pub name: String,
    /// Version label.
    pub version: String,
    /// Total controls across all categories, for list views.
    pub control_count: u32,
    /// The validated definition as registered.
    #[schema(value_type = Object)]
    pub definition: FrameworkDefinition,
    /// When the framework was registered.
    pub created_at: DateTime<Utc>,
}

impl FrameworkRecord {
    /// Rebuild the frozen model from the stored definition.
    ///
    /// The definition was validated at registration, so failure here means
    /// the stored payload was corrupted out-of-band.
    pub fn model(&self) -> Result<Framework, FrameworkError> {
        Framework::from_definition(self.id, &self.definition)
    }
}

/// A policy-control mapping as stored by the API layer.
///
/// Carries the owning framework id so the mapping set for a framework is a
/// single filtered scan; the engine-facing shape is produced by
/// [`MappingRecord::to_mapping`].
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MappingRecord {
    /// Mapping identifier.
    #[schema(value_type = uuid::Uuid)]
    pub id: MappingId,
    /// The framework whose control this mapping addresses.
    #[schema(value_type = uuid::Uuid)]
    pub framework_id: FrameworkId,
    /// The policy end of the mapping.
    #[schema(value_type = uuid::Uuid)]
    pub policy_id: PolicyId,
    /// The control end of the mapping.
    #[schema(value_type = uuid::Uuid)]
    pub control_id: ControlId,
    /// How well the policy covers the control.
    #[schema(value_type = String)]
    pub coverage_level: CoverageLevel,
    /// Whether a reviewer has confirmed the mapping.
    #[schema(value_type = String)]
    pub verification: VerificationState,
    /// Free-form reviewer notes.
    pub notes: Option<String>,
    /// When the mapping was recorded.
    pub created_at: DateTime<Utc>,
}

impl MappingRecord {
    /// Convert to the engine-facing mapping shape.
    pub fn to_mapping(&self) -> PolicyControlMapping {
        PolicyControlMapping {
            id: self.id,
            policy_id: self.policy_id,
            control_id: self.control_id,
            coverage_level: self.coverage_level,
            verification: self.verification,
            notes: self.notes.clone(),
            created_at: self.created_at,
        }
    }
}

/// Kind of a notification record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// An analysis reached `completed`.
    AnalysisCompleted,
    /// An analysis reached `failed`.
    AnalysisFailed,
}

/// A notification recorded for a user.
///
/// Compass records notifications; delivering them (email, webhooks, in-app
/// feeds) is the surrounding platform's concern.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NotificationRecord {
    /// Notification identifier.
    pub id: uuid::Uuid,
    /// The user being notified.
    #[schema(value_type = uuid::Uuid)]
    pub user_id: UserId,
    /// What happened.
    pub kind: NotificationKind,
    /// Short headline.
    pub title: String,
    /// Body text.
    pub message: String,
    /// Optional link into the application.
    pub link: Option<String>,
    /// When the notification was recorded.
    pub created_at: DateTime<Utc>,
}

// -- Application State --------------------------------------------------------

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Maximum number of analysis jobs executing concurrently.
    pub analysis_concurrency: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            analysis_concurrency: 4,
        }
    }
}

/// Shared application state accessible to all route handlers.
///
/// Clone-friendly via `Arc` internals in each `Store` and in the queue.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Registered frameworks.
    pub frameworks: Store<FrameworkId, FrameworkRecord>,
    /// Policy-control mapping records.
    pub mappings: Store<MappingId, MappingRecord>,
    /// Analysis records, pending through terminal.
    pub analyses: Store<compass_core::AnalysisId, AnalysisRecord>,
    /// Notification records.
    pub notifications: Store<uuid::Uuid, NotificationRecord>,

    /// Handle for submitting analysis jobs. Until
    /// [`crate::orchestrator::start_workers`] runs, submissions are
    /// rejected and the triggering endpoint reports an internal error.
    pub analysis_queue: AnalysisQueue,

    /// PostgreSQL connection pool for durable persistence. When `None`,
    /// the API operates in in-memory-only mode.
    pub db_pool: Option<PgPool>,

    /// Application configuration.
    pub config: AppConfig,
}

impl AppState {
    /// Create a new application state with default configuration and no
    /// database pool.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default(), None)
    }

    /// Create a new application state with the given configuration and
    /// optional database pool.
    pub fn with_config(config: AppConfig, db_pool: Option<PgPool>) -> Self {
        Self {
            frameworks: Store::new(),
            mappings: Store::new(),
            analyses: Store::new(),
            notifications: Store::new(),
            analysis_queue: AnalysisQueue::new(),
            db_pool,
            config,
        }
    }

    /// All mapping records for a framework's controls.
    ///
    /// This is the mapping-store read the engine consumes: a point-in-time
    /// set of the mappings that currently exist for the framework.
    pub fn mappings_for_framework(&self, framework_id: FrameworkId) -> Vec<PolicyControlMapping> {
        let mut records: Vec<MappingRecord> = self
            .mappings
            .list()
            .into_iter()
            .filter(|m| m.framework_id == framework_id)
            .collect();
        // Stable order keeps snapshots reproducible for identical stores.
        records.sort_by(|a, b| (a.created_at, a.id.0).cmp(&(b.created_at, b.id.0)));
        records.iter().map(MappingRecord::to_mapping).collect()
    }

    /// Record a notification for a user. Best-effort bookkeeping: callers
    /// never treat this as fallible.
    pub fn notify(
        &self,
        user_id: UserId,
        kind: NotificationKind,
        title: &str,
        message: &str,
        link: Option<String>,
    ) {
        let record = NotificationRecord {
            id: uuid::Uuid::new_v4(),
            user_id,
            kind,
            title: title.to_string(),
            message: message.to_string(),
            link,
            created_at: Utc::now(),
        };
        tracing::info!(user = %user_id, kind = ?kind, title, "notification recorded");
        self.notifications.insert(record.id, record);
    }

    /// Hydrate in-memory stores from the database.
    ///
    /// Called once on startup when a database pool is available, so read
    /// operations stay fast and synchronous afterwards.
    pub async fn hydrate_from_db(&self) -> Result<(), String> {
        let pool = match &self.db_pool {
            Some(pool) => pool,
            None => return Ok(()),
        };

        let frameworks = crate::db::frameworks::load_all(pool)
            .await
            .map_err(|e| format!("failed to load frameworks: {e}"))?;
        let framework_count = frameworks.len();
        for record in frameworks {
            self.frameworks.insert(record.id, record);
        }

        let mappings = crate::db::mappings::load_all(pool)
            .await
            .map_err(|e| format!("failed to load mappings: {e}"))?;
        let mapping_count = mappings.len();
        for record in mappings {
            self.mappings.insert(record.id, record);
        }

        let analyses = crate::db::analyses::load_all(pool)
            .await
            .map_err(|e| format!("failed to load analyses: {e}"))?;
        let analysis_count = analyses.len();
        for record in analyses {
            self.analyses.insert(record.id, record);
        }

        tracing::info!(
            frameworks = framework_count,
            mappings = mapping_count,
            analyses = analysis_count,
            "hydrated in-memory stores from database"
        );

        Ok(())
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compass_core::{CategoryDefinition, ControlDefinition};

    fn sample_definition() -> FrameworkDefinition {
        FrameworkDefinition {
            code: "FW".to_string(),
            name: "Framework".to_string(),
            version: "1".to_string(),
            categories: vec![CategoryDefinition {
                code: "A".to_string(),
                name: "Access".to_string(),
                sort_order: 1,
                parent_code: None,
                high_priority: false,
                controls: vec![ControlDefinition {
                    code: "A1".to_string(),
                    title: "Control A1".to_string(),
                    description: String::new(),
                    sort_order: 1,
                    suggested_policy_type: None,
                }],
            }],
        }
    }

    fn sample_framework_record() -> FrameworkRecord {
        let definition = sample_definition();
        FrameworkRecord {
            id: FrameworkId::new(),
            code: definition.code.clone(),
            name: definition.name.clone(),
            version: definition.version.clone(),
            control_count: 1,
            definition,
            created_at: Utc::now(),
        }
    }

    fn sample_mapping(framework_id: FrameworkId, control_id: ControlId) -> MappingRecord {
        MappingRecord {
            id: MappingId::new(),
            framework_id,
            policy_id: PolicyId::new(),
            control_id,
            coverage_level: CoverageLevel::Full,
            verification: VerificationState::Unverified,
            notes: None,
            created_at: Utc::now(),
        }
    }

    // -- Store tests ----------------------------------------------------------

    #[test]
    fn store_insert_and_get_roundtrip() {
        let store: Store<FrameworkId, FrameworkRecord> = Store::new();
        let record = sample_framework_record();
        let id = record.id;

        assert!(store.insert(id, record).is_none());
        let retrieved = store.get(&id).unwrap();
        assert_eq!(retrieved.id, id);
        assert_eq!(retrieved.code, "FW");
    }

    #[test]
    fn store_insert_returns_previous_value() {
        let store: Store<FrameworkId, FrameworkRecord> = Store::new();
        let record = sample_framework_record();
        let id = record.id;
        store.insert(id, record.clone());
        assert!(store.insert(id, record).is_some());
    }

    #[test]
    fn store_try_update_validates_under_one_lock() {
        let store: Store<FrameworkId, FrameworkRecord> = Store::new();
        let record = sample_framework_record();
        let id = record.id;
        store.insert(id, record);

        let result = store.try_update(&id, |r| {
            if r.control_count == 1 {
                r.control_count = 2;
                Ok(())
            } else {
                Err("unexpected")
            }
        });
        assert_eq!(result, Some(Ok(())));
        assert_eq!(store.get(&id).unwrap().control_count, 2);
    }

    #[test]
    fn store_try_update_missing_key_is_none() {
        let store: Store<FrameworkId, FrameworkRecord> = Store::new();
        let result = store.try_update(&FrameworkId::new(), |_| Ok::<(), ()>(()));
        assert!(result.is_none());
    }

    #[test]
    fn store_remove_deletes_item() {
        let store: Store<FrameworkId, FrameworkRecord> = Store::new();
        let record = sample_framework_record();
        let id = record.id;
        store.insert(id, record);
        assert!(store.remove(&id).is_some());
        assert!(store.is_empty());
    }

    #[test]
    fn store_clone_shares_underlying_data() {
        let store: Store<FrameworkId, FrameworkRecord> = Store::new();
        let clone = store.clone();
        let record = sample_framework_record();
        let id = record.id;
        clone.insert(id, record);
        assert!(store.contains(&id));
    }

    // -- Record tests ---------------------------------------------------------

    #[test]
    fn framework_record_rebuilds_identical_model() {
        let record = sample_framework_record();
        let first = record.model().unwrap();
        let second = record.model().unwrap();
        let first_ids: Vec<_> = first.controls().map(|c| c.id).collect();
        let second_ids: Vec<_> = second.controls().map(|c| c.id).collect();
        assert_eq!(first_ids, second_ids);
    }

    #[test]
    fn mappings_for_framework_filters_and_converts() {
        let state = AppState::new();
        let record = sample_framework_record();
        let framework_id = record.id;
        let model = record.model().unwrap();
        let control_id = model.controls().next().unwrap().id;
        state.frameworks.insert(framework_id, record);

        let mapping = sample_mapping(framework_id, control_id);
        state.mappings.insert(mapping.id, mapping);
        // A mapping for some other framework must not leak in.
        let other = sample_mapping(FrameworkId::new(), ControlId::new());
        state.mappings.insert(other.id, other);

        let mappings = state.mappings_for_framework(framework_id);
        assert_eq!(mappings.len(), 1);
        assert_eq!(mappings[0].control_id, control_id);
    }

    #[test]
    fn notify_appends_a_record() {
        let state = AppState::new();
        let user = UserId::new();
        state.notify(
            user,
            NotificationKind::AnalysisCompleted,
            "Analysis complete",
            "Overall score 82.5",
            Some("/analyses/123".to_string()),
        );
        let records = state.notifications.list();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].user_id, user);
        assert_eq!(records[0].kind, NotificationKind::AnalysisCompleted);
    }

    #[test]
    fn app_state_default_config() {
        let state = AppState::new();
        assert_eq!(state.config.port, 8080);
        assert_eq!(state.config.analysis_concurrency, 4);
        assert!(state.db_pool.is_none());
        assert!(state.frameworks.is_empty());
    }
}
