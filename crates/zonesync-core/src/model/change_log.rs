use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Kind of change planned against a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeAction {
    Create,
    Delete,
    Upsert,
}

impl ChangeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeAction::Create => "CREATE",
            ChangeAction::Delete => "DELETE",
            ChangeAction::Upsert => "UPSERT",
        }
    }
}

impl std::fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a change: `pending` then `applied` or `failed`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeStatus {
    #[default]
    Pending,
    Applied,
    Failed,
}

impl ChangeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeStatus::Pending => "pending",
            ChangeStatus::Applied => "applied",
            ChangeStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audit entry for one planned change
///
/// Created `pending`; moves to `applied` or `failed` exactly once. Any later
/// transition is rejected with [`Error::Conflict`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeLog {
    id: Uuid,
    account_id: Uuid,
    #[serde(default)]
    zone_id: Option<Uuid>,
    record_key: String,
    action: ChangeAction,
    #[serde(default)]
    before: Option<serde_json::Value>,
    #[serde(default)]
    after: Option<serde_json::Value>,
    #[serde(default)]
    plan_id: Option<String>,
    #[serde(default)]
    applied_at: Option<DateTime<Utc>>,
    #[serde(default)]
    remote_change_id: Option<String>,
    #[serde(default)]
    status: ChangeStatus,
    #[serde(default)]
    error: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ChangeLog {
    /// Plan a change; the entry starts out pending
    pub fn new(
        account_id: Uuid,
        zone_id: Option<Uuid>,
        record_key: impl Into<String>,
        action: ChangeAction,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            account_id,
            zone_id,
            record_key: record_key.into(),
            action,
            before: None,
            after: None,
            plan_id: None,
            applied_at: None,
            remote_change_id: None,
            status: ChangeStatus::Pending,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Attach before/after snapshots
    pub fn with_snapshots(
        mut self,
        before: Option<serde_json::Value>,
        after: Option<serde_json::Value>,
    ) -> Self {
        self.before = before;
        self.after = after;
        self
    }

    /// Group this change with others of the same batch
    pub fn with_plan_id(mut self, plan_id: impl Into<String>) -> Self {
        self.plan_id = Some(plan_id.into());
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn account_id(&self) -> Uuid {
        self.account_id
    }

    pub fn zone_id(&self) -> Option<Uuid> {
        self.zone_id
    }

    pub fn record_key(&self) -> &str {
        &self.record_key
    }

    pub fn action(&self) -> ChangeAction {
        self.action
    }

    pub fn before(&self) -> Option<&serde_json::Value> {
        self.before.as_ref()
    }

    pub fn after(&self) -> Option<&serde_json::Value> {
        self.after.as_ref()
    }

    pub fn plan_id(&self) -> Option<&str> {
        self.plan_id.as_deref()
    }

    pub fn applied_at(&self) -> Option<DateTime<Utc>> {
        self.applied_at
    }

    pub fn remote_change_id(&self) -> Option<&str> {
        self.remote_change_id.as_deref()
    }

    pub fn status(&self) -> ChangeStatus {
        self.status
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Transition `pending` → `applied`
    pub fn mark_applied(
        &mut self,
        remote_change_id: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<()> {
        self.ensure_pending(ChangeStatus::Applied)?;
        self.status = ChangeStatus::Applied;
        self.remote_change_id = remote_change_id;
        self.applied_at = Some(at);
        self.updated_at = at;
        Ok(())
    }

    /// Transition `pending` → `failed`
    pub fn mark_failed(&mut self, error: impl Into<String>) -> Result<()> {
        self.ensure_pending(ChangeStatus::Failed)?;
        self.status = ChangeStatus::Failed;
        self.error = Some(error.into());
        self.updated_at = Utc::now();
        Ok(())
    }

    fn ensure_pending(&self, target: ChangeStatus) -> Result<()> {
        if self.status != ChangeStatus::Pending {
            return Err(Error::conflict(format!(
                "change {} is {}, cannot move to {}",
                self.id, self.status, target
            )));
        }
        Ok(())
    }
}

impl std::fmt::Display for ChangeLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.record_key, self.action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> ChangeLog {
        ChangeLog::new(Uuid::new_v4(), None, "www.example.com. A", ChangeAction::Upsert)
    }

    #[test]
    fn starts_pending() {
        let log = entry();
        assert_eq!(log.status(), ChangeStatus::Pending);
        assert!(log.applied_at().is_none());
        assert_eq!(log.to_string(), "www.example.com. A (UPSERT)");
    }

    #[test]
    fn applied_is_terminal() {
        let mut log = entry();
        let at = Utc::now();
        log.mark_applied(Some("C123".to_string()), at).unwrap();
        assert_eq!(log.status(), ChangeStatus::Applied);
        assert_eq!(log.applied_at(), Some(at));
        assert_eq!(log.remote_change_id(), Some("C123"));

        assert!(matches!(log.mark_failed("late"), Err(Error::Conflict(_))));
        assert!(log.mark_applied(None, Utc::now()).is_err());
        assert_eq!(log.status(), ChangeStatus::Applied);
    }

    #[test]
    fn failed_records_error() {
        let mut log = entry();
        log.mark_failed("throttled").unwrap();
        assert_eq!(log.status(), ChangeStatus::Failed);
        assert_eq!(log.error(), Some("throttled"));
        assert!(log.mark_applied(None, Utc::now()).is_err());
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ChangeStatus::Applied).unwrap(),
            "\"applied\""
        );
        assert_eq!(
            serde_json::to_string(&ChangeAction::Upsert).unwrap(),
            "\"UPSERT\""
        );
    }
}
