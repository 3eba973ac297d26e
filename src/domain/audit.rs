//! Audit records for sensitive operations.
//!
//! An [`AuditEntry`] is an immutable snapshot of one sensitive operation:
//! who did what to which entity, from where, with what outcome. Entries are
//! built from an [`AuditDraft`] supplied by middleware or business handlers;
//! construction applies field redaction so no raw sensitive value can reach
//! a sink.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::identity::AuthUser;
use crate::domain::redaction::redact_in_place;

/// Action recorded by an audit entry.
///
/// The well-known variants cover CRUD and account-security events; anything
/// else (e.g. a module-specific `APPROVE_INVOICE`) travels as [`Other`].
///
/// [`Other`]: AuditAction::Other
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    LoginSuccess,
    LoginFailed,
    Logout,
    UpdatePassword,
    UpdateRole,
    UpdatePermissions,
    ExportData,
    Backup,
    Restore,
    Other(String),
}

impl AuditAction {
    /// Uppercase wire name, used in sinks and level filtering.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::LoginSuccess => "LOGIN_SUCCESS",
            Self::LoginFailed => "LOGIN_FAILED",
            Self::Logout => "LOGOUT",
            Self::UpdatePassword => "UPDATE_PASSWORD",
            Self::UpdateRole => "UPDATE_ROLE",
            Self::UpdatePermissions => "UPDATE_PERMISSIONS",
            Self::ExportData => "EXPORT_DATA",
            Self::Backup => "BACKUP",
            Self::Restore => "RESTORE",
            Self::Other(name) => name,
        }
    }

    /// Critical actions skip the buffer and are persisted immediately,
    /// regardless of the configured audit level.
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            Self::Delete
                | Self::UpdatePassword
                | Self::UpdateRole
                | Self::UpdatePermissions
                | Self::LoginFailed
                | Self::LoginSuccess
                | Self::Logout
                | Self::ExportData
                | Self::Backup
                | Self::Restore
        )
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for AuditAction {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Verbosity level controlling which non-critical entries are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuditLevel {
    /// Keep every entry.
    #[default]
    All,
    /// Keep entries for state-changing request methods only.
    Write,
    /// Keep entries whose action involves a delete.
    Delete,
    /// Keep critical actions only.
    Admin,
}

impl AuditLevel {
    /// Parses a level name (`all`, `write`, `delete`, `admin`).
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "all" => Some(Self::All),
            "write" => Some(Self::Write),
            "delete" => Some(Self::Delete),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Write => "write",
            Self::Delete => "delete",
            Self::Admin => "admin",
        }
    }
}

/// Outcome status of the audited operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditStatus {
    Success,
    Failure,
}

impl AuditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

/// Who performed the operation. All fields are null for anonymous requests.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AuditActor {
    pub id: Option<i64>,
    pub email: Option<String>,
    pub role: Option<String>,
}

/// Request context captured alongside the operation.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub method: Option<String>,
    pub path: Option<String>,
    pub body: Value,
}

/// Before/after snapshots for mutating operations. Either side may be null.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeSet {
    pub previous: Value,
    #[serde(rename = "new")]
    pub new_data: Value,
}

impl Default for ChangeSet {
    fn default() -> Self {
        Self {
            previous: Value::Null,
            new_data: Value::Null,
        }
    }
}

/// How the operation ended.
#[derive(Debug, Clone, Serialize)]
pub struct AuditOutcome {
    pub status: AuditStatus,
    pub error: Option<String>,
    #[serde(rename = "duration")]
    pub duration_ms: Option<i64>,
}

impl Default for AuditOutcome {
    fn default() -> Self {
        Self {
            status: AuditStatus::Success,
            error: None,
            duration_ms: None,
        }
    }
}

/// Immutable audit record, ready for persistence.
///
/// Serializes to the nested JSON shape written by the file sink:
///
/// ```json
/// {
///   "id": "…", "timestamp": "…", "action": "DELETE",
///   "entity": "categorias", "entityId": "5",
///   "user": {"id": 7, "email": "a@b.com", "role": "admin"},
///   "request": {"ip": "…", "userAgent": "…", "method": "DELETE", "path": "…", "body": null},
///   "changes": {"previous": null, "new": null},
///   "result": {"status": "success", "error": null, "duration": 12},
///   "metadata": {}
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub action: AuditAction,
    pub entity: String,
    pub entity_id: Option<String>,
    pub user: AuditActor,
    pub request: RequestContext,
    pub changes: ChangeSet,
    pub result: AuditOutcome,
    pub metadata: Value,
}

impl AuditEntry {
    /// Builds an entry from a draft, redacting `request.body` and both
    /// change snapshots. The draft's `user` takes precedence over the
    /// individual actor fields.
    pub fn from_draft(action: AuditAction, draft: AuditDraft) -> Self {
        let mut body = draft.request_body.unwrap_or(Value::Null);
        let mut previous = draft.previous_data.unwrap_or(Value::Null);
        let mut new_data = draft.new_data.unwrap_or(Value::Null);

        redact_in_place(&mut body);
        redact_in_place(&mut previous);
        redact_in_place(&mut new_data);

        let user = match draft.user {
            Some(user) => AuditActor {
                id: Some(user.id),
                email: Some(user.email),
                role: Some(user.role),
            },
            None => AuditActor::default(),
        };

        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            action,
            entity: draft.entity.unwrap_or_else(|| "unknown".to_string()),
            entity_id: draft.entity_id,
            user,
            request: RequestContext {
                ip: draft.ip,
                user_agent: draft.user_agent,
                method: draft.method,
                path: draft.path,
                body,
            },
            changes: ChangeSet { previous, new_data },
            result: AuditOutcome {
                status: if draft.success {
                    AuditStatus::Success
                } else {
                    AuditStatus::Failure
                },
                error: draft.error_message,
                duration_ms: draft.duration_ms,
            },
            metadata: draft.metadata.unwrap_or_else(|| Value::Object(Default::default())),
        }
    }

    /// Whether this entry survives the configured level filter.
    ///
    /// Critical actions are handled before this check and never reach it
    /// through the normal pipeline, but the predicate answers for them
    /// consistently anyway.
    pub fn passes_level(&self, level: AuditLevel) -> bool {
        match level {
            AuditLevel::All => true,
            AuditLevel::Write => matches!(
                self.request.method.as_deref(),
                Some("POST") | Some("PUT") | Some("PATCH") | Some("DELETE")
            ),
            AuditLevel::Delete => self.action.as_str().contains("DELETE"),
            AuditLevel::Admin => self.action.is_critical(),
        }
    }
}

/// Mutable input for one audit entry.
///
/// Middleware and handlers fill only what they know; everything else
/// defaults to null/empty. `success` defaults to true.
#[derive(Debug, Clone)]
pub struct AuditDraft {
    pub entity: Option<String>,
    pub entity_id: Option<String>,
    pub user: Option<AuthUser>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub method: Option<String>,
    pub path: Option<String>,
    pub request_body: Option<Value>,
    pub previous_data: Option<Value>,
    pub new_data: Option<Value>,
    pub success: bool,
    pub error_message: Option<String>,
    pub duration_ms: Option<i64>,
    pub metadata: Option<Value>,
}

impl Default for AuditDraft {
    fn default() -> Self {
        Self {
            entity: None,
            entity_id: None,
            user: None,
            ip: None,
            user_agent: None,
            method: None,
            path: None,
            request_body: None,
            previous_data: None,
            new_data: None,
            success: true,
            error_message: None,
            duration_ms: None,
            metadata: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::redaction::REDACTION_MARKER;
    use serde_json::json;

    #[test]
    fn test_action_names() {
        assert_eq!(AuditAction::Delete.as_str(), "DELETE");
        assert_eq!(AuditAction::LoginFailed.as_str(), "LOGIN_FAILED");
        assert_eq!(
            AuditAction::Other("APPROVE_INVOICE".to_string()).as_str(),
            "APPROVE_INVOICE"
        );
    }

    #[test]
    fn test_critical_actions() {
        assert!(AuditAction::Delete.is_critical());
        assert!(AuditAction::UpdatePassword.is_critical());
        assert!(AuditAction::LoginSuccess.is_critical());
        assert!(AuditAction::Backup.is_critical());
        assert!(!AuditAction::Create.is_critical());
        assert!(!AuditAction::Update.is_critical());
        assert!(!AuditAction::Other("APPROVE".to_string()).is_critical());
    }

    #[test]
    fn test_level_parse() {
        assert_eq!(AuditLevel::parse("all"), Some(AuditLevel::All));
        assert_eq!(AuditLevel::parse("WRITE"), Some(AuditLevel::Write));
        assert_eq!(AuditLevel::parse("delete"), Some(AuditLevel::Delete));
        assert_eq!(AuditLevel::parse("admin"), Some(AuditLevel::Admin));
        assert_eq!(AuditLevel::parse("verbose"), None);
    }

    #[test]
    fn test_entry_defaults() {
        let entry = AuditEntry::from_draft(AuditAction::Create, AuditDraft::default());

        assert_eq!(entry.entity, "unknown");
        assert!(entry.entity_id.is_none());
        assert!(entry.user.id.is_none());
        assert_eq!(entry.request.body, Value::Null);
        assert_eq!(entry.result.status, AuditStatus::Success);
        assert_eq!(entry.metadata, json!({}));
    }

    #[test]
    fn test_entry_redacts_all_payloads() {
        let draft = AuditDraft {
            request_body: Some(json!({"nome": "x", "password": "hunter2"})),
            previous_data: Some(json!({"senha": "old"})),
            new_data: Some(json!({"profile": {"token": "abc"}})),
            ..Default::default()
        };

        let entry = AuditEntry::from_draft(AuditAction::Update, draft);

        assert_eq!(entry.request.body["nome"], "x");
        assert_eq!(entry.request.body["password"], REDACTION_MARKER);
        assert_eq!(entry.changes.previous["senha"], REDACTION_MARKER);
        assert_eq!(entry.changes.new_data["profile"]["token"], REDACTION_MARKER);
    }

    #[test]
    fn test_level_filtering() {
        let write_draft = AuditDraft {
            method: Some("POST".to_string()),
            ..Default::default()
        };
        let read_draft = AuditDraft {
            method: Some("GET".to_string()),
            ..Default::default()
        };

        let create = AuditEntry::from_draft(AuditAction::Create, write_draft.clone());
        assert!(create.passes_level(AuditLevel::All));
        assert!(create.passes_level(AuditLevel::Write));
        assert!(!create.passes_level(AuditLevel::Delete));
        assert!(!create.passes_level(AuditLevel::Admin));

        let read = AuditEntry::from_draft(AuditAction::Other("VIEW".to_string()), read_draft);
        assert!(read.passes_level(AuditLevel::All));
        assert!(!read.passes_level(AuditLevel::Write));

        let bulk_delete =
            AuditEntry::from_draft(AuditAction::Other("BULK_DELETE".to_string()), write_draft);
        assert!(bulk_delete.passes_level(AuditLevel::Delete));
    }

    #[test]
    fn test_serialized_shape() {
        let draft = AuditDraft {
            entity: Some("categorias".to_string()),
            entity_id: Some("5".to_string()),
            user: Some(AuthUser::new(7, "a@b.com", "admin")),
            ip: Some("10.0.0.1".to_string()),
            user_agent: Some("curl/8".to_string()),
            method: Some("DELETE".to_string()),
            path: Some("/api/categorias/5".to_string()),
            duration_ms: Some(12),
            ..Default::default()
        };

        let entry = AuditEntry::from_draft(AuditAction::Delete, draft);
        let value = serde_json::to_value(&entry).unwrap();

        assert_eq!(value["action"], "DELETE");
        assert_eq!(value["entityId"], "5");
        assert_eq!(value["user"]["id"], 7);
        assert_eq!(value["user"]["email"], "a@b.com");
        assert_eq!(value["request"]["userAgent"], "curl/8");
        assert_eq!(value["request"]["method"], "DELETE");
        assert_eq!(value["changes"]["previous"], Value::Null);
        assert_eq!(value["changes"]["new"], Value::Null);
        assert_eq!(value["result"]["status"], "success");
        assert_eq!(value["result"]["duration"], 12);
        assert!(value["id"].is_string());
        assert!(value["timestamp"].is_string());
    }
}
