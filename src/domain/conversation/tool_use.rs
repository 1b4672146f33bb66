//! ToolUse entity - the persisted record of one tool invocation.
//!
//! Lifecycle: `generating` while argument text streams in, `in_progress`
//! while the tool runs, then exactly one of `success` or `error`. The
//! owning message must still be generating for any of these writes; that
//! cross-entity check lives in the store, which sees both records.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{MessageId, StateMachine, Timestamp, ToolUseId};

use super::LifecycleError;

/// Lifecycle kind of a tool use, without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolUsePhase {
    Generating,
    InProgress,
    Success,
    Error,
}

impl StateMachine for ToolUsePhase {
    fn can_transition_to(&self, target: &Self) -> bool {
        use ToolUsePhase::*;
        matches!(
            (self, target),
            (Generating, InProgress) | (InProgress, Success) | (InProgress, Error)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use ToolUsePhase::*;
        match self {
            Generating => vec![InProgress],
            InProgress => vec![Success, Error],
            Success | Error => vec![],
        }
    }
}

impl ToolUsePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolUsePhase::Generating => "generating",
            ToolUsePhase::InProgress => "in_progress",
            ToolUsePhase::Success => "success",
            ToolUsePhase::Error => "error",
        }
    }
}

/// Status of a tool use with its outcome payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ToolUseStatus {
    Generating,
    InProgress,
    Success { result: String },
    Error { error: String },
}

impl ToolUseStatus {
    pub fn phase(&self) -> ToolUsePhase {
        match self {
            ToolUseStatus::Generating => ToolUsePhase::Generating,
            ToolUseStatus::InProgress => ToolUsePhase::InProgress,
            ToolUseStatus::Success { .. } => ToolUsePhase::Success,
            ToolUseStatus::Error { .. } => ToolUsePhase::Error,
        }
    }
}

/// One tool invocation attached to an assistant message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolUse {
    id: ToolUseId,
    message_id: MessageId,
    tool_name: String,
    tool_args: String,
    status: ToolUseStatus,
    created_at: Timestamp,
}

impl ToolUse {
    /// Starts a tool use with empty arguments.
    pub fn start(message_id: MessageId, tool_name: impl Into<String>) -> Self {
        Self {
            id: ToolUseId::new(),
            message_id,
            tool_name: tool_name.into(),
            tool_args: String::new(),
            status: ToolUseStatus::Generating,
            created_at: Timestamp::now(),
        }
    }

    /// Reconstitutes a tool use from persistence (no validation).
    pub fn reconstitute(
        id: ToolUseId,
        message_id: MessageId,
        tool_name: String,
        tool_args: String,
        status: ToolUseStatus,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            message_id,
            tool_name,
            tool_args,
            status,
            created_at,
        }
    }

    // ─── Accessors ───

    pub fn id(&self) -> ToolUseId {
        self.id
    }

    pub fn message_id(&self) -> MessageId {
        self.message_id
    }

    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    pub fn tool_args(&self) -> &str {
        &self.tool_args
    }

    pub fn status(&self) -> &ToolUseStatus {
        &self.status
    }

    pub fn created_at(&self) -> &Timestamp {
        &self.created_at
    }

    // ─── Lifecycle ───

    /// Replaces the argument text with a newer snapshot.
    pub fn set_arguments(&mut self, args: impl Into<String>) -> Result<(), LifecycleError> {
        if self.status.phase() != ToolUsePhase::Generating {
            return Err(LifecycleError::ToolUseNotGenerating(self.id));
        }
        self.tool_args = args.into();
        Ok(())
    }

    /// Argument streaming finished; the tool is about to run.
    pub fn set_in_progress(&mut self) -> Result<(), LifecycleError> {
        self.advance(ToolUsePhase::InProgress)?;
        self.status = ToolUseStatus::InProgress;
        Ok(())
    }

    pub fn set_success(&mut self, result: impl Into<String>) -> Result<(), LifecycleError> {
        self.advance(ToolUsePhase::Success)?;
        self.status = ToolUseStatus::Success {
            result: result.into(),
        };
        Ok(())
    }

    pub fn set_error(&mut self, error: impl Into<String>) -> Result<(), LifecycleError> {
        self.advance(ToolUsePhase::Error)?;
        self.status = ToolUseStatus::Error {
            error: error.into(),
        };
        Ok(())
    }

    fn advance(&self, target: ToolUsePhase) -> Result<(), LifecycleError> {
        let from = self.status.phase();
        from.transition_to(target)
            .map(|_| ())
            .map_err(|_| LifecycleError::ToolUseTransition {
                id: self.id,
                from,
                to: target,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started() -> ToolUse {
        ToolUse::start(MessageId::new(), "queryMemory")
    }

    #[test]
    fn start_has_empty_args_and_generating_status() {
        let tu = started();
        assert_eq!(tu.tool_args(), "");
        assert_eq!(tu.status(), &ToolUseStatus::Generating);
    }

    #[test]
    fn arguments_last_snapshot_wins() {
        let mut tu = started();
        tu.set_arguments("{\"qu").unwrap();
        tu.set_arguments("{\"query\":\"color\"}").unwrap();
        assert_eq!(tu.tool_args(), "{\"query\":\"color\"}");
    }

    #[test]
    fn arguments_frozen_after_in_progress() {
        let mut tu = started();
        tu.set_in_progress().unwrap();
        assert_eq!(
            tu.set_arguments("{}"),
            Err(LifecycleError::ToolUseNotGenerating(tu.id()))
        );
    }

    #[test]
    fn full_success_path() {
        let mut tu = started();
        tu.set_in_progress().unwrap();
        tu.set_success("[]").unwrap();
        assert_eq!(
            tu.status(),
            &ToolUseStatus::Success {
                result: "[]".into()
            }
        );
    }

    #[test]
    fn outcome_is_single_assignment() {
        let mut tu = started();
        tu.set_in_progress().unwrap();
        tu.set_error("boom").unwrap();
        assert!(tu.set_success("late").is_err());
        assert!(tu.set_error("again").is_err());
    }

    #[test]
    fn outcome_requires_in_progress() {
        let mut tu = started();
        let err = tu.set_success("{}").unwrap_err();
        assert_eq!(
            err,
            LifecycleError::ToolUseTransition {
                id: tu.id(),
                from: ToolUsePhase::Generating,
                to: ToolUsePhase::Success,
            }
        );
    }

    #[test]
    fn status_serializes_with_camel_case_tag() {
        let json = serde_json::to_value(ToolUseStatus::InProgress).unwrap();
        assert_eq!(json, serde_json::json!({"type": "inProgress"}));
    }
}
