use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{SyncError, TIMEOUT_MESSAGE};
use crate::rendezvous::WaitTimeout;

/// Operation requested by a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestKind {
    /// Reads a checkpoint value.
    Get,
    /// Writes a checkpoint value.
    Set,
    /// Waits until a checkpoint has a value.
    Wait,
    /// Arms a latch.
    LatchSet,
    /// Counts a latch down by one.
    LatchDown,
    /// Waits until a latch reaches zero.
    LatchWait,
    /// Reports whether a latch is still counting down.
    LatchHasCount,
    /// Waits until a task context reaches a terminal state.
    ContextWait,
    /// Waits until a task reports a state.
    TaskWait,
    /// Registers a new task context from a descriptor.
    ContextSubmit,
}

impl RequestKind {
    /// All request kinds, in declaration order.
    pub const ALL: [RequestKind; 10] = [
        RequestKind::Get,
        RequestKind::Set,
        RequestKind::Wait,
        RequestKind::LatchSet,
        RequestKind::LatchDown,
        RequestKind::LatchWait,
        RequestKind::LatchHasCount,
        RequestKind::ContextWait,
        RequestKind::TaskWait,
        RequestKind::ContextSubmit,
    ];

    /// Returns the wire token of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Get => "GET",
            RequestKind::Set => "SET",
            RequestKind::Wait => "WAIT",
            RequestKind::LatchSet => "LATCH_SET",
            RequestKind::LatchDown => "LATCH_DOWN",
            RequestKind::LatchWait => "LATCH_WAIT",
            RequestKind::LatchHasCount => "LATCH_HAS_COUNT",
            RequestKind::ContextWait => "CONTEXT_WAIT",
            RequestKind::TaskWait => "TASK_WAIT",
            RequestKind::ContextSubmit => "CONTEXT_SUBMIT",
        }
    }

    /// Whether requests of this kind block until another request acts.
    pub fn is_wait(&self) -> bool {
        matches!(
            self,
            RequestKind::Wait
                | RequestKind::LatchWait
                | RequestKind::TaskWait
                | RequestKind::ContextWait
        )
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded request as handed over by the transport.
///
/// `kind` is kept as the raw token so that an unknown kind still reaches the dispatcher, which
/// answers it with an ERROR reply naming the token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Request {
    pub kind: String,
    pub task_id: String,
    pub context_id: String,
    pub selector: String,
    pub value: Option<String>,
    /// Milliseconds to wait, zero or negative waits indefinitely.
    pub timeout_millis: i64,
}

impl Request {
    pub fn new(kind: RequestKind) -> Self {
        Self {
            kind: kind.as_str().to_owned(),
            ..Default::default()
        }
    }

    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = task_id.into();
        self
    }

    pub fn with_context_id(mut self, context_id: impl Into<String>) -> Self {
        self.context_id = context_id.into();
        self
    }

    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = selector.into();
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_timeout_millis(mut self, timeout_millis: i64) -> Self {
        self.timeout_millis = timeout_millis;
        self
    }

    pub fn timeout(&self) -> WaitTimeout {
        WaitTimeout::from_millis(self.timeout_millis)
    }
}

impl FromStr for Request {
    type Err = SyncError;

    /// Decodes a request from its JSON form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(serde_json::from_str(s)?)
    }
}

/// Outcome of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReplyType {
    Ok,
    Error,
}

/// The answer to exactly one [`Request`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub outcome: ReplyType,
    pub value: Option<String>,
}

impl Reply {
    pub fn ok(value: impl Into<String>) -> Self {
        Self {
            outcome: ReplyType::Ok,
            value: Some(value.into()),
        }
    }

    /// OK reply with an empty payload.
    pub fn ok_empty() -> Self {
        Self::ok(String::new())
    }

    /// OK reply without a payload, used for a checkpoint that was never set.
    pub fn ok_absent() -> Self {
        Self {
            outcome: ReplyType::Ok,
            value: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            outcome: ReplyType::Error,
            value: Some(message.into()),
        }
    }

    pub fn timeout() -> Self {
        Self::error(TIMEOUT_MESSAGE)
    }

    pub fn is_ok(&self) -> bool {
        self.outcome == ReplyType::Ok
    }

    pub fn is_timeout(&self) -> bool {
        self.outcome == ReplyType::Error && self.value.as_deref() == Some(TIMEOUT_MESSAGE)
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }
}

impl From<&SyncError> for Reply {
    fn from(err: &SyncError) -> Self {
        Reply::error(err.reply_message())
    }
}
