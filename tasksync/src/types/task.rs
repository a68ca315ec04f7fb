use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Key/value properties handed to a task.
pub type Properties = BTreeMap<String, String>;

/// Lifecycle state of a task in the task registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    Created,
    Submitted,
    Accepted,
    Waiting,
    Scheduled,
    Running,
    Sleeping,
    Finished,
    Aborted,
}

impl TaskState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Created => "CREATED",
            TaskState::Submitted => "SUBMITTED",
            TaskState::Accepted => "ACCEPTED",
            TaskState::Waiting => "WAITING",
            TaskState::Scheduled => "SCHEDULED",
            TaskState::Running => "RUNNING",
            TaskState::Sleeping => "SLEEPING",
            TaskState::Finished => "FINISHED",
            TaskState::Aborted => "ABORTED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Finished | TaskState::Aborted)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a task context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskContextState {
    Waiting,
    Running,
    Finished,
    Failed,
}

impl TaskContextState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskContextState::Waiting => "WAITING",
            TaskContextState::Running => "RUNNING",
            TaskContextState::Finished => "FINISHED",
            TaskContextState::Failed => "FAILED",
        }
    }

    /// `FINISHED` and `FAILED` are final, a context never leaves them.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskContextState::Finished | TaskContextState::Failed)
    }
}

impl fmt::Display for TaskContextState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A task as stored in the task registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskEntry {
    pub id: String,
    pub context_id: String,
    pub name: String,
    pub state: TaskState,
    #[serde(default)]
    pub properties: Properties,
}

/// A task context as stored in the task-context registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskContextEntry {
    pub id: String,
    pub name: String,
    pub state: TaskContextState,
    #[serde(default)]
    pub contained_tasks: Vec<String>,
}

/// Description of a single task, either inline or as a named template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TaskDescriptor {
    pub name: String,
    pub properties: Properties,
}

/// A reusable task descriptor referenced by name from the tasks of a context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskTemplate {
    pub name: String,
    pub task_descriptor: TaskDescriptor,
}

/// Where the descriptor of a context task comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskDescriptorSource {
    TaskDescriptor(TaskDescriptor),
    FromTemplate(String),
}

/// A task listed in a [`TaskContextDescriptor`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextTask {
    pub name: String,
    pub descriptor: TaskDescriptorSource,
    #[serde(default)]
    pub properties: Properties,
}

/// Serialized form of a task context submitted through `CONTEXT_SUBMIT`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TaskContextDescriptor {
    pub name: String,
    pub properties: Properties,
    pub templates: Vec<TaskTemplate>,
    pub tasks: Vec<ContextTask>,
}
