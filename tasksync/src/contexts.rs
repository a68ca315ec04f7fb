//! Registration and cleanup of task contexts.

use std::collections::HashMap;

use config::shared::ContextConfig;
use tracing::{debug, info};
use uuid::Uuid;

use crate::bail;
use crate::error::{ErrorKind, SyncResult};
use crate::names::{checkpoint_map_name, latch_prefix};
use crate::store::{ClusterStore, CountDownLatch, ObservableMap};
use crate::types::{
    TaskContextDescriptor, TaskContextEntry, TaskContextState, TaskDescriptor,
    TaskDescriptorSource, TaskEntry, TaskState,
};

/// Expands `descriptor` into the context entry and the task entries to register under
/// `context_id`.
///
/// Template references are resolved against the templates of the descriptor. Task properties
/// are layered: context properties first, then those of the task descriptor, then those set on
/// the task itself.
pub fn expand_descriptor(
    descriptor: TaskContextDescriptor,
    context_id: &str,
) -> SyncResult<(TaskContextEntry, Vec<TaskEntry>)> {
    let templates: HashMap<&str, &TaskDescriptor> = descriptor
        .templates
        .iter()
        .map(|template| (template.name.as_str(), &template.task_descriptor))
        .collect();

    let mut tasks = Vec::with_capacity(descriptor.tasks.len());
    for task in &descriptor.tasks {
        let task_descriptor = match &task.descriptor {
            TaskDescriptorSource::TaskDescriptor(inline) => inline,
            TaskDescriptorSource::FromTemplate(name) => match templates.get(name.as_str()) {
                Some(template) => *template,
                None => bail!(
                    ErrorKind::ValidationError,
                    "Unknown task template",
                    detail = name.clone()
                ),
            },
        };

        let mut properties = descriptor.properties.clone();
        properties.extend(task_descriptor.properties.clone());
        properties.extend(task.properties.clone());

        tasks.push(TaskEntry {
            id: Uuid::new_v4().to_string(),
            context_id: context_id.to_owned(),
            name: task.name.clone(),
            state: TaskState::Submitted,
            properties,
        });
    }

    let context = TaskContextEntry {
        id: context_id.to_owned(),
        name: descriptor.name,
        state: TaskContextState::Running,
        contained_tasks: tasks.iter().map(|task| task.id.clone()).collect(),
    };

    Ok((context, tasks))
}

/// Releases the shared resources of a context and schedules its entries for eviction.
///
/// The checkpoint map and every latch of the context are destroyed, waiters on them fail. The
/// context and its tasks stay readable until their TTL elapses.
pub async fn cleanup_task_context<S>(
    store: &S,
    context_id: &str,
    config: &ContextConfig,
) -> SyncResult<()>
where
    S: ClusterStore,
{
    store.destroy_map(&checkpoint_map_name(context_id)).await?;

    let prefix = latch_prefix(context_id);
    for name in store.latch_names() {
        if name.starts_with(&prefix) {
            debug!(latch = %name, "destroying latch");
            store.latch(&name).destroy().await?;
        }
    }

    let contexts = store.task_contexts();
    let Some(context) = contexts.get(context_id).await? else {
        debug!(context_id, "no context entry to clean up");
        return Ok(());
    };

    let tasks = store.tasks();
    for task_id in &context.contained_tasks {
        if let Some(task) = tasks.get(task_id).await? {
            tasks.put_with_ttl(task_id, task, config.task_ttl()).await?;
        }
    }

    let tasks_count = context.contained_tasks.len();
    contexts
        .put_with_ttl(context_id, context, config.context_ttl())
        .await?;

    info!(context_id, tasks_count, "task context cleaned up");

    Ok(())
}
