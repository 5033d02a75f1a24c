use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use veloce_core::breakdown::{clean_steps, fallback_breakdown};
use veloce_core::checklist::{MoveDirection, SubTaskList};
use veloce_core::subtask::{SubTask, SubTaskStatus};

use crate::{BreakdownGenerator, BreakdownRequest, ServiceError, SubTaskStore};

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Quiet period after the last context edit before regenerating.
    pub debounce: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(500),
        }
    }
}

/// Change notifications for observers of a session.
#[derive(Debug, Clone, PartialEq)]
pub enum ChecklistEvent {
    Replaced { count: usize },
    Added(SubTask),
    Updated(SubTask),
    Removed { id: String },
    Reordered,
}

/// Store writes, applied one at a time in the order they were queued.
enum WriteOp {
    Upsert(Vec<SubTask>),
    Delete { id: String, siblings: Vec<SubTask> },
    /// Delete-all then insert-all. Not atomic: a failure between the two
    /// leaves the store out of step with the in-memory list.
    Replace { task_id: String, rows: Vec<SubTask> },
    Barrier(oneshot::Sender<()>),
}

async fn run_writer(store: Arc<dyn SubTaskStore>, mut rx: mpsc::UnboundedReceiver<WriteOp>) {
    while let Some(op) = rx.recv().await {
        match op {
            WriteOp::Upsert(rows) => {
                for row in &rows {
                    if let Err(e) = store.upsert(row).await {
                        warn!(task_id = %row.task_id, subtask_id = %row.id, error = %e, "failed to persist subtask");
                    }
                }
            }
            WriteOp::Delete { id, siblings } => {
                if let Err(e) = store.delete(&id).await {
                    warn!(subtask_id = %id, error = %e, "failed to delete subtask");
                }
                for row in &siblings {
                    if let Err(e) = store.upsert(row).await {
                        warn!(subtask_id = %row.id, error = %e, "failed to re-index subtask");
                    }
                }
            }
            WriteOp::Replace { task_id, rows } => {
                if let Err(e) = store.delete_for_task(&task_id).await {
                    warn!(task_id = %task_id, error = %e, "failed to clear subtasks");
                    continue;
                }
                if let Err(e) = store.insert_many(&rows).await {
                    warn!(task_id = %task_id, count = rows.len(), error = %e, "failed to insert subtasks");
                }
            }
            WriteOp::Barrier(done) => {
                let _ = done.send(());
            }
        }
    }
    debug!("subtask writer stopped");
}

/// State container for one task's checklist.
///
/// Mutations apply to the in-memory list synchronously and return whether
/// anything changed. Each change queues its store writes while the list is
/// still locked, and a single writer task applies them in that order, so the
/// store converges on the in-memory list. Write failures are logged only.
/// `flush` waits until everything queued so far has been applied.
///
/// Must be created inside a tokio runtime.
pub struct ChecklistSession {
    list: Mutex<SubTaskList>,
    generator: Arc<dyn BreakdownGenerator>,
    events: broadcast::Sender<ChecklistEvent>,
    writes: mpsc::UnboundedSender<WriteOp>,
    generations: Mutex<Vec<JoinHandle<()>>>,
    regeneration: Mutex<Option<JoinHandle<()>>>,
    config: SessionConfig,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|p| p.into_inner())
}

impl ChecklistSession {
    pub fn new(
        task_id: &str,
        store: Arc<dyn SubTaskStore>,
        generator: Arc<dyn BreakdownGenerator>,
        config: SessionConfig,
    ) -> Arc<Self> {
        Self::with_list(SubTaskList::new(task_id), store, generator, config)
    }

    /// Start from whatever the store holds for `task_id`.
    pub async fn load(
        task_id: &str,
        store: Arc<dyn SubTaskStore>,
        generator: Arc<dyn BreakdownGenerator>,
        config: SessionConfig,
    ) -> Result<Arc<Self>, ServiceError> {
        let rows = store.list_for_task(task_id).await?;
        debug!(task_id, count = rows.len(), "loaded subtasks");
        let list = SubTaskList::from_subtasks(task_id, rows);
        Ok(Self::with_list(list, store, generator, config))
    }

    fn with_list(
        list: SubTaskList,
        store: Arc<dyn SubTaskStore>,
        generator: Arc<dyn BreakdownGenerator>,
        config: SessionConfig,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (writes, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(store, rx));
        Arc::new(Self {
            list: Mutex::new(list),
            generator,
            events,
            writes,
            generations: Mutex::new(Vec::new()),
            regeneration: Mutex::new(None),
            config,
        })
    }

    pub fn task_id(&self) -> String {
        lock(&self.list).task_id().to_string()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChecklistEvent> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> SubTaskList {
        lock(&self.list).clone()
    }

    /// Queue writes and notify observers. Callers hold the list lock so queue
    /// order and event order match the order changes were applied.
    fn commit(&self, op: WriteOp, event: ChecklistEvent) {
        if self.writes.send(op).is_err() {
            warn!("subtask writer is gone, change not persisted");
        }
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn spawn_generation<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(fut);
        let mut generations = lock(&self.generations);
        generations.retain(|h| !h.is_finished());
        generations.push(handle);
    }

    /// Wait for fired regenerations, then for every write queued so far.
    pub async fn flush(&self) {
        loop {
            let handles: Vec<JoinHandle<()>> = lock(&self.generations).drain(..).collect();
            if handles.is_empty() {
                break;
            }
            for handle in handles {
                if let Err(e) = handle.await {
                    warn!(error = %e, "regeneration task failed");
                }
            }
        }
        let (done, applied) = oneshot::channel();
        if self.writes.send(WriteOp::Barrier(done)).is_ok() {
            let _ = applied.await;
        }
    }

    // -- Generation --

    /// Replace the list with a fresh breakdown. Generator failures, and
    /// replies with no usable steps, fall back to the local template for
    /// `task_title`. Returns the new length.
    pub async fn generate(&self, task_title: &str, context: Option<&str>) -> usize {
        let request = BreakdownRequest::new(task_title, context);
        let steps = match self.generator.generate(&request).await.map(clean_steps) {
            Ok(steps) if !steps.is_empty() => steps,
            Ok(_) => {
                warn!(generator = self.generator.name(), "empty breakdown, using fallback");
                fallback_breakdown(task_title)
            }
            Err(e) => {
                warn!(generator = self.generator.name(), error = %e, "breakdown failed, using fallback");
                fallback_breakdown(task_title)
            }
        };

        let mut list = lock(&self.list);
        let task_id = list.task_id().to_string();
        *list = SubTaskList::from_breakdown(&task_id, &steps);
        let count = list.len();
        info!(task_id = %task_id, count, "checklist replaced");
        self.commit(
            WriteOp::Replace {
                task_id,
                rows: list.items().to_vec(),
            },
            ChecklistEvent::Replaced { count },
        );
        count
    }

    /// Debounced `generate`: restarts the quiet period on every call and only
    /// the last call within it runs. Once fired, a regeneration is not cancelled.
    pub fn schedule_regeneration(self: &Arc<Self>, task_title: &str, context: Option<&str>) {
        let session = Arc::clone(self);
        let title = task_title.to_string();
        let context = context.map(String::from);
        let delay = self.config.debounce;

        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let runner = Arc::clone(&session);
            session.spawn_generation(async move {
                runner.generate(&title, context.as_deref()).await;
            });
        });

        if let Some(previous) = lock(&self.regeneration).replace(timer) {
            previous.abort();
        }
    }

    /// Drop a pending debounced regeneration, if any.
    pub fn cancel_regeneration(&self) {
        if let Some(timer) = lock(&self.regeneration).take() {
            timer.abort();
        }
    }

    // -- Mutations --

    pub fn add(&self, title: &str) -> Option<SubTask> {
        self.add_with_estimate(title, None)
    }

    pub fn add_with_estimate(&self, title: &str, minutes: Option<u32>) -> Option<SubTask> {
        let mut list = lock(&self.list);
        let added = list.add_with_estimate(title, minutes).cloned()?;
        self.commit(
            WriteOp::Upsert(vec![added.clone()]),
            ChecklistEvent::Added(added.clone()),
        );
        Some(added)
    }

    pub fn edit(&self, id: &str, new_title: &str) -> bool {
        let mut list = lock(&self.list);
        if !list.edit(id, new_title) {
            return false;
        }
        let Some(row) = list.get(id).cloned() else {
            return false;
        };
        self.commit(
            WriteOp::Upsert(vec![row.clone()]),
            ChecklistEvent::Updated(row),
        );
        true
    }

    pub fn cycle(&self, id: &str) -> Option<SubTaskStatus> {
        let mut list = lock(&self.list);
        let status = list.cycle(id)?;
        let row = list.get(id).cloned()?;
        self.commit(
            WriteOp::Upsert(vec![row.clone()]),
            ChecklistEvent::Updated(row),
        );
        Some(status)
    }

    pub fn move_subtask(&self, id: &str, direction: MoveDirection) -> bool {
        let mut list = lock(&self.list);
        if !list.move_subtask(id, direction) {
            return false;
        }
        self.commit(
            WriteOp::Upsert(list.items().to_vec()),
            ChecklistEvent::Reordered,
        );
        true
    }

    pub fn move_to(&self, id: &str, position: usize) -> bool {
        let mut list = lock(&self.list);
        if !list.move_to(id, position) {
            return false;
        }
        self.commit(
            WriteOp::Upsert(list.items().to_vec()),
            ChecklistEvent::Reordered,
        );
        true
    }

    pub fn delete(&self, id: &str) -> bool {
        let mut list = lock(&self.list);
        if list.delete(id).is_none() {
            return false;
        }
        self.commit(
            WriteOp::Delete {
                id: id.to_string(),
                siblings: list.items().to_vec(),
            },
            ChecklistEvent::Removed { id: id.to_string() },
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LocalStore, MockGenerator, SubTaskStore};
    use veloce_core::breakdown::BreakdownStep;
    use veloce_db::Db;

    fn session_with(generator: MockGenerator) -> (Arc<ChecklistSession>, Arc<MockGenerator>) {
        let store = Arc::new(LocalStore::new(Db::open_in_memory().unwrap()));
        let generator = Arc::new(generator);
        let session =
            ChecklistSession::new("task-1", store, generator.clone(), SessionConfig::default());
        (session, generator)
    }

    #[tokio::test]
    async fn blank_add_emits_nothing() {
        let (session, _) = session_with(MockGenerator::failure("x"));
        let mut rx = session.subscribe();
        assert!(session.add("   ").is_none());
        assert!(rx.try_recv().is_err());
        assert!(session.snapshot().is_empty());
    }

    #[tokio::test]
    async fn generate_prefers_generator_output() {
        let (session, generator) = session_with(MockGenerator::success(vec![
            BreakdownStep::new("One", Some(5), Some("why".into())),
            BreakdownStep::new("Two", None, None),
        ]));
        assert_eq!(session.generate("Anything", Some("ctx")).await, 2);
        assert_eq!(generator.calls(), 1);
        let list = session.snapshot();
        assert_eq!(list.items()[0].ai_reasoning.as_deref(), Some("why"));
        assert_eq!(list.items()[1].order_index, 2);
    }

    #[tokio::test]
    async fn empty_generator_output_falls_back() {
        let (session, _) = session_with(MockGenerator::success(Vec::new()));
        assert_eq!(session.generate("Team call", None).await, 4);
    }

    #[tokio::test]
    async fn blank_generated_titles_are_dropped() {
        let (session, _) = session_with(MockGenerator::success(vec![
            BreakdownStep::new("   ", Some(5), None),
            BreakdownStep::new("  Real step ", None, None),
        ]));
        assert_eq!(session.generate("Anything", None).await, 1);
        let list = session.snapshot();
        assert_eq!(list.items()[0].title, "Real step");
        assert_eq!(list.items()[0].order_index, 1);
    }

    #[tokio::test]
    async fn flush_waits_for_queued_writes() {
        let store = Arc::new(LocalStore::new(Db::open_in_memory().unwrap()));
        let session = ChecklistSession::new(
            "task-1",
            store.clone(),
            Arc::new(MockGenerator::failure("x")),
            SessionConfig::default(),
        );
        for title in ["a", "b", "c"] {
            session.add(title);
        }
        session.flush().await;
        assert_eq!(store.list_for_task("task-1").await.unwrap().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_regeneration_prevents_run() {
        let (session, generator) = session_with(MockGenerator::failure("x"));
        session.schedule_regeneration("Task", Some("a"));
        session.cancel_regeneration();
        tokio::time::sleep(Duration::from_secs(2)).await;
        session.flush().await;
        assert_eq!(generator.calls(), 0);
    }
}
