use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::api::TaskStore;
use crate::chart::{ChartBackend, ChartController, ChartMode};
use crate::errors::{Error, Result};
use crate::export;
use crate::models::{ProgressByUser, Task, UserLabel};
use crate::series::{AxisPolicy, Snapshot, build_view};

/// Where the controller pushes its output. Implementations render a
/// terminal, a test recorder, or whatever else hosts the view; the
/// controller itself never touches a concrete UI toolkit.
pub trait ViewSurface {
    fn show_tasks(&mut self, label: UserLabel, tasks: &[Task]);
    fn show_summary(&mut self, label: UserLabel, snapshot: &Snapshot);
    fn show_no_data(&mut self);
    fn show_error(&mut self, message: &str);
}

/// Root of the client: routes commands to the store, rebuilds the
/// progress view after every mutation, and keeps the cached lists in
/// step with what the server has confirmed.
pub struct ViewController<B: ChartBackend, V: ViewSurface> {
    store: TaskStore,
    chart: ChartController<B>,
    view: V,
    tasks: BTreeMap<u64, Task>,
    timeframe_days: u32,
    axis_policy: AxisPolicy,
    chart_mode: ChartMode,
    progress_epoch: u64,
    export_dir: PathBuf,
}

impl<B: ChartBackend, V: ViewSurface> ViewController<B, V> {
    pub fn new(store: TaskStore, chart: ChartController<B>, view: V) -> Self {
        Self {
            store,
            chart,
            view,
            tasks: BTreeMap::new(),
            timeframe_days: 30,
            axis_policy: AxisPolicy::FixedWindow,
            chart_mode: ChartMode::TimeSeries,
            progress_epoch: 0,
            export_dir: PathBuf::from("."),
        }
    }

    pub fn set_export_dir(&mut self, dir: impl Into<PathBuf>) {
        self.export_dir = dir.into();
    }

    pub fn set_chart_mode(&mut self, mode: ChartMode) {
        self.chart_mode = mode;
    }

    pub fn set_axis_policy(&mut self, policy: AxisPolicy) {
        self.axis_policy = policy;
    }

    pub fn timeframe(&self) -> u32 {
        self.timeframe_days
    }

    /// Initialization setter; interactive changes go through
    /// `on_timeframe_change` so they drive a re-render.
    pub fn set_timeframe(&mut self, timeframe_days: u32) {
        self.timeframe_days = timeframe_days.max(1);
    }

    pub fn chart(&self) -> &ChartController<B> {
        &self.chart
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn tasks_for(&self, label: UserLabel) -> Vec<Task> {
        self.tasks
            .values()
            .filter(|task| task.user_id == label.user_id())
            .cloned()
            .collect()
    }

    /// Fetches the task lists and renders them, without touching the
    /// progress view.
    pub async fn load_tasks(&mut self) -> Result<()> {
        match self.store.list_tasks().await {
            Ok(tasks) => {
                self.tasks = tasks.into_iter().map(|task| (task.id, task)).collect();
                self.render_lists();
                Ok(())
            }
            Err(err) => {
                self.view.show_error(&err.to_string());
                Err(err)
            }
        }
    }

    /// Initial load: task lists plus progress view.
    pub async fn refresh(&mut self) -> Result<()> {
        self.load_tasks().await?;
        self.refresh_progress().await
    }

    pub async fn on_create(&mut self, user_id: u8, content: &str) -> Result<Task> {
        if UserLabel::from_user_id(user_id).is_none() {
            return self.reject(Error::validation("user id must be 1 or 2"));
        }
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return self.reject(Error::validation("task content must not be empty"));
        }

        match self.store.create_task(user_id, trimmed).await {
            Ok(task) => {
                self.tasks.insert(task.id, task.clone());
                self.render_lists();
                self.after_mutation().await;
                Ok(task)
            }
            Err(err) => self.reject(err),
        }
    }

    pub async fn on_toggle(&mut self, task_id: u64) -> Result<Task> {
        let Some(current) = self.tasks.get(&task_id) else {
            return self.reject(Error::NotFound(task_id));
        };
        let desired = !current.completed;

        match self.store.set_completed(task_id, desired).await {
            Ok(updated) => {
                if self.apply_completed(updated.clone()) {
                    self.after_mutation().await;
                }
                Ok(updated)
            }
            Err(err) => self.reject(err),
        }
    }

    /// Applies a completed-toggle response, keyed by entity id. Returns
    /// false when the task has left the cache since the request went
    /// out; a stale response must not resurrect a deleted row.
    pub fn apply_completed(&mut self, updated: Task) -> bool {
        match self.tasks.get_mut(&updated.id) {
            Some(slot) => {
                *slot = updated;
                self.render_lists();
                true
            }
            None => {
                debug!(id = updated.id, "dropping completion for task no longer cached");
                false
            }
        }
    }

    /// The row leaves the cache and the view only once the server has
    /// confirmed the delete.
    pub async fn on_delete(&mut self, task_id: u64) -> Result<()> {
        match self.store.delete_task(task_id).await {
            Ok(()) => {
                self.tasks.remove(&task_id);
                self.render_lists();
                self.after_mutation().await;
                Ok(())
            }
            Err(err) => self.reject(err),
        }
    }

    pub async fn on_timeframe_change(&mut self, timeframe_days: u32) -> Result<()> {
        if timeframe_days == 0 {
            return self.reject(Error::validation("timeframe must be at least one day"));
        }
        info!(timeframe_days, "timeframe changed");
        self.timeframe_days = timeframe_days;
        self.refresh_progress().await
    }

    pub async fn on_export(&mut self) -> Result<PathBuf> {
        let payload = match self.store.fetch_export(self.timeframe_days).await {
            Ok(payload) => payload,
            Err(err) => return self.reject(err),
        };
        match export::write_export(&self.export_dir, self.timeframe_days, &payload).await {
            Ok(path) => Ok(path),
            Err(err) => self.reject(err),
        }
    }

    pub async fn refresh_progress(&mut self) -> Result<()> {
        let epoch = self.begin_progress_fetch();
        let timeframe_days = self.timeframe_days;
        let outcome = self.store.fetch_progress(timeframe_days).await;
        self.apply_progress(epoch, timeframe_days, outcome)
    }

    /// Tags a fetch with the next epoch; any response applied under an
    /// older epoch no longer matches current intent and is discarded.
    fn begin_progress_fetch(&mut self) -> u64 {
        self.progress_epoch += 1;
        self.progress_epoch
    }

    fn apply_progress(
        &mut self,
        epoch: u64,
        timeframe_days: u32,
        outcome: Result<ProgressByUser>,
    ) -> Result<()> {
        if epoch != self.progress_epoch {
            debug!(epoch, current = self.progress_epoch, "discarding superseded progress fetch");
            return Ok(());
        }

        let raw = match outcome {
            Ok(raw) => raw,
            Err(err) => {
                self.view.show_error(&err.to_string());
                return Err(err);
            }
        };

        match build_view(&raw, timeframe_days, self.axis_policy) {
            Ok(view) => {
                if let Err(err) = self.chart.render(&view, self.chart_mode) {
                    self.view.show_error(&err.to_string());
                    return Err(err);
                }
                for (label, snapshot) in &view.snapshots {
                    self.view.show_summary(*label, snapshot);
                }
                Ok(())
            }
            Err(err) if err.is_no_data() => {
                self.view.show_no_data();
                Ok(())
            }
            Err(err) => {
                self.view.show_error(&err.to_string());
                Err(err)
            }
        }
    }

    /// Every confirmed mutation drives exactly one progress re-render.
    /// A refresh failure here is already surfaced through the view;
    /// the mutation itself stands.
    async fn after_mutation(&mut self) {
        if let Err(err) = self.refresh_progress().await {
            debug!(%err, "progress refresh after mutation failed");
        }
    }

    fn render_lists(&mut self) {
        for label in UserLabel::ALL {
            let tasks = self.tasks_for(label);
            self.view.show_tasks(label, &tasks);
        }
    }

    fn reject<T>(&mut self, err: Error) -> Result<T> {
        self.view.show_error(&err.to_string());
        Err(err)
    }
}
