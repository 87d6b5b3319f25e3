use crate::task::Task;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TaskFilter {
    #[default]
    All,
    Active,
    Completed,
}

impl TaskFilter {
    pub const ALL: [TaskFilter; 3] = [TaskFilter::All, TaskFilter::Active, TaskFilter::Completed];

    pub fn label(self) -> &'static str {
        match self {
            TaskFilter::All => "All",
            TaskFilter::Active => "Active",
            TaskFilter::Completed => "Completed",
        }
    }

    pub fn matches(self, task: &Task) -> bool {
        match self {
            TaskFilter::All => true,
            TaskFilter::Active => !task.completed,
            TaskFilter::Completed => task.completed,
        }
    }

    pub fn next(self) -> Self {
        match self {
            TaskFilter::All => TaskFilter::Active,
            TaskFilter::Active => TaskFilter::Completed,
            TaskFilter::Completed => TaskFilter::All,
        }
    }
}

/// Local mirror of the tasks the backend has confirmed, newest first.
#[derive(Debug, Default)]
pub struct TaskList {
    tasks: Vec<Task>,
    pub filter: TaskFilter,
    pub selected: usize,
}

impl TaskList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace_all(&mut self, mut tasks: Vec<Task>) {
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        self.tasks = tasks;
        self.clamp_selection();
    }

    /// Replaces the task with the same id, or inserts it in creation order.
    pub fn upsert(&mut self, task: Task) {
        if let Some(existing) = self.tasks.iter_mut().find(|t| t.id == task.id) {
            *existing = task;
        } else {
            let at = self
                .tasks
                .iter()
                .position(|t| t.created_at <= task.created_at)
                .unwrap_or(self.tasks.len());
            self.tasks.insert(at, task);
        }
        // The update may move the task out of the current filter.
        self.clamp_selection();
    }

    pub fn remove(&mut self, task_id: &str) -> Option<Task> {
        let index = self.tasks.iter().position(|t| t.id == task_id)?;
        let removed = self.tasks.remove(index);
        self.clamp_selection();
        Some(removed)
    }

    pub fn get(&self, task_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn visible(&self) -> Vec<&Task> {
        self.tasks.iter().filter(|t| self.filter.matches(t)).collect()
    }

    pub fn count(&self, filter: TaskFilter) -> usize {
        self.tasks.iter().filter(|t| filter.matches(t)).count()
    }

    pub fn selected_task(&self) -> Option<&Task> {
        self.visible().get(self.selected).copied()
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.visible().len() {
            self.selected += 1;
        }
    }

    pub fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn set_filter(&mut self, filter: TaskFilter) {
        self.filter = filter;
        self.clamp_selection();
    }

    fn clamp_selection(&mut self) {
        let visible = self.visible().len();
        if self.selected >= visible {
            self.selected = visible.saturating_sub(1);
        }
    }
}
