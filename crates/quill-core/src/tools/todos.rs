//! Session todo list

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    Pending,
    InProgress,
    Completed,
}

impl TodoStatus {
    fn rank(self) -> u8 {
        match self {
            TodoStatus::InProgress => 0,
            TodoStatus::Pending => 1,
            TodoStatus::Completed => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TodoPriority {
    High,
    Medium,
    Low,
}

impl TodoPriority {
    fn rank(self) -> u8 {
        match self {
            TodoPriority::High => 0,
            TodoPriority::Medium => 1,
            TodoPriority::Low => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    pub content: String,
    pub status: TodoStatus,
    pub priority: TodoPriority,
    pub id: String,
}

/// A change between the previous and the new list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TodoChange {
    StatusChange {
        task_id: String,
        old_status: TodoStatus,
        new_status: TodoStatus,
    },
    TaskAdded {
        task_id: String,
        status: TodoStatus,
    },
}

/// Counts per status after a replace
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TodoCounts {
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
}

#[derive(Debug, Default)]
pub struct TodoStore {
    items: RwLock<Vec<TodoItem>>,
}

impl TodoStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<TodoItem> {
        self.items.read().clone()
    }

    /// Validate and replace the whole list. Items are kept sorted by status
    /// (in progress first) then priority.
    pub fn replace(&self, mut todos: Vec<TodoItem>) -> Result<Vec<TodoChange>, String> {
        validate(&todos)?;

        let mut items = self.items.write();
        let changes = detect_changes(&items, &todos);

        todos.sort_by_key(|t| (t.status.rank(), t.priority.rank()));
        *items = todos;
        Ok(changes)
    }

    pub fn counts(&self) -> TodoCounts {
        let items = self.items.read();
        let mut counts = TodoCounts::default();
        for item in items.iter() {
            match item.status {
                TodoStatus::Pending => counts.pending += 1,
                TodoStatus::InProgress => counts.in_progress += 1,
                TodoStatus::Completed => counts.completed += 1,
            }
        }
        counts
    }
}

fn validate(todos: &[TodoItem]) -> Result<(), String> {
    let mut ids = HashSet::new();
    if !todos.iter().all(|t| ids.insert(t.id.as_str())) {
        return Err("Duplicate todo IDs found".to_string());
    }

    let in_progress = todos
        .iter()
        .filter(|t| t.status == TodoStatus::InProgress)
        .count();
    if in_progress > 1 {
        return Err("Only one task can be in progress at a time".to_string());
    }

    if todos.iter().any(|t| t.content.trim().is_empty()) {
        return Err("Todo content cannot be empty".to_string());
    }

    Ok(())
}

fn detect_changes(old: &[TodoItem], new: &[TodoItem]) -> Vec<TodoChange> {
    new.iter()
        .filter_map(|todo| match old.iter().find(|o| o.id == todo.id) {
            Some(prev) if prev.status != todo.status => Some(TodoChange::StatusChange {
                task_id: todo.id.clone(),
                old_status: prev.status,
                new_status: todo.status,
            }),
            Some(_) => None,
            None => Some(TodoChange::TaskAdded {
                task_id: todo.id.clone(),
                status: todo.status,
            }),
        })
        .collect()
}
