//! Per-user progression state.
//!
//! Counters and flags are private: they only move through the methods below,
//! which keep the monotonic invariants (an opened city never closes, a done
//! task never reverts, a task's meta is written exactly once, keys never go
//! negative).

use crate::{Reward, TaskDefinition, UserId};
use serde::{Deserialize, Serialize};

/// Free-form payload recorded when a task is completed.
pub type TaskMeta = serde_json::Map<String, serde_json::Value>;

/// One tile of the city grid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CityTile {
    pub name: String,
    pub opened: bool,
}

/// Completion record for one task definition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskProgress {
    pub id: String,
    #[serde(default)]
    pub label: String,
    pub done: bool,
    #[serde(default)]
    pub meta: TaskMeta,
}

/// Everything the game knows about one user.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserState {
    user_id: UserId,
    keys: u32,
    tickets: u32,
    coins: u32,
    cities: Vec<CityTile>,
    tasks: Vec<TaskProgress>,
}

/// Compact progress view, mostly for logs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ProgressSummary {
    pub opened_cities: usize,
    pub total_cities: usize,
    pub done_tasks: usize,
    pub total_tasks: usize,
}

impl ProgressSummary {
    /// Whether every city on the grid has been revealed.
    pub fn complete(&self) -> bool {
        self.opened_cities == self.total_cities
    }
}

impl UserState {
    /// Fresh state: zero counters, every city hidden, every task pending.
    pub fn new(user_id: UserId, cities: &[String], tasks: &[TaskDefinition]) -> Self {
        Self {
            user_id,
            keys: 0,
            tickets: 0,
            coins: 0,
            cities: cities
                .iter()
                .map(|name| CityTile {
                    name: name.clone(),
                    opened: false,
                })
                .collect(),
            tasks: tasks.iter().map(TaskProgress::pending).collect(),
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn keys(&self) -> u32 {
        self.keys
    }

    pub fn tickets(&self) -> u32 {
        self.tickets
    }

    pub fn coins(&self) -> u32 {
        self.coins
    }

    pub fn cities(&self) -> &[CityTile] {
        &self.cities
    }

    pub fn tasks(&self) -> &[TaskProgress] {
        &self.tasks
    }

    pub fn task(&self, task_id: &str) -> Option<&TaskProgress> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    pub fn is_task_done(&self, task_id: &str) -> bool {
        self.task(task_id).is_some_and(|t| t.done)
    }

    /// Add a reward bundle to the counters. Saturates instead of overflowing.
    pub fn credit(&mut self, reward: &Reward) {
        self.keys = self.keys.saturating_add(reward.keys);
        self.tickets = self.tickets.saturating_add(reward.tickets);
        self.coins = self.coins.saturating_add(reward.coins);
    }

    /// Spend one key. Returns `false` (and changes nothing) when none are left.
    pub fn spend_key(&mut self) -> bool {
        match self.keys.checked_sub(1) {
            Some(left) => {
                self.keys = left;
                true
            }
            None => false,
        }
    }

    /// Indices of the cities that are still hidden, in grid order.
    pub fn hidden_city_indices(&self) -> Vec<usize> {
        self.cities
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.opened)
            .map(|(i, _)| i)
            .collect()
    }

    /// Flip a hidden city to opened. Returns `None` if the index is out of
    /// range or the city is already open.
    pub fn reveal_city(&mut self, index: usize) -> Option<&CityTile> {
        let tile = self.cities.get_mut(index)?;
        if tile.opened {
            return None;
        }
        tile.opened = true;
        Some(tile)
    }

    /// Reveal the `n`-th still-hidden city (counting in grid order).
    /// Returns its grid index and tile, or `None` if fewer than `n + 1`
    /// cities are hidden.
    pub fn reveal_nth_hidden(&mut self, n: usize) -> Option<(usize, &CityTile)> {
        let index = *self.hidden_city_indices().get(n)?;
        self.reveal_city(index).map(|tile| (index, tile))
    }

    /// Append a pending entry for a task this record predates.
    pub fn ensure_task(&mut self, def: &TaskDefinition) {
        if self.task(&def.id).is_none() {
            self.tasks.push(TaskProgress::pending(def));
        }
    }

    /// Mark a pending task done and record its meta. Returns `false` if the
    /// task is unknown to this record or already done.
    pub fn mark_task_done(&mut self, task_id: &str, meta: TaskMeta) -> bool {
        match self.tasks.iter_mut().find(|t| t.id == task_id) {
            Some(task) if !task.done => {
                task.done = true;
                task.meta = meta;
                true
            }
            _ => false,
        }
    }

    pub fn summary(&self) -> ProgressSummary {
        ProgressSummary {
            opened_cities: self.cities.iter().filter(|c| c.opened).count(),
            total_cities: self.cities.len(),
            done_tasks: self.tasks.iter().filter(|t| t.done).count(),
            total_tasks: self.tasks.len(),
        }
    }
}

impl TaskProgress {
    fn pending(def: &TaskDefinition) -> Self {
        Self {
            id: def.id.clone(),
            label: def.label.clone(),
            done: false,
            meta: TaskMeta::new(),
        }
    }
}
