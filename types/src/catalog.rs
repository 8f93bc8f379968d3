//! The authoritative task and city definition table.
//!
//! Loaded once at startup (either [`Catalog::default`] or a `[catalog]` table
//! from the node config) and shared read-only by the store and the engine.

use crate::{CatalogError, Reward, UserId, UserState};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Number of tiles on the 3×3 city grid.
pub const GRID_SIZE: usize = 9;

/// Static description of a one-time task.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDefinition {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub reward: Reward,
    /// Completion must be confirmed by an external check (e.g. channel
    /// subscription) before the reward is credited.
    #[serde(default)]
    pub needs_check: bool,
}

impl TaskDefinition {
    pub fn new(id: &str, label: &str, reward: Reward, needs_check: bool) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            reward,
            needs_check,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default = "default_cities")]
    pub cities: Vec<String>,

    #[serde(default = "default_tasks")]
    pub tasks: Vec<TaskDefinition>,

    /// Credited to an inviter when a brand-new user arrives via their link.
    #[serde(default = "default_referral_reward")]
    pub referral_reward: Reward,
}

fn default_cities() -> Vec<String> {
    [
        "Джохор",
        "Бангкок",
        "Куала Лумпур",
        "Сингапур",
        "Алматы",
        "Дубай",
        "Хошимин",
        "Манила",
        "Тайбэй",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_tasks() -> Vec<TaskDefinition> {
    vec![
        TaskDefinition::new("subscribe", "Подпишись на канал", Reward::new(1, 1, 5), true),
        TaskDefinition::new("pin_bot", "Добавь бота в закреп", Reward::new(1, 1, 5), false),
        TaskDefinition::new("invite_friend", "Пригласи 1 друга", Reward::new(1, 1, 10), false),
        TaskDefinition::new(
            "send_route",
            "Отправь маршрут, откуда ты обычно летаешь",
            Reward::new(1, 0, 5),
            false,
        ),
        TaskDefinition::new("mini_quiz", "Пройди мини-квиз", Reward::new(1, 1, 10), false),
    ]
}

fn default_referral_reward() -> Reward {
    Reward::new(1, 1, 0)
}

impl Catalog {
    /// Look up a task definition by id.
    pub fn task(&self, task_id: &str) -> Option<&TaskDefinition> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    /// Synthesize the initial state for a user seen for the first time.
    pub fn new_user(&self, user_id: UserId) -> UserState {
        UserState::new(user_id, &self.cities, &self.tasks)
    }

    /// Check the structural rules every catalog must satisfy.
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.cities.len() != GRID_SIZE {
            return Err(CatalogError::CityCount {
                expected: GRID_SIZE,
                found: self.cities.len(),
            });
        }
        let mut seen = HashSet::new();
        for city in &self.cities {
            if !seen.insert(city.as_str()) {
                return Err(CatalogError::DuplicateCity(city.clone()));
            }
        }
        let mut seen = HashSet::new();
        for task in &self.tasks {
            if task.id.is_empty() {
                return Err(CatalogError::EmptyTaskId);
            }
            if !seen.insert(task.id.as_str()) {
                return Err(CatalogError::DuplicateTask(task.id.clone()));
            }
        }
        Ok(())
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            cities: default_cities(),
            tasks: default_tasks(),
            referral_reward: default_referral_reward(),
        }
    }
}
