//! Core reward engine.

use crate::check::ExternalCheck;
use crate::error::{CityError, TaskError};
use crate::random::RandomSource;
use std::sync::Arc;
use std::time::Duration;
use visarun_types::{Catalog, Reward, TaskMeta, UserState};

/// Upper bound on a single external check before it counts as unavailable.
pub const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Reward for a successful city reveal, on top of the spent key.
const REVEAL_REWARD: Reward = Reward::new(0, 1, 0);

/// Result of a task completion request that did not fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The task flipped to done and `reward` was credited.
    Completed { reward: Reward },
    /// The task was already done; nothing changed.
    AlreadyDone,
}

/// Result of a city reveal request that did not fail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CityOutcome {
    /// The city at grid position `index` was revealed.
    Opened { index: usize, name: String },
    /// Every city is already open; nothing changed.
    AllOpened,
}

/// The reward engine. Applies task, city and referral transitions to a
/// user's state.
///
/// Transitions mutate the state only on success; on error the state is
/// exactly what was passed in.
pub struct RewardEngine {
    catalog: Arc<Catalog>,
    random: Arc<dyn RandomSource>,
    check_timeout: Duration,
}

impl RewardEngine {
    pub fn new(catalog: Arc<Catalog>, random: Arc<dyn RandomSource>) -> Self {
        Self {
            catalog,
            random,
            check_timeout: DEFAULT_CHECK_TIMEOUT,
        }
    }

    /// Override the bound on external checks.
    pub fn with_check_timeout(mut self, timeout: Duration) -> Self {
        self.check_timeout = timeout;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn check_timeout(&self) -> Duration {
        self.check_timeout
    }

    /// Complete `task_id` for the owner of `state`.
    ///
    /// Replaying a completion for a task that is already done is a no-op,
    /// and the external check is not consulted again.
    pub async fn complete_task(
        &self,
        state: &mut UserState,
        task_id: &str,
        payload: TaskMeta,
        check: &dyn ExternalCheck,
    ) -> Result<TaskOutcome, TaskError> {
        let def = self
            .catalog
            .task(task_id)
            .ok_or_else(|| TaskError::UnknownTask(task_id.to_string()))?;

        if state.is_task_done(task_id) {
            return Ok(TaskOutcome::AlreadyDone);
        }

        if def.needs_check {
            self.run_check(state, check).await?;
        }

        state.ensure_task(def);
        if !state.mark_task_done(task_id, payload) {
            return Ok(TaskOutcome::AlreadyDone);
        }
        state.credit(&def.reward);

        tracing::debug!(
            user = %state.user_id(),
            task = task_id,
            keys = def.reward.keys,
            tickets = def.reward.tickets,
            coins = def.reward.coins,
            "task completed"
        );
        Ok(TaskOutcome::Completed { reward: def.reward })
    }

    async fn run_check(&self, state: &UserState, check: &dyn ExternalCheck) -> Result<(), TaskError> {
        let user = state.user_id();
        match tokio::time::timeout(self.check_timeout, check.is_satisfied(user)).await {
            Ok(Ok(true)) => Ok(()),
            Ok(Ok(false)) => Err(TaskError::CheckFailed),
            Ok(Err(e)) => {
                tracing::warn!(%user, check = check.name(), error = %e, "external check failed to run");
                Err(TaskError::CheckUnavailable(e.to_string()))
            }
            Err(_) => {
                tracing::warn!(
                    %user,
                    check = check.name(),
                    timeout_ms = self.check_timeout.as_millis() as u64,
                    "external check timed out"
                );
                Err(TaskError::CheckUnavailable(format!(
                    "{} timed out after {:?}",
                    check.name(),
                    self.check_timeout
                )))
            }
        }
    }

    /// Reveal one hidden city chosen uniformly at random.
    ///
    /// Costs one key and earns one ticket. With no keys left this fails even
    /// if the grid is complete; with a complete grid and keys left it is a
    /// no-op.
    pub fn open_city(&self, state: &mut UserState) -> Result<CityOutcome, CityError> {
        if state.keys() == 0 {
            return Err(CityError::InsufficientKeys);
        }

        let hidden = state.hidden_city_indices().len();
        if hidden == 0 {
            return Ok(CityOutcome::AllOpened);
        }

        let rank = self.random.pick(hidden).min(hidden - 1);
        let (index, name) = match state.reveal_nth_hidden(rank) {
            Some((index, tile)) => (index, tile.name.clone()),
            None => return Ok(CityOutcome::AllOpened),
        };
        let spent = state.spend_key();
        debug_assert!(spent, "key balance checked above");
        state.credit(&REVEAL_REWARD);

        tracing::debug!(user = %state.user_id(), index, city = %name, "city opened");
        Ok(CityOutcome::Opened { index, name })
    }

    /// Credit an inviter. The caller decides whether the invitee qualifies.
    pub fn credit_referral(&self, inviter: &mut UserState, reward: &Reward) {
        inviter.credit(reward);
        tracing::debug!(
            user = %inviter.user_id(),
            keys = reward.keys,
            tickets = reward.tickets,
            coins = reward.coins,
            "referral credited"
        );
    }

    /// The catalog's standard referral reward.
    pub fn referral_reward(&self) -> Reward {
        self.catalog.referral_reward
    }
}
