//! Request handling core shared by the HTTP API and the bot.
//!
//! Every mutating operation follows the same cycle: authenticate, take the
//! user's guard, load or create the record, run the engine, write back.

use std::sync::Arc;

use thiserror::Error;
use tracing::Instrument;

use visarun_crypto::{AuthError, InitDataVerifier, VerifiedInitData};
use visarun_engine::{
    CityError, CityOutcome, ExternalCheck, RewardEngine, TaskError, TaskOutcome,
};
use visarun_store::{StoreError, UserStore};
use visarun_telegram::parse_referral;
use visarun_types::{Catalog, TaskMeta, Timestamp, UserId, UserState};

use crate::locks::UserLocks;
use crate::metrics::GameMetrics;
use crate::tracing_spans::request_span;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Task(#[from] TaskError),

    #[error(transparent)]
    City(#[from] CityError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl ServiceError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Auth(e) => e.code(),
            ServiceError::Task(e) => e.code(),
            ServiceError::City(e) => e.code(),
            ServiceError::Store(_) => "store_error",
        }
    }

    /// HTTP status the API answers with.
    pub fn http_status(&self) -> u16 {
        match self {
            ServiceError::Auth(_) => 401,
            ServiceError::Task(TaskError::CheckUnavailable(_)) => 500,
            ServiceError::Task(_) | ServiceError::City(_) => 400,
            ServiceError::Store(_) => 500,
        }
    }
}

/// What `/start` did about a referral payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReferralOutcome {
    /// The invitee was new; the inviter got the referral reward.
    Credited { inviter: UserId },
    /// The invitee already had a record. Nobody is credited.
    AlreadySeen,
    /// The payload named the invitee themself.
    SelfReferral,
    /// No payload, or one that is not a valid `ref_<id>`.
    NoReferral,
}

pub struct GameService {
    store: Arc<dyn UserStore>,
    verifier: InitDataVerifier,
    engine: RewardEngine,
    check: Arc<dyn ExternalCheck>,
    locks: UserLocks,
    metrics: Arc<GameMetrics>,
}

impl GameService {
    pub fn new(
        store: Arc<dyn UserStore>,
        verifier: InitDataVerifier,
        engine: RewardEngine,
        check: Arc<dyn ExternalCheck>,
    ) -> Self {
        Self {
            store,
            verifier,
            engine,
            check,
            locks: UserLocks::new(),
            metrics: Arc::new(GameMetrics::new()),
        }
    }

    pub fn metrics(&self) -> &Arc<GameMetrics> {
        &self.metrics
    }

    pub fn catalog(&self) -> &Catalog {
        self.engine.catalog()
    }

    /// Verify init data against the current wall clock.
    pub fn authenticate(&self, raw: &str) -> Result<VerifiedInitData, ServiceError> {
        self.authenticate_at(raw, Timestamp::now())
    }

    pub fn authenticate_at(
        &self,
        raw: &str,
        now: Timestamp,
    ) -> Result<VerifiedInitData, ServiceError> {
        self.verifier.verify(raw, now).map_err(|e| {
            self.metrics.auth_failures.inc();
            tracing::debug!(code = e.code(), error = %e, "init data rejected");
            ServiceError::Auth(e)
        })
    }

    /// Authenticate and return the caller's record, creating it on first
    /// contact.
    pub async fn verify(&self, raw: &str) -> Result<UserState, ServiceError> {
        let user = self.authenticate(raw)?.user_id();
        async {
            let _guard = self.locks.lock(user).await;
            self.load(user)
        }
        .instrument(request_span("verify", user))
        .await
    }

    /// Authenticate and reveal one random city.
    pub async fn open_city(&self, raw: &str) -> Result<UserState, ServiceError> {
        let user = self.authenticate(raw)?.user_id();
        async {
            let _guard = self.locks.lock(user).await;
            let mut state = self.load(user)?;
            match self.engine.open_city(&mut state)? {
                CityOutcome::Opened { index, name } => {
                    self.store.put(&state)?;
                    self.metrics.cities_opened.inc();
                    tracing::info!(index, city = %name, keys = state.keys(), "city opened");
                }
                CityOutcome::AllOpened => {
                    tracing::debug!("all cities already opened");
                }
            }
            Ok::<_, ServiceError>(state)
        }
        .instrument(request_span("city_open", user))
        .await
    }

    /// Authenticate and complete `task_id`. The user's guard is held across
    /// the external check, which the engine bounds with a timeout.
    pub async fn complete_task(
        &self,
        raw: &str,
        task_id: &str,
        payload: TaskMeta,
    ) -> Result<UserState, ServiceError> {
        let user = self.authenticate(raw)?.user_id();
        self.complete_task_for(user, task_id, payload).await
    }

    /// Complete `task_id` for a caller whose init data was already verified.
    pub async fn complete_task_for(
        &self,
        user: UserId,
        task_id: &str,
        payload: TaskMeta,
    ) -> Result<UserState, ServiceError> {
        async {
            let _guard = self.locks.lock(user).await;
            let mut state = self.load(user)?;
            let outcome = self
                .engine
                .complete_task(&mut state, task_id, payload, self.check.as_ref())
                .await
                .inspect_err(|e| {
                    if matches!(e, TaskError::CheckFailed | TaskError::CheckUnavailable(_)) {
                        self.metrics.check_failures.inc();
                    }
                    tracing::info!(task = task_id, code = e.code(), "task not completed");
                })?;
            match outcome {
                TaskOutcome::Completed { reward } => {
                    self.store.put(&state)?;
                    self.metrics.tasks_completed.inc();
                    let progress = state.summary();
                    tracing::info!(
                        task = task_id,
                        keys = reward.keys,
                        tickets = reward.tickets,
                        coins = reward.coins,
                        done_tasks = progress.done_tasks,
                        "task completed"
                    );
                }
                TaskOutcome::AlreadyDone => {
                    tracing::debug!(task = task_id, "task already done");
                }
            }
            Ok::<_, ServiceError>(state)
        }
        .instrument(request_span("task_complete", user))
        .await
    }

    /// Apply the referral policy for a `/start` from `invitee`.
    ///
    /// The inviter is credited only when the invitee has never been seen;
    /// the invitee's record is created in the same critical section so a
    /// repeated `/start` finds it.
    pub async fn register_start(
        &self,
        invitee: UserId,
        start_payload: Option<&str>,
    ) -> Result<ReferralOutcome, ServiceError> {
        let Some(inviter) = start_payload.and_then(parse_referral) else {
            return Ok(ReferralOutcome::NoReferral);
        };
        if inviter == invitee {
            return Ok(ReferralOutcome::SelfReferral);
        }

        let _guards = self.locks.lock_pair(invitee, inviter).await;
        if self.store.exists(invitee)? {
            tracing::debug!(%invitee, %inviter, "referral ignored, invitee already known");
            return Ok(ReferralOutcome::AlreadySeen);
        }

        let mut inviter_state = self.store.get_or_create(inviter)?;
        self.engine
            .credit_referral(&mut inviter_state, &self.engine.referral_reward());
        self.store.put(&inviter_state)?;
        self.load(invitee)?;

        self.metrics.referrals_credited.inc();
        tracing::info!(%invitee, %inviter, "referral credited");
        Ok(ReferralOutcome::Credited { inviter })
    }

    pub fn user_count(&self) -> Result<u64, ServiceError> {
        Ok(self.store.user_count()?)
    }

    fn load(&self, user: UserId) -> Result<UserState, ServiceError> {
        let state = self.store.get_or_create(user)?;
        if let Ok(count) = self.store.user_count() {
            self.metrics.users.set(count as i64);
        }
        Ok(state)
    }
}
