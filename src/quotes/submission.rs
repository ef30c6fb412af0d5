use std::{str::FromStr, sync::Arc};

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    api::notifications::{Notification, Notifier, notify_best_effort},
    app_error::AppError,
    cart::{CartHandle, CartLine},
    models::{CreateQuoteRequestEntity, QuoteRequestEntity, QuoteStatus},
    profiles::ProfileStore,
};

use super::{
    CancelHandle, ConfirmationDelay, QuoteRequestStore,
    message::{CombinedMessage, build_combined_message},
};

/// Observable progress of a cart's most recent submission.
#[derive(Serialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SubmissionState {
    Idle,
    Confirming,
    Submitting,
    Succeeded { request_ids: Vec<Uuid> },
    Failed { reason: String },
}

/// What happens to rows that were inserted by a submission that failed.
#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CompensationPolicy {
    /// Successful rows are left in place.
    #[default]
    None,
    /// Successful rows are deleted again.
    DeleteInserted,
}

impl FromStr for CompensationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(CompensationPolicy::None),
            "delete" | "delete_inserted" => Ok(CompensationPolicy::DeleteInserted),
            other => Err(format!("{} is not a valid compensation policy", other)),
        }
    }
}

#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("You must be signed in to submit a quote request")]
    Unauthenticated,

    #[error("Your quote cart is empty")]
    EmptyCart,

    #[error("A quote request for this cart is already being submitted")]
    AlreadySubmitting,

    #[error("The quote request was cancelled before it was sent")]
    Cancelled,

    #[error("Your account could not be registered for quote requests")]
    ProfileUnavailable(#[source] anyhow::Error),

    #[error("{failed} of {total} quote request lines could not be saved")]
    InsertFailed {
        failed: usize,
        total: usize,
        /// Rows of this submission still present in the store.
        orphaned: Vec<Uuid>,
        compensated: usize,
        #[source]
        source: anyhow::Error,
    },
}

impl From<SubmitError> for AppError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::Unauthenticated => AppError::Unauthorized(err.to_string()),
            SubmitError::EmptyCart | SubmitError::Cancelled => {
                AppError::BadRequest(err.to_string())
            }
            SubmitError::AlreadySubmitting => AppError::Conflict(err.to_string()),
            SubmitError::ProfileUnavailable(_) | SubmitError::InsertFailed { .. } => {
                AppError::Upstream(err.to_string())
            }
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default, ToSchema)]
pub struct QuoteForm {
    pub note: Option<String>,
}

#[derive(Serialize, Debug, Clone, ToSchema)]
pub struct SubmissionReceipt {
    pub request_ids: Vec<Uuid>,
    pub subject: String,
    pub message: String,
}

/// Turns a cart into quote request rows: one independent insert per line,
/// dispatched together and awaited jointly.
pub struct QuoteSubmission {
    store: Arc<dyn QuoteRequestStore>,
    profiles: Arc<dyn ProfileStore>,
    notifier: Arc<dyn Notifier>,
    compensation: CompensationPolicy,
}

impl QuoteSubmission {
    pub fn new(
        store: Arc<dyn QuoteRequestStore>,
        profiles: Arc<dyn ProfileStore>,
        notifier: Arc<dyn Notifier>,
        compensation: CompensationPolicy,
    ) -> Self {
        Self {
            store,
            profiles,
            notifier,
            compensation,
        }
    }

    pub fn compensation(&self) -> CompensationPolicy {
        self.compensation
    }

    pub async fn submit(
        &self,
        cart: &CartHandle,
        user_id: Option<Uuid>,
        form: QuoteForm,
    ) -> Result<SubmissionReceipt, SubmitError> {
        self.run(cart, user_id, form, None).await
    }

    /// Waits out `delay` before dispatching. Cancelling `cancel` during the
    /// delay aborts with [`SubmitError::Cancelled`] and nothing is sent.
    pub async fn submit_after_confirmation(
        &self,
        cart: &CartHandle,
        user_id: Option<Uuid>,
        form: QuoteForm,
        delay: ConfirmationDelay,
        cancel: &CancelHandle,
    ) -> Result<SubmissionReceipt, SubmitError> {
        self.run(cart, user_id, form, Some((delay, cancel))).await
    }

    async fn run(
        &self,
        cart: &CartHandle,
        user_id: Option<Uuid>,
        form: QuoteForm,
        confirmation: Option<(ConfirmationDelay, &CancelHandle)>,
    ) -> Result<SubmissionReceipt, SubmitError> {
        let user_id = user_id.ok_or(SubmitError::Unauthenticated)?;
        if cart.lock().is_empty() {
            return Err(SubmitError::EmptyCart);
        }
        let _guard = cart
            .try_begin_submission()
            .ok_or(SubmitError::AlreadySubmitting)?;

        if let Some((delay, cancel)) = confirmation {
            cart.set_submission_state(SubmissionState::Confirming);
            if let Err(err) = delay.wait(cancel).await {
                info!("Quote submission for user {} cancelled", user_id);
                cart.set_submission_state(SubmissionState::Idle);
                return Err(err);
            }
        }

        // The cart may have changed while the confirmation delay was running.
        let lines = cart.lock().lines().to_vec();
        if lines.is_empty() {
            cart.set_submission_state(SubmissionState::Idle);
            return Err(SubmitError::EmptyCart);
        }

        cart.set_submission_state(SubmissionState::Submitting);

        // Every row references the requester's profile.
        if let Err(source) = self.profiles.ensure(user_id).await {
            let err = SubmitError::ProfileUnavailable(source);
            error!("Quote submission for user {} failed: {:#}", user_id, err);
            cart.set_submission_state(SubmissionState::Failed {
                reason: err.to_string(),
            });
            return Err(err);
        }

        let combined = build_combined_message(&lines, form.note.as_deref());

        match self.dispatch(user_id, &lines, &combined).await {
            Ok(rows) => {
                let request_ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
                info!(
                    "User {} submitted {} quote request lines",
                    user_id,
                    request_ids.len()
                );

                notify_best_effort(
                    self.notifier.as_ref(),
                    Notification::QuoteSubmitted {
                        quote_request_id: request_ids[0],
                    },
                )
                .await;

                cart.lock().remove_submitted(&lines);
                cart.set_submission_state(SubmissionState::Succeeded {
                    request_ids: request_ids.clone(),
                });

                Ok(SubmissionReceipt {
                    request_ids,
                    subject: combined.subject,
                    message: combined.message,
                })
            }
            Err(err) => {
                error!("Quote submission for user {} failed: {:#}", user_id, err);
                cart.set_submission_state(SubmissionState::Failed {
                    reason: err.to_string(),
                });
                Err(err)
            }
        }
    }

    async fn dispatch(
        &self,
        user_id: Uuid,
        lines: &[CartLine],
        combined: &CombinedMessage,
    ) -> Result<Vec<QuoteRequestEntity>, SubmitError> {
        let inserts = lines.iter().map(|line| {
            self.store.insert(CreateQuoteRequestEntity {
                user_id,
                subject: combined.subject.clone(),
                message: combined.message.clone(),
                product_id: line.product_id,
                quantity: line.quantity,
                custom_specifications: line.custom_specifications.clone(),
                status: QuoteStatus::Pending.as_str().to_string(),
            })
        });

        let mut inserted = Vec::with_capacity(lines.len());
        let mut failures = Vec::new();
        for result in join_all(inserts).await {
            match result {
                Ok(row) => inserted.push(row),
                Err(err) => failures.push(err),
            }
        }

        if failures.is_empty() {
            return Ok(inserted);
        }

        let failed = failures.len();
        let source = failures.swap_remove(0);
        let compensated = self.compensate(&inserted).await;
        let orphaned = inserted
            .iter()
            .map(|row| row.id)
            .filter(|id| !compensated.contains(id))
            .collect();

        Err(SubmitError::InsertFailed {
            failed,
            total: lines.len(),
            orphaned,
            compensated: compensated.len(),
            source,
        })
    }

    /// Returns the ids that were removed again.
    async fn compensate(&self, inserted: &[QuoteRequestEntity]) -> Vec<Uuid> {
        if inserted.is_empty() {
            return Vec::new();
        }

        match self.compensation {
            CompensationPolicy::None => {
                warn!(
                    "Leaving {} quote request rows from a failed submission in place",
                    inserted.len()
                );
                Vec::new()
            }
            CompensationPolicy::DeleteInserted => {
                let deletes = inserted.iter().map(|row| async move {
                    match self.store.delete(row.id).await {
                        Ok(true) => Some(row.id),
                        Ok(false) => {
                            warn!("Quote request {} was already gone", row.id);
                            None
                        }
                        Err(err) => {
                            error!("Failed to delete quote request {}: {:#}", row.id, err);
                            None
                        }
                    }
                });
                join_all(deletes).await.into_iter().flatten().collect()
            }
        }
    }
}
