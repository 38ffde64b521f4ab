//! Notification lifecycle engine.
//!
//! Owns the state machine:
//!
//! ```text
//! submit   -> Pending   --dispatch--> Sent | Failed
//! schedule -> Scheduled --claim--> Pending --dispatch--> Sent | Failed
//! ```
//!
//! Validation and template rendering happen before anything is persisted.
//! A dispatch failure is recorded as `Failed` before it is reported.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::channel::{ChannelDispatcher, ChannelError};
use crate::clock::Clock;
use crate::metrics::DispatchMetrics;
use crate::store::{NotificationStore, TemplateStore};
use crate::template::{render, TemplateError};

use super::error::{EngineError, EngineResult};
use super::types::{
    Notification, NotificationFilter, NotificationPage, NotificationPatch, NotificationRequest,
    NotificationStatus, NotificationType,
};

/// Page size when none (or a non-positive one) is requested
pub const DEFAULT_PAGE_SIZE: i64 = 10;
/// Largest page a caller can request
pub const MAX_PAGE_SIZE: i64 = 100;

/// Result of an immediate submission.
///
/// The record is always persisted; `dispatch_error` is set when it ended in
/// `Failed`.
#[derive(Debug)]
pub struct SubmitOutcome {
    pub notification: Notification,
    pub dispatch_error: Option<ChannelError>,
}

impl SubmitOutcome {
    pub fn is_sent(&self) -> bool {
        self.dispatch_error.is_none()
    }

    /// Collapse into a `Result`, surfacing the dispatch error
    pub fn into_result(self) -> EngineResult<Notification> {
        match self.dispatch_error {
            None => Ok(self.notification),
            Some(e) => Err(EngineError::Dispatch(e)),
        }
    }
}

/// Counts from one `process_due` pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProcessReport {
    pub due: usize,
    pub sent: usize,
    pub failed: usize,
    /// Claimed by someone else (or deleted) before this pass got to it
    pub skipped: usize,
}

pub struct NotificationEngine {
    notifications: Arc<dyn NotificationStore>,
    templates: Arc<dyn TemplateStore>,
    dispatcher: Arc<ChannelDispatcher>,
    clock: Arc<dyn Clock>,
}

impl NotificationEngine {
    pub fn new(
        notifications: Arc<dyn NotificationStore>,
        templates: Arc<dyn TemplateStore>,
        dispatcher: Arc<ChannelDispatcher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            notifications,
            templates,
            dispatcher,
            clock,
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Create a notification and dispatch it immediately
    #[tracing::instrument(
        name = "engine.submit",
        skip(self, request),
        fields(notification_type = ?request.notification_type)
    )]
    pub async fn submit(&self, request: NotificationRequest) -> EngineResult<SubmitOutcome> {
        let now = self.clock.now();
        let draft = self
            .prepare(request, NotificationStatus::Pending, None, now)
            .await?;

        let notification = self.notifications.create(draft).await?;
        DispatchMetrics::record_created(notification.status);
        tracing::debug!(notification_id = notification.id, "Notification created");

        self.deliver(notification).await
    }

    /// Create a notification for delivery at `when`; nothing is dispatched now
    #[tracing::instrument(
        name = "engine.schedule",
        skip(self, request),
        fields(notification_type = ?request.notification_type, scheduled_at = %when)
    )]
    pub async fn schedule(
        &self,
        request: NotificationRequest,
        when: DateTime<Utc>,
    ) -> EngineResult<Notification> {
        let now = self.clock.now();
        let draft = self
            .prepare(request, NotificationStatus::Scheduled, Some(when), now)
            .await?;

        let notification = self.notifications.create(draft).await?;
        DispatchMetrics::record_created(notification.status);
        tracing::info!(
            notification_id = notification.id,
            scheduled_at = %when,
            "Notification scheduled"
        );

        Ok(notification)
    }

    /// Dispatch every Scheduled notification whose time has come.
    ///
    /// Each record is claimed before dispatch, so a record is dispatched at
    /// most once even when several passes overlap. A failure on one record
    /// is logged and the pass moves on.
    #[tracing::instrument(name = "engine.process_due", skip(self))]
    pub async fn process_due(&self, now: DateTime<Utc>) -> EngineResult<ProcessReport> {
        let due = self.notifications.due(now).await?;
        let mut report = ProcessReport {
            due: due.len(),
            ..ProcessReport::default()
        };

        for candidate in due {
            let claimed = match self
                .notifications
                .claim_scheduled(candidate.id, self.clock.now())
                .await
            {
                Ok(Some(claimed)) => claimed,
                Ok(None) => {
                    tracing::debug!(
                        notification_id = candidate.id,
                        "Scheduled notification already claimed, skipping"
                    );
                    report.skipped += 1;
                    continue;
                }
                Err(e) => {
                    tracing::warn!(
                        notification_id = candidate.id,
                        error = %e,
                        "Failed to claim scheduled notification"
                    );
                    report.failed += 1;
                    continue;
                }
            };

            match self.deliver(claimed).await {
                Ok(outcome) => match outcome.dispatch_error {
                    None => report.sent += 1,
                    Some(e) => {
                        tracing::warn!(
                            notification_id = outcome.notification.id,
                            notification_type = %outcome.notification.notification_type,
                            error = %e,
                            "Scheduled notification failed to send"
                        );
                        report.failed += 1;
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        notification_id = candidate.id,
                        notification_type = %candidate.notification_type,
                        error = %e,
                        "Failed to record dispatch outcome"
                    );
                    report.failed += 1;
                }
            }
        }

        if report.due > 0 {
            tracing::info!(
                due = report.due,
                sent = report.sent,
                failed = report.failed,
                skipped = report.skipped,
                "Processed due notifications"
            );
        }

        Ok(report)
    }

    /// Put claims older than `cutoff` that never recorded an outcome back in
    /// the due set. A pass that died mid-dispatch leaves such records behind.
    #[tracing::instrument(name = "engine.requeue_stale_claims", skip(self))]
    pub async fn requeue_stale_claims(&self, cutoff: DateTime<Utc>) -> EngineResult<u64> {
        let requeued = self
            .notifications
            .requeue_stale(cutoff, self.clock.now())
            .await?;
        if requeued > 0 {
            tracing::warn!(requeued, "Requeued stale scheduled claims");
        }
        Ok(requeued)
    }

    /// Page through live notifications, newest first
    pub async fn list(
        &self,
        limit: Option<i64>,
        offset: Option<i64>,
        filter: NotificationFilter,
    ) -> EngineResult<NotificationPage> {
        let limit = match limit {
            Some(l) if l > 0 => l.min(MAX_PAGE_SIZE),
            _ => DEFAULT_PAGE_SIZE,
        };
        let offset = offset.unwrap_or(0).max(0);

        let (notifications, total) = self.notifications.query(&filter, limit, offset).await?;

        Ok(NotificationPage {
            notifications,
            total,
            limit,
            offset,
        })
    }

    pub async fn get(&self, id: i64) -> EngineResult<Notification> {
        self.notifications
            .get(id)
            .await?
            .ok_or(EngineError::NotFound(id))
    }

    /// Apply a content patch. Lifecycle fields are never touched.
    #[tracing::instrument(name = "engine.update", skip(self, patch))]
    pub async fn update(&self, id: i64, patch: NotificationPatch) -> EngineResult<Notification> {
        for (field, value) in [
            ("title", &patch.title),
            ("message", &patch.message),
            ("recipient", &patch.recipient),
        ] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(EngineError::Validation(format!("{} must not be empty", field)));
            }
        }

        if patch.is_empty() {
            return self.get(id).await;
        }

        self.notifications
            .patch(id, patch, self.clock.now())
            .await?
            .ok_or(EngineError::NotFound(id))
    }

    /// Soft-delete a notification
    #[tracing::instrument(name = "engine.delete", skip(self))]
    pub async fn delete(&self, id: i64) -> EngineResult<()> {
        if self.notifications.soft_delete(id, self.clock.now()).await? {
            tracing::info!(notification_id = id, "Notification deleted");
            Ok(())
        } else {
            Err(EngineError::NotFound(id))
        }
    }

    /// Validate the request, render its template, and build the unsaved record
    async fn prepare(
        &self,
        request: NotificationRequest,
        status: NotificationStatus,
        scheduled_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> EngineResult<Notification> {
        let notification_type: NotificationType = match request.notification_type.as_deref() {
            Some(t) if !t.trim().is_empty() => t.trim().parse()?,
            _ => return Err(EngineError::Validation("type is required".to_string())),
        };

        for (field, value) in [
            ("title", &request.title),
            ("message", &request.message),
            ("recipient", &request.recipient),
        ] {
            if value.trim().is_empty() {
                return Err(EngineError::Validation(format!("{} is required", field)));
            }
        }

        let mut title = request.title;
        let mut message = request.message;

        if let Some(template_id) = request.template_id {
            let template = self
                .templates
                .get(template_id)
                .await?
                .ok_or(TemplateError::NotFound(template_id))?;

            if !template.is_active {
                return Err(TemplateError::Inactive(template.name).into());
            }

            let bindings = request.template_data.unwrap_or(serde_json::Value::Null);
            let rendered = render(&template.content, template.declared_subject(), &bindings)?;

            message = rendered.body;
            if !rendered.subject.trim().is_empty() {
                title = rendered.subject;
            }
        }

        Ok(Notification {
            id: 0,
            notification_type,
            status,
            title,
            message,
            recipient: request.recipient,
            channel: request.channel.filter(|c| !c.trim().is_empty()),
            template_id: request.template_id,
            scheduled_at,
            sent_at: None,
            metadata: request.metadata.unwrap_or_default(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
    }

    /// Dispatch a Pending record and persist the terminal state.
    ///
    /// Only the outcome fields are written, so a patch that lands while the
    /// send is in flight survives.
    async fn deliver(&self, mut notification: Notification) -> EngineResult<SubmitOutcome> {
        let result = self.dispatcher.dispatch(&notification).await;
        let at = self.clock.now();

        let dispatch_error = match result {
            Ok(()) => {
                notification.status = NotificationStatus::Sent;
                notification.sent_at = Some(at);
                None
            }
            Err(e) => {
                notification.status = NotificationStatus::Failed;
                Some(e)
            }
        };
        notification.updated_at = at;

        let notification = match self
            .notifications
            .complete(notification.id, notification.status, notification.sent_at, at)
            .await?
        {
            Some(stored) => stored,
            None => {
                tracing::warn!(
                    notification_id = notification.id,
                    "Notification deleted or no longer pending after dispatch, outcome not stored"
                );
                notification
            }
        };

        match &dispatch_error {
            None => tracing::info!(
                notification_id = notification.id,
                notification_type = %notification.notification_type,
                "Notification sent"
            ),
            Some(e) => tracing::warn!(
                notification_id = notification.id,
                notification_type = %notification.notification_type,
                error = %e,
                "Notification dispatch failed"
            ),
        }

        Ok(SubmitOutcome {
            notification,
            dispatch_error,
        })
    }
}
