//! Scheduled background jobs

use std::sync::Arc;

use anyhow::anyhow;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::agencies::{AgencyError, AgencyService};
use crate::models::NotificationSeverity;
use crate::notifications::NotificationService;

/// Expire lapsed subscriptions and tell their owners. Returns how many expired.
pub async fn sweep_subscriptions(
    agencies: &AgencyService,
    notifications: &NotificationService,
) -> Result<usize, AgencyError> {
    let owners = agencies.expire_subscriptions().await?;
    if owners.is_empty() {
        return Ok(0);
    }

    if let Err(e) = notifications
        .notify_many(
            &owners,
            "Subscription expired",
            "Your agency subscription has expired. Renew it to keep premium features.",
            NotificationSeverity::Warning,
        )
        .await
    {
        tracing::warn!("failed to notify expired subscribers: {}", e);
    }
    Ok(owners.len())
}

/// Start the scheduler with the subscription sweep registered on `cron`
pub async fn start_scheduler(
    cron: &str,
    agencies: Arc<AgencyService>,
    notifications: Arc<NotificationService>,
) -> anyhow::Result<JobScheduler> {
    let scheduler = JobScheduler::new()
        .await
        .map_err(|e| anyhow!("failed to create scheduler: {:?}", e))?;

    let job = Job::new_async(cron, move |_uuid, _lock| {
        let agencies = agencies.clone();
        let notifications = notifications.clone();
        Box::pin(async move {
            match sweep_subscriptions(&agencies, &notifications).await {
                Ok(0) => tracing::debug!("subscription sweep: nothing to expire"),
                Ok(count) => tracing::info!(count, "subscription sweep expired subscriptions"),
                Err(e) => tracing::error!("subscription sweep failed: {}", e),
            }
        })
    })
    .map_err(|e| anyhow!("invalid SUBSCRIPTION_SWEEP_CRON {:?}: {:?}", cron, e))?;

    scheduler
        .add(job)
        .await
        .map_err(|e| anyhow!("failed to register job: {:?}", e))?;
    scheduler
        .start()
        .await
        .map_err(|e| anyhow!("failed to start scheduler: {:?}", e))?;

    tracing::info!(cron, "subscription sweep scheduled");
    Ok(scheduler)
}
