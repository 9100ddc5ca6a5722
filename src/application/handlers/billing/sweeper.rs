//! SweeperHandler - the externally triggered expiry and reminder passes.
//!
//! There is no internal timer; a periodic caller hits the maintenance
//! endpoint. Both passes are re-entrant: the expiry pass only selects rows
//! still active, and the reminder pass only selects rows still pending, so
//! overlapping runs converge on the same state.

use std::sync::Arc;

use crate::domain::billing::{
    BillingError, RenewalReminder, SubscriptionOrigin, SubscriptionStatus,
};
use crate::domain::foundation::Timestamp;
use crate::ports::{
    ProductRepository, ReminderRepository, RenewalNotifier, SubscriptionRepository,
};

/// What one sweep did.
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    /// Active subscriptions found past their period end.
    pub subscriptions_checked: usize,
    /// Subscriptions demoted (past_due or canceled).
    pub expired: usize,
    /// Pending reminders found due.
    pub reminders_checked: usize,
    /// Reminders marked dispatched.
    pub reminders_sent: usize,
    /// Per-row failures; the sweep continues past them.
    pub errors: Vec<String>,
}

/// Handler for the periodic maintenance sweep.
pub struct SweeperHandler {
    subscriptions: Arc<dyn SubscriptionRepository>,
    products: Arc<dyn ProductRepository>,
    reminders: Arc<dyn ReminderRepository>,
    notifier: Arc<dyn RenewalNotifier>,
}

impl SweeperHandler {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        products: Arc<dyn ProductRepository>,
        reminders: Arc<dyn ReminderRepository>,
        notifier: Arc<dyn RenewalNotifier>,
    ) -> Self {
        Self {
            subscriptions,
            products,
            reminders,
            notifier,
        }
    }

    /// Runs the expiry pass followed by the reminder-dispatch pass.
    pub async fn run(&self, now: Timestamp) -> Result<SweepReport, BillingError> {
        let mut report = SweepReport::default();
        self.expire_subscriptions(now, &mut report).await?;
        self.dispatch_reminders(now, &mut report).await?;
        Ok(report)
    }

    /// Demotes active subscriptions past their period end.
    ///
    /// Card-origin rows go to past_due - the rail itself drives retries
    /// and eventual cancellation through webhooks. Crypto-origin rows are
    /// canceled immediately since no automatic retry exists on that rail,
    /// with an immediate-fire notice for monthly products.
    async fn expire_subscriptions(
        &self,
        now: Timestamp,
        report: &mut SweepReport,
    ) -> Result<(), BillingError> {
        let expired = self.subscriptions.find_active_ending_before(now).await?;
        report.subscriptions_checked = expired.len();

        for mut subscription in expired {
            let result = if subscription.origin == SubscriptionOrigin::Crypto {
                subscription.status = SubscriptionStatus::Canceled;
                subscription.cancel_at_period_end = true;
                let update = self.subscriptions.update(&subscription).await;

                if update.is_ok() {
                    if let Ok(Some(product)) =
                        self.products.find_by_id(&subscription.product_id).await
                    {
                        if product.is_monthly_subscription() {
                            let notice = RenewalReminder::expired_notice(
                                subscription.user_id,
                                product.id,
                                now,
                            );
                            if let Err(err) = self.reminders.save(&notice).await {
                                tracing::warn!(
                                    subscription = %subscription.id,
                                    error = %err,
                                    "failed to create expiry notice"
                                );
                            }
                        }
                    }
                }
                update
            } else {
                // The cancel flag is left as the rail reported it.
                subscription.status = SubscriptionStatus::PastDue;
                self.subscriptions.update(&subscription).await
            };

            match result {
                Ok(()) => {
                    report.expired += 1;
                    tracing::info!(
                        subscription = %subscription.id,
                        origin = ?subscription.origin,
                        status = ?subscription.status,
                        "subscription lapsed"
                    );
                }
                Err(err) => {
                    report
                        .errors
                        .push(format!("subscription {}: {}", subscription.id, err));
                }
            }
        }

        Ok(())
    }

    /// Marks due reminders dispatched and hands them to the notifier.
    /// Notification delivery is best-effort; a marked reminder stays sent
    /// even when delivery fails.
    async fn dispatch_reminders(
        &self,
        now: Timestamp,
        report: &mut SweepReport,
    ) -> Result<(), BillingError> {
        let due = self.reminders.find_pending_due(now).await?;
        report.reminders_checked = due.len();

        for mut reminder in due {
            reminder.mark_sent(now);
            match self.reminders.update(&reminder).await {
                Ok(()) => {
                    report.reminders_sent += 1;
                    if let Err(err) = self.notifier.notify(&reminder).await {
                        tracing::warn!(
                            reminder = %reminder.id,
                            error = %err,
                            "reminder notification failed"
                        );
                    }
                }
                Err(err) => {
                    report
                        .errors
                        .push(format!("reminder {}: {}", reminder.id, err));
                }
            }
        }

        Ok(())
    }
}
