//! Renewal reminder - a flag-and-poll record, not a timer.
//!
//! Created when a prepaid monthly subscription is established (fire 7 days
//! before the period ends) or when one expires (fire immediately). The
//! sweeper promotes pending reminders whose fire time has passed; the
//! webhook reconciler marks them renewed when the linked subscription
//! renews.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ProductId, ReminderId, Timestamp, UserId};

/// Reminder lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderStatus {
    Pending,
    Sent,
    Renewed,
    Expired,
    Canceled,
}

/// What triggered the reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderKind {
    /// Upcoming renewal of a prepaid monthly subscription.
    PrepaidRenewal,
    /// The subscription already lapsed; notify immediately.
    SubscriptionExpired,
}

/// A renewal reminder record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenewalReminder {
    pub id: ReminderId,
    pub user_id: UserId,
    pub product_id: ProductId,
    /// When the reminder becomes due for dispatch.
    pub remind_at: Timestamp,
    /// The renewal (or lapse) date the reminder is about.
    pub renews_at: Timestamp,
    pub status: ReminderStatus,
    pub kind: ReminderKind,
    pub sent_at: Option<Timestamp>,
    pub reminder_count: u32,
    pub last_sent_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl RenewalReminder {
    /// Schedules a reminder 7 days before a prepaid renewal date.
    pub fn before_renewal(user_id: UserId, product_id: ProductId, renews_at: Timestamp) -> Self {
        Self {
            id: ReminderId::new(),
            user_id,
            product_id,
            remind_at: renews_at.minus_days(7),
            renews_at,
            status: ReminderStatus::Pending,
            kind: ReminderKind::PrepaidRenewal,
            sent_at: None,
            reminder_count: 0,
            last_sent_at: None,
            created_at: Timestamp::now(),
        }
    }

    /// Creates an immediate-fire notice for an already-expired subscription.
    pub fn expired_notice(user_id: UserId, product_id: ProductId, now: Timestamp) -> Self {
        Self {
            id: ReminderId::new(),
            user_id,
            product_id,
            remind_at: now,
            renews_at: now,
            status: ReminderStatus::Pending,
            kind: ReminderKind::SubscriptionExpired,
            sent_at: None,
            reminder_count: 0,
            last_sent_at: None,
            created_at: now,
        }
    }

    /// True when the reminder is pending and its fire time has passed.
    pub fn is_due(&self, now: Timestamp) -> bool {
        self.status == ReminderStatus::Pending && !self.remind_at.is_after(&now)
    }

    /// Marks the reminder dispatched.
    pub fn mark_sent(&mut self, now: Timestamp) {
        self.status = ReminderStatus::Sent;
        self.sent_at = Some(now);
        self.reminder_count += 1;
        self.last_sent_at = Some(now);
    }

    /// Marks the reminder obsolete because the subscription renewed.
    pub fn mark_renewed(&mut self) {
        self.status = ReminderStatus::Renewed;
    }
}
