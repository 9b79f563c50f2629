use actix_web::web;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::subscription::{Frequency, Subscription};
use crate::notifications::NotificationStatus;

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 100;
pub const MAX_WINDOW_DAYS: i64 = 365;

#[derive(Debug, Deserialize)]
pub struct SubPath {
    pub sub_id: String,
}

#[derive(Debug, Deserialize)]
pub struct UserPath {
    pub user_id: String,
}

pub type RqSubId = web::Path<SubPath>;
pub type RqUserId = web::Path<UserPath>;

/// Lookahead used by the upcoming-renewals route when the caller gives none.
#[derive(Debug, Clone, Copy)]
pub struct RenewalSettings {
    pub default_window_days: i64,
}

#[derive(Debug, Deserialize)]
pub struct SubscriptionCreate {
    pub name: String,
    pub price_cents: i64,
    pub currency: Option<String>,
    pub frequency: Frequency,
    pub category: Option<String>,
    pub payment_method: Option<String>,
    /// defaults to now
    pub start_date: Option<DateTime<Utc>>,
    /// defaults to start_date plus one billing period
    pub renewal_date: Option<DateTime<Utc>>,
}

/// Owner and status are not updatable; status only changes through cancel.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubscriptionUpdate {
    pub name: Option<String>,
    pub price_cents: Option<i64>,
    pub currency: Option<String>,
    pub frequency: Option<Frequency>,
    pub category: Option<String>,
    pub payment_method: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub renewal_date: Option<DateTime<Utc>>,
}

impl SubscriptionUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.price_cents.is_none()
            && self.currency.is_none()
            && self.frequency.is_none()
            && self.category.is_none()
            && self.payment_method.is_none()
            && self.start_date.is_none()
            && self.renewal_date.is_none()
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct RenewalQuery {
    pub days: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    pub subscription: Subscription,
    pub notification: NotificationStatus,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub subscription: Subscription,
    pub already_cancelled: bool,
    pub notification: NotificationStatus,
}

#[derive(Debug, Serialize)]
pub struct RenewalsResponse {
    pub window_days: i64,
    pub from: NaiveDateTime,
    pub until: NaiveDateTime,
    pub subscriptions: Vec<Subscription>,
}
