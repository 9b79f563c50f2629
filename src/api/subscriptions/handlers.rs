use actix_web::{delete, get, post, put, web, HttpResponse};
use chrono::{Duration, NaiveDateTime, Utc};

use super::types::{
    CancelResponse, ListQuery, RenewalQuery, RenewalSettings, RenewalsResponse, RqSubId, RqUserId,
    SubscriptionCreate, SubscriptionResponse, SubscriptionUpdate, DEFAULT_PAGE_SIZE,
    MAX_PAGE_SIZE, MAX_WINDOW_DAYS,
};
use crate::{
    auth::AuthUser,
    errors::{AppError, AppResult},
    models::{
        subscription::{CancelOutcome, NewSubscription, PartialSubscription, Status, Subscription},
        user::{User, UserQuery},
    },
    notifications::{self, templates, MailTransport, NotificationStatus},
    security::validation,
    RqDbPool,
};

const DEFAULT_CURRENCY: &str = "USD";
const MAX_NAME_LEN: usize = 100;
const MAX_LABEL_LEN: usize = 50;
/// Clock skew tolerated on client-supplied start dates.
const START_DATE_LEEWAY_SECS: i64 = 60;

fn parse_id(raw: &str, field: &str) -> AppResult<i32> {
    raw.parse::<i32>()
        .map_err(|_| AppError::invalid_input(field, "Invalid ID format"))
}

fn validate_name(name: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::invalid_input("name", "Name is required"));
    }
    validation::validate_display_text(name, MAX_NAME_LEN)
        .map_err(|e| AppError::invalid_input("name", &e))
}

fn validate_price(price_cents: i64) -> AppResult<()> {
    if price_cents < 0 {
        return Err(AppError::invalid_input("price_cents", "Price cannot be negative"));
    }
    Ok(())
}

fn validate_currency(currency: &str) -> AppResult<()> {
    validation::validate_currency(currency).map_err(|e| AppError::invalid_input("currency", &e))
}

fn validate_label(field: &str, value: &Option<String>) -> AppResult<()> {
    if let Some(value) = value {
        validation::validate_display_text(value, MAX_LABEL_LEN)
            .map_err(|e| AppError::invalid_input(field, &e))?;
    }
    Ok(())
}

fn validate_start(start: NaiveDateTime, now: NaiveDateTime) -> AppResult<()> {
    if start > now + Duration::seconds(START_DATE_LEEWAY_SECS) {
        return Err(AppError::invalid_input("start_date", "Start date cannot be in the future"));
    }
    Ok(())
}

fn validate_dates(start: NaiveDateTime, renewal: NaiveDateTime, now: NaiveDateTime) -> AppResult<()> {
    validate_start(start, now)?;
    if renewal <= start {
        return Err(AppError::invalid_input(
            "renewal_date",
            "Renewal date must be after the start date",
        ));
    }
    Ok(())
}

fn load_accessible(
    conn: &mut diesel::SqliteConnection,
    user: &AuthUser,
    sub_id: i32,
) -> AppResult<Subscription> {
    let subscription = Subscription::get_by_id(conn, sub_id)?
        .ok_or_else(|| AppError::resource_not_found("Subscription"))?;

    if !user.can_access(subscription.user_id) {
        log::warn!(
            "User {} attempted to access subscription {} owned by {}",
            user.id,
            sub_id,
            subscription.user_id
        );
        return Err(AppError::Forbidden);
    }

    Ok(subscription)
}

#[get("")]
pub async fn get_subscriptions(pool: RqDbPool, query: web::Query<ListQuery>) -> AppResult<HttpResponse> {
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    if !(1..=MAX_PAGE_SIZE).contains(&limit) {
        return Err(AppError::invalid_input("limit", "Must be between 1 and 100"));
    }
    let offset = query.offset.unwrap_or(0);
    if offset < 0 {
        return Err(AppError::invalid_input("offset", "Cannot be negative"));
    }

    let mut conn = pool.get()?;
    let subscriptions = Subscription::get_all(&mut conn, limit, offset)?;

    Ok(HttpResponse::Ok().json(subscriptions))
}

#[get("/{sub_id}")]
pub async fn get_subscription(
    user: AuthUser,
    pool: RqDbPool,
    sub_path: RqSubId,
) -> AppResult<HttpResponse> {
    let sub_id = parse_id(&sub_path.sub_id, "sub_id")?;

    let mut conn = pool.get()?;
    let subscription = load_accessible(&mut conn, &user, sub_id)?;

    Ok(HttpResponse::Ok().json(subscription))
}

#[post("")]
pub async fn create_subscription(
    user: AuthUser,
    pool: RqDbPool,
    mailer: web::Data<dyn MailTransport>,
    sub_req: web::Json<SubscriptionCreate>,
) -> AppResult<HttpResponse> {
    let sub_req = sub_req.into_inner();

    validate_name(&sub_req.name)?;
    validate_price(sub_req.price_cents)?;
    let currency = sub_req
        .currency
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
    validate_currency(&currency)?;
    validate_label("category", &sub_req.category)?;
    validate_label("payment_method", &sub_req.payment_method)?;

    let now = Utc::now().naive_utc();
    let start_date = sub_req.start_date.map(|d| d.naive_utc()).unwrap_or(now);
    validate_start(start_date, now)?;
    let renewal_date = match sub_req.renewal_date {
        Some(d) => d.naive_utc(),
        None => start_date
            .checked_add_signed(sub_req.frequency.period())
            .ok_or_else(|| AppError::invalid_input("start_date", "Start date is out of range"))?,
    };
    validate_dates(start_date, renewal_date, now)?;

    let mut conn = pool.get()?;

    let owner = User::get(&mut conn, UserQuery::Id(user.id))?
        .ok_or_else(|| AppError::resource_not_found("User"))?;

    let new_sub = NewSubscription {
        user_id: owner.id,
        name: sub_req.name.trim().to_string(),
        price_cents: sub_req.price_cents,
        currency,
        frequency: sub_req.frequency,
        category: sub_req.category,
        payment_method: sub_req.payment_method,
        status: Status::for_renewal(renewal_date, now),
        start_date,
        renewal_date,
        created_at: now,
        updated_at: now,
    };

    let subscription = new_sub.insert(&mut conn)?;
    drop(conn);

    log::info!("User {} created subscription {}", owner.id, subscription.id);

    let message = templates::subscription_created(&owner, &subscription);
    let notification = notifications::deliver(mailer, message).await;

    Ok(HttpResponse::Created().json(SubscriptionResponse {
        subscription,
        notification,
    }))
}

#[put("/{sub_id}")]
pub async fn update_subscription(
    user: AuthUser,
    pool: RqDbPool,
    sub_path: RqSubId,
    update_req: web::Json<SubscriptionUpdate>,
) -> AppResult<HttpResponse> {
    let sub_id = parse_id(&sub_path.sub_id, "sub_id")?;
    let update_req = update_req.into_inner();

    if update_req.is_empty() {
        return Err(AppError::invalid_input("body", "No fields to update"));
    }
    if let Some(name) = &update_req.name {
        validate_name(name)?;
    }
    if let Some(price_cents) = update_req.price_cents {
        validate_price(price_cents)?;
    }
    if let Some(currency) = &update_req.currency {
        validate_currency(currency)?;
    }
    validate_label("category", &update_req.category)?;
    validate_label("payment_method", &update_req.payment_method)?;

    let mut conn = pool.get()?;
    let existing = load_accessible(&mut conn, &user, sub_id)?;

    let now = Utc::now().naive_utc();
    let start_date = update_req.start_date.map(|d| d.naive_utc());
    let renewal_date = update_req.renewal_date.map(|d| d.naive_utc());
    let effective_renewal = renewal_date.unwrap_or(existing.renewal_date);

    match start_date {
        Some(start) => validate_dates(start, effective_renewal, now)?,
        None if effective_renewal <= existing.start_date => {
            return Err(AppError::invalid_input(
                "renewal_date",
                "Renewal date must be after the start date",
            ));
        }
        None => {}
    }

    // cancelled is terminal; everything else follows the renewal date
    let status = match existing.status {
        Status::Cancelled => None,
        current => {
            let next = Status::for_renewal(effective_renewal, now);
            (next != current).then_some(next)
        }
    };

    let changes = PartialSubscription {
        name: update_req.name.map(|n| n.trim().to_string()),
        price_cents: update_req.price_cents,
        currency: update_req.currency,
        frequency: update_req.frequency,
        category: update_req.category,
        payment_method: update_req.payment_method,
        status,
        start_date,
        renewal_date,
        updated_at: Some(now),
    };

    let updated = Subscription::update(&mut conn, sub_id, &changes)?;
    log::info!("User {} updated subscription {}", user.id, sub_id);

    Ok(HttpResponse::Ok().json(updated))
}

#[delete("/{sub_id}")]
pub async fn delete_subscription(
    user: AuthUser,
    pool: RqDbPool,
    sub_path: RqSubId,
) -> AppResult<HttpResponse> {
    let sub_id = parse_id(&sub_path.sub_id, "sub_id")?;

    let mut conn = pool.get()?;
    load_accessible(&mut conn, &user, sub_id)?;

    if !Subscription::delete(&mut conn, sub_id)? {
        return Err(AppError::resource_not_found("Subscription"));
    }

    log::info!("User {} deleted subscription {}", user.id, sub_id);

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Subscription deleted successfully",
        "id": sub_id
    })))
}

#[get("/user/{user_id}")]
pub async fn get_user_subscriptions(
    user: AuthUser,
    pool: RqDbPool,
    user_path: RqUserId,
) -> AppResult<HttpResponse> {
    let target_id = parse_id(&user_path.user_id, "user_id")?;

    if !user.can_access(target_id) {
        log::warn!(
            "User {} attempted to list subscriptions of user {}",
            user.id,
            target_id
        );
        return Err(AppError::Forbidden);
    }

    let mut conn = pool.get()?;
    if User::get(&mut conn, UserQuery::Id(target_id))?.is_none() {
        return Err(AppError::resource_not_found("User"));
    }

    let subscriptions = Subscription::get_all_for_user(&mut conn, target_id)?;

    Ok(HttpResponse::Ok().json(subscriptions))
}

#[put("/{sub_id}/cancel")]
pub async fn cancel_subscription(
    user: AuthUser,
    pool: RqDbPool,
    mailer: web::Data<dyn MailTransport>,
    sub_path: RqSubId,
) -> AppResult<HttpResponse> {
    let sub_id = parse_id(&sub_path.sub_id, "sub_id")?;

    let mut conn = pool.get()?;
    load_accessible(&mut conn, &user, sub_id)?;

    let subscription = match Subscription::cancel(&mut conn, sub_id, Utc::now().naive_utc())? {
        CancelOutcome::Cancelled(subscription) => subscription,
        CancelOutcome::AlreadyCancelled(subscription) => {
            log::info!("Subscription {} was already cancelled", sub_id);
            return Ok(HttpResponse::Ok().json(CancelResponse {
                subscription,
                already_cancelled: true,
                notification: NotificationStatus::skipped(),
            }));
        }
        CancelOutcome::NotActive(subscription) => {
            return Err(AppError::InvalidTransition {
                from: subscription.status,
                to: Status::Cancelled,
            });
        }
        CancelOutcome::NotFound => return Err(AppError::resource_not_found("Subscription")),
    };

    log::info!("User {} cancelled subscription {}", user.id, sub_id);

    // the cancellation is committed; a failed owner lookup only costs the email
    let owner = User::get(&mut conn, UserQuery::Id(subscription.user_id));
    drop(conn);

    let notification = match owner {
        Ok(Some(owner)) => {
            let message = templates::subscription_cancelled(&owner, &subscription);
            notifications::deliver(mailer, message).await
        }
        Ok(None) => {
            log::warn!("Owner of subscription {} not found, skipping email", sub_id);
            NotificationStatus::skipped()
        }
        Err(e) => {
            log::error!("Failed to load owner of subscription {}: {}", sub_id, e);
            NotificationStatus {
                sent: false,
                error: Some("could not load subscription owner".to_string()),
            }
        }
    };

    Ok(HttpResponse::Ok().json(CancelResponse {
        subscription,
        already_cancelled: false,
        notification,
    }))
}

#[get("/upcoming-renewals")]
pub async fn get_upcoming_renewals(
    user: AuthUser,
    pool: RqDbPool,
    settings: web::Data<RenewalSettings>,
    query: web::Query<RenewalQuery>,
) -> AppResult<HttpResponse> {
    let window_days = query.days.unwrap_or(settings.default_window_days);
    if !(1..=MAX_WINDOW_DAYS).contains(&window_days) {
        return Err(AppError::invalid_input("days", "Must be between 1 and 365"));
    }

    let from = Utc::now().naive_utc();
    let until = from + Duration::days(window_days);
    // admins see every user's renewals
    let owner = (!user.is_admin()).then_some(user.id);

    let mut conn = pool.get()?;
    let subscriptions = Subscription::get_renewing_between(&mut conn, from, until, owner)?;

    Ok(HttpResponse::Ok().json(RenewalsResponse {
        window_days,
        from,
        until,
        subscriptions,
    }))
}
