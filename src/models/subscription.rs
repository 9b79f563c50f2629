use super::user::User;
use crate::schema::*;
use chrono::{Duration, NaiveDateTime};
use diesel::{
    backend::Backend,
    deserialize::{self, FromSql, FromSqlRow},
    prelude::*,
    serialize::{self, Output, ToSql},
    sql_types::Integer,
    AsExpression,
};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable, Associations)]
#[diesel(belongs_to(User))]
#[diesel(table_name = subscriptions)]
pub struct Subscription {
    pub id: i32,
    pub user_id: i32,
    pub name: String,
    /// minor currency units
    pub price_cents: i64,
    /// ISO-4217, upper case
    pub currency: String,
    pub frequency: Frequency,
    pub category: Option<String>,
    pub payment_method: Option<String>,
    pub status: Status,
    pub start_date: NaiveDateTime,
    pub renewal_date: NaiveDateTime,
    /// set once, on the first cancellation
    pub cancelled_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[repr(i32)]
#[derive(Debug, Serialize, Deserialize, AsExpression, Clone, Copy, FromSqlRow, PartialEq, Eq)]
#[diesel(sql_type=Integer)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily = 0,
    Weekly = 1,
    Monthly = 2,
    Yearly = 3,
}

impl Frequency {
    /// Billing period used to derive a renewal date from a start date.
    pub fn period(&self) -> Duration {
        match self {
            Frequency::Daily => Duration::days(1),
            Frequency::Weekly => Duration::days(7),
            Frequency::Monthly => Duration::days(30),
            Frequency::Yearly => Duration::days(365),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frequency::Daily => write!(f, "daily"),
            Frequency::Weekly => write!(f, "weekly"),
            Frequency::Monthly => write!(f, "monthly"),
            Frequency::Yearly => write!(f, "yearly"),
        }
    }
}

impl<DB> FromSql<Integer, DB> for Frequency
where
    DB: Backend,
    i32: FromSql<Integer, DB>,
{
    fn from_sql(bytes: DB::RawValue<'_>) -> deserialize::Result<Self> {
        match i32::from_sql(bytes)? {
            0 => Ok(Frequency::Daily),
            1 => Ok(Frequency::Weekly),
            2 => Ok(Frequency::Monthly),
            3 => Ok(Frequency::Yearly),
            _ => Err("Unrecognized frequency variant".into()),
        }
    }
}

impl<DB> ToSql<Integer, DB> for Frequency
where
    DB: Backend,
    i32: ToSql<Integer, DB>,
{
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, DB>) -> serialize::Result {
        match self {
            Frequency::Daily => 0.to_sql(out),
            Frequency::Weekly => 1.to_sql(out),
            Frequency::Monthly => 2.to_sql(out),
            Frequency::Yearly => 3.to_sql(out),
        }
    }
}

#[repr(i32)]
#[derive(Debug, Serialize, Deserialize, AsExpression, Clone, Copy, FromSqlRow, PartialEq, Eq)]
#[diesel(sql_type=Integer)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Active = 0,
    Cancelled = 1,
    Expired = 2,
}

impl Status {
    /// Status a non-cancelled subscription should carry given its renewal date.
    pub fn for_renewal(renewal_date: NaiveDateTime, now: NaiveDateTime) -> Status {
        if renewal_date < now {
            Status::Expired
        } else {
            Status::Active
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Active => write!(f, "active"),
            Status::Cancelled => write!(f, "cancelled"),
            Status::Expired => write!(f, "expired"),
        }
    }
}

impl<DB> FromSql<Integer, DB> for Status
where
    DB: Backend,
    i32: FromSql<Integer, DB>,
{
    fn from_sql(bytes: DB::RawValue<'_>) -> deserialize::Result<Self> {
        match i32::from_sql(bytes)? {
            0 => Ok(Status::Active),
            1 => Ok(Status::Cancelled),
            2 => Ok(Status::Expired),
            _ => Err("Unrecognized status variant".into()),
        }
    }
}

impl<DB> ToSql<Integer, DB> for Status
where
    DB: Backend,
    i32: ToSql<Integer, DB>,
{
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, DB>) -> serialize::Result {
        match self {
            Status::Active => 0.to_sql(out),
            Status::Cancelled => 1.to_sql(out),
            Status::Expired => 2.to_sql(out),
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = subscriptions)]
pub struct NewSubscription {
    pub user_id: i32,
    pub name: String,
    pub price_cents: i64,
    pub currency: String,
    pub frequency: Frequency,
    pub category: Option<String>,
    pub payment_method: Option<String>,
    pub status: Status,
    pub start_date: NaiveDateTime,
    pub renewal_date: NaiveDateTime,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = subscriptions)]
pub struct PartialSubscription {
    pub name: Option<String>,
    pub price_cents: Option<i64>,
    pub currency: Option<String>,
    pub frequency: Option<Frequency>,
    pub category: Option<String>,
    pub payment_method: Option<String>,
    pub status: Option<Status>,
    pub start_date: Option<NaiveDateTime>,
    pub renewal_date: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

/// Result of a cancellation attempt.
#[derive(Debug)]
pub enum CancelOutcome {
    Cancelled(Subscription),
    AlreadyCancelled(Subscription),
    /// The subscription exists but is in a state that cannot be cancelled.
    NotActive(Subscription),
    NotFound,
}

impl NewSubscription {
    pub fn insert(&self, conn: &mut SqliteConnection) -> QueryResult<Subscription> {
        use crate::schema::subscriptions::dsl::subscriptions;
        diesel::insert_into(subscriptions)
            .values(self)
            .get_result(conn)
            .map_err(|e| {
                log::warn!("Error inserting subscription: {:?}", e);
                e
            })
    }
}

impl Subscription {
    pub fn get_by_id(conn: &mut SqliteConnection, sub_id: i32) -> QueryResult<Option<Subscription>> {
        use crate::schema::subscriptions::dsl::subscriptions;
        subscriptions.find(sub_id).first::<Subscription>(conn).optional()
    }

    pub fn get_all(
        conn: &mut SqliteConnection,
        limit: i64,
        offset: i64,
    ) -> QueryResult<Vec<Subscription>> {
        use crate::schema::subscriptions::dsl::{id, subscriptions};
        subscriptions
            .order(id.asc())
            .limit(limit)
            .offset(offset)
            .load::<Subscription>(conn)
    }

    pub fn get_all_for_user(
        conn: &mut SqliteConnection,
        owner: i32,
    ) -> QueryResult<Vec<Subscription>> {
        use crate::schema::subscriptions::dsl::{id, subscriptions, user_id};
        subscriptions
            .filter(user_id.eq(owner))
            .order(id.asc())
            .load::<Subscription>(conn)
    }

    /// Active subscriptions whose renewal date lies in `[from, until]`, soonest first.
    /// `owner` narrows the search to a single user.
    pub fn get_renewing_between(
        conn: &mut SqliteConnection,
        from: NaiveDateTime,
        until: NaiveDateTime,
        owner: Option<i32>,
    ) -> QueryResult<Vec<Subscription>> {
        use crate::schema::subscriptions::dsl::{id, renewal_date, status, subscriptions, user_id};

        let mut query = subscriptions
            .filter(status.eq(Status::Active))
            .filter(renewal_date.ge(from))
            .filter(renewal_date.le(until))
            .into_boxed();

        if let Some(owner) = owner {
            query = query.filter(user_id.eq(owner));
        }

        query
            .order((renewal_date.asc(), id.asc()))
            .load::<Subscription>(conn)
    }

    pub fn update(
        conn: &mut SqliteConnection,
        sub_id: i32,
        update: &PartialSubscription,
    ) -> QueryResult<Subscription> {
        use crate::schema::subscriptions::dsl::{id, subscriptions};
        diesel::update(subscriptions.filter(id.eq(sub_id)))
            .set(update)
            .get_result(conn)
    }

    /// Moves an active subscription to cancelled in a single conditional update,
    /// so concurrent cancels cannot both win.
    pub fn cancel(
        conn: &mut SqliteConnection,
        sub_id: i32,
        now: NaiveDateTime,
    ) -> QueryResult<CancelOutcome> {
        use crate::schema::subscriptions::dsl::{
            cancelled_at, id, status, subscriptions, updated_at,
        };

        let cancelled = diesel::update(
            subscriptions
                .filter(id.eq(sub_id))
                .filter(status.eq(Status::Active)),
        )
        .set((
            status.eq(Status::Cancelled),
            cancelled_at.eq(Some(now)),
            updated_at.eq(now),
        ))
        .get_result::<Subscription>(conn)
        .optional()?;

        if let Some(subscription) = cancelled {
            return Ok(CancelOutcome::Cancelled(subscription));
        }

        Ok(match Self::get_by_id(conn, sub_id)? {
            None => CancelOutcome::NotFound,
            Some(sub) if sub.status == Status::Cancelled => CancelOutcome::AlreadyCancelled(sub),
            Some(sub) => CancelOutcome::NotActive(sub),
        })
    }

    /// Returns false when no row matched.
    pub fn delete(conn: &mut SqliteConnection, sub_id: i32) -> QueryResult<bool> {
        use crate::schema::subscriptions::dsl::{id, subscriptions};
        let deleted = diesel::delete(subscriptions.filter(id.eq(sub_id))).execute(conn)?;
        Ok(deleted > 0)
    }
}
