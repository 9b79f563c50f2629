use crate::schema::*;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_USER: &str = "user";

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable)]
#[diesel(table_name = users)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub role: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
struct InsertableUser<'a> {
    name: &'a str,
    email: &'a str,
    role: &'a str,
    created_at: NaiveDateTime,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: String,
}

#[derive(Debug, PartialEq)]
pub enum UserTableError {
    EmailExists,
    InvalidEmail,
    InvalidName,
    InvalidRole,
    DatabaseError,
}

#[derive(Debug)]
pub enum UserQuery<'a> {
    Id(i32),
    Email(&'a str),
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }

    pub fn create(conn: &mut SqliteConnection, new_user: &NewUser) -> Result<User, UserTableError> {
        use crate::security::validation;

        if validation::validate_email(&new_user.email).is_err() {
            log::warn!("Rejected user with invalid email {:?}", new_user.email);
            return Err(UserTableError::InvalidEmail);
        }
        if validation::validate_display_text(&new_user.name, 100).is_err()
            || new_user.name.trim().is_empty()
        {
            return Err(UserTableError::InvalidName);
        }
        if new_user.role != ROLE_ADMIN && new_user.role != ROLE_USER {
            return Err(UserTableError::InvalidRole);
        }

        let existing = Self::get(conn, UserQuery::Email(&new_user.email))
            .map_err(|_| UserTableError::DatabaseError)?;
        if existing.is_some() {
            log::warn!("User with email {} already exists", new_user.email);
            return Err(UserTableError::EmailExists);
        }

        let row = InsertableUser {
            name: new_user.name.trim(),
            email: &new_user.email,
            role: &new_user.role,
            created_at: chrono::Utc::now().naive_utc(),
        };

        diesel::insert_into(users::table)
            .values(&row)
            .get_result(conn)
            .map_err(|e| {
                log::error!("Error inserting user: {:?}", e);
                UserTableError::DatabaseError
            })
    }

    pub fn get(conn: &mut SqliteConnection, query: UserQuery) -> QueryResult<Option<User>> {
        use crate::schema::users::dsl::{email, users};

        let result = match query {
            UserQuery::Id(user_id) => users.find(user_id).first::<User>(conn).optional(),
            UserQuery::Email(addr) => users.filter(email.eq(addr)).first::<User>(conn).optional(),
        };

        result.map_err(|e| {
            log::warn!("Error getting user with {:?}: {:?}", query, e);
            e
        })
    }
}
