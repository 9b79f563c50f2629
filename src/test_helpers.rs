use crate::models::user::{NewUser, User, ROLE_USER};
use crate::DbPool;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use diesel_migrations::MigrationHarness;
use tempfile::TempDir;

/// Create a test database with a temporary file
pub fn create_test_db() -> (TempDir, DbPool) {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let db_path = temp_dir.path().join("test.db");

    let pool = crate::initialize_db_pool(&db_path.display().to_string(), 1)
        .expect("Failed to create pool");

    let mut conn = pool.get().expect("Failed to get connection");
    conn.run_pending_migrations(crate::MIGRATIONS)
        .expect("Failed to run migrations");

    (temp_dir, pool)
}

/// Create an in-memory test database connection
pub fn get_test_db_connection() -> SqliteConnection {
    let mut conn = SqliteConnection::establish(":memory:")
        .unwrap_or_else(|_| panic!("Error connecting to in-memory SQLite database"));

    conn.run_pending_migrations(crate::MIGRATIONS)
        .expect("Failed to run migrations");
    conn
}

pub fn create_test_user(conn: &mut SqliteConnection, email: &str) -> User {
    let new_user = NewUser {
        name: "Test User".to_string(),
        email: email.to_string(),
        role: ROLE_USER.to_string(),
    };
    User::create(conn, &new_user).expect("Failed to create test user")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::users;

    #[derive(QueryableByName)]
    struct TestResult {
        #[diesel(sql_type = diesel::sql_types::Integer)]
        test: i32,
    }

    #[test]
    fn test_create_test_db() {
        let (_temp_dir, pool) = create_test_db();
        let mut conn = pool.get().expect("Failed to get connection");

        let result: i32 = diesel::sql_query("SELECT 1 as test")
            .get_result::<TestResult>(&mut conn)
            .map(|r| r.test)
            .expect("Failed to query test database");

        assert_eq!(result, 1);
    }

    #[test]
    fn test_fresh_db_has_no_users() {
        let mut conn = get_test_db_connection();
        let user_count: i64 = users::table
            .count()
            .first(&mut conn)
            .expect("Failed to count users");
        assert_eq!(user_count, 0);
    }
}
