#![allow(dead_code)]

use actix_web::{web, App};
use chrono::Duration;
use diesel_migrations::MigrationHarness;
use std::sync::{Arc, Mutex};
use subtrack::{
    api::{self, subscriptions::types::RenewalSettings},
    auth::JwtKeys,
    models::user::{NewUser, User},
    notifications::{DeliveryError, DeliveryReceipt, EmailMessage, MailTransport},
    security::SecurityHeaders,
    DbPool, MIGRATIONS,
};
use tempfile::TempDir;

pub const SECRET: &str = "integration-test-secret-with-enough-length";
pub const WINDOW_DAYS: i64 = 7;

/// Records every message instead of talking to a provider.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<EmailMessage>>,
    pub fail: bool,
}

impl RecordingMailer {
    pub fn subjects(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|m| m.subject.clone())
            .collect()
    }
}

impl MailTransport for RecordingMailer {
    fn send(&self, message: &EmailMessage) -> Result<DeliveryReceipt, DeliveryError> {
        if self.fail {
            return Err(DeliveryError::Provider("550 mailbox unavailable".to_string()));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(DeliveryReceipt {
            message_id: "<test@subtrack>".to_string(),
            recipient: message.to.clone(),
            code: "250".to_string(),
        })
    }
}

pub struct TestContext {
    _dir: TempDir,
    pub pool: DbPool,
    pub mailer: Arc<RecordingMailer>,
    pub keys: JwtKeys,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_mailer(RecordingMailer::default())
    }

    pub fn with_mailer(mailer: RecordingMailer) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp directory");
        let db_path = dir.path().join("test.db");
        let pool = subtrack::initialize_db_pool(&db_path.display().to_string(), 1)
            .expect("Failed to create pool");
        pool.get()
            .expect("Failed to get connection")
            .run_pending_migrations(MIGRATIONS)
            .expect("Failed to run migrations");

        Self {
            _dir: dir,
            pool,
            mailer: Arc::new(mailer),
            keys: JwtKeys::new(SECRET),
        }
    }

    pub fn app(
        &self,
    ) -> App<
        impl actix_web::dev::ServiceFactory<
            actix_web::dev::ServiceRequest,
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
            Config = (),
            InitError = (),
        >,
    > {
        let mailer: Arc<dyn MailTransport> = self.mailer.clone();

        App::new()
            .wrap(SecurityHeaders)
            .app_data(web::Data::new(self.pool.clone()))
            .app_data(web::Data::new(self.keys.clone()))
            .app_data(web::Data::from(mailer))
            .app_data(web::Data::new(RenewalSettings {
                default_window_days: WINDOW_DAYS,
            }))
            .service(api::health::routes())
            .service(api::routes())
    }

    pub fn create_user(&self, email: &str, role: &str) -> User {
        let mut conn = self.pool.get().expect("Failed to get connection");
        User::create(
            &mut conn,
            &NewUser {
                name: "Test User".to_string(),
                email: email.to_string(),
                role: role.to_string(),
            },
        )
        .expect("Failed to create user")
    }

    pub fn bearer(&self, user: &User) -> (&'static str, String) {
        let token = self
            .keys
            .issue(user, Duration::hours(1))
            .expect("Failed to issue token");
        ("Authorization", format!("Bearer {}", token))
    }
}
