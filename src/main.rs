use actix_cors::Cors;
use actix_governor::Governor;
use actix_web::{middleware, web, App, HttpServer};
use chrono::Duration;
use clap::Parser;
use diesel::SqliteConnection;
use diesel_migrations::MigrationHarness;
use dotenvy::dotenv;
use std::io;
use std::sync::Arc;
use subtrack::{
    api::{self, subscriptions::types::RenewalSettings},
    auth::{jwt::TOKEN_DURATION_DAYS, JwtKeys},
    config::AppConfig,
    models::user::{NewUser, User, UserQuery, ROLE_ADMIN, ROLE_USER},
    notifications::{MailTransport, SmtpMailer},
    observability, security, DbPool, MIGRATIONS,
};

/// CLI options
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Create a new user
    #[clap(long)]
    create_user: bool,
    /// Create a new admin user
    #[clap(long, conflicts_with = "create_user")]
    create_admin: bool,
    /// Print a bearer token for an existing user
    #[clap(long, value_name = "USER_ID")]
    issue_token: Option<i32>,
}

fn main() -> io::Result<()> {
    dotenv().ok();
    observability::init_logging();

    let args = Args::parse();

    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!("Invalid configuration: {}", e);
        io::Error::new(io::ErrorKind::InvalidInput, e)
    })?;

    let db_pool = subtrack::initialize_db_pool(&config.db_path, 8)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

    tracing::info!("Running database migrations");
    let mut conn = db_pool
        .get()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

    if args.create_user || args.create_admin {
        let role = if args.create_admin { ROLE_ADMIN } else { ROLE_USER };
        return cli_create_user(&mut conn, role);
    }

    if let Some(user_id) = args.issue_token {
        return cli_issue_token(&mut conn, &config, user_id);
    }

    drop(conn);
    run_server(config, db_pool)
}

fn prompt(label: &str) -> io::Result<String> {
    println!("{}", label);
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn cli_create_user(db: &mut SqliteConnection, role: &str) -> io::Result<()> {
    let email = prompt("\nEnter user email:")?;
    let name = prompt("Enter display name:")?;

    let new_user = NewUser {
        name,
        email,
        role: role.to_string(),
    };

    match User::create(db, &new_user) {
        Ok(user) => {
            println!("User created successfully");
            println!("{:?}", user);
            Ok(())
        }
        Err(e) => {
            println!("Failed to create user: {:?}", e);
            Err(io::Error::new(io::ErrorKind::InvalidInput, format!("{:?}", e)))
        }
    }
}

fn cli_issue_token(db: &mut SqliteConnection, config: &AppConfig, user_id: i32) -> io::Result<()> {
    let user = User::get(db, UserQuery::Id(user_id))
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?
        .ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("No user with id {}", user_id))
        })?;

    let token = JwtKeys::new(&config.jwt_secret)
        .issue(&user, Duration::days(TOKEN_DURATION_DAYS))
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

    println!("{}", token);
    Ok(())
}

#[actix_web::main]
async fn run_server(config: AppConfig, db_pool: DbPool) -> io::Result<()> {
    let smtp = SmtpMailer::new(&config.mail)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let mailer: Arc<dyn MailTransport> = Arc::new(smtp);

    let rate_limiter = security::create_rate_limiter()
        .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "invalid rate limiter settings"))?;

    let pool = web::Data::new(db_pool);
    let keys = web::Data::new(JwtKeys::new(&config.jwt_secret));
    let mailer_data: web::Data<dyn MailTransport> = web::Data::from(mailer.clone());
    let renewals = web::Data::new(RenewalSettings {
        default_window_days: config.renewal_window_days,
    });

    tracing::info!("Starting server at http://127.0.0.1:{}", config.port);

    let result = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(tracing_actix_web::TracingLogger::default())
            .wrap(middleware::Compress::default())
            .wrap(middleware::NormalizePath::new(
                middleware::TrailingSlash::Trim,
            ))
            .wrap(security::SecurityHeaders)
            .wrap(cors)
            .app_data(pool.clone())
            .app_data(keys.clone())
            .app_data(mailer_data.clone())
            .app_data(renewals.clone())
            .service(api::health::routes())
            .service(api::routes().wrap(Governor::new(&rate_limiter)))
    })
    .bind(("127.0.0.1", config.port))?
    .run()
    .await;

    tracing::info!("Server stopped, closing mail transport");
    mailer.close();

    result
}
