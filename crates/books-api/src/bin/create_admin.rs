//! Create an administrator account.
//!
//! ```text
//! create-admin --username admin --email admin@example.com --password s3cret
//! ```

use clap::Parser;

use books_api::config::AdminSettings;
use books_api::seed::{self, AdminSeed};
use books_persistence::{Database, DatabaseConfig, RetryPolicy, SqliteUserRepository};

#[derive(Debug, Parser)]
#[command(name = "create-admin", version, about = "Create an administrator account")]
struct Args {
    /// SQLite database file or sqlite:// URL
    #[arg(long, env = "DATABASE_URL", default_value = "data/books.db")]
    database_url: String,

    #[arg(long, env = "ADMIN_USERNAME", default_value = "admin")]
    username: String,

    #[arg(long, env = "ADMIN_EMAIL", default_value = "admin@example.com")]
    email: String,

    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    password: String,

    /// bcrypt cost factor
    #[arg(long, env = "PASSWORD_HASH_COST", default_value_t = bcrypt::DEFAULT_COST)]
    hash_cost: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    if args.password.len() < 6 {
        anyhow::bail!("password must be at least 6 characters");
    }

    let db = Database::connect(DatabaseConfig::new(&args.database_url)).await?;
    let users = SqliteUserRepository::new(db.clone(), RetryPolicy::default());

    let admin = AdminSettings {
        username: args.username,
        email: args.email,
        password: None,
    };

    let outcome = seed::ensure_admin(&users, &admin, &args.password, args.hash_cost).await;
    db.close().await;

    match outcome? {
        AdminSeed::Created(user) => {
            println!("Created admin user '{}' (id {})", user.username, user.id);
        }
        AdminSeed::AlreadyExists => {
            println!(
                "A user named '{}' or with email '{}' already exists",
                admin.username, admin.email
            );
        }
    }
    Ok(())
}
