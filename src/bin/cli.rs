use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use dialoguer::{Input, Password, Select};
use dotenvy::dotenv;
use roster::cli::{create_admin, generate_key, seed_users};
use roster::modules::users::{PgUserStore, UserBus};
use roster_config::DatabaseConfig;
use roster_db::{PgPool, init_db_pool, run_migrations};
use roster_observability::init_basic_console_logging;

#[derive(Parser)]
#[command(name = "roster-cli")]
#[command(about = "Roster CLI - Administrative tools for the Roster API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply the database migrations
    Migrate,
    /// Generate an RSA signing key
    Genkey {
        /// Directory the key is written to
        #[arg(short, long, default_value = "/etc/rsa-keys")]
        dir: PathBuf,
    },
    /// Create an admin account
    CreateAdmin {
        /// Full name of the admin
        #[arg(short = 'n', long)]
        name: Option<String>,

        /// Email address
        #[arg(short = 'e', long)]
        email: Option<String>,

        /// Department (sales, shipping or marketing)
        #[arg(short = 'd', long)]
        department: Option<String>,

        /// Password (will be prompted securely if not provided)
        #[arg(short = 'p', long)]
        password: Option<String>,
    },
    /// Seed the database with fake users
    Seed {
        /// Number of users to create
        #[arg(short = 'u', long, default_value = "50")]
        users: usize,
    },
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    init_basic_console_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::Migrate => handle_migrate().await,
        Commands::Genkey { dir } => handle_genkey(dir),
        Commands::CreateAdmin {
            name,
            email,
            department,
            password,
        } => handle_create_admin(name, email, department, password).await,
        Commands::Seed { users } => handle_seed(users).await,
    }
}

async fn connect() -> PgPool {
    let config = DatabaseConfig::from_env().expect("DATABASE_URL must be set");

    init_db_pool(&config)
        .await
        .expect("Failed to connect to database")
}

fn bus(pool: PgPool) -> UserBus {
    UserBus::new(Arc::new(PgUserStore::new(pool)))
}

async fn handle_migrate() {
    let pool = connect().await;

    match run_migrations(&pool).await {
        Ok(()) => println!("✅ Migrations applied"),
        Err(e) => {
            eprintln!("❌ Error running migrations: {e:#}");
            std::process::exit(1);
        }
    }
}

fn handle_genkey(dir: PathBuf) {
    match generate_key(&dir) {
        Ok((kid, path)) => {
            println!("✅ Key generated");
            println!("   kid:  {kid}");
            println!("   file: {}", path.display());
        }
        Err(e) => {
            eprintln!("❌ Error generating key: {e:#}");
            std::process::exit(1);
        }
    }
}

async fn handle_create_admin(
    name: Option<String>,
    email: Option<String>,
    department: Option<String>,
    password: Option<String>,
) {
    // Use provided values or prompt interactively
    let name = name.unwrap_or_else(|| {
        Input::new()
            .with_prompt("Full name")
            .interact_text()
            .expect("Failed to read name")
    });

    let email = email.unwrap_or_else(|| {
        Input::new()
            .with_prompt("Email address")
            .interact_text()
            .expect("Failed to read email")
    });

    let department = department.unwrap_or_else(|| {
        let options = ["sales", "shipping", "marketing"];
        let index = Select::new()
            .with_prompt("Department")
            .items(&options)
            .default(0)
            .interact()
            .expect("Failed to read department");
        options[index].to_string()
    });

    let password = password.unwrap_or_else(|| {
        Password::new()
            .with_prompt("Password")
            .with_confirmation("Confirm password", "Passwords don't match")
            .interact()
            .expect("Failed to read password")
    });

    let pool = connect().await;

    match create_admin(&bus(pool), &name, &email, &department, &password).await {
        Ok(user) => {
            println!("\n✅ Admin created successfully!");
            println!("   Id: {}", user.id);
            println!("   Email: {}", user.email);
            println!("   Name: {}", user.name);
        }
        Err(e) => {
            eprintln!("\n❌ Error creating admin: {e:#}");
            std::process::exit(1);
        }
    }
}

async fn handle_seed(users: usize) {
    let pool = connect().await;

    if let Err(e) = seed_users(&bus(pool), users).await {
        eprintln!("\n❌ Error seeding database: {e:#}");
        std::process::exit(1);
    }
}
