use std::error::Error;

use chrono::Local;
use clap::{Args, Parser, Subcommand};
use engine::{Engine, EngineError, MoneyCents, Month, aggregate};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};

mod prompt;

#[derive(Parser, Debug)]
#[command(name = "budgetwise_admin")]
#[command(about = "Admin utilities for budgetwise (bootstrap users/budgets)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./budgetwise.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    User(User),
    Budget(Budget),
}

#[derive(Args, Debug)]
struct User {
    #[command(subcommand)]
    command: UserCommand,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    Create(UserCreateArgs),
}

#[derive(Args, Debug)]
struct UserCreateArgs {
    #[arg(long)]
    username: String,
    /// Read from a hidden prompt when omitted.
    #[arg(long)]
    password: Option<String>,
}

#[derive(Args, Debug)]
struct Budget {
    #[command(subcommand)]
    command: BudgetCommand,
}

#[derive(Subcommand, Debug)]
enum BudgetCommand {
    Create(BudgetCreateArgs),
    /// Prints this month's figures for every budget of a user.
    List(BudgetListArgs),
}

#[derive(Args, Debug)]
struct BudgetCreateArgs {
    #[arg(long)]
    owner: String,
    #[arg(long)]
    name: String,
    /// Monthly cap, e.g. `500` or `499.99`.
    #[arg(long)]
    amount: MoneyCents,
}

#[derive(Args, Debug)]
struct BudgetListArgs {
    #[arg(long)]
    owner: String,
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;
    let engine = Engine::builder().database(db).build().await?;

    match cli.command {
        Command::User(User {
            command: UserCommand::Create(args),
        }) => {
            let password = match args.password {
                Some(password) => password,
                None => prompt::new_password()?,
            };
            match engine.create_user(&args.username, &password).await {
                Ok(()) => println!("created user: {}", args.username),
                Err(EngineError::ExistingKey(_)) => {
                    eprintln!("user already exists: {}", args.username);
                    std::process::exit(1);
                }
                Err(err) => return Err(err.into()),
            }
        }
        Command::Budget(Budget {
            command: BudgetCommand::Create(args),
        }) => {
            let budget = engine
                .insert_budget(&args.owner, &args.name, args.amount)
                .await?;
            println!("created budget: {} {} ({})", budget.name, budget.amount, budget.id);
        }
        Command::Budget(Budget {
            command: BudgetCommand::List(args),
        }) => {
            let month = Month::of(Local::now().date_naive());
            let budgets = engine.list_budgets(&args.owner).await?;
            let expenses = engine.list_expenses(&args.owner, month.range()).await?;

            println!("{month}");
            for summary in aggregate::summarize(&budgets, &expenses) {
                let flag = if summary.over_budget { "  OVER" } else { "" };
                println!(
                    "{:<24} {:>12} spent of {:>12}, {:>12} left ({:.0}%){flag}",
                    summary.name,
                    summary.spent.to_string(),
                    summary.amount.to_string(),
                    summary.remaining.to_string(),
                    summary.percent_used,
                );
            }
            println!(
                "total: {} spent of {}",
                aggregate::total_spent(&budgets, &expenses),
                aggregate::total_budget(&budgets)
            );
        }
    }

    Ok(())
}
