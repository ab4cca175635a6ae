use anyhow::{bail, Context, Result};
use birthday_tracker::countdown::days_until_next_from_today;
use birthday_tracker::storage::BirthdayStorage;
use birthday_tracker::user_storage::UserStorage;
use birthday_tracker::AppConfig;
use clap::{Parser, Subcommand};
use prettytable::{Cell, Row, Table};
use std::collections::HashMap;

#[derive(Parser)]
#[command(name = "admin")]
#[command(about = "Administration tool for the birthday tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Create a user account")]
    CreateUser {
        #[arg(short, long, help = "Username")]
        username: String,

        #[arg(short, long, help = "Password")]
        password: String,
    },

    #[command(about = "List user accounts")]
    ListUsers,

    #[command(about = "Create a tag")]
    AddTag {
        #[arg(short, long, help = "Tag name")]
        name: String,
    },

    #[command(about = "List tags")]
    ListTags,

    #[command(about = "List birthdays with their countdowns")]
    ListBirthdays,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run_command(cli.command).await {
        eprintln!("❌ Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run_command(command: Commands) -> Result<()> {
    let config = AppConfig::load()?;
    std::fs::create_dir_all(&config.data_dir).context("Failed to create data directory")?;

    match command {
        Commands::CreateUser { username, password } => {
            let users = UserStorage::open(&config.data_dir)?;
            create_user(&users, &username, &password).await?;
        }
        Commands::ListUsers => {
            let users = UserStorage::open(&config.data_dir)?;
            list_users(&users).await?;
        }
        Commands::AddTag { name } => {
            let birthdays = BirthdayStorage::open(&config.data_dir)?;
            let tag = birthdays.add_tag(&name).await?;
            println!("✅ Tag '{}' created with ID {}", tag.name, tag.id);
        }
        Commands::ListTags => {
            let birthdays = BirthdayStorage::open(&config.data_dir)?;
            list_tags(&birthdays).await?;
        }
        Commands::ListBirthdays => {
            let birthdays = BirthdayStorage::open(&config.data_dir)?;
            let users = UserStorage::open(&config.data_dir)?;
            list_birthdays(&birthdays, &users).await?;
        }
    }

    Ok(())
}

async fn create_user(users: &UserStorage, username: &str, password: &str) -> Result<()> {
    if username.trim().is_empty() {
        bail!("Username cannot be empty");
    }
    if password.len() < birthday_tracker::forms::PASSWORD_MIN_LEN {
        bail!(
            "Password must be at least {} characters",
            birthday_tracker::forms::PASSWORD_MIN_LEN
        );
    }

    let user = users.register(username.trim(), password).await?;
    println!("✅ User '{}' created", user.username);
    println!("🆔 User ID: {}", user.id);
    Ok(())
}

async fn list_users(users: &UserStorage) -> Result<()> {
    let all = users.get_all_users().await?;
    if all.is_empty() {
        println!("📭 No users found.");
        return Ok(());
    }

    let mut table = Table::new();
    table.add_row(Row::new(vec![
        Cell::new("ID"),
        Cell::new("Username"),
        Cell::new("Registered"),
    ]));
    for user in all {
        table.add_row(Row::new(vec![
            Cell::new(&user.id[..8]),
            Cell::new(&user.username),
            Cell::new(&user.created_at.format("%Y-%m-%d %H:%M").to_string()),
        ]));
    }
    table.printstd();
    Ok(())
}

async fn list_tags(birthdays: &BirthdayStorage) -> Result<()> {
    let tags = birthdays.get_all_tags().await?;
    if tags.is_empty() {
        println!("🏷️  No tags yet. Use 'admin add-tag' to create one.");
        return Ok(());
    }

    let mut table = Table::new();
    table.add_row(Row::new(vec![Cell::new("ID"), Cell::new("Name")]));
    for tag in tags {
        table.add_row(Row::new(vec![
            Cell::new(&tag.id.to_string()),
            Cell::new(&tag.name),
        ]));
    }
    table.printstd();
    Ok(())
}

async fn list_birthdays(birthdays: &BirthdayStorage, users: &UserStorage) -> Result<()> {
    let all = birthdays.get_all_birthdays().await?;
    if all.is_empty() {
        println!("📭 No birthdays found.");
        return Ok(());
    }

    let owners: HashMap<String, String> = users
        .usernames(all.iter().filter_map(|b| b.owner.as_ref()))
        .await?;

    println!("\n🎂 Birthdays ({})\n", all.len());
    let mut table = Table::new();
    table.add_row(Row::new(vec![
        Cell::new("ID"),
        Cell::new("Name"),
        Cell::new("Date"),
        Cell::new("Days left"),
        Cell::new("Tags"),
        Cell::new("Owner"),
    ]));
    for birthday in all {
        let tags = birthdays.tag_names(&birthday.tags).await?.join(", ");
        let owner = birthday
            .owner
            .as_ref()
            .and_then(|id| owners.get(id).cloned())
            .unwrap_or_else(|| "-".to_string());

        table.add_row(Row::new(vec![
            Cell::new(&birthday.id.to_string()),
            Cell::new(&birthday.full_name()),
            Cell::new(&birthday.birthday.format("%Y-%m-%d").to_string()),
            Cell::new(&days_until_next_from_today(birthday.birthday).to_string()),
            Cell::new(&tags),
            Cell::new(&owner),
        ]));
    }
    table.printstd();
    println!();
    Ok(())
}
