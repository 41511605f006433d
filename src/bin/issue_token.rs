//! Access token issuing tool
//!
//! Creates a user (or reuses one) and prints a fresh bearer token.
//!
//! Run with: cargo run --bin issue_token -- --name "Ada" --email ada@example.com
//!       or: cargo run --bin issue_token -- --user-id 42 --token-name laptop

use sqlx::postgres::PgPoolOptions;

use debit_card_api::auth::issue_token;
use debit_card_api::domain::{NewUser, UserId};
use debit_card_api::store::{PgRecordStore, RecordStore};

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();
    let token_name = arg_value(&args, "--token-name").unwrap_or("cli");

    let database_url = std::env::var("DATABASE_URL")?;
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await?;
    let store = PgRecordStore::new(pool);

    let user = match arg_value(&args, "--user-id") {
        Some(raw) => {
            let id = UserId(raw.parse()?);
            store
                .find_user(id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("user {} does not exist", id))?
        }
        None => {
            let name = arg_value(&args, "--name")
                .ok_or_else(|| anyhow::anyhow!("--name is required unless --user-id is given"))?;
            let email = arg_value(&args, "--email")
                .ok_or_else(|| anyhow::anyhow!("--email is required unless --user-id is given"))?;
            store
                .create_user(NewUser {
                    name: name.to_string(),
                    email: email.to_string(),
                })
                .await?
        }
    };

    let issued = issue_token(&store, user.id, token_name).await?;

    eprintln!("User {} <{}> (id {})", user.name, user.email, user.id);
    eprintln!("Token id {}; the value below is shown only once.", issued.record.id);
    println!("{}", issued.token);

    Ok(())
}
