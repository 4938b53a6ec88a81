use giftcert_marketplace::app::UserService;
use giftcert_marketplace::infra::{logging, AppConfig};
use giftcert_marketplace::{MarketplaceStore, PasswordHasher, PgStore};
use std::sync::Arc;

fn usage_and_exit() -> ! {
    eprintln!(
        "Usage: cargo run --bin preflight -- [--seed-admin]\n\
         \n\
         Validates the configuration and, when DATABASE_URL is set, checks\n\
         connectivity and bootstraps the schema.\n\
         \n\
         Requires env vars:\n\
           JWT_SECRET\n\
         Optional:\n\
           DATABASE_URL, BIND_ADDR, JWT_ACCESS_EXPIRATION_MINUTES,\n\
           JWT_REFRESH_EXPIRATION_MINUTES, BCRYPT_COST, DB_MAX_CONNECTIONS,\n\
           ADMIN_EMAIL + ADMIN_PASSWORD (required with --seed-admin)\n"
    );
    std::process::exit(2);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    logging::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        usage_and_exit();
    }
    let seed_admin = args.iter().any(|a| a == "--seed-admin");

    // Force-read config (nice error messages if anything is missing or malformed)
    let config = AppConfig::from_env()?;

    println!("> Preflight:");
    println!("  BIND_ADDR={}", config.bind_addr);
    println!("  JWT_SECRET=<{} bytes>", config.jwt_secret.len());
    println!(
        "  token lifetimes: access={}m refresh={}m",
        config.access_expiration_minutes, config.refresh_expiration_minutes
    );
    println!("  BCRYPT_COST={}", config.bcrypt_cost);
    match &config.admin {
        Some(admin) => println!("  ADMIN_EMAIL={}", admin.email),
        None => println!("  ADMIN_EMAIL=<unset>"),
    }

    let Some(url) = config.database_url.as_deref() else {
        println!("  DATABASE_URL=<unset> (the server will run on the in-memory store)");
        if seed_admin {
            anyhow::bail!("--seed-admin needs DATABASE_URL");
        }
        println!("> Preflight OK.");
        return Ok(());
    };

    let store = PgStore::connect(url, config.db_max_connections).await?;
    store.ping().await?;
    println!("  Database reachable; schema bootstrapped.");
    for (table, count) in store.table_counts().await? {
        println!("  {:<24} {} row(s)", table, count);
    }

    if seed_admin {
        let admin = config
            .admin
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("--seed-admin needs ADMIN_EMAIL and ADMIN_PASSWORD"))?;
        let users = UserService::new(Arc::new(store), PasswordHasher::new(config.bcrypt_cost));
        let user = users.ensure_admin(&admin.email, &admin.password).await?;
        println!("  Admin account: id={} email={} role={}", user.id, user.email, user.role);
    }

    println!("> Preflight OK.");
    Ok(())
}
