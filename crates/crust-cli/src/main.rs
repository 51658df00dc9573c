//! `crust` operator CLI: database status, migrations, and demo seeding.
//!
//! Output is stable `key=value` lines so scripts can grep it. Anything that
//! could destroy in-flight data sits behind an explicit flag.

use anyhow::Result;
use clap::{Parser, Subcommand};

use crust_db::PgStore;

mod seed;

#[derive(Parser)]
#[command(name = "crust")]
#[command(about = "Pizza backend operator CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    /// Print connectivity, schema presence, and open-order count.
    Status,

    /// Apply SQL migrations. Guardrail: refuses while orders are still in
    /// flight unless --yes is provided.
    Migrate {
        /// Acknowledge you are migrating a DB with open orders.
        #[arg(long, default_value_t = false)]
        yes: bool,
    },

    /// Load the demo catalog and admin account.
    Seed {
        /// Overwrite existing catalog rows with the fixture instead of
        /// skipping them.
        #[arg(long, default_value_t = false)]
        force: bool,

        /// Password for the admin account if it has to be created.
        /// Omitted: a random one is generated and printed once.
        #[arg(long)]
        admin_password: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Dev convenience; silent if the file does not exist.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Db { cmd } => {
            let pool = crust_db::connect_from_env().await?;
            match cmd {
                DbCmd::Status => {
                    let s = crust_db::status(&pool).await?;
                    let open = crust_db::count_open_orders(&pool).await?;
                    println!(
                        "db_ok={} has_orders_table={} open_orders={}",
                        s.ok, s.has_orders_table, open
                    );
                }

                DbCmd::Migrate { yes } => {
                    // Guardrail: refuse migrations while any order is still
                    // being prepared or delivered, unless the operator
                    // explicitly acknowledges with --yes.
                    let n = crust_db::count_open_orders(&pool).await?;
                    if n > 0 && !yes {
                        anyhow::bail!(
                            "REFUSING MIGRATE: {} open order(s) are still in flight. Re-run with: `crust db migrate --yes`",
                            n
                        );
                    }

                    crust_db::migrate(&pool).await?;
                    println!("migrations_applied=true");
                }

                DbCmd::Seed {
                    force,
                    admin_password,
                } => {
                    crust_db::migrate(&pool).await?;
                    let store = PgStore::new(pool);

                    let report = seed::seed_catalog(&store, force).await?;
                    println!(
                        "pizzas_seeded={} pizzas_skipped={}",
                        report.seeded, report.skipped
                    );

                    let generated = admin_password.is_none();
                    let password = admin_password.unwrap_or_else(seed::generate_password);

                    let created = seed::ensure_admin(&store, &password).await?;
                    println!("admin_email={} admin_created={}", seed::ADMIN_EMAIL, created);
                    if created && generated {
                        // Printed exactly once; it is not stored anywhere in
                        // recoverable form.
                        println!("admin_password={}", password);
                    }
                }
            }
        }
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("CRUST_LOG")
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();
}
