//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `personbook_core` linkage and walk the core API once.
//! - Use an in-memory store so runs leave nothing behind.
//! - Log to `PERSONBOOK_LOG_DIR`, or a temp subdirectory when unset.

use log::{error, info};
use personbook_core::{
    default_log_level, init_logging, Passphrase, Person, PersonQuery, PersonService, StoreConfig,
    StoreRegistry,
};
use std::path::PathBuf;
use std::process::ExitCode;

const LOG_DIR_ENV: &str = "PERSONBOOK_LOG_DIR";

#[tokio::main]
async fn main() -> ExitCode {
    println!("personbook_core version={}", personbook_core::core_version());

    let log_dir = log_dir();
    if let Err(err) = init_logging(default_log_level(), &log_dir) {
        eprintln!("logging disabled: {err}");
    }

    match run_walkthrough().await {
        Ok(()) => {
            info!("event=cli_walkthrough module=cli status=ok");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("event=cli_walkthrough module=cli status=error error={err}");
            eprintln!("walkthrough failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn log_dir() -> PathBuf {
    std::env::var_os(LOG_DIR_ENV)
        .map(PathBuf::from)
        .filter(|dir| dir.is_absolute())
        .unwrap_or_else(|| std::env::temp_dir().join("personbook-logs"))
}

async fn run_walkthrough() -> Result<(), Box<dyn std::error::Error>> {
    let registry = StoreRegistry::new(StoreConfig::in_memory(Passphrase::new("smoke")?));
    let service = PersonService::for_store(registry.open()?);

    let mut live = service.observe_all()?;
    let initial = live.next().await.transpose()?.unwrap_or_default();
    info!("event=cli_step module=cli step=observe rows={}", initial.len());
    println!("initial rows={}", initial.len());

    let id = service.insert(
        &Person::new("John", "Doe", "john@example.com", "1234567890", 30)
            .with_address("123 Main St")
            .with_salary(75_000.0),
    )?;
    service.insert(
        &Person::new("Jane", "Roe", "jane@example.com", "0987654321", 28).with_salary(82_000.0),
    )?;
    let after_insert = live.next().await.transpose()?.unwrap_or_default();
    info!(
        "event=cli_step module=cli step=insert id={id} rows={}",
        after_insert.len()
    );
    println!("after insert rows={}", after_insert.len());

    if let Some(person) = service.get_by_id(id)? {
        let renamed = Person {
            first_name: "Johnny".to_string(),
            ..person
        };
        let changed = service.update(&renamed)?;
        info!("event=cli_step module=cli step=update id={id} changed={changed}");
        println!("updated {} rows={changed}", renamed.display_name());
    }

    let hits = service.list(&PersonQuery::search("example.com"))?;
    info!("event=cli_step module=cli step=search hits={}", hits.len());
    println!("search hits={}", hits.len());

    let stats = service.salary_stats()?;
    println!(
        "count={} average_salary={:.2} max_salary={:.2} min_salary={:.2}",
        stats.count, stats.average, stats.max, stats.min
    );

    let deleted = service.delete_by_id(id)?;
    let remaining = service.count()?;
    info!("event=cli_step module=cli step=delete id={id} deleted={deleted} remaining={remaining}");
    println!("delete rows={deleted}");
    println!("remaining rows={remaining}");

    registry.close()?;
    Ok(())
}
