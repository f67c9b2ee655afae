// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{Local, NaiveDate};
use std::env;

// Use library instead of local modules
use dashboard_analytics::{
    lock, Dashboard, DashboardConfig, FilterCoordinator, FilterCriteria, MockDataSource,
};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let config = DashboardConfig::from_env()?;

    match args.get(1).map(String::as_str) {
        Some("apply") => {
            init_logging("info");
            run_apply(config, &args[2..])?;
        }
        Some("config") => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        _ => {
            // Logs would draw over the alternate screen unless explicitly requested
            init_logging("off");
            run_ui_mode(config)?;
        }
    }

    Ok(())
}

fn init_logging(default_filter: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

#[derive(Debug, Default)]
struct ApplyArgs {
    date_from: Option<NaiveDate>,
    date_to: Option<NaiveDate>,
    house: Option<String>,
    seed: Option<u64>,
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", value))
}

fn parse_apply_args(args: &[String]) -> Result<ApplyArgs> {
    let mut parsed = ApplyArgs::default();
    let mut iter = args.iter();

    while let Some(flag) = iter.next() {
        let mut value = || {
            iter.next()
                .ok_or_else(|| anyhow!("Missing value for {}", flag))
        };

        match flag.as_str() {
            "--from" => parsed.date_from = Some(parse_date(value()?)?),
            "--to" => parsed.date_to = Some(parse_date(value()?)?),
            "--house" => parsed.house = Some(value()?.clone()),
            "--seed" => {
                let raw = value()?;
                parsed.seed = Some(raw.parse().with_context(|| format!("Invalid seed '{}'", raw))?);
            }
            other => bail!("Unknown option: {}", other),
        }
    }

    Ok(parsed)
}

/// Headless submission: apply filters once and print what the views received
fn run_apply(mut config: DashboardConfig, args: &[String]) -> Result<()> {
    let args = parse_apply_args(args)?;
    if args.seed.is_some() {
        config.mock.seed = args.seed;
    }

    let defaults = FilterCriteria::month_to_date(Local::now().date_naive());
    let criteria = FilterCriteria {
        date_from: args.date_from.or(defaults.date_from),
        date_to: args.date_to.or(defaults.date_to),
        house: args.house,
    };

    println!("📊 Dashboard Analytics - Apply Filters");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let runtime = tokio::runtime::Runtime::new()?;
    let dashboard = Dashboard::new(&config);
    let coordinator = FilterCoordinator::new(
        &config,
        MockDataSource::from_config(&config),
        dashboard.sinks(),
    );

    println!("\n⏳ Applying filters...");
    let outcome = runtime.block_on(coordinator.submit(criteria));

    for notice in lock(&dashboard.notices).history() {
        println!("🔔 [{:?}] {}", notice.level, notice.message);
    }

    if let Err(err) = outcome {
        eprintln!("❌ {}", err);
        std::process::exit(1);
    }

    println!("\n📈 Metrics");
    for card in lock(&dashboard.metrics).cards() {
        println!("   {:<18} {:>12}", card.title, card.display);
    }

    let table = lock(&dashboard.table);
    println!("\n📋 Records ({})", table.rows().len());
    for row in table.rows() {
        let [id, name, house, date, amount, status] = row.display_cells();
        println!(
            "   {:<5} {:<20} {:<11} {:<10} {:>14}  {}",
            id, name, house, date, amount, status
        );
    }

    println!("\n✅ Filters applied");
    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: DashboardConfig) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    let dashboard = Dashboard::new(&config);
    let coordinator = FilterCoordinator::new(
        &config,
        MockDataSource::from_config(&config),
        dashboard.sinks(),
    );

    let today = Local::now().date_naive();
    let mut app = ui::App::new(dashboard, coordinator, runtime.handle().clone(), today);
    ui::run_ui(&mut app)?;

    println!("\n✅ Dashboard closed");
    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_config: DashboardConfig) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use the API: cargo run --bin dashboard-server --features server");
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_apply_args() {
        let parsed = parse_apply_args(&args(&[
            "--from", "2024-03-01", "--to", "2024-03-31", "--house", "Gryffindor", "--seed", "42",
        ]))
        .unwrap();

        assert_eq!(parsed.date_from, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(parsed.date_to, NaiveDate::from_ymd_opt(2024, 3, 31));
        assert_eq!(parsed.house.as_deref(), Some("Gryffindor"));
        assert_eq!(parsed.seed, Some(42));
    }

    #[test]
    fn test_parse_apply_args_errors() {
        assert!(parse_apply_args(&args(&["--from"])).is_err());
        assert!(parse_apply_args(&args(&["--from", "03/01/2024"])).is_err());
        assert!(parse_apply_args(&args(&["--verbose"])).is_err());
        assert!(parse_apply_args(&args(&["--seed", "abc"])).is_err());
    }
}
