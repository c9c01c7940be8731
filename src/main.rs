use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Parser;
use serde_json::json;

use order_sweeper::cli::{Cli, Command, parse_now};
use order_sweeper::config::{SweeperConfig, interval_from_hours};
use order_sweeper::logging;
use order_sweeper::scheduler::Scheduler;
use order_sweeper::store::{InMemoryStore, OrderStore};
use order_sweeper::sweeper::{SweepReport, SweepSettings, Sweeper};
use order_sweeper::ui::{self, SweepProgress};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.json_logs);

    let config = SweeperConfig::load_from(&cli.config)?;

    match cli.command {
        Command::Run {
            now,
            dry_run,
            json,
            seed,
        } => {
            let now = parse_now(now.as_deref())?;
            let sweeper = Sweeper::new(SweepSettings {
                dry_run,
                ..config.sweep_settings()
            });

            match seed {
                Some(path) => {
                    let store = InMemoryStore::from_json_file(&path)?;
                    if json {
                        let report = sweeper.run(now, &store).await?;
                        let out = json!({ "report": report, "orders": store.snapshot() });
                        ui::write_json(&mut std::io::stdout().lock(), &out)?;
                    } else {
                        sweep_with_progress(&sweeper, now, &store, &path.display().to_string())
                            .await?;
                        ui::print_orders_json(&store.snapshot())?;
                    }
                }
                None => {
                    let store = config.firestore_client()?;
                    let target = format!("{}/{}", config.project_id, config.collection);
                    if json {
                        let report = sweeper.run(now, &store).await?;
                        ui::print_report_json(&report)?;
                    } else {
                        sweep_with_progress(&sweeper, now, &store, &target).await?;
                    }
                }
            }
        }
        Command::Schedule { interval_hours } => {
            let interval = match interval_hours {
                Some(hours) => interval_from_hours(hours)?,
                None => config.interval()?,
            };
            let store = config.firestore_client()?;
            let scheduler = Scheduler::new(Sweeper::new(config.sweep_settings()), store, interval);

            scheduler
                .run_until(async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
                        std::future::pending::<()>().await;
                    }
                })
                .await;
        }
        Command::Config => {
            println!("project_id        = {:?}", config.project_id);
            println!("database          = {:?}", config.database);
            println!("collection        = {:?}", config.collection);
            println!("grace_period_days = {}", config.grace_period_days);
            println!("interval_hours    = {}", config.interval_hours);
            println!("base_url          = {:?}", config.base_url);
            println!(
                "access_token      = {}",
                if config.access_token.is_some() { "<set>" } else { "<unset>" }
            );
            println!("query_cutoff      = {}", config.query_cutoff);
        }
    }

    Ok(())
}

async fn sweep_with_progress<S: OrderStore>(
    sweeper: &Sweeper,
    now: DateTime<Utc>,
    store: &S,
    target: &str,
) -> Result<SweepReport> {
    let progress = SweepProgress::start(target);
    match sweeper.run(now, store).await {
        Ok(report) => {
            progress.complete(&report);
            Ok(report)
        }
        Err(e) => {
            progress.fail(&e);
            Err(e.into())
        }
    }
}
