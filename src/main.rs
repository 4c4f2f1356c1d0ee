use clap::Parser;
use vigil::cli::{Cli, Command};
use vigil::config::Config;
use vigil::fetch;
use vigil::notify::{ConsoleNotifier, Notifier};
use vigil::notify::webhook::WebhookNotifier;
use vigil::report;
use vigil::store::Store;
use vigil::store::diff;
use vigil::util::format_timestamp;
use vigil::watch;

fn open_store() -> Store {
    match Store::open() {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Error opening snapshot store: {e}");
            std::process::exit(1);
        }
    }
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Command::Watch(args) => {
            let config = match Config::from_watch_args(&args) {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("Error loading config: {e}");
                    std::process::exit(1);
                }
            };

            let notifier: Box<dyn Notifier> = match &config.webhook_url {
                Some(url) => Box::new(WebhookNotifier::new(url.clone(), config.timeout)),
                None => Box::new(ConsoleNotifier),
            };

            let sources = fetch::default_sources();
            let mut store = open_store();

            match watch::run(&config, &sources, &mut store, notifier.as_ref()) {
                Ok(outcome) => {
                    report::print_outcome(&outcome, config.json_output, config.verbose);
                }
                Err(e) => {
                    // nothing was persisted; the scheduler sees the failure
                    // and the next run retries against the intact baseline
                    eprintln!("Run failed: {e}");
                    std::process::exit(1);
                }
            }
        }
        Command::Report(args) => {
            let store = open_store();

            if args.list {
                match store.list_snapshots() {
                    Ok(snapshots) => {
                        if snapshots.is_empty() {
                            println!("No snapshots found. Run 'vigil watch' to create one.");
                        } else {
                            println!("Snapshots:");
                            println!("{:<6} {:<20} {:<14} {:<12}", "ID", "Date", "Observations", "Duration");
                            println!("{}", "-".repeat(56));

                            for snapshot in snapshots {
                                println!(
                                    "{:<6} {:<20} {:<14} {:<12}",
                                    snapshot.id,
                                    format_timestamp(snapshot.timestamp),
                                    snapshot.observation_count,
                                    format!("{:.2}s", snapshot.run_duration_ms as f64 / 1000.0)
                                );
                            }
                        }
                    }
                    Err(e) => {
                        eprintln!("Error listing snapshots: {e}");
                        std::process::exit(1);
                    }
                }
                return;
            }

            let snapshot_result = if let Some(id_str) = &args.id {
                let id: i64 = id_str.parse().unwrap_or_else(|_| {
                    eprintln!("Invalid snapshot ID: '{id_str}'. Must be a number.");
                    std::process::exit(1);
                });
                store.get_snapshot(id)
            } else {
                store.latest_snapshot()
            };

            match snapshot_result {
                Ok(Some(snapshot)) => {
                    let observations = store.load_observations(snapshot.id).unwrap_or_default();

                    if args.json {
                        println!("{}", report::json::render_observations(&observations));
                    } else {
                        print!("{}", report::table::render_observations(&observations));
                        println!(
                            "\nsnapshot: #{} ({})",
                            snapshot.id,
                            format_timestamp(snapshot.timestamp)
                        );
                        println!("run duration: {:.2}s", snapshot.run_duration_ms as f64 / 1000.0);
                    }
                }
                Ok(None) => {
                    eprintln!("No snapshots found. Run 'vigil watch' to create one.");
                    std::process::exit(1);
                }
                Err(e) => {
                    eprintln!("Error loading snapshot: {e}");
                    std::process::exit(1);
                }
            }
        }
        Command::Diff(args) => {
            let store = open_store();

            // validate that --from and --to are used together
            if args.from.is_some() != args.to.is_some() {
                eprintln!("Both --from and --to must be specified together.");
                std::process::exit(1);
            }

            let (from_id, to_id) = if let (Some(from_str), Some(to_str)) = (&args.from, &args.to) {
                let from: i64 = from_str.parse().unwrap_or_else(|_| {
                    eprintln!("Invalid 'from' snapshot ID: '{from_str}'. Must be a number.");
                    std::process::exit(1);
                });
                let to: i64 = to_str.parse().unwrap_or_else(|_| {
                    eprintln!("Invalid 'to' snapshot ID: '{to_str}'. Must be a number.");
                    std::process::exit(1);
                });
                (from, to)
            } else {
                match store.list_snapshots() {
                    Ok(snapshots) => {
                        if snapshots.len() < 2 {
                            eprintln!("Need at least 2 snapshots to compare. Run 'vigil watch' a few times.");
                            std::process::exit(1);
                        }
                        (snapshots[1].id, snapshots[0].id)
                    }
                    Err(e) => {
                        eprintln!("Error loading snapshots: {e}");
                        std::process::exit(1);
                    }
                }
            };

            let from_snapshot = load_snapshot_or_exit(&store, from_id);
            let to_snapshot = load_snapshot_or_exit(&store, to_id);

            let from_observations = load_observations_or_exit(&store, from_id);
            let to_observations = load_observations_or_exit(&store, to_id);

            let result = diff::compare_observations(
                &from_observations,
                &to_observations,
                from_id,
                Some(to_id),
                from_snapshot.timestamp,
                to_snapshot.timestamp,
            );

            println!("\nComparing snapshots:");
            println!("  From: #{} ({})", result.from_id, format_timestamp(result.from_timestamp));
            println!("  To:   #{} ({})", to_id, format_timestamp(result.to_timestamp));
            println!();

            if result.is_empty() {
                println!("No changes detected.");
            } else {
                print!("{}", report::table::render_delta(&result));
            }
        }
    }
}

fn load_snapshot_or_exit(store: &Store, id: i64) -> vigil::store::Snapshot {
    match store.get_snapshot(id) {
        Ok(Some(s)) => s,
        Ok(None) => {
            eprintln!("Snapshot {id} not found");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error loading snapshot {id}: {e}");
            std::process::exit(1);
        }
    }
}

fn load_observations_or_exit(store: &Store, id: i64) -> Vec<vigil::fetch::source::Observation> {
    match store.load_observations(id) {
        Ok(observations) => observations,
        Err(e) => {
            eprintln!("Error loading observations for snapshot {id}: {e}");
            std::process::exit(1);
        }
    }
}
