//! pomotick - a terminal Pomodoro timer.
//!
//! Work and break phases alternate with a long break after every fourth
//! pomodoro. Settings and statistics persist between runs, and a desktop
//! notification announces the end of each phase.

use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, Sender};
use std::thread;

use chrono::{Local, Utc};
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod event;
mod models;
mod notifications;
mod persistence;
mod plan;
mod store;
mod ticker;
mod timer;
mod validation;

use cli::{Cli, Commands, PlanAction, SettingsAction, StatsAction};
use event::{EventResult, HostEvent};
use models::Phase;
use notifications::DesktopNotifier;
use persistence::Database;
use store::Store;
use ticker::ThreadTicker;
use timer::{PhaseEnded, Timer};

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn print_settings(settings: &models::Settings) {
    println!("Work:          {} min", settings.work_duration);
    println!("Short break:   {} min", settings.short_break_duration);
    println!("Long break:    {} min", settings.long_break_duration);
    println!("Notifications: {}", on_off(settings.notifications_enabled));
    println!("Wake lock:     {}", on_off(settings.wake_lock_enabled));
}

fn print_statistics(stats: &models::Statistics) {
    println!("Completed sessions: {}", stats.completed_sessions);
    println!("Total work time:    {}", timer::format_work_time(stats.total_work_time));
    println!("Current streak:     {}", stats.streak);
}

fn print_plan(plan: Option<&models::TimeBoundPomodoro>) {
    match plan {
        Some(plan) => println!(
            "Until {}: {}/{} sets done{}",
            plan.target_time.with_timezone(&Local).format("%H:%M"),
            plan.completed_sets,
            plan.estimated_sets,
            if plan.auto_advance { ", auto-advancing" } else { "" }
        ),
        None => println!("No active plan."),
    }
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

fn print_status(timer: &Timer) {
    let (done, cycle) = timer.set_progress();
    let state = if timer.is_running() { "running" } else { "stopped" };
    print!(
        "\r{:<12} {}  {:>3.0}%  [{}]  pomodoros {}  set {}/{}   ",
        timer.phase().to_string(),
        timer.format_time(),
        timer.progress(),
        state,
        timer.completed_pomodoros(),
        done,
        cycle
    );
    let _ = io::stdout().flush();
}

fn announce(ended: &PhaseEnded) {
    println!();
    println!("{}: {}", ended.notification.title, ended.notification.body);
    if ended.finished == Phase::Work {
        println!("{} pomodoros since the last reset.", ended.completed_pomodoros);
    }
    println!("Up next: {}", ended.next);
}

/// Forwards stdin lines to the run loop until EOF.
fn spawn_input_reader(tx: Sender<HostEvent>) {
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(HostEvent::Input(line)).is_err() {
                return;
            }
        }
        let _ = tx.send(HostEvent::InputClosed);
    });
}

fn run(store: Store) -> Result<(), Box<dyn std::error::Error>> {
    let (tx, rx) = mpsc::channel();
    spawn_input_reader(tx.clone());

    let mut timer = Timer::new(
        store,
        Box::new(ThreadTicker::new(tx)),
        Box::new(DesktopNotifier),
    );
    if timer.settings().wake_lock_enabled {
        tracing::info!("wake lock requested but not supported by the terminal host");
    }

    println!("pomotick - type 'help' for commands");
    print_status(&timer);

    while let Ok(event) = rx.recv() {
        match event {
            HostEvent::Tick(generation) => {
                if let Some(ended) = timer.on_tick(generation) {
                    announce(&ended);
                    timer.auto_advance(Utc::now());
                }
                print_status(&timer);
            }
            HostEvent::Input(line) => {
                let command = match event::parse_command(&line) {
                    Ok(command) => command,
                    Err(e) => {
                        println!("{e}");
                        print_status(&timer);
                        continue;
                    }
                };
                match event::handle_command(&mut timer, command) {
                    EventResult::Quit => break,
                    EventResult::StateChanged | EventResult::SettingsChanged => {}
                    EventResult::SettingsRejected(message) => println!("{message}"),
                    EventResult::ShowStats => {
                        println!();
                        print_statistics(timer.statistics());
                    }
                    EventResult::ShowHelp => {
                        println!();
                        println!("{}", event::HELP);
                    }
                }
                print_status(&timer);
            }
            HostEvent::InputClosed => break,
        }
    }

    timer.shutdown();
    println!();
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let db_path = cli.db.clone().unwrap_or_else(Database::default_path);
    tracing::debug!(path = %db_path.display(), "opening database");
    let mut store = Store::load(Database::open(&db_path)?);

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(store)?,
        Commands::Settings { action } => match action {
            SettingsAction::Show => print_settings(store.settings()),
            SettingsAction::Set(args) => {
                let update = args.to_update();
                if update.is_empty() {
                    println!("Nothing to change.");
                } else {
                    store.update_settings(&update)?;
                }
                print_settings(store.settings());
            }
        },
        Commands::Stats { action } => match action.unwrap_or(StatsAction::Show) {
            StatsAction::Show => print_statistics(store.statistics()),
            StatsAction::Reset => {
                store.reset_statistics()?;
                print_statistics(store.statistics());
            }
        },
        Commands::Plan { action } => match action {
            PlanAction::Until {
                time,
                no_auto_advance,
            } => {
                let now = Local::now();
                let target = plan::parse_time_input(&time, &now)?;
                let plan = plan::plan_until(&target, &now, store.settings(), !no_auto_advance);
                store.set_time_bound_session(Some(plan))?;
                print_plan(store.time_bound_session());
            }
            PlanAction::Show => print_plan(store.time_bound_session()),
            PlanAction::Clear => {
                store.set_time_bound_session(None)?;
                print_plan(None);
            }
        },
        Commands::Notify { payload } => {
            // Unparseable payloads are treated like an empty one.
            let value = serde_json::from_str(&payload).unwrap_or(serde_json::Value::Null);
            let notification = validation::sanitize_push_payload(&value);
            if store.settings().notifications_enabled {
                if notifications::show(notification).join().is_err() {
                    tracing::error!("notification thread panicked");
                }
            } else {
                tracing::info!(title = %notification.title, "notifications disabled, not showing");
            }
        }
    }

    Ok(())
}
