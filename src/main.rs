use bike_allocation::core::report::{assignment_csv, standings, AssociationView};
use bike_allocation::domain::model::{Assignment, Recovery};
use bike_allocation::domain::ports::RecoveryStore;
use bike_allocation::domain::recovery_date::RecoveryDate;
use bike_allocation::utils::error::ErrorSeverity;
use bike_allocation::utils::logger::{init_logger, LogFormat};
use bike_allocation::utils::validation::{validate_url, Validate};
use bike_allocation::{
    AllocError, CliConfig, Command, DocumentStore, LocalStorage, Result, RunCoordinator,
    SubmissionOutcome, SubmissionService, TomlConfig,
};
use chrono::{Local, NaiveDateTime};
use clap::Parser;
use std::sync::Arc;

type Store = DocumentStore<LocalStorage>;

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    let format = if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };
    init_logger(format, cli.verbose);

    tracing::info!("Starting bike-allocation");
    tracing::debug!("CLI config: {:?}", cli);

    if let Err(e) = cli.validate() {
        exit_with(&e);
    }

    tracing::info!("📁 Loading configuration from: {}", cli.config);
    let mut config = match TomlConfig::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", cli.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    if let Some(data_dir) = &cli.data_dir {
        config.storage.data_dir = data_dir.clone();
        tracing::info!("🔧 Data directory overridden to: {}", data_dir);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        exit_with(&e);
    }

    let store = Arc::new(DocumentStore::new(LocalStorage::new(config.data_dir())));
    let now = Local::now().naive_local();

    if let Err(e) = run(cli.command, &config, store, now).await {
        tracing::error!(
            "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        exit_with(&e);
    }
}

fn exit_with(e: &AllocError) -> ! {
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Low => 4,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}

async fn run(command: Command, config: &TomlConfig, store: Arc<Store>, now: NaiveDateTime) -> Result<()> {
    match command {
        Command::AddRecovery { date, images_url } => {
            validate_url("images_url", &images_url)?;
            let recovery = Recovery {
                date: RecoveryDate::parse(&date)?,
                images_url,
            };
            if store.add_recovery(&recovery).await? {
                println!("✅ Added recovery {}", recovery.date);
            } else {
                println!("ℹ️  Recovery {} was already registered", recovery.date);
            }
            let bikes = store.load_bikes(&recovery.date).await?;
            println!(
                "📷 {} bike photos found in {}",
                bikes.len(),
                DocumentStore::<LocalStorage>::bikes_dir(&recovery.date)
            );
        }

        Command::Recoveries => {
            let today = now.date();
            let (past, upcoming): (Vec<_>, Vec<_>) = store
                .list_recoveries()
                .await?
                .into_iter()
                .partition(|recovery| recovery.date.is_past(today));

            println!("Upcoming recoveries:");
            for recovery in &upcoming {
                println!(
                    "  {}  (preferences until {})  {}",
                    recovery.date,
                    recovery.date.submission_deadline(),
                    recovery.images_url
                );
            }
            if !past.is_empty() {
                println!("Past recoveries:");
                for recovery in &past {
                    println!("  {}", recovery.date);
                }
            }
        }

        Command::Submit {
            association,
            date,
            fields,
        } => {
            let date = RecoveryDate::parse(&date)?;
            let service = SubmissionService::new(store, config.associations.clone())
                .with_deadlines(config.enforce_deadlines());

            match service.submit(&association, &date, fields, now).await? {
                SubmissionOutcome::Recorded(_) => {
                    println!("✅ Preference of {} for {} stored", association, date)
                }
                SubmissionOutcome::AlreadySubmitted => println!(
                    "ℹ️  {} already submitted a preference for {}, the previous one stands",
                    association, date
                ),
            }
        }

        Command::Assign { date } => {
            let date = RecoveryDate::parse(&date)?;
            let assignment = assignment_for(&date, config, store, now).await?;

            println!("Assignment for {}:", date);
            for association in &config.associations {
                println!(
                    "  {:<24} {} bikes",
                    association.name,
                    assignment.count_for(&association.id)
                );
            }
            println!("  {:<24} {} bikes", "(unassigned)", assignment.unassigned().count());
        }

        Command::Show { date, association } => {
            let date = RecoveryDate::parse(&date)?;
            if config.association(&association).is_none() {
                return Err(AllocError::UnknownAssociation { id: association });
            }
            let assignment = assignment_for(&date, config, store, now).await?;
            let view = AssociationView::new(&assignment, &association);

            println!(
                "{} of the {} bikes of {} go to {}; {} are unassigned",
                view.assigned.len(),
                view.total,
                date,
                association,
                view.unassigned.len()
            );
            for bike in &view.assigned {
                println!("  🚲 {} ({})", bike.id, bike.file_id);
            }
            if !view.unassigned.is_empty() {
                println!("Unassigned:");
                for bike in &view.unassigned {
                    println!("  {} ({})", bike.id, bike.file_id);
                }
            }
        }

        Command::Export { date, output } => {
            let date = RecoveryDate::parse(&date)?;
            let assignment = assignment_for(&date, config, store, now).await?;
            let csv = assignment_csv(&assignment)?;

            match output {
                Some(path) => {
                    std::fs::write(&path, csv)?;
                    println!("📁 Output saved to: {}", path);
                }
                None => print!("{}", csv),
            }
        }

        Command::Points => {
            let ledger = store.load_ledger().await?;
            for (association, score) in standings(&ledger, &config.associations) {
                println!("  {:<24} {:>8.2}", association.name, score);
            }
        }
    }

    Ok(())
}

async fn assignment_for(
    date: &RecoveryDate,
    config: &TomlConfig,
    store: Arc<Store>,
    now: NaiveDateTime,
) -> Result<Assignment> {
    if config.enforce_deadlines() && !date.is_deadline_past(now) {
        return Err(AllocError::AllocationNotReady {
            date: date.to_string(),
        });
    }

    let coordinator = RunCoordinator::new(store, config.associations.clone());
    coordinator.get_or_compute(date).await
}
