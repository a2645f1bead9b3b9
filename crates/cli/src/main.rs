use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use clap::{Parser, Subcommand};
use consult_core::constants::{DATABASE_PATH_ENV_VAR, TIMEZONE_ENV_VAR};
use consult_core::{
    parse_instant, parse_local_date_time, ConsultationFilter, ConsultationService,
    ConsultationStatus, ConsultationStore, ConsultationUpdate, CoreConfig, NewConsultation,
    NewPerson, NewUser, NonEmptyText, RecordId, RegistryService, SqliteStore,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod output;

#[derive(Parser)]
#[command(name = "consult")]
#[command(about = "Clinic consultation records CLI")]
struct Cli {
    /// Clinic time zone (overrides CONSULT_TIMEZONE)
    #[arg(long, global = true)]
    timezone: Option<String>,
    /// SQLite database file (overrides CONSULT_DATABASE_PATH)
    #[arg(long, global = true)]
    database: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage patients
    Person {
        #[command(subcommand)]
        action: PersonCommand,
    },
    /// Manage practitioners
    Doctor {
        #[command(subcommand)]
        action: DoctorCommand,
    },
    /// Book a consultation
    Create {
        #[arg(long)]
        person: RecordId,
        #[arg(long)]
        doctor: RecordId,
        /// Clinic wall-clock time, e.g. 2024-06-15T10:00
        #[arg(long, value_parser = parse_local_date_time)]
        at: NaiveDateTime,
        #[arg(long, default_value_t = ConsultationStatus::Scheduled)]
        status: ConsultationStatus,
        #[arg(long)]
        reason: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// List consultations, most recent first
    List {
        #[arg(long)]
        person: Option<RecordId>,
        #[arg(long)]
        doctor: Option<RecordId>,
        /// Earliest instant, RFC 3339 or YYYY-MM-DD (UTC midnight)
        #[arg(long, value_parser = parse_instant)]
        from: Option<DateTime<Utc>>,
        /// Latest instant, RFC 3339 or YYYY-MM-DD (UTC midnight)
        #[arg(long, value_parser = parse_instant)]
        to: Option<DateTime<Utc>>,
        #[arg(long)]
        status: Option<ConsultationStatus>,
    },
    /// Show one consultation
    Show { id: RecordId },
    /// Change fields of a consultation
    Update {
        id: RecordId,
        #[arg(long)]
        person: Option<RecordId>,
        #[arg(long)]
        doctor: Option<RecordId>,
        /// Clinic wall-clock time
        #[arg(long, value_parser = parse_local_date_time)]
        at: Option<NaiveDateTime>,
        #[arg(long)]
        status: Option<ConsultationStatus>,
        #[arg(long)]
        reason: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Delete a consultation
    Delete { id: RecordId },
    /// A patient's consultations with practitioner details
    History {
        person: RecordId,
        #[arg(long)]
        doctor: Option<RecordId>,
    },
}

#[derive(Subcommand)]
enum PersonCommand {
    /// Register a patient
    Add {
        #[arg(long)]
        first_name: NonEmptyText,
        #[arg(long)]
        last_name: NonEmptyText,
        /// Date of birth (YYYY-MM-DD)
        #[arg(long)]
        birth_date: Option<NaiveDate>,
        #[arg(long)]
        phone: Option<String>,
    },
}

#[derive(Subcommand)]
enum DoctorCommand {
    /// Register a practitioner and its user identity
    Add {
        #[arg(long)]
        email: NonEmptyText,
        #[arg(long)]
        first_name: NonEmptyText,
        #[arg(long)]
        last_name: NonEmptyText,
        #[arg(long)]
        specialty: Option<String>,
    },
}

/// Entry point for the `consult` binary.
///
/// # Environment Variables
/// - `CONSULT_TIMEZONE`: clinic zone name (default: "Africa/Douala")
/// - `CONSULT_DATABASE_PATH`: SQLite file (default: "consultations.db")
/// - `RUST_LOG`: log filter, added to the default `consult=info`
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("consult=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let cfg = Arc::new(CoreConfig::from_env_values(
        cli.timezone
            .or_else(|| std::env::var(TIMEZONE_ENV_VAR).ok()),
        cli.database
            .or_else(|| std::env::var(DATABASE_PATH_ENV_VAR).ok()),
    )?);
    tracing::debug!(
        "clinic zone {}, database {}",
        cfg.clinic_timezone(),
        cfg.database_path().display()
    );

    let store = Arc::new(SqliteStore::open(cfg.database_path())?);
    let result = run(cli.command, cfg, store.clone()).await;

    match Arc::try_unwrap(store) {
        Ok(store) => store.close()?,
        Err(_) => tracing::warn!("store still shared at exit; closing on drop"),
    }

    println!("{}", result?);
    Ok(())
}

/// Executes one command and returns the JSON to print.
async fn run(
    command: Commands,
    cfg: Arc<CoreConfig>,
    store: Arc<dyn ConsultationStore>,
) -> anyhow::Result<String> {
    let clock = cfg.clock();
    let consultations = ConsultationService::new(cfg, store.clone());
    let registry = RegistryService::new(store);

    match command {
        Commands::Person {
            action:
                PersonCommand::Add {
                    first_name,
                    last_name,
                    birth_date,
                    phone,
                },
        } => {
            let person = registry
                .register_person(NewPerson {
                    first_name,
                    last_name,
                    birth_date,
                    phone,
                })
                .await?;
            output::record(&person)
        }
        Commands::Doctor {
            action:
                DoctorCommand::Add {
                    email,
                    first_name,
                    last_name,
                    specialty,
                },
        } => {
            let doctor = registry
                .register_doctor(
                    NewUser {
                        email,
                        first_name,
                        last_name,
                    },
                    specialty,
                )
                .await?;
            output::record(&doctor)
        }
        Commands::Create {
            person,
            doctor,
            at,
            status,
            reason,
            notes,
        } => {
            let created = consultations
                .create(NewConsultation {
                    person_id: person,
                    doctor_id: doctor,
                    date_time: at,
                    status,
                    reason,
                    notes,
                })
                .await?;
            output::consultation(clock, &created)
        }
        Commands::List {
            person,
            doctor,
            from,
            to,
            status,
        } => {
            let filter = ConsultationFilter {
                person_id: person,
                doctor_id: doctor,
                from,
                to,
                status,
            };
            let found = consultations.find_all(&filter).await?;
            output::consultations(clock, &found)
        }
        Commands::Show { id } => {
            let found = consultations.find_one(id).await?;
            output::consultation(clock, &found)
        }
        Commands::Update {
            id,
            person,
            doctor,
            at,
            status,
            reason,
            notes,
        } => {
            let update = ConsultationUpdate {
                person_id: person,
                doctor_id: doctor,
                date_time: at,
                status,
                reason,
                notes,
            };
            if update.is_empty() {
                tracing::debug!("update {} carries no changes", id);
            }
            let updated = consultations.update(id, update).await?;
            output::consultation(clock, &updated)
        }
        Commands::Delete { id } => {
            let deleted = consultations.remove(id).await?;
            output::record(&deleted)
        }
        Commands::History { person, doctor } => {
            let history = consultations.patient_history(person, doctor).await?;
            output::consultations(clock, &history)
        }
    }
}
