use crate::api::ApiClient;
use crate::config::Config;
use crate::domain::appointment::{AppointmentSearch, AvailabilityQuery, PatientDocument, SelectedSlot};
use crate::domain::capacity::CapacityRequest;
use crate::domain::patient::PatientDetails;
use crate::domain::rut::Rut;
use crate::services::{CapacityService, CatalogService, EmailVerificationService, PatientService, SchedulingService};
use crate::storage::FileSessionStore;
use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncReadExt;

#[derive(Debug, Parser)]
#[command(name = "clinic-agenda", version, about = "Clinic scheduling backend client")]
pub struct Cli {
    #[command(flatten)]
    pub config: Config,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in and persist the session
    Login {
        #[arg(long, env = "CLINIC_USERNAME")]
        username: String,
        #[arg(long, env = "CLINIC_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the persisted session
    Logout,
    /// Show the persisted session
    Session,
    /// Look up, register and update patients
    #[command(subcommand)]
    Patient(PatientCommand),
    /// List a reference catalog
    Catalog {
        #[arg(value_enum)]
        kind: CatalogKind,
        /// Region, specialty, prestation or facility id, depending on the catalog
        #[arg(long)]
        id: Option<i64>,
    },
    /// Free slots for a service at a facility
    Availability {
        #[arg(long)]
        categorie_id: i64,
        #[arg(long)]
        age: u32,
        #[arg(long)]
        facility_id: i64,
    },
    /// Search, inspect and book appointments
    #[command(subcommand)]
    Appointment(AppointmentCommand),
    /// Open provider schedules
    #[command(subcommand)]
    Capacity(CapacityCommand),
    /// Validate and format a RUT
    Rut { value: String },
    /// Check an e-mail address and record the result on the patient
    VerifyEmail {
        email: String,
        #[arg(long)]
        rut: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum PatientCommand {
    /// Look a patient up by document number
    Get { rut: String },
    /// Look a patient up by internal id
    ById { id: i64 },
    /// Register a patient from a JSON file (`-` for stdin)
    Create { file: PathBuf },
    /// Update a patient from a JSON file (`-` for stdin)
    Update { rut: String, file: PathBuf },
}

#[derive(Debug, Subcommand)]
pub enum AppointmentCommand {
    /// Appointments in a date range
    Search {
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
        #[arg(long, conflicts_with = "foreign_number")]
        rut: Option<String>,
        #[arg(long)]
        foreign_number: Option<String>,
        #[arg(long, requires = "foreign_number")]
        country_code: Option<String>,
        #[arg(long)]
        facility_id: Option<i64>,
        #[arg(long)]
        professional_id: Option<i64>,
    },
    /// Details of one appointment
    Show { event_id: String },
    /// Book a slot for a patient
    Book {
        #[arg(long)]
        rut: String,
        #[arg(long)]
        professional_id: i64,
        #[arg(long)]
        date: String,
        #[arg(long)]
        hour: String,
        #[arg(long)]
        facility_id: i64,
        #[arg(long)]
        categorie_id: i64,
        #[arg(long)]
        comment: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum CapacityCommand {
    /// Open a provider's schedule from a JSON file (`-` for stdin)
    Create { file: PathBuf },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum CatalogKind {
    Countries,
    Regions,
    Communes,
    Financers,
    Occupations,
    ConsultationSpecialties,
    Specialties,
    Prestations,
    Facilities,
    FacilitiesForPrestation,
    Providers,
    Boxes,
}

impl Cli {
    pub fn load() -> Self {
        Self::parse()
    }

    /// Runs the selected command against the backend.
    ///
    /// # Errors
    /// Returns an error if the command fails or its input cannot be read.
    pub async fn run(self) -> anyhow::Result<()> {
        let Self { config, command } = self;

        // Needs no backend.
        if let Command::Rut { value } = &command {
            return print_json(&rut_report(value));
        }

        let store = Arc::new(FileSessionStore::new(&config.session.session_dir));
        let client = ApiClient::builder(config.api.clone()).session_store(store).build()?;

        match command {
            Command::Login { username, password } => {
                let session = client.login(&username, &password).await?;
                tracing::info!(user = %session.display_name(), "Session stored");
                print_json(&session)
            }
            Command::Logout => {
                client.logout().await;
                Ok(())
            }
            Command::Session => print_json(&client.session().await?),
            Command::Patient(cmd) => run_patient(PatientService::new(client), cmd).await,
            Command::Catalog { kind, id } => run_catalog(&CatalogService::new(client), kind, id).await,
            Command::Availability { categorie_id, age, facility_id } => {
                let query = AvailabilityQuery { categorie_id, age, facility_id };
                print_json(&SchedulingService::new(client).availability(query).await?)
            }
            Command::Appointment(cmd) => run_appointment(SchedulingService::new(client), cmd).await,
            Command::Capacity(CapacityCommand::Create { file }) => {
                let request: CapacityRequest = read_json(&file).await?;
                print_json(&CapacityService::new(client).create(request).await?)
            }
            Command::VerifyEmail { email, rut } => {
                let service = EmailVerificationService::new(client, config.mail)?;
                print_json(&service.verify(&email, rut.as_deref()).await?)
            }
            Command::Rut { .. } => Ok(()),
        }
    }
}

async fn run_patient(service: PatientService, cmd: PatientCommand) -> anyhow::Result<()> {
    let patient = match cmd {
        PatientCommand::Get { rut } => service.find_by_rut(&rut).await?,
        PatientCommand::ById { id } => service.find_by_id(id).await?,
        PatientCommand::Create { file } => service.create(&read_json(&file).await?).await?,
        PatientCommand::Update { rut, file } => {
            let details: PatientDetails = read_json(&file).await?;
            service.update(&rut, details).await?
        }
    };
    print_json(&patient)
}

async fn run_catalog(service: &CatalogService, kind: CatalogKind, id: Option<i64>) -> anyhow::Result<()> {
    let required = || id.with_context(|| format!("--id is required for {kind:?}"));

    match kind {
        CatalogKind::Countries => print_json(&service.countries().await?),
        CatalogKind::Regions => print_json(&service.regions().await?),
        CatalogKind::Communes => print_json(&service.communes(id).await?),
        CatalogKind::Financers => print_json(&service.financers().await?),
        CatalogKind::Occupations => print_json(&service.occupations().await?),
        CatalogKind::ConsultationSpecialties => print_json(&service.consultation_specialties().await?),
        CatalogKind::Specialties => print_json(&service.specialties().await?),
        CatalogKind::Prestations => print_json(&service.prestations(required()?).await?),
        CatalogKind::Facilities => print_json(&service.facilities().await?),
        CatalogKind::FacilitiesForPrestation => print_json(&service.facilities_for_prestation(required()?).await?),
        CatalogKind::Providers => print_json(&service.providers(required()?).await?),
        CatalogKind::Boxes => print_json(&service.boxes(required()?).await?),
    }
}

async fn run_appointment(service: SchedulingService, cmd: AppointmentCommand) -> anyhow::Result<()> {
    match cmd {
        AppointmentCommand::Search { start, end, rut, foreign_number, country_code, facility_id, professional_id } => {
            let document = match (rut, foreign_number) {
                (Some(rut), _) => Some(PatientDocument::National(rut)),
                (None, Some(number)) => Some(PatientDocument::Foreign { number, country_code }),
                (None, None) => None,
            };
            let search = AppointmentSearch { start, end, document, facility_id, professional_id };
            print_json(&service.search(&search).await?)
        }
        AppointmentCommand::Show { event_id } => print_json(&service.details(&event_id).await?),
        AppointmentCommand::Book { rut, professional_id, date, hour, facility_id, categorie_id, comment } => {
            let slot = SelectedSlot { professional_id, date, hour, facility_id, categorie_id };
            let outcome = service.book(&rut, slot, comment.as_deref()).await?;
            print_json(&outcome)?;
            if !outcome.is_success() {
                anyhow::bail!(outcome.message.unwrap_or_else(|| "Booking was not accepted".to_string()));
            }
            Ok(())
        }
    }
}

fn rut_report(value: &str) -> serde_json::Value {
    match value.parse::<Rut>() {
        Ok(rut) => json!({ "valid": true, "rut": rut.compact(), "formatted": rut.to_string() }),
        Err(e) => json!({ "valid": false, "error": e.to_string() }),
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = if path == Path::new("-") {
        let mut buf = String::new();
        tokio::io::stdin().read_to_string(&mut buf).await.context("reading stdin")?;
        buf
    } else {
        tokio::fs::read_to_string(path).await.with_context(|| format!("reading {}", path.display()))?
    };
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

#[allow(clippy::print_stdout)]
fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rut_report() {
        let report = rut_report("12.345.678-5");
        assert_eq!(report["valid"], true);
        assert_eq!(report["rut"], "12345678-5");
        assert_eq!(report["formatted"], "12.345.678-5");

        let report = rut_report("12345678-9");
        assert_eq!(report["valid"], false);
    }

    #[test]
    fn test_parse_catalog_command() {
        let cli = Cli::try_parse_from([
            "clinic-agenda",
            "--base-url",
            "http://localhost",
            "--api-key",
            "k",
            "catalog",
            "providers",
            "--id",
            "4",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::Catalog { kind: CatalogKind::Providers, id: Some(4) }));
        assert_eq!(cli.config.api.api_prefix, "/api_nestjs");
    }

    #[test]
    fn test_rut_needs_no_backend_settings() {
        let cli = Cli::try_parse_from(["clinic-agenda", "rut", "12.345.678-5"]).unwrap();
        assert!(matches!(cli.command, Command::Rut { ref value } if value == "12.345.678-5"));
    }

    #[tokio::test]
    async fn test_backend_command_reports_missing_base_url() {
        let cli = Cli::try_parse_from(["clinic-agenda", "--base-url=", "--session-dir", "unused", "logout"]).unwrap();
        let err = cli.run().await.unwrap_err();
        assert!(err.to_string().contains("CLINIC_API_BASE_URL"), "got {err}");
    }
}
