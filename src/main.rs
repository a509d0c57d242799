//! `solar-detect` command-line client

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::{Duration, Local, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, warn};

use solar_detect_lib::api::types::UserType;
use solar_detect_lib::auth::{ensure_user_type, KeyringStore, SessionManager};
use solar_detect_lib::config::load_env;
use solar_detect_lib::detection::detect_mask;
use solar_detect_lib::quota::{precheck, QuotaCheck, QuotaPolicy};
use solar_detect_lib::validation::{
    self, Coordinates, LoginForm, ProfileUpdateForm, RegistrationForm,
};
use solar_detect_lib::{
    init_tracing, Config, MaskDetector, MaskVerdict, Prediction, Result, SolarDetectClient,
    SolarDetectError,
};

/// Solar panel detection client
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log filter used when RUST_LOG is unset (e.g. "debug")
    #[arg(long, env = "SOLAR_DETECT_LOG", global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum FieldKind {
    Cpf,
    Cnpj,
    Phone,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum AccountKind {
    Student,
    Company,
}

impl From<AccountKind> for UserType {
    fn from(kind: AccountKind) -> Self {
        match kind {
            AccountKind::Student => UserType::Student,
            AccountKind::Company => UserType::Company,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check a CPF, CNPJ or phone number
    Validate { kind: FieldKind, value: String },

    /// Print a CPF, CNPJ or phone number with canonical punctuation
    Format { kind: FieldKind, value: String },

    /// Log in and store the session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "SOLAR_DETECT_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long, value_enum)]
        user_type: AccountKind,
    },

    /// Create an account and store the session
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "SOLAR_DETECT_PASSWORD", hide_env_values = true)]
        password: String,
        /// CPF for students, CNPJ for companies
        #[arg(long)]
        document: String,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        address: Option<String>,
        #[arg(long, value_enum)]
        user_type: AccountKind,
    },

    /// Forget the stored session
    Logout,

    /// Show the profile and request quota
    Profile,

    /// Change profile fields
    UpdateProfile {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        address: Option<String>,
    },

    /// Delete the account
    DeleteAccount {
        #[arg(long, env = "SOLAR_DETECT_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Show when the stored token expires
    TokenStatus,

    /// Request a detection for a coordinate
    Predict {
        /// Latitude, -90 to 90 (a decimal comma is accepted)
        #[arg(long, allow_hyphen_values = true)]
        lat: String,
        /// Longitude, -180 to 180
        #[arg(long, allow_hyphen_values = true)]
        lon: String,
        /// Save the returned image here
        #[arg(long)]
        out: Option<PathBuf>,
        /// Use the POST endpoint instead of GET
        #[arg(long)]
        post: bool,
        /// Do not fetch the profile to check the quota first
        #[arg(long)]
        skip_quota_check: bool,
    },

    /// Run the mask detector on a local image file
    Scan { file: PathBuf },
}

#[tokio::main]
async fn main() -> ExitCode {
    load_env();
    let args = Args::parse();
    init_tracing(
        args.log_level
            .as_deref()
            .unwrap_or("warn,solar_detect_lib=info"),
    );

    match run(args.command).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> Result<ExitCode> {
    let config = Config::from_env()?;
    let sessions = SessionManager::new(KeyringStore::new());

    match command {
        Command::Validate { kind, value } => {
            let valid = is_valid_field(kind, &value);
            println!("{}", if valid { "valid" } else { "invalid" });
            if !valid {
                return Ok(ExitCode::FAILURE);
            }
        }

        Command::Format { kind, value } => {
            let formatted = match kind {
                FieldKind::Cpf => validation::format_cpf(&value),
                FieldKind::Cnpj => validation::format_cnpj(&value),
                FieldKind::Phone => validation::format_phone(&value),
            };
            println!("{}", formatted);
        }

        Command::Login {
            email,
            password,
            user_type,
        } => {
            let user_type = UserType::from(user_type);
            let request = LoginForm {
                email,
                password,
                user_type,
            }
            .into_request()?;

            let client = SolarDetectClient::new(config)?;
            let response = client.login(&request).await?;
            ensure_user_type(&response, user_type)?;

            let session = sessions.set_auth(&response, Utc::now())?;
            println!(
                "Logged in as {} ({}), session valid until {}",
                response.email.as_deref().unwrap_or(&request.email),
                response.user_type,
                session.expires_at.with_timezone(&Local)
            );
        }

        Command::Register {
            name,
            email,
            password,
            document,
            phone,
            address,
            user_type,
        } => {
            let request = RegistrationForm {
                name,
                email,
                password,
                document_number: document,
                phone,
                address,
                user_type: user_type.into(),
            }
            .into_request()?;

            let client = SolarDetectClient::new(config)?;
            let response = client.register(&request).await?;
            sessions.set_auth(&response, Utc::now())?;
            println!("Account created for {}", request.email);
        }

        Command::Logout => {
            sessions.clear_auth()?;
            println!("Logged out");
        }

        Command::Profile => {
            let client = authenticated_client(config, &sessions)?;
            let profile = with_session(&sessions, client.profile().await)?;
            let quota = &profile.quota;

            println!("{} <{}>", profile.name, profile.email);
            println!("Account:  {}", profile.user_type);
            println!(
                "Document: {}",
                validation::format_document(
                    validation::DocumentKind::for_user_type(profile.user_type),
                    &profile.document_number
                )
            );
            if let Some(phone) = &profile.phone {
                println!("Phone:    {}", validation::format_phone(phone));
            }
            if let Some(address) = &profile.address {
                println!("Address:  {}", address);
            }
            println!(
                "Quota:    {}/{} requests ({:.0}%){}, resets in {} min (last reset {})",
                quota.remaining_requests,
                quota.total_quota,
                quota.percentage_remaining(),
                if quota.is_low() { " LOW" } else { "" },
                quota.minutes_until_reset,
                quota.last_reset_time.format("%d/%m/%Y %H:%M")
            );
        }

        Command::UpdateProfile {
            name,
            email,
            phone,
            address,
        } => {
            let form = ProfileUpdateForm {
                name,
                email,
                phone,
                address,
            };
            if form.is_empty() {
                return Err(SolarDetectError::InvalidInput(
                    "nothing to update".to_string(),
                ));
            }
            let request = form.into_request()?;

            let client = authenticated_client(config, &sessions)?;
            let profile = with_session(&sessions, client.update_profile(&request).await)?;
            println!("Profile updated: {} <{}>", profile.name, profile.email);
        }

        Command::DeleteAccount { password } => {
            let client = authenticated_client(config, &sessions)?;
            let message = with_session(&sessions, client.delete_account(&password).await)?;
            sessions.clear_auth()?;
            println!("{}", message);
        }

        Command::TokenStatus => {
            let now = Utc::now();
            match sessions.current(now)? {
                Some(session) => {
                    let window = Duration::seconds(config.refresh_window_secs);
                    let refresh = sessions.needs_refresh(now, window)?;
                    println!(
                        "Session for {} valid until {}{}",
                        session
                            .user_type
                            .map(|t| t.to_string())
                            .unwrap_or_else(|| "unknown account".to_string()),
                        session.expires_at.with_timezone(&Local),
                        if refresh { " (expiring soon, log in again)" } else { "" }
                    );
                    if let Some(subject) = sessions.claims()?.as_ref().and_then(|c| c.subject()) {
                        println!("Subject: {}", subject);
                    }
                }
                None => println!("Not logged in"),
            }
        }

        Command::Predict {
            lat,
            lon,
            out,
            post,
            skip_quota_check,
        } => {
            let coords = Coordinates::parse(&lat, &lon)?;
            let mask = config.mask;
            let window = Duration::seconds(config.refresh_window_secs);
            if sessions.needs_refresh(Utc::now(), window)? {
                warn!("Session token is close to expiring; log in again soon");
            }
            let client = authenticated_client(config, &sessions)?;

            if !skip_quota_check {
                let profile = with_session(&sessions, client.profile().await)?;
                let policy = QuotaPolicy::for_user_type(profile.user_type);
                if let QuotaCheck::Denied {
                    minutes_until_reset,
                } = precheck(&profile.quota, &policy, Local::now().naive_local())
                {
                    return Err(SolarDetectError::QuotaExceeded(format!(
                        "no requests left, quota resets in {} min",
                        minutes_until_reset
                    )));
                }
            }

            let mut detector = MaskDetector::new(mask);
            let analysed = if post {
                client.detect_at_post(&coords, &mut detector).await
            } else {
                client.detect_at(&coords, &mut detector).await
            };
            let (prediction, verdict) = with_session(&sessions, analysed)?;

            match &prediction {
                Prediction::Image { bytes, .. } => {
                    println!("Received image ({} bytes)", bytes.len());
                    if let Some(path) = out {
                        let path = with_extension(path, prediction.file_extension());
                        tokio::fs::write(&path, bytes).await?;
                        println!("Saved to {}", path.display());
                    }
                }
                Prediction::ImageUrl(url) => println!("Image available at {}", url),
            }
            println!("{}", describe(verdict));
        }

        Command::Scan { file } => {
            let bytes = tokio::fs::read(&file).await?;
            let verdict = detect_mask(&bytes, &config.mask);
            debug!(file = %file.display(), %verdict, "Scanned local image");
            println!("{}", describe(verdict));
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn is_valid_field(kind: FieldKind, value: &str) -> bool {
    match kind {
        FieldKind::Cpf => validation::is_valid_cpf(value),
        FieldKind::Cnpj => validation::is_valid_cnpj(value),
        FieldKind::Phone => validation::is_valid_phone(value),
    }
}

/// Client carrying the stored token, or `NotAuthenticated`.
fn authenticated_client(
    config: Config,
    sessions: &SessionManager<KeyringStore>,
) -> Result<SolarDetectClient> {
    let token = sessions.require_token(Utc::now())?;
    Ok(SolarDetectClient::new(config)?.with_token(token))
}

/// Drop the stored session when the server rejects the token.
fn with_session<T>(sessions: &SessionManager<KeyringStore>, result: Result<T>) -> Result<T> {
    if let Err(SolarDetectError::Unauthorized) = &result {
        if let Err(e) = sessions.clear_auth() {
            warn!(error = %e, "Failed to clear rejected session");
        }
    }
    result
}

fn with_extension(path: PathBuf, ext: Option<&str>) -> PathBuf {
    match (path.extension(), ext) {
        (None, Some(ext)) => path.with_extension(ext),
        _ => path,
    }
}

fn describe(verdict: MaskVerdict) -> &'static str {
    match verdict {
        MaskVerdict::Present => "Detection overlay present: solar panels found",
        MaskVerdict::Absent => "No detection overlay: no solar panels found",
        MaskVerdict::Unknown => "Could not analyse the image; no conclusion about solar panels",
    }
}
