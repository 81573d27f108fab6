mod config;
mod session;

use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use clap::{Parser, Subcommand};
use config::{load_settings, Settings, DEFAULT_SETTINGS_FILE};
use form_core::{FormController, SubmitAttempt};
use notifier::{LogNotifier, Notifier, TelegramNotifier};
use shared::{FormProfile, ProfileKind};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Enrollment form for the learning center")]
struct Cli {
    #[arg(long, default_value = DEFAULT_SETTINGS_FILE)]
    config: PathBuf,
    /// Overrides the profile from the settings file and environment.
    #[arg(long)]
    profile: Option<ProfileKind>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fill the form line by line (default).
    Interactive,
    /// Validate and submit one registration, then exit.
    Submit {
        #[arg(long)]
        name: String,
        #[arg(long)]
        city: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        subject: Option<String>,
        /// Print the final form state as JSON.
        #[arg(long)]
        json: bool,
    },
}

fn build_controller(settings: &Settings) -> Arc<FormController> {
    let profile = FormProfile::for_kind(settings.profile);
    let notifier: Arc<dyn Notifier> = if profile.notify {
        Arc::new(TelegramNotifier::new(settings.telegram_config()))
    } else {
        Arc::new(LogNotifier)
    };
    FormController::new(profile, notifier, settings.controller_options())
}

async fn submit_once(
    controller: &FormController,
    name: String,
    city: &str,
    phone: &str,
    subject: Option<&str>,
    json: bool,
) -> Result<bool> {
    controller.set_name(name).await;
    controller.select_city(city).await?;
    controller.input_phone(phone).await;
    if let Some(subject) = subject {
        controller.select_subject(subject).await?;
    }

    let attempt = controller.submit().await;
    let view = controller.snapshot().await;
    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    }

    let delivered = match attempt {
        SubmitAttempt::Invalid(errors) => {
            if !json {
                for (field, message) in errors.iter() {
                    println!("{field}: {message}");
                }
            }
            false
        }
        SubmitAttempt::Busy => false,
        SubmitAttempt::Submitted(outcome) => {
            if !json {
                println!("{}", outcome.headline());
                if let Some(contact) = &view.fallback_contact {
                    println!("Telefon: {contact}");
                }
            }
            outcome.is_delivered()
        }
    };
    Ok(delivered)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut settings = load_settings(&cli.config);
    if let Some(profile) = cli.profile {
        settings.profile = profile;
    }
    info!(profile = %settings.profile, "starting enrollment form");

    let controller = build_controller(&settings);

    match cli.command.unwrap_or(Command::Interactive) {
        Command::Interactive => {
            session::run(Arc::clone(&controller), settings.fallback_contact.clone()).await?;
        }
        Command::Submit {
            name,
            city,
            phone,
            subject,
            json,
        } => {
            let result =
                submit_once(&controller, name, &city, &phone, subject.as_deref(), json).await;
            controller.shutdown().await;
            if !result? {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
