//! CLI commands

use anyhow::{Context, Result};
use clap::Subcommand;
use kuteera_core::{FileStore, KeyValueStore, decode_expiry};
use kuteera_http::KuteeraClient;
use kuteera_http::types::{CustomerRegistration, LoginResponse};
use kuteera_session::routes::{is_admin_path, is_customer_path};
use kuteera_session::{
    AdminGuard, AdminShell, AuthContext, CustomerGuard, GuardOutcome, RouteDecision, RouteRules,
    SessionEvent, SessionScheduler, SystemClock, Timers,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Settings;

#[derive(Subcommand)]
pub enum Commands {
    /// Log in with a phone number
    Login {
        /// Registered phone number
        phone: String,

        /// Admin password, required for admin accounts
        #[arg(long, env = "KUTEERA_ADMIN_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Show the identity behind the stored session
    Whoami,

    /// Exchange the refresh token for a new access token
    Refresh,

    /// Log out and clear the stored session
    Logout,

    /// Run the route rules and guards for a path
    Check {
        /// Path to visit, e.g. /admin/order-history
        path: String,

        /// Cookie header to forward for admin paths
        #[arg(long)]
        cookie: Option<String>,
    },

    /// Keep an admin session open, warning before it expires
    Watch {
        /// Refresh automatically when the expiry warning fires
        #[arg(long)]
        stay_signed_in: bool,
    },

    /// List cities open for registration
    Cities,

    /// Look up the city registered for a phone number
    City {
        /// Phone number
        phone: String,
    },

    /// Register a customer from a JSON file
    Register {
        /// Registration JSON file
        file: PathBuf,
    },

    /// Print the resolved configuration
    Config,
}

/// Everything a command needs, built from settings
struct App {
    settings: Settings,
    client: KuteeraClient,
    context: AuthContext,
}

impl App {
    fn open(settings: Settings) -> Result<Self> {
        let path = settings.session_path();
        let store: Arc<dyn KeyValueStore> = Arc::new(
            FileStore::open(&path)
                .with_context(|| format!("failed to open session file {}", path.display()))?,
        );
        let client = KuteeraClient::from_config(&settings.config.api, store.clone())?;
        let context = AuthContext::new(store);
        Ok(Self {
            settings,
            client,
            context,
        })
    }

    fn scheduler(&self) -> (SessionScheduler, tokio::sync::mpsc::UnboundedReceiver<SessionEvent>) {
        SessionScheduler::new(
            self.context.clone(),
            self.client.clone(),
            Timers::new(),
            Arc::new(SystemClock),
            self.settings.config.session.warning_lead(),
        )
    }
}

impl Commands {
    pub const fn is_long_running(&self) -> bool {
        matches!(self, Self::Watch { .. })
    }

    pub async fn execute(self, settings: Settings) -> Result<()> {
        if matches!(self, Self::Config) {
            println!("{}", serde_json::to_string_pretty(&settings.config)?);
            return Ok(());
        }

        let app = App::open(settings)?;
        match self {
            Self::Login { phone, password } => login(&app, phone, password).await,
            Self::Whoami => whoami(&app).await,
            Self::Refresh => refresh(&app).await,
            Self::Logout => logout(&app).await,
            Self::Check { path, cookie } => check(&app, &path, cookie.as_deref()).await,
            Self::Watch { stay_signed_in } => watch(&app, stay_signed_in).await,
            Self::Cities => {
                for city in app.client.available_cities().await? {
                    println!("{city}");
                }
                Ok(())
            }
            Self::City { phone } => {
                match app.client.city_by_phone(&phone).await? {
                    Some(city) => println!("{city}"),
                    None => println!("No customer registered for {phone}"),
                }
                Ok(())
            }
            Self::Register { file } => register(&app, file).await,
            Self::Config => Ok(()),
        }
    }
}

async fn login(app: &App, phone: String, password: Option<String>) -> Result<()> {
    let response = app.client.login(phone, password).await?;

    if let Some(hint) = admin_hint(&response) {
        println!("{hint}");
    }

    app.context.set_admin(response.is_admin);
    app.context.set_user(response.user.clone());
    let name = response
        .user
        .as_ref()
        .map_or("unknown user", |user| user.display_name());
    println!("{} ({name})", response.message);
    Ok(())
}

/// Admin accounts that log in without a password get a customer session
fn admin_hint(response: &LoginResponse) -> Option<&'static str> {
    (response.is_admin_account && !response.is_admin)
        .then_some("Signed in as a customer; pass --password for admin access")
}

async fn whoami(app: &App) -> Result<()> {
    let identity = app.client.me().await?;
    app.context.set_admin(identity.is_admin());
    app.context.set_user(Some(identity.clone()));
    println!("{}", serde_json::to_string_pretty(&identity)?);
    Ok(())
}

async fn refresh(app: &App) -> Result<()> {
    let token = app.client.refresh_access_token().await?;
    match decode_expiry(&token) {
        Some(expires_at) => println!("Session renewed until {expires_at}"),
        None => println!("Session renewed"),
    }
    Ok(())
}

async fn logout(app: &App) -> Result<()> {
    let (scheduler, _events) = app.scheduler();
    scheduler.log_out().await;
    println!("Logged out");
    Ok(())
}

async fn check(app: &App, path: &str, cookie: Option<&str>) -> Result<()> {
    let has_token = app.context.access_token().is_some();
    let rules = RouteRules::new(app.client.clone());

    if let RouteDecision::Redirect(target) = rules.evaluate(path, cookie, has_token).await {
        println!("redirect {target}");
        return Ok(());
    }

    let cancel = CancellationToken::new();
    let outcome = if is_admin_path(path) {
        AdminGuard::new(app.context.clone(), app.client.clone())
            .check(path, &cancel)
            .await
    } else if is_customer_path(path) {
        CustomerGuard::new(app.context.clone(), app.client.clone())
            .with_policy(app.settings.config.session.customer_identity)
            .check(&cancel)
            .await
    } else {
        GuardOutcome::Render
    };

    match outcome {
        GuardOutcome::Render => println!("render {path}"),
        GuardOutcome::Redirect(target) => println!("redirect {target}"),
        GuardOutcome::Cancelled => println!("cancelled"),
    }
    Ok(())
}

async fn watch(app: &App, stay_signed_in: bool) -> Result<()> {
    let (scheduler, mut events) = app.scheduler();
    let guard = AdminGuard::new(app.context.clone(), app.client.clone());
    let shell = AdminShell::new(guard, scheduler.clone());
    let cancel = CancellationToken::new();

    match shell.mount("/admin", &cancel).await {
        GuardOutcome::Render => info!(state = ?scheduler.state(), "Watching admin session"),
        GuardOutcome::Redirect(target) => {
            println!("redirect {target}");
            return Ok(());
        }
        GuardOutcome::Cancelled => return Ok(()),
    }

    loop {
        let event = tokio::select! {
            event = events.recv() => event,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                shell.unmount();
                return Ok(());
            }
        };
        let Some(event) = event else {
            return Ok(());
        };

        match event {
            SessionEvent::WarningShown { expires_at } => {
                println!("Session expires at {expires_at}");
                if stay_signed_in && let Err(err) = scheduler.stay_signed_in().await {
                    warn!("Could not stay signed in: {err}");
                }
            }
            SessionEvent::Refreshed { expires_at } => match expires_at {
                Some(expires_at) => println!("Session renewed until {expires_at}"),
                None => println!("Session renewed"),
            },
            SessionEvent::Notification(message) => println!("{message}"),
            SessionEvent::LoggedOut { reason } => println!("Logged out ({reason:?})"),
            SessionEvent::Navigate(target) => {
                println!("redirect {target}");
                shell.unmount();
                return Ok(());
            }
        }
    }
}

async fn register(app: &App, file: PathBuf) -> Result<()> {
    let raw = std::fs::read_to_string(&file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let registration: CustomerRegistration = serde_json::from_str(&raw)?;
    let response = app.client.register(&registration).await?;
    match response.customer_id {
        Some(id) => println!("Registered customer {id}"),
        None => println!("Registration accepted"),
    }
    Ok(())
}
