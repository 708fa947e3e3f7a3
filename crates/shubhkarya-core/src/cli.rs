use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::datekey::TimeGrouping;
use crate::session::Role;

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "shubhkarya",
    version,
    about = "Shubhkarya: puja booking console",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    /// Config file; defaults to $SHUBHKARYA_CONFIG or the user config dir.
    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Override a config key, e.g. `--set api.base_url=http://host:5000`.
    #[arg(
        long = "set",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append,
        global = true
    )]
    pub overrides: Vec<KeyVal>,

    /// Directory holding the session file.
    #[arg(long = "data", global = true)]
    pub data: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Public landing page: services, poojas and verified pandits.
    Home(HomeArgs),
    /// Booking history with status counts and a per-week/month chart.
    History(HistoryArgs),
    /// Month calendar with booked days marked.
    Calendar(CalendarArgs),
    /// Devotee dashboard summary.
    Dashboard(DashboardArgs),
    /// Book a puja.
    Book(BookArgs),
    /// Leave a review.
    Review(ReviewArgs),
    /// Pandit dashboard.
    PanditDashboard(PanditDashboardArgs),
    /// Accept or reject a booking (pandit).
    BookingStatus(BookingStatusArgs),
    /// Pandit directory (admin).
    Pandits(PanditListArgs),
    PanditVerify(IdArg),
    PanditDelete(IdArg),
    /// Register as a pandit.
    Signup(SignupArgs),
    /// Devotee directory (admin).
    Devotees(DevoteeListArgs),
    DevoteeUpdate(DevoteeUpdateArgs),
    /// Pooja catalog.
    Poojas(PoojaListArgs),
    PoojaAdd(PoojaFormArgs),
    PoojaUpdate(PoojaUpdateArgs),
    PoojaDelete(IdArg),
    /// Admin home counts.
    Overview,
    Login(LoginArgs),
    Logout,
    Whoami,
}

#[derive(Args, Debug, Clone)]
pub struct HomeArgs {
    /// Show the details of one pooja.
    #[arg(long)]
    pub pooja: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct HistoryArgs {
    /// Raw status to keep, or `all`.
    #[arg(long, default_value = "all")]
    pub status: String,

    /// Date prefix: `YYYY`, `YYYY-MM` or `YYYY-MM-DD`.
    #[arg(long, default_value = "")]
    pub date: String,

    #[arg(long, value_enum, default_value_t = TimeGrouping::Month)]
    pub group: TimeGrouping,

    /// Every booking rather than the logged-in devotee's.
    #[arg(long)]
    pub all: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CalendarArgs {
    #[arg(long, requires = "month")]
    pub year: Option<i32>,

    /// 1..=12
    #[arg(long, requires = "year", value_parser = clap::value_parser!(u32).range(1..=12))]
    pub month: Option<u32>,
}

#[derive(Args, Debug, Clone)]
pub struct DashboardArgs {
    #[arg(long, default_value = "")]
    pub search: String,

    #[arg(long = "pandit-search", default_value = "")]
    pub pandit_search: String,
}

#[derive(Args, Debug, Clone)]
pub struct BookArgs {
    #[arg(long)]
    pub pandit: Option<String>,

    #[arg(long)]
    pub service: Option<String>,

    /// YYYY-MM-DD
    #[arg(long, default_value = "")]
    pub date: String,

    /// HH:MM
    #[arg(long, default_value = "")]
    pub time: String,

    #[arg(long, default_value = "")]
    pub location: String,

    /// Items you will arrange yourself.
    #[arg(long, default_value = "")]
    pub items: String,
}

#[derive(Args, Debug, Clone)]
pub struct ReviewArgs {
    /// Defaults to the logged-in name.
    #[arg(long)]
    pub name: Option<String>,

    #[arg(long, default_value_t = 0)]
    pub rating: u8,

    #[arg(long, default_value = "")]
    pub comment: String,
}

#[derive(Args, Debug, Clone)]
pub struct PanditDashboardArgs {
    #[arg(long, default_value = "")]
    pub date: String,

    #[arg(long, default_value = "")]
    pub name: String,

    #[arg(long, default_value = "all")]
    pub status: String,
}

#[derive(Args, Debug, Clone)]
pub struct BookingStatusArgs {
    pub id: String,
    pub status: String,
}

#[derive(Args, Debug, Clone)]
pub struct IdArg {
    pub id: String,
}

#[derive(Args, Debug, Clone)]
pub struct PanditListArgs {
    #[arg(long, default_value = "")]
    pub name: String,

    #[arg(long, default_value = "")]
    pub city: String,

    #[arg(long, default_value = "")]
    pub experience: String,
}

#[derive(Args, Debug, Clone)]
pub struct SignupArgs {
    #[arg(long, default_value = "")]
    pub name: String,
    #[arg(long, default_value = "")]
    pub phone: String,
    #[arg(long, default_value = "")]
    pub email: String,
    #[arg(long, default_value = "")]
    pub password: String,
    #[arg(long = "confirm-password", default_value = "")]
    pub confirm_password: String,
    #[arg(long, default_value = "")]
    pub city: String,
    #[arg(long, default_value = "")]
    pub experience: String,
    /// Comma separated.
    #[arg(long, default_value = "")]
    pub languages: String,
    /// Comma separated.
    #[arg(long, default_value = "")]
    pub specialties: String,
    #[arg(long, default_value = "")]
    pub bio: String,
    #[arg(long = "photo-url", default_value = "")]
    pub photo_url: String,
}

#[derive(Args, Debug, Clone)]
pub struct DevoteeListArgs {
    #[arg(long, default_value = "")]
    pub name: String,

    #[arg(long, default_value = "")]
    pub city: String,
}

#[derive(Args, Debug, Clone)]
pub struct DevoteeUpdateArgs {
    pub id: String,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub city: Option<String>,
    #[arg(long)]
    pub address: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct PoojaListArgs {
    #[arg(long, default_value = "")]
    pub search: String,
}

#[derive(Args, Debug, Clone)]
pub struct PoojaFormArgs {
    #[arg(long, default_value = "")]
    pub name: String,
    #[arg(long, default_value = "")]
    pub description: String,
    #[arg(long = "image-url", default_value = "")]
    pub image_url: String,
}

#[derive(Args, Debug, Clone)]
pub struct PoojaUpdateArgs {
    pub id: String,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long = "image-url")]
    pub image_url: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct LoginArgs {
    #[arg(long = "user-id")]
    pub user_id: String,
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long, value_enum, default_value_t = Role::Devotee)]
    pub role: Role,
    #[arg(long)]
    pub token: Option<String>,
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}
