use std::io::{self, Write};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, anyhow, bail};
use chrono::{NaiveDate, Utc};
use shubhkarya_shared::DevoteeUpdate;
use tracing::{debug, info, instrument};

use crate::aggregate::StatusFilter;
use crate::api::{BookingApi, BookingScope, HttpApiClient};
use crate::calendar::CalendarMonth;
use crate::cli::{
    BookArgs, BookingStatusArgs, CalendarArgs, Command, DashboardArgs, DevoteeListArgs,
    DevoteeUpdateArgs, HistoryArgs, HomeArgs, IdArg, LoginArgs, PanditDashboardArgs,
    PanditListArgs, PoojaFormArgs, PoojaListArgs, PoojaUpdateArgs, ReviewArgs, SignupArgs,
};
use crate::config::Config;
use crate::render::Renderer;
use crate::session::{Role, Session, SessionStore};
use crate::views::FlashMessage;
use crate::views::devotee_dashboard::DevoteeDashboard;
use crate::views::directory::{DevoteeDirectory, PanditDirectory};
use crate::views::history::BookingHistoryView;
use crate::views::home::HomePage;
use crate::views::overview::AdminOverview;
use crate::views::pandit_dashboard::PanditDashboard;
use crate::views::poojas::{CatalogMessage, PoojaCatalog};
use crate::views::signup::{PanditSignup, SIGNUP_DONE, SignupForm};

pub struct AppContext {
    pub cfg: Config,
    pub sessions: SessionStore,
    pub renderer: Renderer,
}

impl AppContext {
    fn api(&self, session: Option<&Session>) -> anyhow::Result<Arc<dyn BookingApi>> {
        let client = HttpApiClient::from_config(&self.cfg)
            .context("failed to build API client")?
            .with_session(session);
        Ok(Arc::new(client))
    }

    fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.cfg.timezone()).date_naive()
    }

    fn devotee_dashboard(&self, session: Option<Session>) -> anyhow::Result<DevoteeDashboard> {
        let api = self.api(session.as_ref())?;
        Ok(DevoteeDashboard::new(
            api,
            session,
            self.cfg.timezone(),
            self.today(),
            self.cfg.booking_clear_delay(),
            self.cfg.review_clear_delay(),
        ))
    }
}

/// Runs one subcommand to completion on a single-threaded runtime.
#[instrument(skip_all)]
pub fn dispatch(ctx: &AppContext, command: Command) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    debug!(?command, "dispatching command");
    runtime.block_on(run_command(ctx, command))
}

async fn run_command(ctx: &AppContext, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Home(args) => cmd_home(ctx, args).await,
        Command::History(args) => cmd_history(ctx, args).await,
        Command::Calendar(args) => cmd_calendar(ctx, args).await,
        Command::Dashboard(args) => cmd_dashboard(ctx, args).await,
        Command::Book(args) => cmd_book(ctx, args).await,
        Command::Review(args) => cmd_review(ctx, args).await,
        Command::PanditDashboard(args) => cmd_pandit_dashboard(ctx, args).await,
        Command::BookingStatus(args) => cmd_booking_status(ctx, args).await,
        Command::Pandits(args) => cmd_pandits(ctx, args).await,
        Command::PanditVerify(args) => cmd_pandit_verify(ctx, args).await,
        Command::PanditDelete(args) => cmd_pandit_delete(ctx, args).await,
        Command::Signup(args) => cmd_signup(ctx, args).await,
        Command::Devotees(args) => cmd_devotees(ctx, args).await,
        Command::DevoteeUpdate(args) => cmd_devotee_update(ctx, args).await,
        Command::Poojas(args) => cmd_poojas(ctx, args).await,
        Command::PoojaAdd(args) => cmd_pooja_add(ctx, args).await,
        Command::PoojaUpdate(args) => cmd_pooja_update(ctx, args).await,
        Command::PoojaDelete(args) => cmd_pooja_delete(ctx, args).await,
        Command::Overview => cmd_overview(ctx).await,
        Command::Login(args) => cmd_login(ctx, args),
        Command::Logout => cmd_logout(ctx),
        Command::Whoami => cmd_whoami(ctx),
    }
}

/// Scope follows the role: devotees see their own bookings, pandits the ones
/// made with them, admins everything.
fn history_scope(session: &Session) -> BookingScope {
    match session.role {
        Role::Devotee => BookingScope::Devotee(session.user_id.clone()),
        Role::Pandit => BookingScope::Pandit(session.user_id.clone()),
        Role::Admin => BookingScope::All,
    }
}

/// Public page; works without a session.
async fn cmd_home(ctx: &AppContext, args: HomeArgs) -> anyhow::Result<()> {
    let mut view = HomePage::new(ctx.api(None)?, ctx.cfg.api.base_url.clone());
    view.load().await;

    let mut out = io::stdout().lock();
    if let Some(id) = args.pooja.as_deref() {
        let Some(pooja) = view.select_pooja(id).cloned() else {
            bail!("no pooja with id {id}");
        };
        ctx.renderer.key_values(
            &mut out,
            &[
                ("Pooja", pooja.name.clone().unwrap_or_default()),
                ("Description", pooja.description.clone().unwrap_or_default()),
                ("Image", view.pooja_image(&pooja)),
            ],
        )?;
        return Ok(());
    }

    writeln!(out, "Our services")?;
    ctx.renderer.service_table(&mut out, view.services())?;
    writeln!(out)?;
    writeln!(out, "Pooja provided")?;
    let poojas: Vec<_> = view.poojas().iter().collect();
    ctx.renderer.pooja_table(&mut out, &poojas)?;
    writeln!(out)?;
    writeln!(out, "Our verified pandits")?;
    let pandits: Vec<_> = view.featured_pandits().iter().collect();
    ctx.renderer
        .pandit_table(&mut out, &pandits, |p| view.pandit_photo(p))?;
    Ok(())
}

async fn cmd_history(ctx: &AppContext, args: HistoryArgs) -> anyhow::Result<()> {
    let session = ctx.sessions.load()?;
    let scope = match (&session, args.all) {
        (_, true) => BookingScope::All,
        (Some(session), false) => history_scope(session),
        (None, false) => bail!("not logged in; run `shubhkarya login` first or pass --all"),
    };

    let mut view = BookingHistoryView::new(ctx.api(session.as_ref())?, scope, ctx.cfg.timezone());
    view.set_status_filter(&args.status);
    view.set_date_filter(&args.date);
    view.set_grouping(args.group);
    view.load().await;

    let summary = view.summary();
    let mut out = io::stdout().lock();
    ctx.renderer.key_values(
        &mut out,
        &[
            ("Total bookings", summary.total.to_string()),
            ("Matching", summary.filtered.len().to_string()),
            ("Status filter", view.query().status.as_str().to_string()),
        ],
    )?;
    writeln!(out)?;
    ctx.renderer.status_counts(&mut out, &summary.status_counts)?;
    writeln!(out)?;
    ctx.renderer
        .bar_chart(&mut out, &view.chart_title(), &summary.series())?;
    writeln!(out)?;
    ctx.renderer.booking_table(&mut out, &summary.filtered)?;
    Ok(())
}

async fn cmd_calendar(ctx: &AppContext, args: CalendarArgs) -> anyhow::Result<()> {
    let session = ctx.sessions.require()?;
    let mut view = ctx.devotee_dashboard(Some(session))?;
    view.load().await;
    if let (Some(year), Some(month)) = (args.year, args.month) {
        view.show_month(CalendarMonth::new(year, month as i32 - 1));
    }

    let mut out = io::stdout().lock();
    ctx.renderer
        .calendar(&mut out, &view.calendar(), &view.booked_days(), Some(ctx.today()))?;
    Ok(())
}

async fn cmd_dashboard(ctx: &AppContext, args: DashboardArgs) -> anyhow::Result<()> {
    let session = ctx.sessions.require()?;
    let mut view = ctx.devotee_dashboard(Some(session.clone()))?;
    view.load().await;
    view.booking_search = args.search;
    view.pandit_search = args.pandit_search;

    let stats = view.stats(ctx.today());
    let upcoming = stats
        .upcoming
        .map(|b| {
            format!(
                "{} with {} on {}",
                b.service_name(),
                b.pandit_name(),
                b.resolved_date().unwrap_or("-")
            )
        })
        .unwrap_or_else(|| "none".to_string());

    let mut out = io::stdout().lock();
    writeln!(out, "Namaste, {}", session.name)?;
    ctx.renderer.key_values(
        &mut out,
        &[
            ("Total", stats.total.to_string()),
            ("Pending", stats.pending.to_string()),
            ("Accepted", stats.accepted.to_string()),
            ("Rejected", stats.rejected.to_string()),
            ("Upcoming", upcoming),
        ],
    )?;
    writeln!(out)?;
    ctx.renderer
        .booking_table(&mut out, &view.filtered_bookings())?;
    writeln!(out)?;
    let base = ctx.cfg.api.base_url.clone();
    ctx.renderer.pandit_table(&mut out, &view.filtered_pandits(), |p| {
        crate::views::directory::photo_url(p, &base)
    })?;
    Ok(())
}

fn print_flash(ctx: &AppContext, message: Option<&FlashMessage>) -> anyhow::Result<()> {
    let mut out = io::stdout().lock();
    match message {
        Some(message) if message.is_error() => Err(anyhow!(message.text.clone())),
        Some(message) => ctx.renderer.flash(&mut out, message),
        None => Ok(()),
    }
}

async fn cmd_book(ctx: &AppContext, args: BookArgs) -> anyhow::Result<()> {
    let session = ctx.sessions.load()?;
    let mut view = ctx.devotee_dashboard(session)?;
    if let Some(pandit) = args.pandit.as_deref() {
        view.select_pandit(pandit);
    }
    if let Some(service) = args.service.as_deref() {
        view.select_service(service);
    }
    view.booking_form.puja_date = args.date;
    view.booking_form.puja_time = args.time;
    view.booking_form.location = args.location;
    view.booking_form.saman_list = args.items;

    let now = Instant::now();
    view.submit_booking(now).await;
    print_flash(ctx, view.booking_flash().current(now))
}

async fn cmd_review(ctx: &AppContext, args: ReviewArgs) -> anyhow::Result<()> {
    let session = ctx.sessions.load()?;
    let default_name = session.as_ref().map(|s| s.name.clone()).unwrap_or_default();
    let mut view = ctx.devotee_dashboard(session)?;
    view.review_form.name = args.name.unwrap_or(default_name);
    view.review_form.rating = args.rating;
    view.review_form.comment = args.comment;

    let now = Instant::now();
    view.submit_review(now).await;
    print_flash(ctx, view.review_flash().current(now))
}

fn pandit_session(ctx: &AppContext) -> anyhow::Result<Session> {
    let session = ctx.sessions.require()?;
    if session.role != Role::Pandit {
        bail!("logged in as {:?}; log in with --role pandit", session.role);
    }
    Ok(session)
}

async fn cmd_pandit_dashboard(ctx: &AppContext, args: PanditDashboardArgs) -> anyhow::Result<()> {
    let session = pandit_session(ctx)?;
    let name = session.name.clone();
    let mut view = PanditDashboard::new(ctx.api(Some(&session))?, session, ctx.cfg.timezone());
    view.load().await;
    view.filters.date = args.date;
    view.filters.devotee_name = args.name;
    view.filters.status = StatusFilter::parse(&args.status);

    let stats = view.stats();
    let mut out = io::stdout().lock();
    writeln!(out, "Pandit {name}")?;
    ctx.renderer.key_values(
        &mut out,
        &[
            ("Bookings", stats.total.to_string()),
            ("Accepted", stats.accepted.to_string()),
            ("Pending", stats.pending.to_string()),
            ("Rejected", stats.rejected.to_string()),
            ("Devotees", stats.unique_devotees.to_string()),
            ("Earnings", format!("Rs {}", stats.earnings)),
        ],
    )?;

    writeln!(out, "\nTop services")?;
    for service in view.top_services() {
        writeln!(out, "  {} ({})", service.name, service.count)?;
    }

    writeln!(out, "\nUpcoming")?;
    ctx.renderer
        .booking_table(&mut out, &view.upcoming(ctx.today()))?;

    writeln!(out, "\nRecent")?;
    ctx.renderer.booking_table(&mut out, &view.recent())?;

    writeln!(out, "\nDevotees")?;
    for devotee in view.devotees() {
        writeln!(
            out,
            "  {}  {}",
            devotee.name,
            devotee.phone.as_deref().unwrap_or("-")
        )?;
    }

    writeln!(out, "\nBookings")?;
    ctx.renderer.booking_table(&mut out, &view.filtered())?;
    Ok(())
}

async fn cmd_booking_status(ctx: &AppContext, args: BookingStatusArgs) -> anyhow::Result<()> {
    let session = pandit_session(ctx)?;
    let mut view = PanditDashboard::new(ctx.api(Some(&session))?, session, ctx.cfg.timezone());
    view.load().await;
    view.update_status(&args.id, &args.status)
        .await
        .with_context(|| format!("failed to update booking {}", args.id))?;

    let mut out = io::stdout().lock();
    if let Some(record) = view.bookings().iter().find(|b| b.id == args.id) {
        ctx.renderer.booking_table(&mut out, &[record])?;
    } else {
        writeln!(out, "booking {} set to {}", args.id, args.status)?;
    }
    Ok(())
}

async fn cmd_pandits(ctx: &AppContext, args: PanditListArgs) -> anyhow::Result<()> {
    let session = ctx.sessions.load()?;
    let mut view = PanditDirectory::new(ctx.api(session.as_ref())?, ctx.cfg.api.base_url.clone());
    view.load().await;
    view.filters.name = args.name;
    view.filters.city = args.city;
    view.filters.experience = args.experience;

    let stats = view.stats();
    let mut out = io::stdout().lock();
    ctx.renderer.key_values(
        &mut out,
        &[
            ("Pandits", stats.total.to_string()),
            ("Verified", stats.verified.to_string()),
            ("Pending", stats.pending.to_string()),
        ],
    )?;
    writeln!(out)?;
    ctx.renderer
        .pandit_table(&mut out, &view.filtered(), |p| view.photo_url(p))?;
    Ok(())
}

async fn cmd_pandit_verify(ctx: &AppContext, args: IdArg) -> anyhow::Result<()> {
    let session = ctx.sessions.load()?;
    let mut view = PanditDirectory::new(ctx.api(session.as_ref())?, ctx.cfg.api.base_url.clone());
    view.verify(&args.id)
        .await
        .with_context(|| format!("failed to verify pandit {}", args.id))?;
    info!(pandit = %args.id, "verified");
    println!("pandit {} verified", args.id);
    Ok(())
}

async fn cmd_pandit_delete(ctx: &AppContext, args: IdArg) -> anyhow::Result<()> {
    let session = ctx.sessions.load()?;
    let mut view = PanditDirectory::new(ctx.api(session.as_ref())?, ctx.cfg.api.base_url.clone());
    view.delete(&args.id)
        .await
        .with_context(|| format!("failed to delete pandit {}", args.id))?;
    println!("pandit {} deleted; {} remaining", args.id, view.pandits().len());
    Ok(())
}

async fn cmd_signup(ctx: &AppContext, args: SignupArgs) -> anyhow::Result<()> {
    let mut view = PanditSignup::new(ctx.api(None)?)?;
    view.form = SignupForm {
        name: args.name,
        phone: args.phone,
        email: args.email,
        password: args.password,
        confirm_password: args.confirm_password,
        city: args.city,
        experience_years: args.experience,
        languages: args.languages,
        specialties: args.specialties,
        bio: args.bio,
        profile_photo_url: args.photo_url,
    };
    view.submit()
        .await
        .with_context(|| format!("signup failed at step {}", view.step().number()))?;
    println!("{SIGNUP_DONE}");
    Ok(())
}

async fn cmd_devotees(ctx: &AppContext, args: DevoteeListArgs) -> anyhow::Result<()> {
    let session = ctx.sessions.load()?;
    let mut view = DevoteeDirectory::new(ctx.api(session.as_ref())?);
    view.load().await;
    view.filters.name = args.name;
    view.filters.city = args.city;

    let mut out = io::stdout().lock();
    writeln!(out, "{} devotees", view.devotees().len())?;
    ctx.renderer.devotee_table(&mut out, &view.filtered())?;
    Ok(())
}

async fn cmd_devotee_update(ctx: &AppContext, args: DevoteeUpdateArgs) -> anyhow::Result<()> {
    let patch = DevoteeUpdate {
        phone: args.phone,
        city: args.city,
        address: args.address,
    };
    if patch.is_empty() {
        bail!("nothing to update; pass --phone, --city or --address");
    }

    let session = ctx.sessions.load()?;
    let mut view = DevoteeDirectory::new(ctx.api(session.as_ref())?);
    view.update(&args.id, &patch)
        .await
        .with_context(|| format!("failed to update devotee {}", args.id))?;

    let mut out = io::stdout().lock();
    let updated: Vec<_> = view.devotees().iter().filter(|d| d.id == args.id).collect();
    ctx.renderer.devotee_table(&mut out, &updated)?;
    Ok(())
}

async fn cmd_poojas(ctx: &AppContext, args: PoojaListArgs) -> anyhow::Result<()> {
    let session = ctx.sessions.load()?;
    let mut view = PoojaCatalog::new(ctx.api(session.as_ref())?);
    view.load().await;
    view.search = args.search;

    let mut out = io::stdout().lock();
    ctx.renderer.pooja_table(&mut out, &view.filtered())?;
    Ok(())
}

fn catalog_outcome(view: &PoojaCatalog) -> anyhow::Result<()> {
    match view.message() {
        Some(CatalogMessage::Success(text)) => {
            println!("{text}");
            Ok(())
        }
        Some(CatalogMessage::Error(text)) => Err(anyhow!(text.clone())),
        None => Ok(()),
    }
}

async fn cmd_pooja_add(ctx: &AppContext, args: PoojaFormArgs) -> anyhow::Result<()> {
    let session = ctx.sessions.load()?;
    let mut view = PoojaCatalog::new(ctx.api(session.as_ref())?);
    view.form.name = args.name;
    view.form.description = args.description;
    view.form.image_url = args.image_url;
    view.submit().await;
    catalog_outcome(&view)
}

async fn cmd_pooja_update(ctx: &AppContext, args: PoojaUpdateArgs) -> anyhow::Result<()> {
    let session = ctx.sessions.load()?;
    let mut view = PoojaCatalog::new(ctx.api(session.as_ref())?);
    view.load().await;
    if !view.start_edit(&args.id) {
        bail!("no pooja with id {}", args.id);
    }
    if let Some(name) = args.name {
        view.form.name = name;
    }
    if let Some(description) = args.description {
        view.form.description = description;
    }
    if let Some(image_url) = args.image_url {
        view.form.image_url = image_url;
    }
    view.submit().await;
    catalog_outcome(&view)
}

async fn cmd_pooja_delete(ctx: &AppContext, args: IdArg) -> anyhow::Result<()> {
    let session = ctx.sessions.load()?;
    let mut view = PoojaCatalog::new(ctx.api(session.as_ref())?);
    view.delete(&args.id).await;
    catalog_outcome(&view)
}

async fn cmd_overview(ctx: &AppContext) -> anyhow::Result<()> {
    let session = ctx.sessions.load()?;
    let mut view = AdminOverview::new(ctx.api(session.as_ref())?);
    view.load().await;
    let counts = view.counts();

    let mut out = io::stdout().lock();
    ctx.renderer.key_values(
        &mut out,
        &[
            ("Devotees", counts.devotees.to_string()),
            ("Pandits", counts.pandits.to_string()),
            ("Bookings", counts.bookings.to_string()),
        ],
    )?;
    Ok(())
}

fn cmd_login(ctx: &AppContext, args: LoginArgs) -> anyhow::Result<()> {
    let mut session = Session::new(args.user_id, args.name, args.role);
    session.email = args.email;
    session.token = args.token;
    ctx.sessions.save(&session)?;
    println!("logged in as {} ({:?})", session.name, session.role);
    Ok(())
}

fn cmd_logout(ctx: &AppContext) -> anyhow::Result<()> {
    ctx.sessions.clear()?;
    println!("logged out");
    Ok(())
}

fn cmd_whoami(ctx: &AppContext) -> anyhow::Result<()> {
    match ctx.sessions.load()? {
        Some(session) => {
            let mut out = io::stdout().lock();
            ctx.renderer.key_values(
                &mut out,
                &[
                    ("User", session.user_id.clone()),
                    ("Name", session.name.clone()),
                    ("Email", session.email.clone().unwrap_or_default()),
                    ("Role", format!("{:?}", session.role).to_lowercase()),
                ],
            )?;
        }
        None => println!("not logged in"),
    }
    Ok(())
}
