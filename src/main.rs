//! SkyCast terminal client.
//!
//! Pick a point with `click <lat> <lng>` (or let the device locate itself),
//! pick a day with `date <YYYY-MM-DD>`, and the forecast for that pair is
//! printed as soon as it arrives.

use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use skycast_core::{AppError, Config, ConfigError, LocationConfig, LocationProvider};
use skycast_sync::{
    DisplayState, ForecastController, ForecastEvent, ForecastOptions, MapSurface, MarkerOverlay,
    PointChange, PointController, PointEvent, PointOptions, Session, SessionError, SessionHandle,
};
use skycast_weather::{
    format_date, parse_date, Coordinates, ForecastClient, ForecastPayload, Geolocator,
    GoogleGeocoder, IpGeolocator, PositionOptions, StaticGeolocator, SystemClock,
    UnavailableGeolocator,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

#[derive(Debug, Parser)]
#[command(name = "skycast", version, about = "Climatology-backed forecasts for any point on the map")]
struct Args {
    /// Config file to use instead of the platform default
    #[arg(long)]
    config: Option<PathBuf>,

    /// Latitude of the point to forecast; prints one forecast and exits
    #[arg(long, requires = "lng", allow_hyphen_values = true)]
    lat: Option<f64>,

    /// Longitude of the point to forecast
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    lng: Option<f64>,

    /// Target date (YYYY-MM-DD), defaults to today
    #[arg(long, value_parser = parse_date)]
    date: Option<NaiveDate>,
}

/// One line of interactive input.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Input {
    Click { latitude: f64, longitude: f64 },
    Date(NaiveDate),
    Locate,
    Show,
    Help,
    Quit,
}

impl FromStr for Input {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let mut words = line.split_whitespace();
        let command = words.next().unwrap_or_default();
        let input = match command {
            "click" => {
                let latitude = words.next().context("usage: click <lat> <lng>")?.parse()?;
                let longitude = words.next().context("usage: click <lat> <lng>")?.parse()?;
                Input::Click {
                    latitude,
                    longitude,
                }
            }
            "date" => {
                let raw = words.next().context("usage: date <YYYY-MM-DD>")?;
                Input::Date(parse_date(raw).with_context(|| format!("not a date: {}", raw))?)
            }
            "locate" => Input::Locate,
            "show" => Input::Show,
            "help" | "?" => Input::Help,
            "quit" | "exit" => Input::Quit,
            other => anyhow::bail!("unknown command '{}', try 'help'", other),
        };
        if words.next().is_some() {
            anyhow::bail!("too many arguments for '{}'", command);
        }
        Ok(input)
    }
}

/// Prints the marker overlay whenever it changes.
struct TerminalMap;

impl MapSurface for TerminalMap {
    fn render(&mut self, overlay: Option<&MarkerOverlay>) {
        if let Some(marker) = overlay {
            println!("[map] marker at {}: {}", marker.point, marker.label);
        }
    }
}

fn build_geolocator(config: &LocationConfig) -> Result<Arc<dyn Geolocator>> {
    let geolocator: Arc<dyn Geolocator> = match config.provider {
        LocationProvider::Ip => Arc::new(IpGeolocator::new(config.ip_lookup_url.clone())?),
        LocationProvider::Static => {
            let latitude = config
                .static_latitude
                .ok_or_else(|| ConfigError::MissingSetting("location.static_latitude".into()))?;
            let longitude = config
                .static_longitude
                .ok_or_else(|| ConfigError::MissingSetting("location.static_longitude".into()))?;
            Arc::new(StaticGeolocator(Coordinates::new(latitude, longitude)))
        }
        LocationProvider::None => Arc::new(UnavailableGeolocator),
    };
    Ok(geolocator)
}

fn build_session(config: &Config) -> Result<(Session<TerminalMap>, SessionHandle)> {
    let fetch_timeout = Duration::from_secs(config.forecast.timeout_secs);

    let api_key = config.geocoding.resolved_api_key().unwrap_or_default();
    let geocoder = GoogleGeocoder::with_base_url(&config.geocoding.base_url, api_key, fetch_timeout)?
        .with_label_index(config.geocoding.label_index);

    let points = PointController::new(
        Arc::new(geocoder),
        build_geolocator(&config.location)?,
        PointOptions {
            position: PositionOptions {
                high_accuracy: config.location.high_accuracy,
                timeout: Duration::from_secs(config.location.timeout_secs),
            },
            geocode_timeout: fetch_timeout,
        },
    );

    let source = ForecastClient::new(&config.forecast.base_url, fetch_timeout)?;
    let forecasts = ForecastController::new(
        Arc::new(source),
        Arc::new(SystemClock),
        ForecastOptions {
            horizon_days: config.dates.horizon_days,
            fetch_timeout,
        },
    );

    Ok(Session::new(points, forecasts, TerminalMap))
}

/// Rejected commands keep their `SyncError` so the exit path can show its
/// user message.
fn session_error(err: SessionError) -> anyhow::Error {
    match err {
        SessionError::Rejected(e) => e.into(),
        closed => closed.into(),
    }
}

fn print_forecast(payload: &ForecastPayload) {
    let Some(report) = &payload.report else {
        println!("Forecast:");
        println!("{:#}", payload.raw);
        return;
    };
    let summary = &report.climatological_probability_and_means;
    let means = &summary.climatological_means;
    let risk = &summary.probabilities;
    let show = |v: Option<f64>| v.map_or_else(|| "n/a".to_string(), |v| format!("{:.1}", v));

    println!("Forecast for {} ({})", report.query_date, summary.date_context);
    println!(
        "  temperature  {} / {} C",
        show(means.avg_tmax_c),
        show(means.avg_tmin_c)
    );
    println!("  humidity     {} %", show(means.avg_humidity_percent));
    println!("  wind         {} m/s", show(means.avg_wind_speed_ms));
    println!(
        "  rain {} %, extreme heat {} %, extreme wind {} %",
        show(risk.p_rain_percent),
        show(risk.p_extreme_heat_percent),
        show(risk.p_extreme_wind_percent)
    );
    println!("  risk level   {}", risk.main_risk_level);
    println!(
        "  PM2.5 {}, PM10 {}",
        show(report.air_quality_context.pm25_concentration),
        show(report.air_quality_context.pm10_concentration)
    );
    println!("  {}", report.data_summary);
}

fn print_display(state: &DisplayState) {
    if state.point.is_user_set {
        println!("Point: {} ({})", state.point, state.label);
    } else {
        println!("Point: none selected");
    }
    println!(
        "Date:  {} (selectable {} to {})",
        format_date(state.target_date),
        format_date(state.date_window.min),
        format_date(state.date_window.max)
    );
    if let Some(err) = &state.location_error {
        println!("Location: {}", err.user_message());
    }
    if state.loading {
        println!("Loading forecast...");
    } else if let Some(payload) = state.forecast.payload() {
        print_forecast(payload);
    } else if let Some(err) = &state.forecast_error {
        println!("{}", err.user_message());
    }
}

fn print_help() {
    println!("Commands:");
    println!("  click <lat> <lng>   select a point");
    println!("  date <YYYY-MM-DD>   change the target date");
    println!("  locate              use my location again");
    println!("  show                print the current state");
    println!("  quit                exit");
}

async fn print_events(
    mut points: mpsc::UnboundedReceiver<PointEvent>,
    mut forecasts: mpsc::UnboundedReceiver<ForecastEvent>,
) {
    loop {
        tokio::select! {
            Some(event) = points.recv() => match event.change {
                PointChange::Selected | PointChange::Located => println!("Point: {}", event.point),
                PointChange::LabelResolved => println!("Place: {}", event.label),
                PointChange::LocationFailed(err) => println!("Location: {}", err.user_message()),
            },
            Some(event) = forecasts.recv() => {
                if event.loading {
                    println!("Loading forecast...");
                } else if let Some(payload) = event.result.payload() {
                    print_forecast(payload);
                } else if let Some(err) = event.error {
                    println!("{}", err.user_message());
                }
            },
            else => break,
        }
    }
}

/// Wait until the forecast for the latest (point, date) pair has settled.
async fn settled(
    handle: &SessionHandle,
    events: &mut mpsc::UnboundedReceiver<ForecastEvent>,
) -> Result<DisplayState> {
    loop {
        let state = handle.display().await?;
        if !state.loading {
            return Ok(state);
        }
        if events.recv().await.is_none() {
            return Ok(state);
        }
    }
}

async fn run_once(
    handle: &SessionHandle,
    events: &mut mpsc::UnboundedReceiver<ForecastEvent>,
    latitude: f64,
    longitude: f64,
    date: Option<NaiveDate>,
) -> Result<()> {
    handle.select_point(latitude, longitude)?;
    if let Some(date) = date {
        handle.set_date(date).await.map_err(session_error)?;
    }
    let state = settled(handle, events).await?;
    print_display(&state);
    Ok(())
}

async fn run_interactive(handle: &SessionHandle, date: Option<NaiveDate>) -> Result<()> {
    if let Some(date) = date {
        handle.set_date(date).await.map_err(session_error)?;
    }
    print_help();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let input = match line.parse::<Input>() {
            Ok(input) => input,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };
        match input {
            Input::Click {
                latitude,
                longitude,
            } => handle.select_point(latitude, longitude)?,
            Input::Date(date) => {
                match handle.set_date(date).await {
                    Ok(()) => {}
                    Err(SessionError::Rejected(e)) => println!("{}", e.user_message()),
                    Err(e) => return Err(e.into()),
                }
            }
            Input::Locate => handle.relocate()?,
            Input::Show => print_display(&handle.display().await?),
            Input::Help => print_help(),
            Input::Quit => break,
        }
    }
    Ok(())
}

async fn run(args: Args) -> Result<()> {
    let (config, validation) = Config::load_validated(args.config.as_deref())?;
    skycast_core::init(&config.logging.level)?;
    for warning in &validation.warnings {
        tracing::warn!("Config warning: {}", warning);
    }

    let (mut session, handle) = build_session(&config)?;
    let point_events = session.subscribe_points();
    let mut forecast_events = session.subscribe_forecasts();
    let runner = tokio::spawn(async move { session.run().await });

    tracing::info!("SkyCast started");

    match (args.lat, args.lng) {
        (Some(latitude), Some(longitude)) => {
            run_once(&handle, &mut forecast_events, latitude, longitude, args.date).await?;
        }
        _ => {
            let printer = tokio::spawn(print_events(point_events, forecast_events));
            run_interactive(&handle, args.date).await?;
            printer.abort();
        }
    }

    handle.shutdown()?;
    runner.await?;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("SkyCast failed: {:#}", e);
            let err = AppError::from_anyhow(e);
            eprintln!("{}", err.user_message());
            eprintln!("  {}", err);
            ExitCode::FAILURE
        }
    }
}
