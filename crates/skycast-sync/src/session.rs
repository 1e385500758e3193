//! Drives both controllers from one task.
//!
//! A [`Session`] owns the point controller, the forecast controller and the
//! map surface. Commands arrive through a [`SessionHandle`]; lookup
//! completions arrive through each controller's own channel. Point events are
//! forwarded to the forecast controller and the map in the order they were
//! published.

use chrono::NaiveDate;
use skycast_core::SyncError;
use skycast_weather::{DateWindow, ForecastResult, GeoPoint, PlaceLabel};
use tokio::sync::{mpsc, oneshot};

use crate::events::{ForecastEvent, PointChange, PointEvent};
use crate::forecast_controller::{ForecastController, ForecastMessage};
use crate::map::{MapSurface, MarkerOverlay};
use crate::point_controller::{PointController, PointMessage};

#[derive(Debug)]
pub enum SessionCommand {
    /// Map click.
    SelectPoint { latitude: f64, longitude: f64 },
    /// Locate the device again, even if a point was already chosen.
    Relocate,
    SetDate {
        date: NaiveDate,
        reply: oneshot::Sender<Result<(), SyncError>>,
    },
    Snapshot {
        reply: oneshot::Sender<DisplayState>,
    },
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error("Session is no longer running")]
    Closed,
    #[error(transparent)]
    Rejected(#[from] SyncError),
}

/// Everything the presentation layer shows at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayState {
    pub point: GeoPoint,
    pub label: PlaceLabel,
    pub marker: Option<MarkerOverlay>,
    pub target_date: NaiveDate,
    pub date_window: DateWindow,
    pub forecast: ForecastResult,
    pub loading: bool,
    pub forecast_error: Option<SyncError>,
    /// Last geolocation failure, cleared once a point is committed.
    pub location_error: Option<SyncError>,
}

/// Cloneable sender side of a running [`Session`].
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<SessionCommand>,
}

impl SessionHandle {
    pub fn select_point(&self, latitude: f64, longitude: f64) -> Result<(), SessionError> {
        self.send(SessionCommand::SelectPoint {
            latitude,
            longitude,
        })
    }

    pub fn relocate(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Relocate)
    }

    /// Change the target date. Out-of-range dates come back as
    /// [`SessionError::Rejected`].
    pub async fn set_date(&self, date: NaiveDate) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::SetDate { date, reply })?;
        rx.await.map_err(|_| SessionError::Closed)??;
        Ok(())
    }

    pub async fn display(&self) -> Result<DisplayState, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Snapshot { reply })?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    pub fn shutdown(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Shutdown)
    }

    fn send(&self, command: SessionCommand) -> Result<(), SessionError> {
        self.tx.send(command).map_err(|_| SessionError::Closed)
    }
}

enum Step {
    PointEvent(PointEvent),
    Point(PointMessage),
    Forecast(ForecastMessage),
    Command(SessionCommand),
    Stop,
}

pub struct Session<M: MapSurface> {
    points: PointController,
    forecasts: ForecastController,
    map: M,
    point_events: mpsc::UnboundedReceiver<PointEvent>,
    commands: mpsc::UnboundedReceiver<SessionCommand>,
    location_error: Option<SyncError>,
}

impl<M: MapSurface> Session<M> {
    pub fn new(
        mut points: PointController,
        forecasts: ForecastController,
        map: M,
    ) -> (Self, SessionHandle) {
        let point_events = points.subscribe();
        let (tx, commands) = mpsc::unbounded_channel();
        let session = Self {
            points,
            forecasts,
            map,
            point_events,
            commands,
            location_error: None,
        };
        (session, SessionHandle { tx })
    }

    pub fn subscribe_points(&mut self) -> mpsc::UnboundedReceiver<PointEvent> {
        self.points.subscribe()
    }

    pub fn subscribe_forecasts(&mut self) -> mpsc::UnboundedReceiver<ForecastEvent> {
        self.forecasts.subscribe()
    }

    pub fn points(&self) -> &PointController {
        &self.points
    }

    pub fn forecasts(&self) -> &ForecastController {
        &self.forecasts
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn display(&self) -> DisplayState {
        let point = self.points.point();
        let label = self.points.label().clone();
        DisplayState {
            marker: MarkerOverlay::from_state(point, &label),
            point,
            label,
            target_date: self.forecasts.target_date(),
            date_window: self.forecasts.date_window(),
            forecast: self.forecasts.result().clone(),
            loading: self.forecasts.is_loading(),
            forecast_error: self.forecasts.last_error().cloned(),
            location_error: self.location_error.clone(),
        }
    }

    /// Run the startup geolocation, then serve commands until shutdown or
    /// until every handle is dropped.
    pub async fn run(&mut self) {
        tracing::info!("Session started");
        self.map.render(None);
        self.points.initialize();

        loop {
            let step = tokio::select! {
                biased;
                Some(event) = self.point_events.recv() => Step::PointEvent(event),
                Some(msg) = self.points.next_message() => Step::Point(msg),
                Some(msg) = self.forecasts.next_message() => Step::Forecast(msg),
                command = self.commands.recv() => match command {
                    Some(command) => Step::Command(command),
                    None => Step::Stop,
                },
            };

            match step {
                Step::PointEvent(event) => self.on_point_event(event),
                Step::Point(msg) => self.points.handle(msg),
                Step::Forecast(msg) => self.forecasts.handle(msg),
                Step::Command(SessionCommand::Shutdown) | Step::Stop => break,
                Step::Command(command) => self.on_command(command),
            }
        }

        tracing::info!("Session stopped");
    }

    fn on_point_event(&mut self, event: PointEvent) {
        match &event.change {
            PointChange::LocationFailed(err) => {
                self.location_error = Some(err.clone());
                return;
            }
            PointChange::Selected | PointChange::Located => {
                self.location_error = None;
                self.forecasts.on_point_changed(&event);
            }
            PointChange::LabelResolved => {}
        }
        let overlay = MarkerOverlay::from_state(event.point, &event.label);
        self.map.render(overlay.as_ref());
    }

    fn on_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::SelectPoint {
                latitude,
                longitude,
            } => self.points.select_point(latitude, longitude),
            SessionCommand::Relocate => self.points.relocate(),
            SessionCommand::SetDate { date, reply } => {
                let result = self.forecasts.set_target_date(date).map(|_| ());
                let _ = reply.send(result);
            }
            SessionCommand::Snapshot { reply } => {
                let _ = reply.send(self.display());
            }
            SessionCommand::Shutdown => {}
        }
    }
}
