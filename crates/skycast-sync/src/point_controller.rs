//! Selected point and its place label.
//!
//! Points come from map clicks and from device geolocation. Every new point
//! gets a reverse-geocoding lookup; lookups run as spawned tasks and report
//! back through the controller's own channel, so a late answer for an old
//! point can be recognised and dropped.

use std::sync::Arc;
use std::time::Duration;

use skycast_core::SyncError;
use skycast_weather::{
    Coordinates, GeoPoint, GeocodeError, Geolocator, LocationError, PlaceLabel, PositionOptions,
    ReverseGeocoder, DEFAULT_FETCH_TIMEOUT,
};
use tokio::sync::mpsc;

use crate::events::{PointChange, PointEvent, Subscribers};

/// Completion of an asynchronous lookup issued by [`PointController`].
#[derive(Debug)]
pub enum PointMessage {
    LocationDone {
        attempt: u64,
        result: Result<Coordinates, LocationError>,
    },
    GeocodeDone {
        point: GeoPoint,
        result: Result<PlaceLabel, GeocodeError>,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct PointOptions {
    pub position: PositionOptions,
    /// Geocode lookups still pending after this long count as failed.
    pub geocode_timeout: Duration,
}

impl Default for PointOptions {
    fn default() -> Self {
        Self {
            position: PositionOptions::default(),
            geocode_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

pub struct PointController {
    point: GeoPoint,
    label: PlaceLabel,
    geocoder: Arc<dyn ReverseGeocoder>,
    geolocator: Arc<dyn Geolocator>,
    options: PointOptions,
    location_attempts: u64,
    /// Only this attempt may still move the point.
    pending_location: Option<u64>,
    in_flight: usize,
    tx: mpsc::UnboundedSender<PointMessage>,
    rx: mpsc::UnboundedReceiver<PointMessage>,
    subscribers: Subscribers<PointEvent>,
}

impl PointController {
    pub fn new(
        geocoder: Arc<dyn ReverseGeocoder>,
        geolocator: Arc<dyn Geolocator>,
        options: PointOptions,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            point: GeoPoint::UNSET,
            label: PlaceLabel::Unresolved,
            geocoder,
            geolocator,
            options,
            location_attempts: 0,
            pending_location: None,
            in_flight: 0,
            tx,
            rx,
            subscribers: Subscribers::default(),
        }
    }

    pub fn point(&self) -> GeoPoint {
        self.point
    }

    pub fn label(&self) -> &PlaceLabel {
        &self.label
    }

    /// Receive every committed `(point, label)` change from now on.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<PointEvent> {
        self.subscribers.subscribe()
    }

    /// True while any lookup issued by this controller has not reported back.
    pub fn has_pending(&self) -> bool {
        self.in_flight > 0
    }

    /// Startup lookup: locate the device unless a point was already chosen.
    pub fn initialize(&mut self) {
        if self.point.is_user_set {
            tracing::debug!("Point already chosen, skipping startup geolocation");
            return;
        }
        self.request_location();
    }

    /// "Use my location again": locate regardless of the current point.
    pub fn relocate(&mut self) {
        self.request_location();
    }

    /// A map click at `(latitude, longitude)`.
    pub fn select_point(&mut self, latitude: f64, longitude: f64) {
        if !latitude.is_finite() || !longitude.is_finite() {
            tracing::warn!("Ignoring non-finite map coordinate {}, {}", latitude, longitude);
            return;
        }
        if let Some(attempt) = self.pending_location.take() {
            tracing::debug!("Map click supersedes geolocation attempt {}", attempt);
        }
        self.commit_point(GeoPoint::chosen(latitude, longitude), PointChange::Selected);
    }

    /// Apply a finished geocode lookup. Returns false when `point` is no
    /// longer the current point and the label was discarded.
    pub fn on_geocode_resolved(&mut self, point: GeoPoint, label: PlaceLabel) -> bool {
        if point != self.point {
            tracing::debug!("Discarding label for superseded point {}", point);
            return false;
        }
        self.label = label;
        self.publish(PointChange::LabelResolved);
        true
    }

    /// Wait for the next lookup to report back.
    pub async fn next_message(&mut self) -> Option<PointMessage> {
        self.rx.recv().await
    }

    pub fn handle(&mut self, msg: PointMessage) {
        self.in_flight = self.in_flight.saturating_sub(1);
        match msg {
            PointMessage::LocationDone { attempt, result } => self.on_location_done(attempt, result),
            PointMessage::GeocodeDone { point, result } => {
                let label = match result {
                    Ok(label) => label,
                    Err(e) => {
                        let err = SyncError::GeocodeLookupFailed(e.to_string());
                        tracing::warn!("{}", err);
                        PlaceLabel::Unresolved
                    }
                };
                self.on_geocode_resolved(point, label);
            }
        }
    }

    /// Handle messages until every issued lookup has reported back.
    pub async fn settle(&mut self) {
        while self.has_pending() {
            match self.next_message().await {
                Some(msg) => self.handle(msg),
                None => break,
            }
        }
    }

    fn on_location_done(&mut self, attempt: u64, result: Result<Coordinates, LocationError>) {
        if self.pending_location != Some(attempt) {
            tracing::debug!("Discarding superseded geolocation attempt {}", attempt);
            return;
        }
        self.pending_location = None;

        match result {
            Ok(coords) => {
                tracing::info!("Got location: {}, {}", coords.latitude, coords.longitude);
                self.commit_point(
                    GeoPoint::chosen(coords.latitude, coords.longitude),
                    PointChange::Located,
                );
            }
            Err(e) => {
                let err = match e {
                    LocationError::PermissionDenied => SyncError::GeolocationDenied,
                    other => SyncError::GeolocationUnavailable(other.to_string()),
                };
                tracing::warn!("{}", err);
                self.publish(PointChange::LocationFailed(err));
            }
        }
    }

    fn request_location(&mut self) {
        if !self.geolocator.is_available() {
            let err = SyncError::GeolocationUnavailable("no location capability".to_string());
            tracing::warn!("{}", err);
            self.publish(PointChange::LocationFailed(err));
            return;
        }

        self.location_attempts += 1;
        let attempt = self.location_attempts;
        self.pending_location = Some(attempt);
        self.in_flight += 1;

        let geolocator = self.geolocator.clone();
        let options = self.options.position;
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result =
                match tokio::time::timeout(options.timeout, geolocator.current_position(options))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(LocationError::Timeout),
                };
            let _ = tx.send(PointMessage::LocationDone { attempt, result });
        });
    }

    fn commit_point(&mut self, point: GeoPoint, change: PointChange) {
        self.point = point;
        self.label = PlaceLabel::Unresolved;
        self.publish(change);
        self.request_geocode(point);
    }

    fn request_geocode(&mut self, point: GeoPoint) {
        self.in_flight += 1;

        let geocoder = self.geocoder.clone();
        let timeout = self.options.geocode_timeout;
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = match tokio::time::timeout(timeout, geocoder.reverse_geocode(point)).await
            {
                Ok(result) => result,
                Err(_) => Err(GeocodeError::Timeout),
            };
            let _ = tx.send(PointMessage::GeocodeDone { point, result });
        });
    }

    fn publish(&mut self, change: PointChange) {
        self.subscribers.publish(PointEvent {
            point: self.point,
            label: self.label.clone(),
            change,
        });
    }
}
