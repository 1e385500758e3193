//! Target date and the forecast for the current (point, date) pair.
//!
//! Every change to either input issues a new fetch stamped with the next
//! sequence number. Completions are applied only when they answer the latest
//! issued request, so a slow response for an older pair can never overwrite
//! a newer one.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use skycast_core::SyncError;
use skycast_weather::{
    Clock, DateWindow, ForecastError, ForecastPayload, ForecastRequest, ForecastResult,
    ForecastSource, GeoPoint, DEFAULT_FETCH_TIMEOUT, DEFAULT_HORIZON_DAYS,
};
use tokio::sync::mpsc;

use crate::events::{ForecastEvent, PointEvent, Subscribers};
use crate::request_state::{Completion, RequestState};

/// Completion of a forecast fetch issued by [`ForecastController`].
#[derive(Debug)]
pub struct ForecastMessage {
    pub seq: u64,
    pub request: ForecastRequest,
    pub result: Result<ForecastPayload, ForecastError>,
}

#[derive(Debug, Clone, Copy)]
pub struct ForecastOptions {
    /// Last selectable day, counted from today.
    pub horizon_days: u32,
    /// Fetches still pending after this long count as failed.
    pub fetch_timeout: Duration,
}

impl Default for ForecastOptions {
    fn default() -> Self {
        Self {
            horizon_days: DEFAULT_HORIZON_DAYS,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

pub struct ForecastController {
    point: GeoPoint,
    date: NaiveDate,
    result: ForecastResult,
    state: RequestState,
    next_seq: u64,
    last_error: Option<SyncError>,
    source: Arc<dyn ForecastSource>,
    clock: Arc<dyn Clock>,
    options: ForecastOptions,
    in_flight: usize,
    tx: mpsc::UnboundedSender<ForecastMessage>,
    rx: mpsc::UnboundedReceiver<ForecastMessage>,
    subscribers: Subscribers<ForecastEvent>,
}

impl ForecastController {
    pub fn new(
        source: Arc<dyn ForecastSource>,
        clock: Arc<dyn Clock>,
        options: ForecastOptions,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let date = clock.today();
        Self {
            point: GeoPoint::UNSET,
            date,
            result: ForecastResult::NoData,
            state: RequestState::Idle,
            next_seq: 0,
            last_error: None,
            source,
            clock,
            options,
            in_flight: 0,
            tx,
            rx,
            subscribers: Subscribers::default(),
        }
    }

    pub fn point(&self) -> GeoPoint {
        self.point
    }

    pub fn target_date(&self) -> NaiveDate {
        self.date
    }

    pub fn result(&self) -> &ForecastResult {
        &self.result
    }

    /// True strictly while the fetch for the current pair is outstanding.
    pub fn is_loading(&self) -> bool {
        self.state.is_pending()
    }

    pub fn request_state(&self) -> RequestState {
        self.state
    }

    pub fn last_error(&self) -> Option<&SyncError> {
        self.last_error.as_ref()
    }

    /// Dates the picker may offer right now.
    pub fn date_window(&self) -> DateWindow {
        DateWindow::starting(self.clock.today(), self.options.horizon_days)
    }

    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<ForecastEvent> {
        self.subscribers.subscribe()
    }

    /// True while any fetch issued by this controller has not reported back,
    /// including superseded ones.
    pub fn has_pending(&self) -> bool {
        self.in_flight > 0
    }

    /// Date-picker input. Out-of-range dates are rejected and the previous
    /// date is kept; nothing is fetched.
    pub fn set_target_date(&mut self, date: NaiveDate) -> Result<u64, SyncError> {
        self.on_point_or_date_changed(self.point, date)
    }

    /// Consume an event from the point controller. Only events that move the
    /// point trigger a fetch; label updates do not.
    pub fn on_point_changed(&mut self, event: &PointEvent) -> Option<u64> {
        if !event.moves_point() {
            return None;
        }

        let window = self.date_window();
        let date = if window.contains(self.date) {
            self.date
        } else {
            // The day rolled over since the date was picked.
            tracing::info!(
                "Target date {} left the selectable range, moving to {}",
                self.date,
                window.min
            );
            window.min
        };

        match self.on_point_or_date_changed(event.point, date) {
            Ok(seq) => Some(seq),
            Err(e) => {
                tracing::warn!("{}", e);
                None
            }
        }
    }

    /// Commit a new (point, date) pair and fetch its forecast. The displayed
    /// result is cleared until the answer arrives.
    pub fn on_point_or_date_changed(
        &mut self,
        point: GeoPoint,
        date: NaiveDate,
    ) -> Result<u64, SyncError> {
        self.check_date(date)?;

        self.point = point;
        self.date = date;
        let request = ForecastRequest::new(point, date);

        self.next_seq += 1;
        let seq = self.next_seq;
        if let Some(previous) = self.state.latest_seq().filter(|_| self.state.is_pending()) {
            tracing::debug!("Request {} supersedes pending request {}", seq, previous);
        }
        self.state = self.state.on_issued(seq);
        self.result = ForecastResult::NoData;
        self.last_error = None;
        self.publish();

        tracing::info!(
            seq,
            "Fetching forecast for {}, {} on {}",
            request.latitude,
            request.longitude,
            request.target_date
        );
        self.spawn_fetch(seq, request);
        Ok(seq)
    }

    /// Apply a finished fetch. Returns how it was classified.
    pub fn on_fetch_completed(
        &mut self,
        seq: u64,
        request: ForecastRequest,
        result: Result<ForecastPayload, ForecastError>,
    ) -> Completion {
        let completion = self.state.classify(seq);
        if completion == Completion::Superseded {
            tracing::debug!(seq, "Discarding superseded forecast for {:?}", request);
            return completion;
        }

        match result {
            Ok(payload) => {
                self.result = ForecastResult::Ready(Arc::new(payload));
                self.state = self.state.on_resolved();
                self.last_error = None;
            }
            Err(e) => {
                let err = SyncError::ForecastFetchFailed(e.to_string());
                tracing::warn!(seq, "{}", err);
                self.result = ForecastResult::NoData;
                self.state = self.state.on_failed();
                self.last_error = Some(err);
            }
        }
        self.publish();
        completion
    }

    pub async fn next_message(&mut self) -> Option<ForecastMessage> {
        self.rx.recv().await
    }

    pub fn handle(&mut self, msg: ForecastMessage) {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.on_fetch_completed(msg.seq, msg.request, msg.result);
    }

    /// Handle messages until every issued fetch has reported back.
    pub async fn settle(&mut self) {
        while self.has_pending() {
            match self.next_message().await {
                Some(msg) => self.handle(msg),
                None => break,
            }
        }
    }

    fn check_date(&self, date: NaiveDate) -> Result<(), SyncError> {
        let window = self.date_window();
        if window.contains(date) {
            Ok(())
        } else {
            let err = SyncError::InvalidDateSelection {
                date,
                min: window.min,
                max: window.max,
            };
            tracing::warn!("{}", err);
            Err(err)
        }
    }

    fn spawn_fetch(&mut self, seq: u64, request: ForecastRequest) {
        self.in_flight += 1;

        let source = self.source.clone();
        let timeout = self.options.fetch_timeout;
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = match tokio::time::timeout(timeout, source.fetch(request)).await {
                Ok(result) => result,
                Err(_) => Err(ForecastError::Timeout),
            };
            let _ = tx.send(ForecastMessage {
                seq,
                request,
                result,
            });
        });
    }

    fn publish(&mut self) {
        self.subscribers.publish(ForecastEvent {
            result: self.result.clone(),
            loading: self.is_loading(),
            error: self.last_error.clone(),
        });
    }
}
