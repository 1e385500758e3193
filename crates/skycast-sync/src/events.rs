//! Events the controllers publish to the presentation layer.

use skycast_core::SyncError;
use skycast_weather::{ForecastResult, GeoPoint, PlaceLabel};
use tokio::sync::mpsc;

/// Why a [`PointEvent`] was emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointChange {
    /// The user clicked the map.
    Selected,
    /// Device geolocation produced a fix.
    Located,
    /// A reverse-geocoding lookup for the current point finished.
    LabelResolved,
    /// Geolocation failed; point and label are unchanged.
    LocationFailed(SyncError),
}

/// `(GeoPoint, PlaceLabel)` after a committed change.
#[derive(Debug, Clone, PartialEq)]
pub struct PointEvent {
    pub point: GeoPoint,
    pub label: PlaceLabel,
    pub change: PointChange,
}

impl PointEvent {
    /// True when the point itself moved, as opposed to a label update or a
    /// failure notice.
    pub fn moves_point(&self) -> bool {
        matches!(self.change, PointChange::Selected | PointChange::Located)
    }
}

/// `(ForecastResult, LoadingState)` after a state change.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastEvent {
    pub result: ForecastResult,
    pub loading: bool,
    /// Set when the fetch that produced this state failed.
    pub error: Option<SyncError>,
}

/// Fan-out of events to any number of receivers. Receivers that have been
/// dropped are pruned on the next publish.
#[derive(Debug)]
pub struct Subscribers<T> {
    senders: Vec<mpsc::UnboundedSender<T>>,
}

impl<T> Default for Subscribers<T> {
    fn default() -> Self {
        Self {
            senders: Vec::new(),
        }
    }
}

impl<T: Clone> Subscribers<T> {
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.push(tx);
        rx
    }

    pub fn publish(&mut self, event: T) {
        self.senders.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_reaches_every_subscriber() {
        let mut subs = Subscribers::<u32>::default();
        let mut a = subs.subscribe();
        let mut b = subs.subscribe();
        subs.publish(7);
        assert_eq!(a.try_recv().unwrap(), 7);
        assert_eq!(b.try_recv().unwrap(), 7);
    }

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let mut subs = Subscribers::<u32>::default();
        let keep = subs.subscribe();
        drop(subs.subscribe());
        subs.publish(1);
        assert_eq!(subs.len(), 1);
        drop(keep);
        subs.publish(2);
        assert!(subs.is_empty());
    }

    #[test]
    fn test_only_selection_and_location_move_the_point() {
        let event = |change| PointEvent {
            point: GeoPoint::chosen(1.0, 2.0),
            label: PlaceLabel::Unresolved,
            change,
        };
        assert!(event(PointChange::Selected).moves_point());
        assert!(event(PointChange::Located).moves_point());
        assert!(!event(PointChange::LabelResolved).moves_point());
        assert!(!event(PointChange::LocationFailed(SyncError::GeolocationDenied)).moves_point());
    }
}
