//! Marker overlay for the map surface.

use skycast_weather::{GeoPoint, PlaceLabel};

/// A marker at the selected point with a popup showing its place name.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerOverlay {
    pub point: GeoPoint,
    pub label: String,
}

impl MarkerOverlay {
    /// The overlay for a committed `(point, label)` pair. The marker is shown
    /// only once the point was chosen and its label resolved.
    pub fn from_state(point: GeoPoint, label: &PlaceLabel) -> Option<Self> {
        if !point.is_user_set {
            return None;
        }
        label.as_str().map(|name| Self {
            point,
            label: name.to_string(),
        })
    }
}

/// Anything that can draw the marker overlay.
pub trait MapSurface: Send {
    /// Replace the current overlay. `None` removes the marker.
    fn render(&mut self, overlay: Option<&MarkerOverlay>);
}

/// A surface that draws nothing.
#[derive(Debug, Default)]
pub struct NullMap;

impl MapSurface for NullMap {
    fn render(&mut self, _overlay: Option<&MarkerOverlay>) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_marker_until_label_resolves() {
        let point = GeoPoint::chosen(10.0, 106.0);
        assert_eq!(MarkerOverlay::from_state(point, &PlaceLabel::Unresolved), None);

        let overlay = MarkerOverlay::from_state(point, &PlaceLabel::Resolved("Saigon".into()));
        assert_eq!(
            overlay,
            Some(MarkerOverlay {
                point,
                label: "Saigon".into()
            })
        );
    }

    #[test]
    fn test_no_marker_on_default_point() {
        let label = PlaceLabel::Resolved("Null Island".into());
        assert!(MarkerOverlay::from_state(GeoPoint::UNSET, &label).is_none());
    }
}
