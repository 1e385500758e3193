//! Weather collaborators for SkyCast
//!
//! Value types shared by the controllers, plus the HTTP clients for reverse
//! geocoding and the forecast endpoint and the device-location providers.

pub mod dates;
pub mod geocode;
pub mod location;
pub mod provider;
pub mod types;

pub use dates::{
    format_date, parse_date, Clock, DateWindow, FixedClock, SystemClock, DEFAULT_HORIZON_DAYS,
};
pub use geocode::{
    pick_label, GeocodeCandidate, GoogleGeocoder, ReverseGeocoder, DEFAULT_LABEL_INDEX,
    GOOGLE_GEOCODE_URL,
};
pub use location::{
    Geolocator, IpGeolocator, PositionOptions, StaticGeolocator, UnavailableGeolocator,
    DEFAULT_LOCATION_TIMEOUT, IP_LOOKUP_URL,
};
pub use provider::{ForecastClient, ForecastSource, DEFAULT_FETCH_TIMEOUT, DEFAULT_FORECAST_URL};
pub use types::*;
