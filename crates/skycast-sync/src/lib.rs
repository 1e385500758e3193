//! Keeps the selected point, its place label, the target date and the
//! forecast consistent while lookups complete in any order.

pub mod events;
pub mod forecast_controller;
pub mod map;
pub mod point_controller;
pub mod request_state;
pub mod session;

pub use events::{ForecastEvent, PointChange, PointEvent, Subscribers};
pub use forecast_controller::{ForecastController, ForecastMessage, ForecastOptions};
pub use map::{MapSurface, MarkerOverlay, NullMap};
pub use point_controller::{PointController, PointMessage, PointOptions};
pub use request_state::{Completion, RequestState};
pub use session::{DisplayState, Session, SessionCommand, SessionError, SessionHandle};
pub use skycast_core::SyncError;
