pub mod api;
pub mod chart;
pub mod controller;
pub mod errors;
pub mod export;
pub mod models;
pub mod series;
pub mod ui;

pub use api::TaskStore;
pub use chart::{ChartConfig, ChartController, ChartMode, SvgBackend};
pub use controller::{ViewController, ViewSurface};
pub use errors::{Error, Result};
pub use models::{ProgressByUser, ProgressPoint, Task, UserLabel};
pub use series::{AxisPolicy, ProgressView, Snapshot, build_view, build_view_at};
