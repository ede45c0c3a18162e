mod cases;
mod config;
mod country;
mod covariate;
mod dates;
mod error;
mod ioutil;
mod logging;
mod matrix;
mod merge;
mod metrics;
mod month;
mod period;
mod pipeline;
mod progress;
mod sanitize;
mod table;

pub use cases::*;
pub use config::*;
pub use country::*;
pub use covariate::*;
pub use dates::*;
pub use error::*;
pub use ioutil::*;
pub use logging::*;
pub use matrix::*;
pub use merge::*;
pub use metrics::*;
pub use month::*;
pub use period::*;
pub use pipeline::*;
pub use progress::*;
pub use sanitize::*;
pub use table::*;
