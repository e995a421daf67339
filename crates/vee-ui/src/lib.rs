//! # vee-ui
//!
//! Presentational fragments of the Vee client: askama templates, inline
//! markup and relative time labels.

pub mod markup;
pub mod registry;
pub mod time;
pub mod views;

pub use markup::render_inline;
pub use registry::{Routes, TemplateRegistry};
pub use time::{month_year, time_ago};
pub use views::*;
