//! # Data Sweeper
//!
//! Upload tabular files, preview them, clean them, chart them and convert
//! them between CSV and Excel (`.xlsx`).
//!
//! ## Features
//!
//! - **Two formats both ways**: CSV and Office Open XML spreadsheets are read
//!   and written without any native dependency
//! - **Type inference**: Boolean, Integer, Float, Text, Date and DateTime
//!   columns, with missing values tracked per cell
//! - **Cleaning**: duplicate-row removal and mean imputation of numeric columns
//! - **Projection**: keep an ordered selection of columns
//! - **Charting**: bar chart of the first two numeric columns, rendered as Vega-Lite
//! - **Independent files**: one file failing never stops the others
//!
//! ## Surfaces
//!
//! - [`server`]: HTTP page and JSON API
//! - [`session::process_files`]: the same pipeline as a library call, also
//!   used by the `data-sweeper convert` command
pub mod chart;
pub mod cleaning;
pub mod config;
pub mod error;
pub mod format;
pub mod projection;
pub mod server;
pub mod session;
pub mod table;

mod helpers;

pub use error::DataSweeperError;
pub use error::ErrorKind;
pub use table::Table;
