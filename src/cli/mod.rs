pub mod fetch;
pub mod intervals;
pub mod setup;
pub mod ui;
