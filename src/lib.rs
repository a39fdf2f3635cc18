// Library surface for the engine, the stats recorder and their persistence.
// The terminal front end in main.rs drives these through `game::Command`.
pub mod app_dirs;
pub mod config;
pub mod error;
pub mod game;
pub mod runtime;
pub mod session;
pub mod stats;
pub mod store;
pub mod theme;
pub mod util;
