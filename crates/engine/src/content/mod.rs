mod builtin;
mod database;
mod types;

pub use builtin::{builtin_levels, builtin_tracks};
pub use database::Catalog;
pub use types::{
    CatalogError, Direction, LevelConfig, ParseDirectionError, PatternSegment, SelectionError,
    TimingWindows, TrackProfile,
};
