pub mod args;
pub mod error;
pub mod model;
pub mod controller {
    pub mod fixtures;
    pub mod http_handlers;
    pub mod lineup;
    pub mod live;
    pub mod player_stats;
    pub mod provider;
    pub mod stats_page;
    pub mod team_season;
    pub mod warm;
}
pub mod view {
    pub mod fixtures;
    pub mod index;
}

pub use error::EngineError;
