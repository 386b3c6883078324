pub mod build;
pub mod fit;
pub mod map;
pub mod molaris;
pub mod molaris_stats;
pub mod qfep;
pub mod stats;
