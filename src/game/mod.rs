pub mod approach;
pub mod chart;
pub mod ease;
pub mod gameplay;
pub mod timescale;
pub mod timing;
