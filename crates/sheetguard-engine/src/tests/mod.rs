mod common;
mod cycle_detection;
mod impact_ranking;
