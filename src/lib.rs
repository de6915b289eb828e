// bank-reviews: app-store review analytics for banking apps
//
// This is the library root. Each module corresponds to one stage or shared
// concern of the pipeline: scrape, preprocess, sentiment, themes, load.

pub mod artifacts;
pub mod config;
pub mod db;
pub mod models;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod sentiment;
pub mod source;
pub mod status;
pub mod themes;
