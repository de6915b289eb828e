// Review source: collecting raw reviews and app summaries from the store.
//
// The ReviewSource trait is the seam: PlayStoreClient talks to Google Play,
// tests plug in scripted sources. Retry and per-app failure isolation live
// in scrape.rs and sit above the trait.

pub mod client;
pub mod parse;
pub mod retry;
pub mod scrape;
pub mod traits;
