mod geocode;
mod knowledge;
mod weather;

pub use geocode::Geocoder;
pub use knowledge::{KnowledgeBase, KnowledgeStore};
pub use weather::WeatherService;
