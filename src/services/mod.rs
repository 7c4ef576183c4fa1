pub mod measurements;
pub mod systems;
pub mod weather_cache;
