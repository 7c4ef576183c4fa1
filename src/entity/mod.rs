pub mod measurements;
pub mod systems;
pub mod weather_current;
pub mod weather_forecast;
