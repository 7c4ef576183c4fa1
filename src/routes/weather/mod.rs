mod handlers;
mod types;

pub use handlers::{
    get_current_weather, get_current_weather_cached, get_measured_radiation,
    get_weather_forecast, get_weather_forecast_cached,
};
pub use types::{
    CurrentWeatherQuery, CurrentWeatherResponse, ForecastQuery, ForecastResponse,
    MeasuredRadiationPoint, MeasuredRadiationQuery,
};

// Re-export utoipa path structs for OpenAPI documentation
pub use handlers::{
    __path_get_current_weather, __path_get_current_weather_cached, __path_get_measured_radiation,
    __path_get_weather_forecast, __path_get_weather_forecast_cached,
};
