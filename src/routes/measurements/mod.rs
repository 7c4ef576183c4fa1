mod export;
mod handlers;
pub mod types;

pub use handlers::{
    create_measurement, create_measurements_batch, delete_measurement, get_measurement,
    list_measurements,
};
pub use types::{
    CreateMeasurementRequest, MeasurementBatchRequest, MeasurementResponse, MeasurementsQuery,
};

// Re-export utoipa path structs for OpenAPI documentation
pub use handlers::{
    __path_create_measurement, __path_create_measurements_batch, __path_delete_measurement,
    __path_get_measurement, __path_list_measurements,
};
