mod handlers;
mod types;

pub use handlers::{create_system, delete_system, get_system, list_systems, update_system};
pub use types::{CreateSystemRequest, SystemResponse, SystemsQuery, UpdateSystemRequest};

// Re-export utoipa path structs for OpenAPI documentation
pub use handlers::{
    __path_create_system, __path_delete_system, __path_get_system, __path_list_systems,
    __path_update_system,
};
