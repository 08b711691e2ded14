// Domain layer: core models, entity schemas and ports (interfaces). No I/O here.

pub mod model;
pub mod ports;
pub mod schema;
