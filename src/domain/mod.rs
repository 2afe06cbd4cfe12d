// Domain layer: request/response models and ports (interfaces) to external systems.

pub mod model;
pub mod ports;
