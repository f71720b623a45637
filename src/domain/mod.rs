// Domain layer: core models and ports (interfaces) for the discovery panel.

pub mod model;
pub mod ports;
