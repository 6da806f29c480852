pub mod lifecycle;
pub mod models;
pub mod ports;
pub mod services;
pub mod tokener;
pub mod validation;
