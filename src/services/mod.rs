pub mod freshness_service;
pub mod verification_service;
