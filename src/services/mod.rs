pub mod custom_request;
pub mod geo;
pub mod intent;
pub mod llm_service;
pub mod narrator;
pub mod opening_hours;
pub mod places_service;
pub mod plan_generation_service;
pub mod schedule_assembler;
pub mod venue_selector;
