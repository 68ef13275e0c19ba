pub mod conditions;
pub mod plan;
pub mod venue;
