pub mod delivery;
pub mod forecast;
pub mod location;
pub mod order;
pub mod plan;
pub mod product;
pub mod profile;
pub mod sensor;
