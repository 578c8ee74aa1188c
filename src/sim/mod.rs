pub mod hosts;
pub mod profit;
pub mod world;

pub use world::SimNetwork;
