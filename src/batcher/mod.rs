pub mod batch;
pub mod controller;
pub mod delays;
pub mod formulas;
pub mod network;
pub mod ram;
pub mod target;
pub mod threads;
