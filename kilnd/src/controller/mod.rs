//! Control loop: the tick engine and the plant it drives.

mod engine;
mod plant;

pub(crate) use engine::Engine;
pub(crate) use plant::SimulatedPlant;
