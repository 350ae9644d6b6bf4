// Domain layer: plain data carriers and the ports the demos talk to.

pub mod model;
pub mod ports;
