// Domain layer: records, derived series and the ports the pipeline runs against.

pub mod model;
pub mod ports;
