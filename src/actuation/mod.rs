// Actuation side of the loop: proportional step computation, clamped position
// bookkeeping and the driver interface that moves the pan/tilt servos.

pub mod controller;
pub mod position;
pub mod driver;
