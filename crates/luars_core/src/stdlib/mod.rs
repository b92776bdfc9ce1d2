// Standard library pieces implemented by the runtime core
pub mod basic;
pub mod math;
pub mod string;
