pub mod gate;
pub mod upstream;
