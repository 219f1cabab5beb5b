pub mod area;
pub mod cells;
pub mod position;
pub mod spatial;
pub mod time;
