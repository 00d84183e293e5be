pub mod cell;
pub mod collision;
pub mod entity;
pub mod generate;
pub mod geometry;
pub mod grid;
