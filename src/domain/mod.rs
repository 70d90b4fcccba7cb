pub mod entity;
pub mod grid;
pub mod layout;
pub mod maze;
pub mod physics;
