pub mod collision;
pub mod physics;
pub mod spawner;
