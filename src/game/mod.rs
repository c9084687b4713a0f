pub mod constants;
pub mod state;
pub mod systems;
pub mod difficulty;
pub mod session;
pub mod flow;
pub mod ui;
