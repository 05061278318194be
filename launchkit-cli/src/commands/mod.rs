pub mod export;
pub mod launch;
pub mod state;
