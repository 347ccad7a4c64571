pub mod state;

pub use state::{BoardAction, BoardState};
