pub mod batch;
pub mod solver;

pub use batch::{BatchDriver, BatchReport};
pub use solver::{Solution, Solver, SolverConfig};
