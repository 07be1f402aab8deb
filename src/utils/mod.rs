pub mod flatten;
pub mod suggest;
