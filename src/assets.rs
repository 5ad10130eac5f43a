pub mod stamps;
