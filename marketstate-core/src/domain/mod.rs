//! Domain types shared by the host adapter and the runner.

pub mod bar;

pub use bar::Bar;
