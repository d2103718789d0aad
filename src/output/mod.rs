pub mod plot;
pub mod write;

pub use plot::plot_ratio;
pub use write::write_csv;
