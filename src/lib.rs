pub mod config;
pub mod geo;
pub mod load;
pub mod normalize;
pub mod pipeline;
pub mod render;
pub mod transform;

pub use config::Config;
pub use pipeline::run;
