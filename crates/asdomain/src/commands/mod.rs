pub mod converge;
pub mod destroy;
pub mod plan;
