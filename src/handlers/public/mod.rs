// handlers/public/mod.rs - Public handlers (no authentication required)
pub mod buggy;
pub mod status;
