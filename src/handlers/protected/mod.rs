// handlers/protected/mod.rs - Protected handlers (bearer token required)
//
// Each route group declares its AccessPolicy where it is mounted in app.rs.
pub mod buggy;
pub mod members;
