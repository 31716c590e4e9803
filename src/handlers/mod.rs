// handlers/mod.rs - Handler tiers
//
// Public (no auth) → Protected (bearer token, optionally a role)
pub mod public;
pub mod protected;
