// ── Paw Atoms Layer ────────────────────────────────────────────────────────
// Constants, error types, the swap data model and the provider trait.
// Dependency rule: atoms hold no I/O. The only engine import allowed is the
// pure hex/checksum helpers in engine::dex::primitives.

pub mod constants;
pub mod error;
pub mod traits;
pub mod types;
