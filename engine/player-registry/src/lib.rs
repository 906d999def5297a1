//! Player Registry - resolves tennis players to stable identities
//!
//! Names from different sources are matched on their normalized form within a
//! tour; live API players are matched on the provider's id. Unknown players
//! are created on first sighting.

pub mod registry;
pub mod types;

pub use registry::{resolve_id, PlayerRegistry, PlayerResolver};
pub use types::{IdentityCache, ResolvedPlayer, ResolverStats};
