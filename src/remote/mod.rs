//! Outbound network collaborators.
//!
//! Every call here carries its own bounded timeout so a stalled
//! collaborator cannot wedge the scheduler.

pub mod gateway;
pub mod media;
pub mod search;

pub use gateway::ModelGateway;
pub use media::MediaExchange;
pub use search::VideoSearch;
