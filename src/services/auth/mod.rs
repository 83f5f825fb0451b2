pub mod clock;
pub mod credentials;
pub mod error;
pub mod factory;
pub mod failure;
pub mod gate;
pub mod policy;
pub mod principal;
pub mod token_codec;
pub mod whitelist;

pub use error::AuthError;
pub use factory::build_gate;
pub use gate::{AuthorizationGate, GateDecision, GateState};
pub use principal::Principal;
pub use token_codec::TokenCodec;
