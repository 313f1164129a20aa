//! Error taxonomy for the matching and verification engine
use crate::contract::ContractStatus;

/// Field-level failures when validating contract input
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("crop name must not be empty")]
    EmptyCrop,
    #[error("unit must not be empty")]
    EmptyUnit,
    #[error("quantity must be greater than zero")]
    ZeroQuantity,
    #[error("strike price must be greater than zero")]
    ZeroStrikePrice,
    #[error("party id must not be empty")]
    EmptyParty,
    #[error("delivery window is not set")]
    MissingDeliveryWindow,
    #[error("unrecognised delivery window: {0}")]
    UnrecognisedDeliveryWindow(String),
    #[error("party already holds the other side of this contract")]
    SelfAcceptance,
    #[error("malformed sha-256 digest: {0}")]
    MalformedDigest(String),
}

/// The stable error surface of the engine. Callers can rely on the variant
/// alone to tell "you lost the race" apart from "this does not exist".
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("contract not found: {0}")]
    NotFound(String),
    #[error("transition rejected, contract is {current:?}")]
    Conflict { current: ContractStatus },
    #[error("contract store unavailable: {0}")]
    Dependency(#[from] sled::Error),
    #[error("internal engine failure: {0}")]
    Internal(#[from] anyhow::Error),
}

// Record codec failures are not user errors, they mean a corrupt row or a
// schema bug. Surface them on the Internal arm.
impl From<minicbor::decode::Error> for EngineError {
    fn from(err: minicbor::decode::Error) -> Self {
        Self::Internal(anyhow::Error::new(err))
    }
}

impl From<minicbor::encode::Error<std::convert::Infallible>> for EngineError {
    fn from(err: minicbor::encode::Error<std::convert::Infallible>) -> Self {
        Self::Internal(anyhow::Error::new(err))
    }
}
