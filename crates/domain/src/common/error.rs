use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("invalid rule: {0}")]
    InvalidRule(String),

    #[error("invalid packet: {0}")]
    InvalidPacket(String),

    #[error("address family mismatch: {0}")]
    AddressFamilyMismatch(String),
}
