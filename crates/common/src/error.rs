use std::collections::TryReserveError;

/// Erros do store de texto.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("falha ao escrever no buffer: {0}")]
    BufferWrite(#[from] TryReserveError),
    #[error("TTL fixo exige um runtime Tokio ativo")]
    NoRuntime,
}

/// Erros de parsing de TTL (`none`, `400ms`, `2s`, `5m`).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TtlParseError {
    #[error("TTL vazio")]
    Empty,
    #[error("número inválido no TTL: {0}")]
    InvalidNumber(String),
    #[error("unidade de TTL inválida: {0}. Use: ms, s, m")]
    InvalidUnit(String),
}

/// Result type alias.
pub type StoreResult<T> = Result<T, StoreError>;
