//! Quote errors.

use mm_core::BookState;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuoteError {
    /// The snapshot is missing one or both sides.
    #[error("Order book not quotable: {0}")]
    Unquotable(BookState),

    #[error("Spread fraction must be in (0, 1), got {0}")]
    InvalidSpread(Decimal),
}

pub type QuoteResult<T> = Result<T, QuoteError>;
