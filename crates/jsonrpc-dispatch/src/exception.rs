//! Application failures and their kind chains.
//!
//! Procedures fail in one of two ways. Protocol errors ([`RpcError`]) are
//! serialized as-is. Anything else is an application error: a type
//! implementing [`Exception`], boxed into a [`Fault`] together with the kind
//! chain used to pick an error handler.

use std::backtrace::Backtrace;
use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::error::RpcError;

/// Kind every chain ends with.
pub const BASE_EXCEPTION: &str = "Exception";

/// An application error type that error handlers can be registered for.
///
/// `ancestors` lists the parent kinds from the immediate parent upwards; the
/// universal [`BASE_EXCEPTION`] is appended automatically.
///
/// ```rust
/// use jsonrpc_dispatch::exception::Exception;
///
/// #[derive(Debug, thiserror::Error)]
/// #[error("account {0} is locked")]
/// struct AccountLocked(u64);
///
/// impl Exception for AccountLocked {
///     const KIND: &'static str = "AccountLocked";
///
///     fn ancestors() -> &'static [&'static str] {
///         &["PermissionError"]
///     }
/// }
/// ```
pub trait Exception: StdError + Send + Sync + 'static {
    const KIND: &'static str;

    fn ancestors() -> &'static [&'static str] {
        &[]
    }
}

/// A boxed application error with its kind chain, most derived first.
pub struct Fault {
    error: Box<dyn StdError + Send + Sync + 'static>,
    chain: Vec<&'static str>,
    backtrace: Backtrace,
}

impl Fault {
    pub fn new<E: Exception>(error: E) -> Self {
        Self::with_kind(E::KIND, E::ancestors(), Box::new(error))
    }

    /// Wrap an arbitrary error under an explicit kind chain
    pub fn with_kind(
        kind: &'static str,
        ancestors: &[&'static str],
        error: Box<dyn StdError + Send + Sync + 'static>,
    ) -> Self {
        let mut chain = Vec::with_capacity(ancestors.len() + 2);
        chain.push(kind);
        chain.extend(ancestors.iter().copied().filter(|k| *k != kind));
        if chain.last() != Some(&BASE_EXCEPTION) {
            chain.push(BASE_EXCEPTION);
        }
        Self {
            error,
            chain,
            backtrace: Backtrace::capture(),
        }
    }

    /// A fault of the base kind carrying only a message
    pub fn msg(message: impl fmt::Display) -> Self {
        Self::with_kind(
            BASE_EXCEPTION,
            &[],
            Box::new(MessageError(message.to_string())),
        )
    }

    pub fn kind(&self) -> &'static str {
        self.chain[0]
    }

    pub fn kind_chain(&self) -> &[&'static str] {
        &self.chain
    }

    /// Whether `E` is this fault's kind or one of its ancestors
    pub fn is<E: Exception>(&self) -> bool {
        self.chain.contains(&E::KIND)
    }

    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.error.downcast_ref::<E>()
    }

    pub fn message(&self) -> String {
        self.error.to_string()
    }

    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    pub fn get_ref(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.error.as_ref()
    }
}

impl fmt::Debug for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fault")
            .field("kind", &self.kind())
            .field("chain", &self.chain)
            .field("error", &self.error)
            .finish()
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl StdError for Fault {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.error.source()
    }
}

impl<E: Exception> From<E> for Fault {
    fn from(error: E) -> Self {
        Fault::new(error)
    }
}

#[derive(Debug, Error)]
#[error("{0}")]
struct MessageError(String);

/// Raised when a procedure exceeds the configured timeout
#[derive(Debug, Error)]
#[error("procedure '{method}' timed out after {}ms", timeout.as_millis())]
pub struct TimeoutError {
    pub method: String,
    pub timeout: Duration,
}

impl Exception for TimeoutError {
    const KIND: &'static str = "TimeoutError";
}

/// Raised when a procedure panics while being invoked
#[derive(Debug, Error)]
#[error("{message}")]
pub struct PanicError {
    pub method: String,
    pub message: String,
}

impl Exception for PanicError {
    const KIND: &'static str = "PanicError";
}

/// The synthesized fault handed to a `ServerError` fallback handler
#[derive(Debug, Error)]
#[error("{original}")]
pub struct ServerFault {
    pub original: Fault,
}

impl Exception for ServerFault {
    const KIND: &'static str = "ServerError";
}

/// The failure half of a procedure's result
#[derive(Debug, Error)]
pub enum ProcedureError {
    #[error(transparent)]
    Rpc(#[from] RpcError),
    #[error(transparent)]
    Fault(#[from] Fault),
}

impl ProcedureError {
    pub fn msg(message: impl fmt::Display) -> Self {
        ProcedureError::Fault(Fault::msg(message))
    }

    pub fn as_rpc(&self) -> Option<&RpcError> {
        match self {
            ProcedureError::Rpc(error) => Some(error),
            ProcedureError::Fault(_) => None,
        }
    }

    pub fn as_fault(&self) -> Option<&Fault> {
        match self {
            ProcedureError::Fault(fault) => Some(fault),
            ProcedureError::Rpc(_) => None,
        }
    }
}

impl<E: Exception> From<E> for ProcedureError {
    fn from(error: E) -> Self {
        ProcedureError::Fault(Fault::new(error))
    }
}
