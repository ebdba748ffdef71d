//! Faults surfaced to the peripheral stack.
//!
//! The stack maps these onto its own error vocabulary when answering the
//! remote peer; the `Display` renderings are the BlueZ error names each
//! variant corresponds to.

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Fault {
    #[error("org.freedesktop.DBus.Error.InvalidArgs")]
    InvalidArgs,
    #[error("org.bluez.Error.NotSupported")]
    NotSupported,
    /// Write value failed validation
    #[error("org.bluez.Error.NotPermitted")]
    NotPermitted,
    /// Write payload has the wrong byte length for its codec
    #[error("org.bluez.Error.InvalidValueLength")]
    InvalidValueLength,
    /// Backend call failed after the value passed validation
    #[error("org.bluez.Error.Failed")]
    Failed,
}
