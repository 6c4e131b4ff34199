//! Wire protocol for NodeManager clients.
//!
//! This crate defines what a client and a management daemon say to each
//! other:
//!
//! - **Types** ([`Request`], [`Reply`], [`Action`]): the envelopes that
//!   travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how envelopes are
//!   converted to and from bytes.
//! - **Status** ([`StatusCode`], [`Response`], [`StatusError`]): how a
//!   reply's numeric code becomes a success value or a failure.
//! - **Errors** ([`ProtocolError`]): what can go wrong while encoding or
//!   decoding.
//!
//! # Architecture
//!
//! ```text
//! Transport (bytes) → Protocol (Reply → Response) → Client (subscribers, config)
//! ```

mod codec;
mod error;
mod status;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::{ProtocolError, StatusError};
pub use status::{Response, StatusClass, StatusCode};
pub use types::{
    Action, FieldMap, ReadCommand, Reply, Request, ScalarCommand, WriteCommand,
    WriteOp,
};
