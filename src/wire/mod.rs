//! Codec & wire (§4.A): framing, the message type registry, and the shared
//! byte-level primitives `sig_data`/`wire_data`/`gen_output_ids` build on.

mod framing;
mod message;
pub mod types;

pub use framing::{read_frame, write_frame, MAGIC};
pub use message::{
    Message, TYPE_ACCEPT_CHANNEL, TYPE_FUNDING_CREATED, TYPE_FUNDING_LOCKED, TYPE_FUNDING_SIGNED,
    TYPE_INIT, TYPE_INITIATE_SWAP, TYPE_INVOICE_EXECUTED, TYPE_INVOICE_GENERATED, TYPE_OPEN_CHANNEL,
    TYPE_PING, TYPE_PONG, TYPE_SWAP_ACCEPTED,
};
