use crate::wire::Message;

/// `Ping`/`Pong` carry no state beyond resetting the peer's idle timer
/// (§4.C); `Pong` needs no handler entry since it produces no reply.
pub fn handle_ping(padding: Vec<u8>) -> Message {
    Message::Pong { padding }
}
