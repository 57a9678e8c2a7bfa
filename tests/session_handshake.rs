//! End-to-end Noise-XK handshake and message exchange over a real TCP
//! loopback connection (§4.C), exercising `SecureChannel` the way
//! `ConnectionManager` and `spawn_peer_session` do in production.

use drawbridge_node::keys::NodeKey;
use drawbridge_node::session::SecureChannel;
use drawbridge_node::wire::Message;
use tokio::net::{TcpListener, TcpStream};

#[tokio::test]
async fn handshake_then_message_round_trip() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let responder_key = NodeKey::generate();
    let initiator_key = NodeKey::generate();
    let responder_pub = responder_key.public_key();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        SecureChannel::handshake_inbound(stream, &responder_key)
            .await
            .unwrap()
    });

    let client_stream = TcpStream::connect(addr).await.unwrap();
    let mut client = SecureChannel::handshake_outbound(client_stream, &initiator_key, responder_pub)
        .await
        .unwrap();

    let mut server = server.await.unwrap();
    assert_eq!(server.remote_static, initiator_key.public_key());

    let ping = Message::Ping {
        padding: vec![0xab; 16],
    };
    client.send(&ping).await.unwrap();
    let received = server.recv().await.unwrap();
    match received {
        Message::Ping { padding } => assert_eq!(padding, vec![0xab; 16]),
        other => panic!("unexpected message: {other:?}"),
    }

    let pong = Message::Pong {
        padding: vec![0xcd; 4],
    };
    server.send(&pong).await.unwrap();
    let received = client.recv().await.unwrap();
    match received {
        Message::Pong { padding } => assert_eq!(padding, vec![0xcd; 4]),
        other => panic!("unexpected message: {other:?}"),
    }
}
