use anyhow::Result;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use redis_lite::cli::ReplicaOf;
use redis_lite::error::HandshakeError;
use redis_lite::replica::{replica_handler, HandshakeState};

/// Answers each request it receives with the next canned reply, then hangs up.
async fn mock_primary(replies: Vec<&'static str>) -> Result<(ReplicaOf, JoinHandle<Vec<u8>>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();

    let task = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("replica never connected");
        let mut received = Vec::new();
        for reply in replies {
            let mut buf = [0u8; 512];
            let n = socket.read(&mut buf).await.unwrap_or(0);
            if n == 0 {
                break;
            }
            received.extend_from_slice(&buf[..n]);
            if socket.write_all(reply.as_bytes()).await.is_err() {
                break;
            }
        }
        received
    });

    Ok((
        ReplicaOf {
            host: "127.0.0.1".into(),
            port,
        },
        task,
    ))
}

#[tokio::test]
async fn handshake_succeeds() -> Result<()> {
    let (primary, task) = mock_primary(vec![
        "+PONG\r\n",
        "+OK\r\n",
        "+OK\r\n",
        "+FULLRESYNC abcxyz 0\r\n",
    ])
    .await?;

    replica_handler(&primary, 6380).await?;

    let received = String::from_utf8(task.await?)?;
    assert!(received.starts_with("*1\r\n$4\r\nPING\r\n"));
    assert!(received.contains("$14\r\nlistening-port\r\n$4\r\n6380\r\n"));
    assert!(received.contains("$4\r\ncapa\r\n$6\r\npsync2\r\n"));
    assert!(received.ends_with("*3\r\n$5\r\nPSYNC\r\n$1\r\n?\r\n$2\r\n-1\r\n"));
    Ok(())
}

#[tokio::test]
async fn handshake_fails_on_unexpected_pong() -> Result<()> {
    let (primary, task) = mock_primary(vec!["+OK\r\n"]).await?;

    let err = replica_handler(&primary, 6380).await.unwrap_err();
    assert!(matches!(
        err,
        HandshakeError::UnexpectedReply {
            state: HandshakeState::AwaitPong,
            ..
        }
    ));
    task.await?;
    Ok(())
}

#[tokio::test]
async fn handshake_fails_on_rejected_replconf() -> Result<()> {
    let (primary, task) = mock_primary(vec!["+PONG\r\n", "-ERR not today\r\n"]).await?;

    let err = replica_handler(&primary, 6380).await.unwrap_err();
    assert!(matches!(
        err,
        HandshakeError::UnexpectedReply {
            state: HandshakeState::AwaitReplconf1,
            ..
        }
    ));
    task.await?;
    Ok(())
}

#[tokio::test]
async fn handshake_fails_when_primary_hangs_up() -> Result<()> {
    let (primary, task) = mock_primary(vec!["+PONG\r\n"]).await?;

    let err = replica_handler(&primary, 6380).await.unwrap_err();
    assert!(matches!(
        err,
        HandshakeError::ConnectionClosed(HandshakeState::AwaitReplconf1)
            | HandshakeError::Resp(_)
    ));
    task.await?;
    Ok(())
}
