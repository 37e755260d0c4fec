//! Integration tests for qfprom-client.
//!
//! A small in-process fuse service stands in for the kernel module. Like the
//! real one it tells read and write frames apart by how many bytes a single
//! receive returns.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use qfprom_client::protocol::{RegisterResponse, READ_REQUEST_SIZE, WRITE_REQUEST_SIZE};
use qfprom_client::{
    DeviceError, QfpromError, ReadType, RegisterClient, RegisterResult, RegisterRow,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Error code the mock returns for rows it does not know.
const NO_SUCH_ROW: u32 = 7;

#[derive(Default)]
struct FuseState {
    rows: HashMap<u32, (u32, u32)>,
    requests: Vec<Vec<u8>>,
    disconnects: usize,
}

type Shared = Arc<Mutex<FuseState>>;

async fn start_service(rows: &[(u32, u32, u32)]) -> (SocketAddr, Shared) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let state = Shared::default();
    {
        let mut s = state.lock().unwrap();
        for &(address, lsb, msb) in rows {
            s.rows.insert(address, (lsb, msb));
        }
    }

    let shared = state.clone();
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(serve(stream, shared.clone()));
        }
    });

    (addr, state)
}

async fn serve(mut stream: TcpStream, state: Shared) {
    let mut buf = [0u8; 64];
    loop {
        let n = match stream.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        let req = buf[..n].to_vec();
        let word = |at: usize| u32::from_le_bytes([req[at], req[at + 1], req[at + 2], req[at + 3]]);

        let reply = {
            let mut s = state.lock().unwrap();
            s.requests.push(req.clone());

            match (req[0], n) {
                (0x00, _) => {
                    s.disconnects += 1;
                    return;
                }
                (0x01, READ_REQUEST_SIZE) | (0x03, READ_REQUEST_SIZE) => {
                    let address = word(1);
                    let (lsb, msb, error) = match s.rows.get(&address) {
                        Some(&(lsb, msb)) => (lsb, msb, 0),
                        None => (0, 0, NO_SUCH_ROW),
                    };
                    RegisterResponse {
                        command: req[0],
                        address,
                        read_type: word(5),
                        lsb,
                        msb,
                        error,
                    }
                }
                (0x01, WRITE_REQUEST_SIZE) => {
                    let address = word(1);
                    // blown fuses stay blown
                    let row = s.rows.entry(address).or_insert((0, 0));
                    row.0 |= word(9);
                    row.1 |= word(13);
                    RegisterResponse {
                        command: 0x01,
                        address,
                        read_type: word(5),
                        lsb: row.0,
                        msb: row.1,
                        error: 0,
                    }
                }
                _ => continue,
            }
        };

        if stream.write_all(&reply.encode()).await.is_err() {
            return;
        }
    }
}

async fn wait_for_disconnect(state: &Shared) -> usize {
    for _ in 0..100 {
        let count = state.lock().unwrap().disconnects;
        if count > 0 {
            return count;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    0
}

/// Read of 0x1000 returns the row exactly as the service reported it.
#[tokio::test]
async fn test_read_end_to_end() {
    let (addr, state) = start_service(&[(0x1000, 0xAABB_CCDD, 0x1122_3344)]).await;

    let mut client = RegisterClient::connect(addr).await.unwrap();
    let result = client.read_register(0x1000, ReadType::Raw).await.unwrap();

    assert_eq!(
        result,
        RegisterResult::Row(RegisterRow {
            address: 0x1000,
            lsb: 0xAABB_CCDD,
            msb: 0x1122_3344,
        })
    );

    client.close().await.unwrap();

    assert_eq!(wait_for_disconnect(&state).await, 1);
    let requests = state.lock().unwrap().requests.clone();
    assert_eq!(
        requests,
        vec![
            vec![0x01, 0x00, 0x10, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00],
            vec![0x00],
        ]
    );
}

/// Unknown rows come back as device rejections, not errors.
#[tokio::test]
async fn test_device_error_end_to_end() {
    let (addr, _state) = start_service(&[(0x10, 1, 2)]).await;

    let mut client = RegisterClient::connect(addr).await.unwrap();
    let results = client
        .read_many([0x10, 0x18, 0x10], ReadType::Corrected)
        .await
        .unwrap();

    assert!(results[0].is_ok());
    assert_eq!(
        results[1],
        RegisterResult::Rejected(DeviceError {
            address: 0x18,
            code: NO_SUCH_ROW
        })
    );
    assert!(results[2].is_ok());

    client.close().await.unwrap();
}

/// Corrected reads carry a 1 in the type word.
#[tokio::test]
async fn test_corrected_read_on_wire() {
    let (addr, state) = start_service(&[(0x20, 0, 0)]).await;

    let mut client = RegisterClient::connect(addr).await.unwrap();
    let response = client
        .exchange(qfprom_client::RegisterRequest::Read {
            address: 0x20,
            read_type: ReadType::Corrected,
        })
        .await
        .unwrap();
    // the mock echoes the type word into read_type
    assert_eq!(response.read_type, 1);

    let first = state.lock().unwrap().requests[0].clone();
    assert_eq!(&first[5..9], &[0x01, 0x00, 0x00, 0x00]);

    client.close().await.unwrap();
}

/// A write followed by a read of the same row sees the blown bits.
#[tokio::test]
async fn test_write_then_read_back() {
    let (addr, state) = start_service(&[(0x40, 0x0000_00F0, 0)]).await;

    let mut client = RegisterClient::builder()
        .read_timeout(Duration::from_secs(5))
        .connect(addr)
        .await
        .unwrap();

    let written = client
        .write_register(0x40, 0x0000_000F, 0x8000_0000, 19_200)
        .await
        .unwrap();
    assert_eq!(
        written.row().copied(),
        Some(RegisterRow {
            address: 0x40,
            lsb: 0x0000_00FF,
            msb: 0x8000_0000,
        })
    );

    let read = client.read_register(0x40, ReadType::Raw).await.unwrap();
    assert_eq!(read.row().map(|r| r.value()), Some(0x8000_0000_0000_00FF));

    let write_frame = state.lock().unwrap().requests[0].clone();
    assert_eq!(write_frame.len(), WRITE_REQUEST_SIZE);
    assert_eq!(&write_frame[5..9], &19_200u32.to_le_bytes());

    client.close().await.unwrap();
}

/// Direct reads go out with opcode 3.
#[tokio::test]
async fn test_read_direct_end_to_end() {
    let (addr, state) = start_service(&[(0x80, 5, 6)]).await;

    let mut client = RegisterClient::connect(addr).await.unwrap();
    let result = client.read_direct(0x80).await.unwrap();
    assert_eq!(result.row().map(|r| (r.lsb, r.msb)), Some((5, 6)));
    assert_eq!(state.lock().unwrap().requests[0][0], 0x03);

    client.close().await.unwrap();
}

/// Disconnect returns without waiting for the service.
#[tokio::test]
async fn test_disconnect_does_not_block() {
    let (addr, state) = start_service(&[]).await;

    let mut client = RegisterClient::connect(addr).await.unwrap();
    tokio::time::timeout(Duration::from_secs(1), client.disconnect())
        .await
        .expect("disconnect blocked")
        .unwrap();

    assert_eq!(wait_for_disconnect(&state).await, 1);
    assert!(matches!(
        client.read_register(0, ReadType::Raw).await,
        Err(QfpromError::SessionClosed)
    ));
}

/// A service that hangs up mid-frame surfaces a transport error.
#[tokio::test]
async fn test_truncated_response() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut req = [0u8; READ_REQUEST_SIZE];
        stream.read_exact(&mut req).await.unwrap();
        stream.write_all(&[0x01, 0x00, 0x10]).await.unwrap();
    });

    let mut client = RegisterClient::connect(addr).await.unwrap();
    let err = client
        .read_register(0x1000, ReadType::Raw)
        .await
        .unwrap_err();

    assert!(err.is_transport(), "unexpected error: {}", err);
}

/// Nobody listening: connect fails as a transport error.
#[tokio::test]
async fn test_connect_refused() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = RegisterClient::connect(addr).await.err().unwrap();
    assert!(err.is_transport());
}

/// Independent connections do not interfere.
#[tokio::test]
async fn test_parallel_connections() {
    let (addr, _state) = start_service(&[(0x100, 1, 0), (0x200, 2, 0)]).await;

    let tasks: Vec<_> = [0x100u32, 0x200]
        .into_iter()
        .map(|address| {
            tokio::spawn(async move {
                let mut client = RegisterClient::connect(addr).await.unwrap();
                let mut seen = Vec::new();
                for _ in 0..10 {
                    let result = client.read_register(address, ReadType::Raw).await.unwrap();
                    seen.push(result.row().map(|r| r.lsb));
                }
                client.close().await.unwrap();
                seen
            })
        })
        .collect();

    let mut expected = 1;
    for task in tasks {
        let seen = task.await.unwrap();
        assert!(seen.iter().all(|&lsb| lsb == Some(expected)));
        expected += 1;
    }
}
