#![allow(dead_code)] // Test helpers appear unused when compiled independently

use std::collections::HashMap;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;

/// How the mock store misbehaves, for failure-isolation tests.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum FailureMode {
    #[default]
    None,
    /// Accept connections and immediately drop them.
    CloseOnConnect,
    /// Accept connections, read commands, never reply.
    Unresponsive,
}

#[derive(Clone, Default)]
struct StoreState {
    entries: Arc<Mutex<HashMap<String, String>>>,
    commands: Arc<Mutex<Vec<String>>>,
    conns: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

/// Minimal memcached-speaking server: `set`/`get` over the text protocol,
/// with a command log for asserting what the client put on the wire.
pub struct MockMemcached {
    addr: String,
    state: StoreState,
    shutdown_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl MockMemcached {
    pub async fn spawn() -> Self {
        Self::spawn_with(FailureMode::None).await
    }

    pub async fn spawn_with(mode: FailureMode) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind mock memcached listener");
        Self::serve(listener, mode).await
    }

    /// Bind a specific port, for restart-on-the-same-address tests.
    pub async fn spawn_on(port: u16) -> Self {
        let listener = TcpListener::bind(("127.0.0.1", port))
            .await
            .expect("failed to bind mock memcached listener");
        Self::serve(listener, FailureMode::None).await
    }

    async fn serve(listener: TcpListener, mode: FailureMode) -> Self {
        let addr = format!(
            "127.0.0.1:{}",
            listener.local_addr().expect("listener has no addr").port()
        );
        let state = StoreState::default();
        let accept_state = state.clone();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => return,
                    accepted = listener.accept() => {
                        let Ok((stream, _)) = accepted else { return };
                        match mode {
                            FailureMode::CloseOnConnect => drop(stream),
                            FailureMode::Unresponsive => {
                                let conn = tokio::spawn(swallow(stream));
                                accept_state.conns.lock().await.push(conn);
                            }
                            FailureMode::None => {
                                let conn = tokio::spawn(serve_conn(stream, accept_state.clone()));
                                accept_state.conns.lock().await.push(conn);
                            }
                        }
                    }
                }
            }
        });

        Self {
            addr,
            state,
            shutdown_tx,
            handle,
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn port(&self) -> u16 {
        self.addr
            .rsplit(':')
            .next()
            .and_then(|p| p.parse().ok())
            .expect("mock addr has no port")
    }

    /// Every command line the server has received, in order.
    pub async fn commands(&self) -> Vec<String> {
        self.state.commands.lock().await.clone()
    }

    /// Raw stored value for a key, bypassing the protocol.
    pub async fn entry(&self, key: &str) -> Option<String> {
        self.state.entries.lock().await.get(key).cloned()
    }

    /// Stop accepting and tear down live connections so clients observe a
    /// dead store.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(());
        let _ = self.handle.await;
        for conn in self.state.conns.lock().await.drain(..) {
            conn.abort();
        }
    }
}

async fn swallow(stream: TcpStream) {
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
    }
}

async fn serve_conn(stream: TcpStream, state: StoreState) {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut line = String::new();

    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
        let command = line.trim_end().to_string();
        state.commands.lock().await.push(command.clone());

        let parts: Vec<&str> = command.split_whitespace().collect();
        let reply: Vec<u8> = match parts.as_slice() {
            ["set", key, _flags, _exptime, _len] => {
                let mut data = String::new();
                if reader.read_line(&mut data).await.unwrap_or(0) == 0 {
                    return;
                }
                state
                    .entries
                    .lock()
                    .await
                    .insert(key.to_string(), data.trim_end().to_string());
                b"STORED\r\n".to_vec()
            }
            ["get", key] => match state.entries.lock().await.get(*key) {
                Some(value) => {
                    format!("VALUE {} 0 {}\r\n{}\r\nEND\r\n", key, value.len(), value)
                        .into_bytes()
                }
                None => b"END\r\n".to_vec(),
            },
            _ => b"ERROR\r\n".to_vec(),
        };

        if write_half.write_all(&reply).await.is_err() {
            return;
        }
    }
}

/// Best-effort check for whether binding to loopback is permitted in the current sandbox.
pub async fn can_bind_loopback() -> bool {
    match TcpListener::bind("127.0.0.1:0").await {
        Ok(listener) => {
            drop(listener);
            true
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => false,
        Err(_) => true, // treat other errors as non-fatal for skipping
    }
}

/// Find an available TCP port
pub async fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}
