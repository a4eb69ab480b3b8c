use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use crate::error::StoreError;
use crate::ports::catalog::{AlbumType, CandidateAlbum};
use crate::ports::clock::Clock;
use crate::ports::store::{SettingsStore, StoredSettings};

/// Clock that only moves when a test tells it to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicI64,
}

impl ManualClock {
    pub fn at(now_ms: i64) -> Self {
        Self {
            now_ms: AtomicI64::new(now_ms),
        }
    }

    pub fn set(&self, now_ms: i64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    settings: Mutex<StoredSettings>,
}

impl MemoryStore {
    pub fn with(settings: StoredSettings) -> Self {
        Self {
            settings: Mutex::new(settings),
        }
    }

    pub fn with_credentials(client_id: &str, client_secret: &str) -> Self {
        Self::with(StoredSettings {
            client_id: Some(client_id.to_string()),
            client_secret: Some(client_secret.to_string()),
            ..StoredSettings::default()
        })
    }

    pub fn snapshot(&self) -> StoredSettings {
        self.settings.lock().unwrap().clone()
    }
}

impl SettingsStore for MemoryStore {
    fn load(&self) -> Result<StoredSettings, StoreError> {
        Ok(self.snapshot())
    }

    fn save(&self, settings: &StoredSettings) -> Result<(), StoreError> {
        *self.settings.lock().unwrap() = settings.clone();
        Ok(())
    }
}

pub fn candidate(
    id: &str,
    name: &str,
    artists: &[&str],
    album_type: AlbumType,
    total_tracks: u32,
) -> CandidateAlbum {
    CandidateAlbum {
        id: id.to_string(),
        uri: format!("spotify:album:{}", id),
        name: name.to_string(),
        artists: artists.iter().map(|artist| artist.to_string()).collect(),
        album_type,
        total_tracks,
        images: vec![],
        external_url: format!("https://open.spotify.com/album/{}", id),
    }
}

/// Accept a single HTTP/1.1 request on a local port, answer it with `status`
/// and a JSON `body`, and hand back the raw request text.
///
/// Returns the server's base URL, e.g. `http://127.0.0.1:40123`.
pub async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;

        let response = format!(
            "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();

        request
    });

    (base_url, handle)
}

async fn read_request(socket: &mut TcpStream) -> String {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let read = socket.read(&mut chunk).await.unwrap();
        assert!(read > 0, "connection closed before headers were complete");
        buffer.extend_from_slice(&chunk[..read]);
        if let Some(pos) = buffer.windows(4).position(|window| window == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let headers = String::from_utf8_lossy(&buffer[..header_end]).to_string();
    let content_length = headers
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buffer.len() < header_end + content_length {
        let read = socket.read(&mut chunk).await.unwrap();
        assert!(read > 0, "connection closed before body was complete");
        buffer.extend_from_slice(&chunk[..read]);
    }

    String::from_utf8_lossy(&buffer).to_string()
}

/// Value of the first header called `name`, compared case-insensitively.
pub fn header<'a>(request: &'a str, name: &str) -> Option<&'a str> {
    request
        .split("\r\n\r\n")
        .next()?
        .lines()
        .skip(1)
        .filter_map(|line| line.split_once(':'))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case(name))
        .map(|(_, value)| value.trim())
}
