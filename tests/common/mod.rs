#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

pub const ARCHIVE_COMMENT: &str = "sample archive written by the zip crate";

pub fn lorem(len: usize) -> Vec<u8> {
    b"Lorem ipsum dolor sit amet, consectetur adipiscing elit. "
        .iter()
        .copied()
        .cycle()
        .take(len)
        .collect()
}

/// (name, contents, deflated) for every file in [`sample_archive`], in write order.
pub fn sample_files() -> Vec<(&'static str, Vec<u8>, bool)> {
    vec![
        ("readme.txt", b"zipscan sample archive\n".to_vec(), false),
        ("src/lib.rs", lorem(10_000), true),
        ("data/blob.bin", (0..=255u8).cycle().take(200_000).collect(), false),
        ("empty.txt", Vec::new(), false),
    ]
}

/// An archive written by the `zip` crate: one directory entry followed by [`sample_files`].
pub fn sample_archive(large_file: bool) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = |method: CompressionMethod| {
        SimpleFileOptions::default()
            .compression_method(method)
            .large_file(large_file)
    };

    writer
        .add_directory("docs/", options(CompressionMethod::Stored))
        .unwrap();
    for (name, contents, deflated) in sample_files() {
        let method = if deflated {
            CompressionMethod::Deflated
        } else {
            CompressionMethod::Stored
        };
        writer
            .start_file(name, options(method))
            .unwrap();
        writer.write_all(&contents).unwrap();
    }
    writer.set_comment(ARCHIVE_COMMENT);
    writer.finish().unwrap().into_inner()
}

pub fn crc32(data: &[u8]) -> u32 {
    let mut crc = flate2::Crc::new();
    crc.update(data);
    crc.sum()
}

/// Minimal HTTP/1.1 server for `data`: answers HEAD and (ranged) GET, one request per connection.
pub struct TestServer {
    pub url: String,
    pub requests: Arc<AtomicUsize>,
}

pub async fn serve(data: Vec<u8>, accept_ranges: bool) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/archive.zip", listener.local_addr().unwrap());
    let data = Arc::new(data);
    let requests = Arc::new(AtomicUsize::new(0));

    let counter = requests.clone();
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let data = data.clone();
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let request = String::from_utf8_lossy(&request).to_string();
                let response = respond(&request, &data, accept_ranges);
                let _ = stream.write_all(&response).await;
                let _ = stream.shutdown().await;
            });
        }
    });

    TestServer { url, requests }
}

fn respond(request: &str, data: &[u8], accept_ranges: bool) -> Vec<u8> {
    let ranges_header = if accept_ranges {
        "Accept-Ranges: bytes\r\n"
    } else {
        ""
    };

    if request.starts_with("HEAD ") {
        return format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\n{ranges_header}Connection: close\r\n\r\n",
            data.len()
        )
        .into_bytes();
    }

    let range = request.lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        if !name.eq_ignore_ascii_case("range") {
            return None;
        }
        let (start, end) = value.trim().strip_prefix("bytes=")?.split_once('-')?;
        Some((start.parse::<usize>().ok()?, end.parse::<usize>().ok()?))
    });

    match range {
        Some((start, end)) if accept_ranges && start <= end && end < data.len() => {
            let body = &data[start..=end];
            let mut response = format!(
                "HTTP/1.1 206 Partial Content\r\nContent-Length: {}\r\nContent-Range: bytes {start}-{end}/{}\r\nConnection: close\r\n\r\n",
                body.len(),
                data.len()
            )
            .into_bytes();
            response.extend_from_slice(body);
            response
        }
        _ => {
            let mut response = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                data.len()
            )
            .into_bytes();
            response.extend_from_slice(data);
            response
        }
    }
}
