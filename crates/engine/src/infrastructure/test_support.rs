//! Shared helpers for adapter tests that talk to a local stub server.

use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::http::{header::AUTHORIZATION, HeaderMap};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use tokio::net::TcpListener;

/// Bearer keys in the order the stub received them.
pub(crate) type KeyLog = Arc<Mutex<Vec<String>>>;

pub(crate) async fn spawn_stub(router: axum::Router) -> (SocketAddr, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    (addr, handle)
}

/// Record the request's bearer key and return it.
pub(crate) fn record_key(log: &KeyLog, headers: &HeaderMap) -> String {
    let key = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or_default()
        .to_string();
    log.lock().unwrap().push(key.clone());
    key
}

pub(crate) fn logged_keys(log: &KeyLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([10, 20, 30])));
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, ImageFormat::Png).unwrap();
    buffer.into_inner()
}
