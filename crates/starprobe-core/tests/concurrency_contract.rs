//! Contract Test: Stateless Concurrent Operation
//!
//! Every core operation is a per-request unit of work. Running many of them
//! at once must give each caller exactly its own answer.

mod common;

use bytes::Bytes;
use common::*;
use starprobe_core::download::{ByteStreamRequest, RandomByteStream};
use starprobe_core::probe::latency_probe;
use starprobe_core::upload::StreamChunkSource;
use starprobe_core::{
    ClientAddress, DownloadConfig, IspClassifier, ProbeAck, UploadBody, UploadConsumer,
};
use std::sync::Arc;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_uploads_count_independently() {
    let consumer = UploadConsumer::default();

    let handles: Vec<_> = (0..32usize)
        .map(|i| {
            let consumer = consumer.clone();
            tokio::spawn(async move {
                let size = 1000 * (i + 1);
                let frames = vec![Ok::<_, std::io::Error>(Bytes::from(vec![0u8; size]))];
                let body = UploadBody::chunked(StreamChunkSource::new(tokio_stream::iter(frames)));
                (size, consumer.consume(body).await.unwrap())
            })
        })
        .collect();

    for handle in handles {
        let (size, result) = handle.await.unwrap();
        assert_eq!(result.received_bytes, size as u64);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_downloads_are_exact() {
    let config = DownloadConfig {
        default_bytes: 1000,
        max_bytes: 500_000,
        chunk_size: 65536,
    };

    let handles: Vec<_> = (1..=16i128)
        .map(|i| {
            let config = config.clone();
            tokio::spawn(async move {
                let request = ByteStreamRequest::new(i * 30_001);
                let stream = RandomByteStream::for_request(&request, &config);
                let expected = request.effective_size(&config);
                (expected, stream.map(|c| c.len() as u64).sum::<u64>())
            })
        })
        .collect();

    for handle in handles {
        let (expected, actual) = handle.await.unwrap();
        assert_eq!(expected, actual);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_classification_is_isolated() {
    let lookup = Arc::new(StaticLookup::new("Comcast", "Comcast Cable", "AS7922 Comcast"));
    let classifier = IspClassifier::new(lookup.clone());

    let handles: Vec<_> = (0..20)
        .map(|i| {
            let classifier = classifier.clone();
            tokio::spawn(async move {
                let literal = if i % 2 == 0 { "127.0.0.1".to_string() } else { format!("203.0.113.{}", i) };
                let info = classifier.classify(Some(ClientAddress::new(literal.clone()))).await;
                (literal, info)
            })
        })
        .collect();

    for handle in handles {
        let (literal, info) = handle.await.unwrap();
        assert_eq!(info.ip, Some(ClientAddress::new(literal.clone())));
        assert_eq!(info.is_starlink, literal == "127.0.0.1");
    }

    // Only the non-loopback half reached the lookup
    assert_eq!(lookup.call_count(), 10);
}

#[test]
fn probe_has_no_observable_state() {
    let responses: Vec<ProbeAck> = (0..1000).map(|_| latency_probe()).collect();
    assert!(responses.iter().all(|ack| *ack == ProbeAck));
}
