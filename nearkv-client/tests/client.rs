use std::collections::BTreeMap;
use std::io::Write;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

use nearkv_client::{ClientConfig, ClientError, IndexClient, IndexValue};
use nearkv_common::{decode_request, encode_response, read_frame, Match, Request, Response};

fn spawn_server(expected_requests: usize, handler: fn(usize, Request, &mut TcpStream)) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");

    thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept");
        let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
        let mut reader = stream.try_clone().expect("clone");
        for idx in 0..expected_requests {
            let body = read_frame(&mut reader).expect("read frame");
            let request = decode_request(&body).expect("decode request");
            handler(idx, request, &mut stream);
        }
    });

    addr
}

fn write_response(stream: &mut TcpStream, response: &Response) {
    let mut buf = Vec::new();
    encode_response(response, &mut buf);
    stream.write_all(&buf).expect("write response");
    stream.flush().expect("flush response");
}

fn reply_info(stream: &mut TcpStream) {
    let mut info = BTreeMap::new();
    info.insert("version".to_string(), "0.1.0".to_string());
    write_response(stream, &Response::Info(info));
}

fn client_for(addr: SocketAddr) -> IndexClient {
    let mut config = ClientConfig::new(addr.ip().to_string());
    config.port = addr.port();
    config.connect_timeout = Some(Duration::from_secs(1));
    config.read_timeout = Some(Duration::from_secs(1));
    config.write_timeout = Some(Duration::from_secs(1));
    IndexClient::with_config(config).expect("client")
}

#[test]
fn construction_probes_with_info() {
    let addr = spawn_server(1, |_, request, stream| {
        assert_eq!(request, Request::Info);
        reply_info(stream);
    });

    client_for(addr);
}

#[test]
fn construction_fails_against_unreachable_endpoint() {
    // Bind and drop immediately so the port is (briefly) refusing.
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let mut config = ClientConfig::new(addr.ip().to_string());
    config.port = addr.port();
    config.connect_timeout = Some(Duration::from_millis(200));
    let err = IndexClient::with_config(config).expect_err("no server");
    assert!(matches!(err, ClientError::Connection { .. }));
}

#[test]
fn construction_fails_when_probe_is_rejected() {
    let addr = spawn_server(1, |_, request, stream| {
        assert_eq!(request, Request::Info);
        write_response(stream, &Response::Error("index not ready".to_string()));
    });

    let mut config = ClientConfig::new(addr.ip().to_string());
    config.port = addr.port();
    config.read_timeout = Some(Duration::from_secs(1));
    let err = IndexClient::with_config(config).expect_err("probe rejected");
    assert!(matches!(err, ClientError::Connection { .. }));
}

#[test]
fn info_returns_server_metadata() {
    let addr = spawn_server(2, |_, request, stream| {
        assert_eq!(request, Request::Info);
        reply_info(stream);
    });

    let mut client = client_for(addr);
    let info = client.info().expect("info");
    assert_eq!(info.get("version").map(String::as_str), Some("0.1.0"));
}

#[test]
fn set_passes_text_through_and_serializes_structured() {
    let addr = spawn_server(3, |idx, request, stream| {
        match idx {
            0 => reply_info(stream),
            1 => {
                assert_eq!(
                    request,
                    Request::Set {
                        key: "plain".to_string(),
                        value: b"words".to_vec(),
                    }
                );
                write_response(stream, &Response::Ack);
            }
            _ => {
                assert_eq!(
                    request,
                    Request::Set {
                        key: "cfg".to_string(),
                        value: b"{\"n\":1}".to_vec(),
                    }
                );
                write_response(stream, &Response::Ack);
            }
        }
    });

    let mut client = client_for(addr);
    client.set("plain", "words").expect("set text");
    client
        .set("cfg", serde_json::json!({"n": 1}))
        .expect("set structured");
}

#[test]
fn get_decodes_wire_values() {
    let addr = spawn_server(3, |idx, request, stream| match idx {
        0 => reply_info(stream),
        1 => {
            assert_eq!(
                request,
                Request::Get {
                    key: "a".to_string()
                }
            );
            write_response(stream, &Response::Value(b"1".to_vec()));
        }
        _ => write_response(stream, &Response::Value(b"plain words".to_vec())),
    });

    let mut client = client_for(addr);
    let number = client.get("a").expect("get");
    assert_eq!(number, Some(IndexValue::Structured(serde_json::json!(1))));
    let text = client.get("b").expect("get");
    assert_eq!(text, Some(IndexValue::Text("plain words".to_string())));
}

#[test]
fn missing_key_is_a_sentinel_for_get_and_an_error_for_fetch() {
    let addr = spawn_server(3, |idx, request, stream| {
        if idx == 0 {
            reply_info(stream);
            return;
        }
        assert_eq!(
            request,
            Request::Get {
                key: "ghost".to_string()
            }
        );
        // Empty value is the server's miss signal.
        write_response(stream, &Response::Value(Vec::new()));
    });

    let mut client = client_for(addr);
    assert_eq!(client.get("ghost").expect("get"), None);
    let err = client.fetch("ghost").expect_err("fetch");
    match err {
        ClientError::KeyNotFound(key) => assert_eq!(key, "ghost"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn mset_sends_one_batched_request() {
    let addr = spawn_server(2, |idx, request, stream| {
        if idx == 0 {
            reply_info(stream);
            return;
        }
        assert_eq!(
            request,
            Request::MSet {
                pairs: vec![
                    ("a".to_string(), b"1".to_vec()),
                    ("b".to_string(), b"2".to_vec()),
                ],
            }
        );
        write_response(stream, &Response::Ack);
    });

    let mut client = client_for(addr);
    let mut pairs = BTreeMap::new();
    pairs.insert("a".to_string(), IndexValue::from("1"));
    pairs.insert("b".to_string(), IndexValue::from("2"));
    client.mset(&pairs).expect("mset");
}

#[test]
fn get_fuzzy_forwards_bounds_and_preserves_server_order() {
    let addr = spawn_server(2, |idx, request, stream| {
        if idx == 0 {
            reply_info(stream);
            return;
        }
        assert_eq!(
            request,
            Request::GetFuzzy {
                key: "apple".to_string(),
                max_edit_distance: 2,
                min_exact_prefix: 3,
            }
        );
        // Deliberately not distance-sorted; the client must not re-rank.
        write_response(
            stream,
            &Response::Matches(vec![
                Match {
                    key: "apply".to_string(),
                    distance: 1,
                    raw_value: Vec::new(),
                },
                Match {
                    key: "apple".to_string(),
                    distance: 0,
                    raw_value: b"v".to_vec(),
                },
            ]),
        );
    });

    let mut client = client_for(addr);
    let matches = client.get_fuzzy("apple", 2, 3).expect("get_fuzzy");
    let keys: Vec<&str> = matches.iter().map(|m| m.key.as_str()).collect();
    assert_eq!(keys, ["apply", "apple"]);
    assert_eq!(matches[1].value(), Some(IndexValue::Text("v".to_string())));
}

#[test]
fn get_near_forwards_greedy_flag() {
    let addr = spawn_server(2, |idx, request, stream| {
        if idx == 0 {
            reply_info(stream);
            return;
        }
        assert_eq!(
            request,
            Request::GetNear {
                key: "apple".to_string(),
                min_exact_prefix: 2,
                greedy: true,
            }
        );
        write_response(stream, &Response::Matches(Vec::new()));
    });

    let mut client = client_for(addr);
    let matches = client.get_near("apple", 2, true).expect("get_near");
    assert!(matches.is_empty());
}

#[test]
fn flush_forwards_the_mode() {
    let addr = spawn_server(3, |idx, request, stream| match idx {
        0 => reply_info(stream),
        1 => {
            assert_eq!(request, Request::Flush { asynchronous: false });
            write_response(stream, &Response::Ack);
        }
        _ => {
            assert_eq!(request, Request::Flush { asynchronous: true });
            write_response(stream, &Response::Ack);
        }
    });

    let mut client = client_for(addr);
    client.flush(false).expect("sync flush");
    client.flush(true).expect("async flush");
}

#[test]
fn force_merge_forwards_max_segments() {
    let addr = spawn_server(2, |idx, request, stream| {
        if idx == 0 {
            reply_info(stream);
            return;
        }
        assert_eq!(request, Request::ForceMerge { max_segments: 4 });
        write_response(stream, &Response::Ack);
    });

    let mut client = client_for(addr);
    client.force_merge(4).expect("force_merge");
}

#[test]
fn force_merge_rejects_zero_segments_locally() {
    // Only the probe reaches the server.
    let addr = spawn_server(1, |_, request, stream| {
        assert_eq!(request, Request::Info);
        reply_info(stream);
    });

    let mut client = client_for(addr);
    let err = client.force_merge(0).expect_err("zero segments");
    assert!(matches!(err, ClientError::InvalidMaxSegments));
}

#[test]
fn server_error_replies_propagate_unchanged() {
    let addr = spawn_server(2, |idx, _, stream| {
        if idx == 0 {
            reply_info(stream);
            return;
        }
        write_response(stream, &Response::Error("segment corrupt".to_string()));
    });

    let mut client = client_for(addr);
    let err = client.get("a").expect_err("server error");
    match err {
        ClientError::Server(message) => assert_eq!(message, "segment corrupt"),
        other => panic!("unexpected error: {other}"),
    }
}
