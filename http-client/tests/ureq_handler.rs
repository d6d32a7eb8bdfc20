//! Exercises `UreqHandler` against a local mock HTTP server

use http_client::{HttpError, HttpHandler, HttpRequest, Method, UreqHandler};
use mockito::Server;
use rstest::rstest;

fn request_for(server: &Server, method: Method, uri: &str, body: &str) -> HttpRequest {
    let address = server.socket_address();
    HttpRequest {
        method,
        address: address.ip().to_string(),
        port: address.port(),
        uri: uri.to_string(),
        body: body.to_string(),
    }
}

#[rstest]
#[case(Method::Get, "GET")]
#[case(Method::Put, "PUT")]
#[case(Method::Post, "POST")]
#[case(Method::Delete, "DELETE")]
fn test_sends_method_uri_and_body(#[case] method: Method, #[case] verb: &str) {
    let mut server = Server::new();
    let mock = server
        .mock(verb, "/api/user/lights/1/state")
        .match_header("content-type", "application/json")
        .match_body(r#"{"on":true}"#)
        .with_status(200)
        .with_body(r#"[{"success":{"/lights/1/state/on":true}}]"#)
        .create();

    let handler = UreqHandler::new();
    let body = handler
        .send(&request_for(&server, method, "/api/user/lights/1/state", r#"{"on":true}"#))
        .unwrap();

    assert_eq!(body, r#"[{"success":{"/lights/1/state/on":true}}]"#);
    mock.assert();
}

#[test]
fn test_non_success_status_is_reported() {
    let mut server = Server::new();
    let _mock = server.mock("GET", "/api/user").with_status(503).create();

    let handler = UreqHandler::new();
    let error = handler
        .send(&request_for(&server, Method::Get, "/api/user", "{}"))
        .unwrap_err();

    assert_eq!(error, HttpError::Status(503));
}
