//! Blocking HTTP client for the remote tag endpoint. The remote contract for
//! delete/update was never published, so both are expressed as an ordered
//! candidate list evaluated by one first-success-wins helper.

use crate::format::truncate_with_ellipsis;
use crate::store::TagEntry;
use reqwest::Method;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;

const DEFAULT_BASE_URL: &str =
    "https://capstone-five-dusky.vercel.app/chatbot/tags";
const TIMEOUT_SECS: u64 = 15;
const PROBE_TIMEOUT_SECS: u64 = 10;
const BODY_PREVIEW: usize = 200;

/// A tag as the remote endpoint returns it. `nama` is the author name; `id`
/// is server-assigned and comes back as either a string or a number.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteTag {
    #[serde(default, deserialize_with = "id_from_any")]
    pub id: Option<String>,
    pub tag: String,
    #[serde(default)]
    pub nama: String,
    #[serde(default)]
    pub input: Vec<String>,
    #[serde(default)]
    pub responses: Vec<String>,
}

fn id_from_any<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Option::<Value>::deserialize(de)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "unsupported id value: {other}"
        ))),
    }
}

/// The body every push operation sends.
pub fn tag_payload(entry: &TagEntry, author: &str) -> Value {
    json!({
        "tag": entry.tag,
        "nama": author,
        "input": entry.input,
        "responses": entry.responses,
    })
}

/// Outcome of a single send, ready for console reporting.
#[derive(Debug)]
pub struct SendReport {
    pub status: Option<u16>,
    pub detail: String,
    pub success: bool,
}

/// One delete/update attempt against a guessed endpoint.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub label: String,
    pub method: Method,
    pub url: String,
    pub body: Option<Value>,
}

#[derive(Debug)]
pub struct Attempt {
    pub label: String,
    pub detail: String,
    pub ok: bool,
}

#[derive(Debug)]
pub struct FallbackReport {
    pub attempts: Vec<Attempt>,
    pub succeeded: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    Working,
    NotFound,
    MethodNotAllowed,
    Unexpected(u16),
    Unreachable,
}

/// GET and POST probe results plus the overall classification.
#[derive(Debug)]
pub struct ConnectivityReport {
    pub get: Result<(u16, String), String>,
    pub post: Result<(u16, String), String>,
    pub health: Health,
}

/// Ordered delete attempts: DELETE by id when one is known, then the two
/// POST-shaped guesses.
pub fn delete_candidates(
    base: &str,
    id: Option<&str>,
    tag: &str,
    author: &str,
) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    if let Some(id) = id {
        candidates.push(Candidate {
            label: format!("DELETE {base}/{id}"),
            method: Method::DELETE,
            url: format!("{base}/{id}"),
            body: None,
        });
    }
    candidates.push(Candidate {
        label: format!("POST {base}/delete"),
        method: Method::POST,
        url: format!("{base}/delete"),
        body: Some(json!({ "tag": tag, "nama": author })),
    });
    candidates.push(Candidate {
        label: format!("POST {base} (delete action)"),
        method: Method::POST,
        url: base.to_string(),
        body: Some(json!({ "action": "delete", "tag": tag, "nama": author })),
    });
    candidates
}

/// Ordered update attempts: PUT by id when one is known, then POST guesses
/// carrying the full updated payload.
pub fn update_candidates(
    base: &str,
    id: Option<&str>,
    payload: &Value,
) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    if let Some(id) = id {
        candidates.push(Candidate {
            label: format!("PUT {base}/{id}"),
            method: Method::PUT,
            url: format!("{base}/{id}"),
            body: Some(payload.clone()),
        });
    }
    candidates.push(Candidate {
        label: format!("POST {base}/update"),
        method: Method::POST,
        url: format!("{base}/update"),
        body: Some(payload.clone()),
    });
    let mut with_action = payload.clone();
    if let Some(map) = with_action.as_object_mut() {
        map.insert("action".to_string(), json!("update"));
    }
    candidates.push(Candidate {
        label: format!("POST {base} (update action)"),
        method: Method::POST,
        url: base.to_string(),
        body: Some(with_action),
    });
    candidates
}

pub struct ApiClient {
    client: Client,
    base: String,
}

impl ApiClient {
    pub fn new(base: impl Into<String>) -> Result<Self, String> {
        let client = Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()
            .map_err(|e| format!("could not build HTTP client: {e}"))?;
        Ok(Self { client, base: base.into() })
    }

    /// Base URL from `INTENT_TAGS_API_URL`, else the production endpoint.
    pub fn from_env() -> Result<Self, String> {
        let base = std::env::var("INTENT_TAGS_API_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(base)
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    /// POST one tag. 200/201 counts as success; everything else is reported
    /// with a body preview and never retried.
    pub fn send_tag(&self, entry: &TagEntry, author: &str) -> SendReport {
        let payload = tag_payload(entry, author);
        let response = self
            .client
            .post(&self.base)
            .header("Accept", "application/json")
            .json(&payload)
            .send();
        let response = match response {
            Ok(r) => r,
            Err(err) => {
                return SendReport {
                    status: None,
                    detail: format!("request failed: {err}"),
                    success: false,
                };
            }
        };
        let status = response.status().as_u16();
        let body = response.text().unwrap_or_default();
        if matches!(status, 200 | 201) {
            // Surface the server's message field when it sends one.
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| {
                    v.get("message")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                });
            SendReport {
                status: Some(status),
                detail: message.unwrap_or_default(),
                success: true,
            }
        } else {
            SendReport {
                status: Some(status),
                detail: truncate_with_ellipsis(&body, BODY_PREVIEW),
                success: false,
            }
        }
    }

    /// GET the full remote tag list. The body is accepted either as a bare
    /// array or nested under a `data` field.
    pub fn fetch_tags(&self) -> Result<Vec<RemoteTag>, String> {
        let response = self
            .client
            .get(&self.base)
            .header("Accept", "application/json")
            .send()
            .map_err(|e| format!("request failed: {e}"))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|e| format!("could not read response: {e}"))?;
        if !matches!(status, 200..=299) {
            return Err(format!(
                "HTTP {status}: {}",
                truncate_with_ellipsis(&body, BODY_PREVIEW)
            ));
        }

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum TagListBody {
            Bare(Vec<RemoteTag>),
            Wrapped { data: Vec<RemoteTag> },
        }

        match serde_json::from_str::<TagListBody>(&body) {
            Ok(TagListBody::Bare(tags))
            | Ok(TagListBody::Wrapped { data: tags }) => Ok(tags),
            Err(_) => Err(format!(
                "unexpected response shape: {}",
                truncate_with_ellipsis(&body, BODY_PREVIEW)
            )),
        }
    }

    /// Run candidates in order and stop at the first 200/201/204. Every
    /// attempt's outcome is kept for reporting.
    pub fn try_candidates(&self, candidates: &[Candidate]) -> FallbackReport {
        let mut attempts = Vec::new();
        for candidate in candidates {
            let mut request =
                self.client.request(candidate.method.clone(), &candidate.url);
            if let Some(body) = &candidate.body {
                request = request.json(body);
            }
            match request.send() {
                Ok(response) => {
                    let status = response.status().as_u16();
                    let ok = matches!(status, 200 | 201 | 204);
                    attempts.push(Attempt {
                        label: candidate.label.clone(),
                        detail: format!("HTTP {status}"),
                        ok,
                    });
                    if ok {
                        return FallbackReport { attempts, succeeded: true };
                    }
                }
                Err(err) => attempts.push(Attempt {
                    label: candidate.label.clone(),
                    detail: format!("request failed: {err}"),
                    ok: false,
                }),
            }
        }
        FallbackReport { attempts, succeeded: false }
    }

    pub fn delete_tag(
        &self,
        id: Option<&str>,
        tag: &str,
        author: &str,
    ) -> FallbackReport {
        self.try_candidates(&delete_candidates(&self.base, id, tag, author))
    }

    pub fn update_tag(
        &self,
        id: Option<&str>,
        payload: &Value,
    ) -> FallbackReport {
        self.try_candidates(&update_candidates(&self.base, id, payload))
    }

    /// One GET and one POST with a fixed sample payload, classified from the
    /// POST result.
    pub fn check_connectivity(&self) -> ConnectivityReport {
        let probe_timeout = Duration::from_secs(PROBE_TIMEOUT_SECS);
        let get = self.probe(
            self.client.get(&self.base).timeout(probe_timeout),
        );
        let sample = json!({
            "tag": "test_connectivity",
            "nama": "Test",
            "input": ["test"],
            "responses": ["test response"],
        });
        let post = self.probe(
            self.client.post(&self.base).timeout(probe_timeout).json(&sample),
        );
        let health = match &post {
            Ok((200 | 201, _)) => Health::Working,
            Ok((404, _)) => Health::NotFound,
            Ok((405, _)) => Health::MethodNotAllowed,
            Ok((status, _)) => Health::Unexpected(*status),
            Err(_) => Health::Unreachable,
        };
        ConnectivityReport { get, post, health }
    }

    fn probe(
        &self,
        request: reqwest::blocking::RequestBuilder,
    ) -> Result<(u16, String), String> {
        let response = request.send().map_err(|e| e.to_string())?;
        let status = response.status().as_u16();
        let body = response.text().unwrap_or_default();
        Ok((status, truncate_with_ellipsis(&body, BODY_PREVIEW)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_for(server: &mockito::ServerGuard) -> ApiClient {
        ApiClient::new(format!("{}/chatbot/tags", server.url())).unwrap()
    }

    fn sample_entry() -> TagEntry {
        TagEntry {
            tag: "greeting".to_string(),
            input: vec!["hi".to_string()],
            responses: vec!["hello there".to_string()],
        }
    }

    #[test]
    fn send_tag_reports_created_with_server_message() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/chatbot/tags")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "tag": "greeting",
                "nama": "Alice",
            })))
            .with_status(201)
            .with_body(r#"{"message": "tag stored"}"#)
            .create();

        let report = client_for(&server).send_tag(&sample_entry(), "Alice");
        mock.assert();
        assert!(report.success);
        assert_eq!(report.status, Some(201));
        assert_eq!(report.detail, "tag stored");
    }

    #[test]
    fn send_tag_failure_carries_a_body_preview() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/chatbot/tags")
            .with_status(500)
            .with_body("internal error")
            .create();

        let report = client_for(&server).send_tag(&sample_entry(), "Alice");
        assert!(!report.success);
        assert_eq!(report.status, Some(500));
        assert!(report.detail.contains("internal error"));
    }

    #[test]
    fn fetch_tags_accepts_bare_and_wrapped_lists() {
        let body = r#"[{"id": 7, "tag": "greeting", "nama": "Alice",
                        "input": ["hi"], "responses": ["hello"]}]"#;
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/chatbot/tags")
            .with_status(200)
            .with_body(body)
            .create();
        let tags = client_for(&server).fetch_tags().unwrap();
        mock.assert();
        assert_eq!(tags.len(), 1);
        // numeric ids are normalized to strings
        assert_eq!(tags[0].id.as_deref(), Some("7"));

        server
            .mock("GET", "/chatbot/tags")
            .with_status(200)
            .with_body(format!(r#"{{"data": {body}}}"#))
            .create();
        let tags = client_for(&server).fetch_tags().unwrap();
        assert_eq!(tags[0].tag, "greeting");
        assert_eq!(tags[0].nama, "Alice");
    }

    #[test]
    fn fetch_tags_error_status_is_an_error() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/chatbot/tags")
            .with_status(503)
            .with_body("down")
            .create();
        let err = client_for(&server).fetch_tags().unwrap_err();
        assert!(err.contains("503"));
    }

    #[test]
    fn delete_with_known_id_stops_at_the_first_204() {
        let mut server = mockito::Server::new();
        let by_id = server
            .mock("DELETE", "/chatbot/tags/42")
            .with_status(204)
            .create();
        let fallback_path = server
            .mock("POST", "/chatbot/tags/delete")
            .expect(0)
            .create();
        let fallback_base = server
            .mock("POST", "/chatbot/tags")
            .expect(0)
            .create();

        let report =
            client_for(&server).delete_tag(Some("42"), "greeting", "Alice");
        by_id.assert();
        fallback_path.assert();
        fallback_base.assert();
        assert!(report.succeeded);
        assert_eq!(report.attempts.len(), 1);
        assert!(report.attempts[0].ok);
    }

    #[test]
    fn delete_without_id_falls_through_to_the_next_candidate() {
        let mut server = mockito::Server::new();
        let first = server
            .mock("POST", "/chatbot/tags/delete")
            .with_status(404)
            .create();
        let second = server
            .mock("POST", "/chatbot/tags")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "action": "delete",
                "tag": "greeting",
            })))
            .with_status(200)
            .create();

        let report =
            client_for(&server).delete_tag(None, "greeting", "Alice");
        first.assert();
        second.assert();
        assert!(report.succeeded);
        assert_eq!(report.attempts.len(), 2);
        assert!(!report.attempts[0].ok);
        assert!(report.attempts[1].ok);
    }

    #[test]
    fn update_with_known_id_uses_put_first() {
        let mut server = mockito::Server::new();
        let put = server
            .mock("PUT", "/chatbot/tags/9")
            .with_status(200)
            .create();
        let payload = tag_payload(&sample_entry(), "Alice");
        let report = client_for(&server).update_tag(Some("9"), &payload);
        put.assert();
        assert!(report.succeeded);
        assert_eq!(report.attempts.len(), 1);
    }

    #[test]
    fn exhausted_candidates_report_every_attempt() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/chatbot/tags/update")
            .with_status(404)
            .create();
        server.mock("POST", "/chatbot/tags").with_status(500).create();

        let payload = tag_payload(&sample_entry(), "Alice");
        let report = client_for(&server).update_tag(None, &payload);
        assert!(!report.succeeded);
        assert_eq!(report.attempts.len(), 2);
    }

    #[test]
    fn connectivity_classifies_from_the_post_probe() {
        let mut server = mockito::Server::new();
        server.mock("GET", "/chatbot/tags").with_status(200).create();
        server.mock("POST", "/chatbot/tags").with_status(405).create();

        let report = client_for(&server).check_connectivity();
        assert_eq!(report.health, Health::MethodNotAllowed);
        assert_eq!(report.get.unwrap().0, 200);
    }

    #[test]
    fn payload_uses_the_wire_field_names() {
        let payload = tag_payload(&sample_entry(), "Alice");
        assert_eq!(payload["tag"], "greeting");
        assert_eq!(payload["nama"], "Alice");
        assert_eq!(payload["input"][0], "hi");
        assert_eq!(payload["responses"][0], "hello there");
    }
}
