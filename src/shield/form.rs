//! Login submission parsing.
//!
//! Anything that is not a field mapping, or lacks either credential, yields
//! `None`. Callers cannot tell these cases apart.

use std::collections::HashMap;

use axum::{
    body::{Body, Bytes},
    extract::{FromRequest, Multipart, Request},
    http::{HeaderMap, header},
};

/// Username and password taken from a submitted body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub async fn extract(
        headers: &HeaderMap,
        body: &Bytes,
        username_field: &str,
        password_field: &str,
    ) -> Option<Self> {
        let mut fields = parse_fields(headers, body).await?;

        let username = take_filled(&mut fields, username_field)?;
        let password = take_filled(&mut fields, password_field)?;

        Some(Self { username, password })
    }
}

/// Interpret `body` as a flat field mapping according to its content type.
///
/// - `application/x-www-form-urlencoded` (or no content type): form fields
/// - `multipart/form-data`: text parts; file parts are skipped
/// - `application/json` / `+json`: a top-level object; non-string values are dropped
/// - anything else: not a mapping
///
/// A repeated field keeps its last value.
pub async fn parse_fields(headers: &HeaderMap, body: &Bytes) -> Option<HashMap<String, String>> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| {
            v.split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase()
        });

    match content_type.as_deref() {
        None | Some("application/x-www-form-urlencoded") => {
            let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(body).ok()?;
            Some(pairs.into_iter().collect())
        }
        Some("multipart/form-data") => parse_multipart(headers, body.clone()).await,
        Some(ct) if ct == "application/json" || ct.ends_with("+json") => {
            let value: serde_json::Value = serde_json::from_slice(body).ok()?;
            let object = match value {
                serde_json::Value::Object(object) => object,
                _ => return None,
            };

            Some(
                object
                    .into_iter()
                    .filter_map(|(k, v)| match v {
                        serde_json::Value::String(s) => Some((k, s)),
                        _ => None,
                    })
                    .collect(),
            )
        }
        Some(_) => None,
    }
}

async fn parse_multipart(headers: &HeaderMap, body: Bytes) -> Option<HashMap<String, String>> {
    // Multipart needs the boundary from the original content type.
    let mut req = Request::new(Body::from(body));
    let content_type = headers.get(header::CONTENT_TYPE)?.clone();
    req.headers_mut().insert(header::CONTENT_TYPE, content_type);

    let mut multipart = Multipart::from_request(req, &()).await.ok()?;
    let mut fields = HashMap::new();

    while let Some(field) = multipart.next_field().await.ok()? {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        if field.file_name().is_some() {
            continue;
        }
        let value = field.text().await.ok()?;
        fields.insert(name, value);
    }

    Some(fields)
}

// Empty, whitespace-only and "0" all count as not filled in.
fn take_filled(fields: &mut HashMap<String, String>, name: &str) -> Option<String> {
    fields
        .remove(name)
        .filter(|v| !v.trim().is_empty() && v != "0")
}
