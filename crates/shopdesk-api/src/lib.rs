// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use reqwest::StatusCode;
use reqwest::blocking::multipart::Form;
use reqwest::blocking::{Client as HttpClient, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{Map, Value};
use shopdesk_app::{
    EntityKind, ID_FIELD, Operation, Record, RecordId, RemoteCause, RemoteError, RemoteResource,
    Resources,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Parses and checks an http(s) base URL that paths can be appended to.
pub fn parse_base_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        bail!("api.base_url must not be empty");
    }
    let url = Url::parse(trimmed).with_context(|| format!("parse base URL {trimmed:?}"))?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        bail!("base URL {trimmed:?} must be an http:// or https:// URL");
    }
    Ok(url)
}

fn build_http(timeout: Duration) -> Result<HttpClient> {
    HttpClient::builder()
        .timeout(timeout)
        .build()
        .context("build HTTP client")
}

/// REST client for one entity collection under a shared base URL.
#[derive(Debug, Clone)]
pub struct ResourceClient {
    entity: EntityKind,
    collection: Url,
    timeout: Duration,
    http: HttpClient,
}

impl ResourceClient {
    pub fn new(base_url: &str, entity: EntityKind, timeout: Duration) -> Result<Self> {
        Self::with_http(base_url, entity, timeout, build_http(timeout)?)
    }

    fn with_http(
        base_url: &str,
        entity: EntityKind,
        timeout: Duration,
        http: HttpClient,
    ) -> Result<Self> {
        let mut collection = parse_base_url(base_url)?;
        collection
            .path_segments_mut()
            .map_err(|()| anyhow::anyhow!("base URL {base_url:?} cannot take a path"))?
            .pop_if_empty()
            .push(entity.descriptor().path());
        Ok(Self {
            entity,
            collection,
            timeout,
            http,
        })
    }

    pub fn collection_url(&self) -> &Url {
        &self.collection
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn record_url(&self, id: &RecordId) -> Url {
        let mut url = self.collection.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push(id.as_str());
        }
        url
    }

    fn error(&self, operation: Operation, cause: RemoteCause) -> RemoteError {
        let error = RemoteError::new(operation, self.entity, cause);
        warn!(entity = %self.entity, %operation, %error, "request failed");
        error
    }

    fn send(&self, operation: Operation, url: &Url, request: RequestBuilder) -> Result<Response, RemoteError> {
        debug!(entity = %self.entity, %operation, %url, "sending request");
        let response = request
            .send()
            .map_err(|error| self.error(operation, connection_error(url, &error)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(self.error(operation, clean_error_response(status, &body)));
        }
        Ok(response)
    }

    fn json(&self, operation: Operation, response: Response) -> Result<Value, RemoteError> {
        response
            .json::<Value>()
            .map_err(|error| self.error(operation, RemoteCause::Decode(error.to_string())))
    }

    fn decode(&self, operation: Operation, value: Value) -> Result<Record, RemoteError> {
        Record::from_json(value)
            .map_err(|error| self.error(operation, RemoteCause::Decode(error.to_string())))
    }
}

impl RemoteResource for ResourceClient {
    fn entity(&self) -> EntityKind {
        self.entity
    }

    fn list(&self) -> Result<Vec<Record>, RemoteError> {
        let url = &self.collection;
        let response = self.send(Operation::List, url, self.http.get(url.clone()))?;
        let value = self.json(Operation::List, response)?;
        let records = Record::list_from_json(value).map_err(|error| {
            self.error(Operation::List, RemoteCause::Decode(error.to_string()))
        })?;
        debug!(entity = %self.entity, count = records.len(), "listed");
        Ok(records)
    }

    fn create(&self, fields: &Map<String, Value>) -> Result<Record, RemoteError> {
        let url = &self.collection;
        let response = self.send(Operation::Create, url, self.http.post(url.clone()).json(fields))?;
        let value = self.json(Operation::Create, response)?;
        self.decode(Operation::Create, value)
    }

    fn update(&self, id: &RecordId, fields: &Map<String, Value>) -> Result<Record, RemoteError> {
        let url = self.record_url(id);
        let response = self.send(Operation::Update, &url, self.http.put(url.clone()).json(fields))?;
        let mut value = self.json(Operation::Update, response)?;
        if let Value::Object(object) = &mut value
            && !object.contains_key(ID_FIELD)
            && !object.contains_key("id")
        {
            object.insert(ID_FIELD.to_owned(), Value::String(id.to_string()));
        }
        self.decode(Operation::Update, value)
    }

    fn delete(&self, id: &RecordId) -> Result<(), RemoteError> {
        let url = self.record_url(id);
        self.send(Operation::Delete, &url, self.http.delete(url.clone()))?;
        Ok(())
    }
}

/// Clients for every entity, sharing one connection pool.
pub fn connect(base_url: &str, timeout: Duration) -> Result<Resources> {
    let http = build_http(timeout)?;
    let orders = ResourceClient::with_http(base_url, EntityKind::Orders, timeout, http.clone())?;
    let products = ResourceClient::with_http(base_url, EntityKind::Products, timeout, http)?;
    Ok(Resources::new(Arc::new(orders), Arc::new(products)))
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
}

/// Pushes an image to the media host and returns where it now lives.
#[derive(Debug, Clone)]
pub struct MediaUploader {
    upload_url: Url,
    upload_preset: String,
    http: HttpClient,
}

impl MediaUploader {
    pub fn new(upload_url: &str, upload_preset: &str, timeout: Duration) -> Result<Self> {
        let upload_url = parse_base_url(upload_url).context("media.upload_url")?;
        if upload_preset.trim().is_empty() {
            bail!("media.upload_preset must not be empty when media.upload_url is set");
        }
        Ok(Self {
            upload_url,
            upload_preset: upload_preset.trim().to_owned(),
            http: build_http(timeout)?,
        })
    }

    pub fn upload(&self, path: &Path) -> Result<String> {
        let form = Form::new()
            .text("upload_preset", self.upload_preset.clone())
            .file("file", path)
            .with_context(|| format!("read {} -- check the path and retry", path.display()))?;

        debug!(url = %self.upload_url, file = %path.display(), "uploading media");
        let upload_error = |cause| RemoteError::new(Operation::Upload, EntityKind::Products, cause);
        let response = self
            .http
            .post(self.upload_url.clone())
            .multipart(form)
            .send()
            .map_err(|error| upload_error(connection_error(&self.upload_url, &error)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(upload_error(clean_error_response(status, &body)).into());
        }
        let parsed: UploadResponse = response
            .json()
            .map_err(|error| upload_error(RemoteCause::Decode(error.to_string())))?;
        if parsed.secure_url.trim().is_empty() {
            bail!("media host answered without a secure_url");
        }
        Ok(parsed.secure_url)
    }
}

fn connection_error(url: &Url, error: &reqwest::Error) -> RemoteCause {
    let message = if error.is_timeout() {
        "timed out -- check the server and retry".to_owned()
    } else {
        format!("{error} -- check that the server is running")
    };
    RemoteCause::Transport {
        url: url.to_string(),
        message,
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    message: Option<String>,
    error: Option<Value>,
}

fn clean_error_response(status: StatusCode, body: &str) -> RemoteCause {
    let status = status.as_u16();
    if let Ok(parsed) = serde_json::from_str::<ErrorEnvelope>(body) {
        let message = parsed.message.filter(|message| !message.is_empty()).or_else(|| {
            match parsed.error? {
                Value::String(text) => Some(text),
                Value::Object(mut object) => match object.remove("message") {
                    Some(Value::String(text)) => Some(text),
                    _ => None,
                },
                _ => None,
            }
        });
        if let Some(message) = message
            && !message.is_empty()
        {
            return RemoteCause::Status { status, message };
        }
    }

    let body = body.trim();
    if !body.is_empty() && body.len() < 100 && !body.contains('{') && !body.contains('<') {
        return RemoteCause::Status {
            status,
            message: body.to_owned(),
        };
    }

    RemoteCause::BareStatus(status)
}
