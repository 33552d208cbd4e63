// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use shopdesk_api::MediaUploader;
use shopdesk_app::{EntityKind, RemoteRequest, Resources};
use shopdesk_tui::{AppRuntime, InternalEvent};
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::thread;
use tracing::debug;

/// Runs each request on its own thread against the configured backend.
pub struct ApiRuntime {
    resources: Resources,
    uploader: Option<MediaUploader>,
}

impl ApiRuntime {
    pub fn new(resources: Resources, uploader: Option<MediaUploader>) -> Self {
        Self {
            resources,
            uploader,
        }
    }
}

impl AppRuntime for ApiRuntime {
    fn dispatch(&mut self, request: RemoteRequest, tx: &Sender<InternalEvent>) {
        let client = self.resources.get(request.entity).clone();
        let tx = tx.clone();
        thread::spawn(move || {
            let ticket = request.ticket.id;
            let completion = request.execute(client.as_ref());
            if tx.send(InternalEvent::Completed(completion)).is_err() {
                debug!(ticket, "ui closed before the request finished");
            }
        });
    }

    fn upload_media(
        &mut self,
        entity: EntityKind,
        path: PathBuf,
        tx: &Sender<InternalEvent>,
    ) -> Result<()> {
        let Some(uploader) = self.uploader.clone() else {
            bail!("media upload is not configured -- set [media] upload_url and upload_preset");
        };
        let tx = tx.clone();
        thread::spawn(move || {
            let result = uploader.upload(&path).map_err(|error| format!("{error:#}"));
            let _ = tx.send(InternalEvent::MediaUploaded { entity, result });
        });
        Ok(())
    }
}
