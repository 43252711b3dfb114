//! Dataverse $batch request builder
//!
//! Builds the multipart/mixed body for the Web API `$batch` endpoint, with
//! optional changesets for transactional groups.

use super::command::BatchCommand;
use crate::api::constants;
use uuid::Uuid;

const CRLF: &str = "\r\n";

/// Builder for creating Dataverse $batch requests
pub struct BatchRequestBuilder {
    batch_id: String,
    environment_url: String,
    items: Vec<BatchItem>,
    next_content_id: u32,
}

#[derive(Debug, Clone)]
enum BatchItem {
    Request(BatchCommand),
    ChangeSet {
        changeset_id: String,
        operations: Vec<(u32, BatchCommand)>,
    },
}

impl BatchRequestBuilder {
    pub fn new(environment_url: impl Into<String>) -> Self {
        Self::with_batch_id(environment_url, format!("batch_{}", Uuid::new_v4()))
    }

    /// Use a fixed boundary instead of a random one
    pub fn with_batch_id(environment_url: impl Into<String>, batch_id: impl Into<String>) -> Self {
        Self {
            batch_id: batch_id.into(),
            environment_url: environment_url.into(),
            items: Vec::new(),
            next_content_id: 1,
        }
    }

    /// Add a request outside any changeset
    pub fn add_request(mut self, command: BatchCommand) -> Self {
        self.items.push(BatchItem::Request(command));
        self
    }

    pub fn add_requests(mut self, commands: impl IntoIterator<Item = BatchCommand>) -> Self {
        self.items.extend(commands.into_iter().map(BatchItem::Request));
        self
    }

    /// Add commands as one changeset; they succeed or fail together.
    ///
    /// Content-IDs are numbered across the whole batch, starting at 1.
    pub fn add_changeset(mut self, commands: impl IntoIterator<Item = BatchCommand>) -> Self {
        let mut operations = Vec::new();
        for command in commands {
            operations.push((self.next_content_id, command));
            self.next_content_id += 1;
        }

        if operations.is_empty() {
            return self;
        }

        self.items.push(BatchItem::ChangeSet {
            changeset_id: format!("changeset_{}", Uuid::new_v4()),
            operations,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.items
            .iter()
            .map(|item| match item {
                BatchItem::Request(_) => 1,
                BatchItem::ChangeSet { operations, .. } => operations.len(),
            })
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn batch_id(&self) -> &str {
        &self.batch_id
    }

    /// Build the complete batch request body
    pub fn build(self) -> BatchRequest {
        let mut body = String::new();

        for item in &self.items {
            match item {
                BatchItem::Request(command) => {
                    body.push_str(&format!("--{}{}", self.batch_id, CRLF));
                    self.write_part(&mut body, command, None);
                }
                BatchItem::ChangeSet {
                    changeset_id,
                    operations,
                } => {
                    body.push_str(&format!("--{}{}", self.batch_id, CRLF));
                    body.push_str(&format!(
                        "Content-Type: multipart/mixed; boundary=\"{}\"{}",
                        changeset_id, CRLF
                    ));
                    body.push_str(CRLF);

                    for (content_id, command) in operations {
                        body.push_str(&format!("--{}{}", changeset_id, CRLF));
                        self.write_part(&mut body, command, Some(*content_id));
                    }

                    body.push_str(&format!("--{}--{}", changeset_id, CRLF));
                }
            }
        }

        body.push_str(&format!("--{}--{}", self.batch_id, CRLF));

        BatchRequest {
            content_type: format!("multipart/mixed; boundary=\"{}\"", self.batch_id),
            body,
        }
    }

    fn write_part(&self, body: &mut String, command: &BatchCommand, content_id: Option<u32>) {
        body.push_str(&format!("Content-Type: application/http{}", CRLF));
        body.push_str(&format!("Content-Transfer-Encoding: binary{}", CRLF));
        if let Some(id) = content_id {
            body.push_str(&format!("Content-ID: {}{}", id, CRLF));
        }
        body.push_str(CRLF);

        body.push_str(&format!(
            "{} {} HTTP/1.1{}",
            command.method,
            self.request_url(&command.url),
            CRLF
        ));

        if let Some(content_type) = command.content_type() {
            body.push_str(&format!("Content-Type: {}{}", content_type, CRLF));
        }
        for (name, value) in &command.headers {
            body.push_str(&format!("{}: {}{}", name, value, CRLF));
        }
        body.push_str(CRLF);

        if let Some(data) = &command.data {
            body.push_str(&data.to_string());
        }
        body.push_str(CRLF);
    }

    /// Content-ID references (`$1/...`) stay relative
    fn request_url(&self, url: &str) -> String {
        if url.starts_with('$') {
            url.to_string()
        } else {
            constants::resolve_url(&self.environment_url, url)
        }
    }
}

/// Complete batch request ready to send
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub content_type: String,
    pub body: String,
}
