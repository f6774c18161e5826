//! Per-slot document upload lifecycle: preview, upload, then commit or roll back.

use std::collections::BTreeMap;
use std::fmt;

use mime::Mime;
use tracing::{debug, info, warn};

use super::collaborators::{FileUploader, UploadError, UploadedFile};
use super::domain::{DocumentSlot, DocumentState, Documents};

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// A file picked by the candidate, not yet stored anywhere durable.
#[derive(Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl LocalFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

impl fmt::Debug for LocalFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalFile")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}

/// Synchronous checks run before a selection is accepted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadRejected {
    #[error("{} is empty", .slot.display_name())]
    EmptyFile { slot: DocumentSlot },
    #[error("{} is {size} bytes; the limit is {max} bytes", .slot.display_name())]
    TooLarge {
        slot: DocumentSlot,
        size: usize,
        max: usize,
    },
    #[error("{} must be one of {allowed} (got {found})", .slot.display_name())]
    UnsupportedType {
        slot: DocumentSlot,
        found: String,
        allowed: String,
    },
}

/// MIME allow-lists and size limits per slot. Slots without a list accept any type.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    allowed: BTreeMap<DocumentSlot, Vec<Mime>>,
    max_bytes: usize,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        let mut allowed = BTreeMap::new();
        allowed.insert(
            DocumentSlot::ProfilePhoto,
            vec![mime::IMAGE_PNG, mime::IMAGE_JPEG],
        );
        for slot in [
            DocumentSlot::AadharFront,
            DocumentSlot::AadharBack,
            DocumentSlot::PanFront,
            DocumentSlot::PanBack,
        ] {
            allowed.insert(slot, vec![mime::IMAGE_PNG]);
        }

        Self {
            allowed,
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl UploadPolicy {
    pub fn permissive(max_bytes: usize) -> Self {
        Self {
            allowed: BTreeMap::new(),
            max_bytes,
        }
    }

    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn allow(mut self, slot: DocumentSlot, types: Vec<Mime>) -> Self {
        self.allowed.insert(slot, types);
        self
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    pub fn allowed_types(&self, slot: DocumentSlot) -> Option<&[Mime]> {
        self.allowed.get(&slot).map(Vec::as_slice)
    }

    pub fn check(&self, slot: DocumentSlot, file: &LocalFile) -> Result<(), UploadRejected> {
        if file.bytes.is_empty() {
            return Err(UploadRejected::EmptyFile { slot });
        }
        if file.size() > self.max_bytes {
            return Err(UploadRejected::TooLarge {
                slot,
                size: file.size(),
                max: self.max_bytes,
            });
        }

        let Some(allowed) = self.allowed_types(slot) else {
            return Ok(());
        };
        let accepted = file
            .content_type
            .parse::<Mime>()
            .map(|found| {
                allowed
                    .iter()
                    .any(|candidate| candidate.essence_str() == found.essence_str())
            })
            .unwrap_or(false);

        if accepted {
            Ok(())
        } else {
            Err(UploadRejected::UnsupportedType {
                slot,
                found: file.content_type.clone(),
                allowed: allowed
                    .iter()
                    .map(|candidate| candidate.essence_str().to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
        }
    }
}

/// Identifies one selection of one slot; later selections supersede it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTicket {
    pub slot: DocumentSlot,
    pub generation: u64,
    pub preview: String,
}

/// A selection that has been previewed and is waiting to be sent to storage.
#[derive(Debug)]
pub struct PendingUpload {
    ticket: UploadTicket,
    file: LocalFile,
    owner_id: String,
}

impl PendingUpload {
    pub fn ticket(&self) -> &UploadTicket {
        &self.ticket
    }

    pub fn file(&self) -> &LocalFile {
        &self.file
    }

    /// Sends the bytes to storage. Never touches the draft.
    pub async fn dispatch(self, uploader: &dyn FileUploader) -> UploadCompletion {
        let outcome = uploader.upload(&self.file, &self.owner_id).await;
        UploadCompletion {
            ticket: self.ticket,
            outcome,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadCompletion {
    pub ticket: UploadTicket,
    pub outcome: Result<UploadedFile, UploadError>,
}

/// What applying a completion did to its slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadResolution {
    Committed { slot: DocumentSlot, url: String },
    Failed { slot: DocumentSlot, error: UploadError },
    /// A newer selection owns the slot; the completion was dropped.
    Stale { slot: DocumentSlot, generation: u64 },
}

/// Tracks the current generation of every slot so stale completions are ignored.
#[derive(Debug, Clone, Default)]
pub struct UploadCoordinator {
    policy: UploadPolicy,
    generations: BTreeMap<DocumentSlot, u64>,
}

impl UploadCoordinator {
    pub fn new(policy: UploadPolicy) -> Self {
        Self {
            policy,
            generations: BTreeMap::new(),
        }
    }

    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    pub fn current_generation(&self, slot: DocumentSlot) -> u64 {
        self.generations.get(&slot).copied().unwrap_or(0)
    }

    pub(crate) fn select(
        &mut self,
        documents: &mut Documents,
        slot: DocumentSlot,
        file: LocalFile,
        owner_id: &str,
    ) -> Result<PendingUpload, UploadRejected> {
        self.policy.check(slot, &file)?;

        let generation = self.bump(slot);
        let preview = format!("preview://{}/{}/{}", slot.key(), generation, file.name);
        let state = documents.slot_mut(slot);
        let previous = state.settled().durable_url().map(str::to_string);
        *state = DocumentState::LocalPreview {
            preview: preview.clone(),
            previous,
        };

        debug!(slot = slot.key(), generation, file = %file.name, "document selected");

        Ok(PendingUpload {
            ticket: UploadTicket {
                slot,
                generation,
                preview,
            },
            file,
            owner_id: owner_id.to_string(),
        })
    }

    /// Moves a previewed slot to `Uploading`; returns `false` if the ticket is stale.
    pub(crate) fn begin(&self, documents: &mut Documents, ticket: &UploadTicket) -> bool {
        if ticket.generation != self.current_generation(ticket.slot) {
            return false;
        }
        let uploading = match documents.get(ticket.slot) {
            DocumentState::LocalPreview { preview, previous } if *preview == ticket.preview => {
                DocumentState::Uploading {
                    preview: preview.clone(),
                    previous: previous.clone(),
                }
            }
            _ => return false,
        };
        *documents.slot_mut(ticket.slot) = uploading;
        true
    }

    pub(crate) fn complete(
        &self,
        documents: &mut Documents,
        completion: UploadCompletion,
    ) -> UploadResolution {
        let UploadCompletion { ticket, outcome } = completion;
        let slot = ticket.slot;

        if ticket.generation != self.current_generation(slot) {
            debug!(
                slot = slot.key(),
                generation = ticket.generation,
                current = self.current_generation(slot),
                "ignoring stale upload completion"
            );
            return UploadResolution::Stale {
                slot,
                generation: ticket.generation,
            };
        }

        let state = documents.slot_mut(slot);
        match outcome {
            Ok(UploadedFile { url }) => {
                *state = DocumentState::Committed { url: url.clone() };
                info!(
                    slot = slot.key(),
                    %url,
                    preview = %ticket.preview,
                    "document committed; preview released"
                );
                UploadResolution::Committed { slot, url }
            }
            Err(error) => {
                *state = DocumentState::Empty;
                warn!(slot = slot.key(), %error, "document upload failed; slot reset");
                UploadResolution::Failed { slot, error }
            }
        }
    }

    /// Supersedes every outstanding ticket.
    pub(crate) fn invalidate_all(&mut self) {
        for slot in DocumentSlot::ALL {
            self.bump(slot);
        }
    }

    fn bump(&mut self, slot: DocumentSlot) -> u64 {
        let generation = self.generations.entry(slot).or_insert(0);
        *generation += 1;
        *generation
    }
}
