//! # Inbound Message Handling
//!
//! What the hub does with a frame from a page. Every request is handled
//! independently; there is no handshake and no ordering between types.
//!
//! | request                   | effect                                     |
//! |---------------------------|--------------------------------------------|
//! | `set_article`             | replace snapshot, broadcast it             |
//! | `request_current_article` | unicast snapshot (nothing if none yet)     |
//! | `upload_image`            | store photo, broadcast `image_updated`     |
//! | `image_uploaded`          | broadcast `image_updated` without a path   |
//! | `save_name`               | rename record, broadcast `current_article` |
//!
//! Malformed frames and unknown types are logged and dropped without a reply.

use tracing::{debug, error, info, warn};

use crate::hub::{HubCommand, HubHandle};
use crate::protocol::{Decoded, HubMessage, InboundMessage};
use crate::registry::PeerContext;
use tagger_core::{CurrentArticle, ProductChanges};
use tagger_db::{ImageStore, ProductRepository};

/// Reply for `upload_image` without its required fields.
pub const UPLOAD_FIELDS_REQUIRED: &str = "ean and image_base64 required";

/// Reply for `save_name` without a barcode.
pub const EAN_REQUIRED: &str = "ean required";

#[derive(Clone)]
pub struct InboundHandler {
    hub: HubHandle,
    products: ProductRepository,
    images: ImageStore,
}

impl InboundHandler {
    pub fn new(hub: HubHandle, products: ProductRepository, images: ImageStore) -> Self {
        InboundHandler {
            hub,
            products,
            images,
        }
    }

    /// Handles one text frame from `peer`.
    pub async fn handle(&self, peer: &PeerContext, text: &str) {
        match InboundMessage::decode(text) {
            Decoded::Message(message) => self.dispatch(peer, message).await,
            Decoded::Unknown(kind) => {
                info!(peer = %peer.id, kind = ?kind, "Ignoring unknown message type");
            }
            Decoded::Malformed => {
                debug!(peer = %peer.id, bytes = text.len(), "Ignoring malformed frame");
            }
        }
    }

    async fn dispatch(&self, peer: &PeerContext, message: InboundMessage) {
        match message {
            InboundMessage::SetArticle {
                ean,
                name,
                image_path,
            } => {
                self.hub.set_article(CurrentArticle {
                    ean,
                    name,
                    image_path,
                });
            }

            InboundMessage::RequestCurrentArticle => {
                self.hub.send(HubCommand::SendSnapshot(peer.id));
            }

            InboundMessage::UploadImage { ean, image_base64 } => {
                if ean.is_empty() || image_base64.is_empty() {
                    peer.reply(&HubMessage::error(UPLOAD_FIELDS_REQUIRED));
                    return;
                }
                match self.images.ingest_base64(&ean, &image_base64).await {
                    Ok(stored) => {
                        if stored.is_raw() {
                            warn!(ean = %ean, path = stored.path(), "Upload kept as raw bytes");
                        }
                        self.hub.broadcast_from_anywhere(HubMessage::image_updated(
                            &ean,
                            Some(stored.path().to_string()),
                        ));
                    }
                    Err(e) => {
                        error!(ean = %ean, error = %e, "Image upload failed");
                        peer.reply(&HubMessage::error(format!("image upload failed: {e}")));
                    }
                }
            }

            InboundMessage::ImageUploaded { ean } => {
                if ean.is_empty() {
                    return;
                }
                self.hub
                    .broadcast_from_anywhere(HubMessage::image_updated(ean, None));
            }

            InboundMessage::SaveName { ean, name } => {
                if ean.is_empty() {
                    peer.reply(&HubMessage::error(EAN_REQUIRED));
                    return;
                }
                match self.products.upsert(&ProductChanges::manual(&ean, name)).await {
                    Ok(record) => {
                        self.hub.set_article(CurrentArticle {
                            ean: record.ean,
                            name: record.name,
                            image_path: record.image_path,
                        });
                    }
                    Err(e) => {
                        error!(ean = %ean, error = %e, "Saving name failed");
                        peer.reply(&HubMessage::error(format!("save failed: {e}")));
                    }
                }
            }
        }
    }
}
