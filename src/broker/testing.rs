//! Test collaborators for the broker.
//!
//! | Type | Behavior |
//! |------|----------|
//! | [`PrefixVerifier`] | Accepts blobs starting with `SIGNED:` and strips the prefix |
//! | [`JsonSchemaParser`] | Parses `{"tag": .., "messages": [..]}` into a [`JsonCodec`] |
//! | [`JsonCodec`] | Sends `{"tag", "name", "payload"}` frames, reads JSON replies |

use std::sync::Arc;

use async_trait::async_trait;
use rustc_hash::FxHashSet;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::{Error, Result};
use crate::protocol::{MessageCodec, SchemaParser, Verifier};
use crate::transport::{BoundReceiver, BoundSender, MemoryTransport};

use super::{Broker, BrokerOptions};

// ============================================================================
// Constants
// ============================================================================

/// Prefix that marks a blob as signed.
pub const SIGNATURE_PREFIX: &[u8] = b"SIGNED:";

// ============================================================================
// PrefixVerifier
// ============================================================================

/// Verifier that trusts anything carrying [`SIGNATURE_PREFIX`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PrefixVerifier;

#[async_trait]
impl Verifier for PrefixVerifier {
    async fn verify(&self, signed: &[u8]) -> Result<Vec<u8>> {
        signed
            .strip_prefix(SIGNATURE_PREFIX)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| Error::verification("missing signature prefix"))
    }
}

// ============================================================================
// JsonSchemaParser
// ============================================================================

#[derive(Deserialize)]
struct SchemaDocument {
    tag: String,
    messages: Vec<String>,
}

/// Parser for JSON schema documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSchemaParser;

impl SchemaParser for JsonSchemaParser {
    fn parse_configure(&self, raw: &[u8]) -> Result<Arc<dyn MessageCodec>> {
        let document: SchemaDocument =
            serde_json::from_slice(raw).map_err(|e| Error::schema_parse(e.to_string()))?;

        Ok(Arc::new(JsonCodec {
            tag: document.tag,
            messages: document.messages.into_iter().collect(),
        }))
    }
}

// ============================================================================
// JsonCodec
// ============================================================================

/// Schema set that frames messages as JSON.
#[derive(Debug)]
pub struct JsonCodec {
    tag: String,
    messages: FxHashSet<String>,
}

#[async_trait]
impl MessageCodec for JsonCodec {
    async fn build_and_send(&self, sender: &BoundSender, name: &str, payload: &Value) -> Result<()> {
        if !self.messages.contains(name) {
            return Err(Error::encoding(format!("unknown message {name}")));
        }

        let frame = json!({ "tag": self.tag, "name": name, "payload": payload });
        sender.send(serde_json::to_vec(&frame)?).await
    }

    async fn receive_and_parse(&self, receiver: &BoundReceiver) -> Result<Value> {
        let data = receiver.receive().await?;
        let response: Value =
            serde_json::from_slice(&data).map_err(|e| Error::decoding(e.to_string()))?;

        Ok(json!({ "tag": self.tag, "response": response }))
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Installs a log subscriber honoring `RUST_LOG`, once per process.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Builds a signed schema blob with the given tag and message names.
pub fn signed_schema(tag: &str, messages: &[&str]) -> Vec<u8> {
    let mut blob = SIGNATURE_PREFIX.to_vec();
    blob.extend(json!({ "tag": tag, "messages": messages }).to_string().into_bytes());
    blob
}

/// Builds a broker over `transport` with default options.
pub fn test_broker(transport: MemoryTransport) -> Broker {
    test_broker_with(transport, BrokerOptions::default())
}

/// Builds a broker over `transport` with `options`.
pub fn test_broker_with(transport: MemoryTransport, options: BrokerOptions) -> Broker {
    Broker::builder()
        .transport(transport)
        .verifier(PrefixVerifier)
        .parser(JsonSchemaParser)
        .options(options)
        .build()
        .expect("test broker options are valid")
}
