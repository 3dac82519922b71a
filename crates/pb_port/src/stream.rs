//! Binds carriers to in-memory stream messages.
//!
//! A [`Message`] has an id, a channel, string metadata and a byte payload.
//! Carrier fields map onto it through four groups:
//!
//! | group       | cardinality | shapes      | message part            |
//! |-------------|-------------|-------------|-------------------------|
//! | `messageId` | 0..1        | primitive   | `id`                    |
//! | `channel`   | 0..1        | primitive   | `channel`               |
//! | `header`    | 0..         | primitive   | `metadata[peer]`        |
//! | `body`      | 0..1        | content     | `payload`               |
//!
//! The payload is described by the `contentType` and `contentEncoding`
//! metadata entries.

use alloc::collections::BTreeMap;

use pb_content::{Content, ContentOptions, ContentRegistry, Encoding, EntityRef, SinkWriter, media_types};

use crate::populate::{groups, peers};
use crate::{
    CardinalityRange, Carrier, FieldGroup, InputDecoder, OutputEncoder, Port, PortDirection, PortError,
    PortField, PortReflector, Shape,
};

/// Port kind of stream inputs, as in `#[port(inp = "header")]`.
pub const INPUT_KIND: &str = "inp";

/// Port kind of stream outputs, as in `#[port(out = "body")]`.
pub const OUTPUT_KIND: &str = "out";

// -----------------------------------------------------------------------------
// Message

/// A stream message.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: Option<String>,
    pub channel: Option<String>,
    pub metadata: BTreeMap<String, String>,
    pub payload: Vec<u8>,
}

impl Message {
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = payload.into();
        self
    }

    #[inline]
    pub fn metadata_item(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }
}

// -----------------------------------------------------------------------------
// Ports

/// The stream field groups.
pub fn field_groups() -> [(&'static str, FieldGroup); 4] {
    let single_primitive =
        || FieldGroup::new(CardinalityRange::zero_to_one()).with_shapes([Shape::Primitive]);
    [
        (groups::MESSAGE_ID, single_primitive()),
        (groups::CHANNEL, single_primitive()),
        (
            groups::HEADER,
            FieldGroup::new(CardinalityRange::zero_to_many()).with_shapes([Shape::Primitive]),
        ),
        (
            groups::BODY,
            FieldGroup::new(CardinalityRange::zero_to_one())
                .with_shapes([Shape::Content])
                .with_content(true),
        ),
    ]
}

/// A reflector for stream ports.
///
/// Body fields always bind as [`Shape::Content`], whatever their type.
pub fn port_reflector(direction: PortDirection) -> PortReflector {
    PortReflector::new(direction).with_field_groups(field_groups())
}

/// Compiles the `inp` port of `T`.
pub fn input_port<T: Carrier>() -> Result<Port, PortError> {
    port_reflector(PortDirection::In).reflect_port::<T>(INPUT_KIND)
}

/// Compiles the `out` port of `T`.
pub fn output_port<T: Carrier>() -> Result<Port, PortError> {
    port_reflector(PortDirection::Out).reflect_port::<T>(OUTPUT_KIND)
}

fn invalid_group(field: &PortField, expected: &str) -> PortError {
    PortError::InvalidGroup {
        field: field.name.to_owned(),
        group: field.group.clone(),
        expected: expected.to_owned(),
    }
}

// -----------------------------------------------------------------------------
// MessageDecoder

/// Reads input fields from a [`Message`].
///
/// The body's content type and encoding come from the message metadata,
/// falling back to the decoder defaults. An empty payload is absent content.
#[derive(Debug, Clone)]
pub struct MessageDecoder<'m> {
    message: &'m Message,
    default_content_type: String,
    default_encoding: String,
}

impl<'m> MessageDecoder<'m> {
    /// A decoder defaulting to JSON bodies without encoding.
    pub fn new(message: &'m Message) -> Self {
        Self {
            message,
            default_content_type: media_types::JSON.to_owned(),
            default_encoding: String::new(),
        }
    }

    pub fn with_default_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.default_content_type = content_type.into();
        self
    }

    pub fn with_default_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.default_encoding = encoding.into();
        self
    }

    fn body_options(&self) -> ContentOptions {
        let content_type = self
            .message
            .metadata_item(peers::CONTENT_TYPE)
            .unwrap_or(self.default_content_type.as_str());
        let encoding = self
            .message
            .metadata_item(peers::CONTENT_ENCODING)
            .unwrap_or(self.default_encoding.as_str());
        ContentOptions::new(content_type).with_encoding(Encoding::parse(encoding))
    }
}

impl InputDecoder for MessageDecoder<'_> {
    fn transport(&self) -> &'static str {
        "stream"
    }

    fn decode_primitive(&mut self, field: &PortField) -> Result<Option<String>, PortError> {
        let value = match field.group.as_str() {
            groups::HEADER => self.message.metadata_item(&field.peer).map(str::to_owned),
            groups::MESSAGE_ID => self.message.id.clone(),
            groups::CHANNEL => self.message.channel.clone(),
            _ => return Err(invalid_group(field, "channel,header,messageId")),
        };
        Ok(value)
    }

    fn decode_content(&mut self, field: &PortField) -> Result<Content, PortError> {
        if field.group != groups::BODY {
            return Err(invalid_group(field, groups::BODY));
        }

        let options = self.body_options();
        if self.message.payload.is_empty() {
            log::trace!("message has no payload for field {:?}", field.name);
            return Ok(Content::absent(options));
        }
        Ok(Content::from_bytes(options, self.message.payload.clone()))
    }
}

// -----------------------------------------------------------------------------
// MessageEncoder

/// Writes output fields into a [`Message`].
///
/// Unset headers leave the metadata untouched. Encoding a body records its
/// content type, and any encoding, in the metadata.
#[derive(Debug)]
pub struct MessageEncoder<'m> {
    message: &'m mut Message,
}

impl<'m> MessageEncoder<'m> {
    pub fn new(message: &'m mut Message) -> Self {
        Self { message }
    }
}

impl OutputEncoder for MessageEncoder<'_> {
    fn encode_message_id(&mut self, _: &PortField, value: String) -> Result<(), PortError> {
        self.message.id = Some(value);
        Ok(())
    }

    fn encode_channel(&mut self, channel: Option<String>) -> Result<(), PortError> {
        if channel.is_some() {
            self.message.channel = channel;
        }
        Ok(())
    }

    fn encode_header(&mut self, field: &PortField, value: Option<String>) -> Result<(), PortError> {
        if let Some(value) = value {
            self.message.metadata.insert(field.peer.clone(), value);
        }
        Ok(())
    }

    fn encode_body(
        &mut self,
        _: &PortField,
        registry: &ContentRegistry,
        options: &ContentOptions,
        body: EntityRef<'_>,
    ) -> Result<(), PortError> {
        let mut payload = Vec::new();
        options.write_entity(registry, Box::new(SinkWriter(&mut payload)), body)?;

        self.message
            .metadata
            .insert(peers::CONTENT_TYPE.to_owned(), options.mime_type.clone());
        if !options.encoding.is_empty() {
            self.message
                .metadata
                .insert(peers::CONTENT_ENCODING.to_owned(), options.encoding.to_string());
        }
        self.message.payload = payload;
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use core::net::{IpAddr, Ipv4Addr, SocketAddr};
    use std::collections::BTreeMap;
    use std::io::Read;

    use flate2::read::GzDecoder;
    use pb_content::ContentRegistry;
    use serde::{Deserialize, Serialize};

    use super::{Message, MessageDecoder, MessageEncoder, input_port, output_port};
    use crate::{Carrier, InputsPopulator, OutputsPopulator, PortError, Shape};

    #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
    struct Response {
        c: String,
    }

    #[derive(Carrier, Default)]
    struct Outputs {
        #[port(out = "header")]
        a: String,
        #[port(out = "body")]
        b: Response,
        #[port(out = "header=contentType,optional")]
        m: Option<String>,
        #[port(out = "header=contentEncoding,optional")]
        n: Option<String>,
        #[port(out = "channel,default=MY_TOPIC")]
        o: Option<String>,
        #[port(out = "messageId")]
        p: Option<String>,
    }

    fn outputs() -> Outputs {
        Outputs {
            a: "value-a".into(),
            b: Response { c: "value-c".into() },
            ..Outputs::default()
        }
    }

    fn publish(outputs: &Outputs, content_type: &str) -> Message {
        let port = output_port::<Outputs>().unwrap();
        let registry = ContentRegistry::default();
        let mut message = Message::default();
        OutputsPopulator::new(&port, outputs, MessageEncoder::new(&mut message), &registry)
            .with_content_type(content_type)
            .populate()
            .unwrap();
        message
    }

    fn metadata<const N: usize>(entries: [(&str, &str); N]) -> BTreeMap<String, String> {
        entries.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn simple_json() {
        let message = publish(&outputs(), "application/json");
        assert_eq!(
            message.metadata,
            metadata([("a", "value-a"), ("contentType", "application/json")])
        );
        assert_eq!(message.payload, b"{\"c\":\"value-c\"}\n");
        assert_eq!(message.channel.as_deref(), Some("MY_TOPIC"));
        assert_eq!(message.id, None);
    }

    #[test]
    fn header_overrides_content_type() {
        let outputs = Outputs {
            m: Some("application/json".into()),
            ..outputs()
        };
        let message = publish(&outputs, "text/plain");
        assert_eq!(
            message.metadata,
            metadata([("a", "value-a"), ("contentType", "application/json")])
        );
        assert_eq!(message.payload, b"{\"c\":\"value-c\"}\n");
    }

    #[test]
    fn carrier_overrides_channel() {
        let outputs = Outputs {
            o: Some("OTHER_TOPIC".into()),
            ..outputs()
        };
        let message = publish(&outputs, "application/json");
        assert_eq!(message.channel.as_deref(), Some("OTHER_TOPIC"));
    }

    #[test]
    fn carrier_sets_message_id() {
        let outputs = Outputs {
            p: Some("my-message-id".into()),
            ..outputs()
        };
        let message = publish(&outputs, "application/json");
        assert_eq!(message.id.as_deref(), Some("my-message-id"));
        assert_eq!(message.channel.as_deref(), Some("MY_TOPIC"));
    }

    #[test]
    fn encoded_bodies_record_their_encoding() {
        let outputs = Outputs {
            n: Some("gzip".into()),
            ..outputs()
        };
        let message = publish(&outputs, "application/json");
        assert_eq!(message.metadata_item("contentEncoding"), Some("gzip"));

        let mut body = String::new();
        GzDecoder::new(message.payload.as_slice())
            .read_to_string(&mut body)
            .unwrap();
        assert_eq!(body, "{\"c\":\"value-c\"}\n");
    }

    #[derive(Carrier, Debug, Default)]
    struct Inputs {
        #[port(inp = "messageId")]
        id: Option<String>,
        #[port(inp = "channel")]
        channel: String,
        #[port(inp = "header=x-tenant")]
        tenant: String,
        #[port(inp = "header,default=1")]
        attempt: u32,
        #[port(inp = "body")]
        body: Option<Response>,
    }

    fn receive(message: &Message) -> Result<Inputs, PortError> {
        let port = input_port::<Inputs>()?;
        let registry = ContentRegistry::default();
        InputsPopulator::new(&port, MessageDecoder::new(message), &registry).populate()
    }

    #[test]
    fn decodes_every_group() {
        let message = Message::default()
            .with_id("m-1")
            .with_channel("TOPIC")
            .with_metadata("x-tenant", "acme")
            .with_metadata("attempt", "3")
            .with_payload(r#"{"c":"value-c"}"#);
        let inputs = receive(&message).unwrap();

        assert_eq!(inputs.id.as_deref(), Some("m-1"));
        assert_eq!(inputs.channel, "TOPIC");
        assert_eq!(inputs.tenant, "acme");
        assert_eq!(inputs.attempt, 3);
        assert_eq!(inputs.body, Some(Response { c: "value-c".into() }));
    }

    #[test]
    fn empty_payload_leaves_body_unset() {
        let message = Message::default()
            .with_channel("TOPIC")
            .with_metadata("x-tenant", "acme");
        let inputs = receive(&message).unwrap();
        assert_eq!(inputs.attempt, 1);
        assert_eq!(inputs.body, None);
    }

    #[test]
    fn missing_header_is_reported() {
        let message = Message::default().with_channel("TOPIC");
        let error = receive(&message).unwrap_err();
        assert!(matches!(
            error.root_cause(),
            PortError::MissingRequiredValue(peer) if peer == "x-tenant"
        ));
    }

    #[test]
    fn decodes_with_metadata_encoding() {
        let outputs = Outputs {
            n: Some("base64".into()),
            ..outputs()
        };
        let message = publish(&outputs, "application/json")
            .with_channel("TOPIC")
            .with_metadata("x-tenant", "acme");
        let inputs = receive(&message).unwrap();
        assert_eq!(inputs.body, Some(Response { c: "value-c".into() }));
    }

    #[test]
    fn body_fields_bind_as_content() {
        let port = input_port::<Inputs>().unwrap();
        assert_eq!(port.field_by_name("body").map(|f| f.shape()), Some(Shape::Content));
    }

    #[test]
    fn unknown_groups_are_rejected() {
        #[derive(Carrier, Default)]
        struct Query {
            #[port(inp = "query")]
            q: String,
        }

        let error = input_port::<Query>().unwrap_err();
        assert!(matches!(error, PortError::InvalidGroup { ref group, .. } if group == "query"));
    }

    #[test]
    fn optional_address_headers() {
        #[derive(Carrier, Debug, Default)]
        struct Origin {
            #[port(inp = "header=x-client")]
            client: Option<IpAddr>,
            #[port(inp = "header=x-proxy")]
            proxy: Option<SocketAddr>,
        }

        let port = input_port::<Origin>().unwrap();
        let client = port.field_by_name("client").unwrap();
        assert_eq!(client.shape(), Shape::Primitive);
        assert_eq!(client.port_type.indirections, 1);

        let registry = ContentRegistry::default();
        let message = Message::default().with_metadata("x-client", "10.1.2.3");
        let origin = InputsPopulator::new(&port, MessageDecoder::new(&message), &registry)
            .populate::<Origin>()
            .unwrap();
        assert_eq!(origin.client, Some(IpAddr::from(Ipv4Addr::new(10, 1, 2, 3))));
        assert_eq!(origin.proxy, None);

        let message = Message::default().with_metadata("x-proxy", "not-an-address");
        let error = InputsPopulator::new(&port, MessageDecoder::new(&message), &registry)
            .populate::<Origin>()
            .unwrap_err();
        assert!(matches!(error.root_cause(), PortError::Coercion(_)));
    }
}
