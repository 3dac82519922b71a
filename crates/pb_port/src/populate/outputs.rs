use pb_content::{ContentOptions, ContentRegistry, Encoding, EntityRef};

use super::{groups, peers};
use crate::{Carrier, Port, PortError, PortField, PortFieldExtractor};

// -----------------------------------------------------------------------------
// OutputEncoder

/// Writes extracted carrier values to a transport.
pub trait OutputEncoder {
    fn encode_message_id(&mut self, field: &PortField, value: String) -> Result<(), PortError>;

    /// The channel to publish on; `None` when neither the carrier nor the
    /// populator names one.
    fn encode_channel(&mut self, channel: Option<String>) -> Result<(), PortError>;

    /// A header value; `None` when the carrier leaves the header unset.
    fn encode_header(&mut self, field: &PortField, value: Option<String>) -> Result<(), PortError>;

    fn encode_body(
        &mut self,
        field: &PortField,
        registry: &ContentRegistry,
        options: &ContentOptions,
        body: EntityRef<'_>,
    ) -> Result<(), PortError>;
}

// -----------------------------------------------------------------------------
// OutputsPopulator

/// Extracts a carrier's values and hands them to an [`OutputEncoder`].
///
/// Fields are encoded by group: `messageId`, then `channel`, then every
/// `header`, then `body`. Header fields with the `contentType` or
/// `contentEncoding` peer override the body's content type and encoding.
pub struct OutputsPopulator<'a, E> {
    port: &'a Port,
    outputs: &'a dyn Carrier,
    encoder: E,
    registry: &'a ContentRegistry,
    channel: Option<String>,
    content_type: String,
    content_encoding: String,
}

impl<'a, E: OutputEncoder> OutputsPopulator<'a, E> {
    pub fn new(port: &'a Port, outputs: &'a dyn Carrier, encoder: E, registry: &'a ContentRegistry) -> Self {
        Self {
            port,
            outputs,
            encoder,
            registry,
            channel: None,
            content_type: String::new(),
            content_encoding: String::new(),
        }
    }

    /// Channel used when the carrier has no `channel` value.
    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    /// Body content type used when no header overrides it.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Body encoding used when no header overrides it.
    pub fn with_content_encoding(mut self, content_encoding: impl Into<String>) -> Self {
        self.content_encoding = content_encoding.into();
        self
    }

    pub fn populate(mut self) -> Result<E, PortError> {
        let expected = self.port.struct_info();
        let actual = self.outputs.info();
        if actual.type_id() != expected.type_id() {
            return Err(PortError::CarrierMismatch {
                expected: expected.type_name(),
                actual: actual.type_name(),
            });
        }

        self.populate_message_id()?;
        self.populate_channel()?;
        self.populate_headers()?;
        self.populate_body()?;
        Ok(self.encoder)
    }

    fn populate_message_id(&mut self) -> Result<(), PortError> {
        let Some(field) = self.port.field_by_group(groups::MESSAGE_ID) else {
            return Ok(());
        };
        let value = PortFieldExtractor::new(field, self.outputs)
            .extract_primitive()
            .map_err(|e| e.in_field(&field.group, field.name))?;
        match value {
            Some(value) => self.encoder.encode_message_id(field, value),
            None => Ok(()),
        }
    }

    fn populate_channel(&mut self) -> Result<(), PortError> {
        if let Some(field) = self.port.field_by_group(groups::CHANNEL) {
            let value = PortFieldExtractor::new(field, self.outputs)
                .extract_primitive()
                .map_err(|e| e.in_field(&field.group, field.name))?;
            if let Some(value) = value {
                self.channel = Some(value);
            }
        }
        self.encoder.encode_channel(self.channel.clone())
    }

    fn populate_headers(&mut self) -> Result<(), PortError> {
        for field in self.port.fields_by_group(groups::HEADER) {
            let value = PortFieldExtractor::new(field, self.outputs)
                .extract_primitive()
                .map_err(|e| e.in_field(&field.group, field.name))?;

            if let Some(value) = value.as_deref() {
                if field.has_peer(peers::CONTENT_TYPE) {
                    self.content_type = value.to_owned();
                } else if field.has_peer(peers::CONTENT_ENCODING) {
                    self.content_encoding = value.to_owned();
                }
            }

            self.encoder
                .encode_header(field, value)
                .map_err(|e| e.in_field(&field.group, field.name))?;
        }
        Ok(())
    }

    fn populate_body(&mut self) -> Result<(), PortError> {
        let Some(field) = self.port.field_by_group(groups::BODY) else {
            return Ok(());
        };

        let body = PortFieldExtractor::new(field, self.outputs)
            .extract_entity()
            .map_err(|e| e.in_field(&field.group, field.name))?;
        let Some(body) = body else {
            log::trace!("no body to encode for field {:?}", field.name);
            return Ok(());
        };

        if self.content_type.is_empty() {
            return Err(PortError::MissingContentType.in_field(&field.group, field.name));
        }

        let options = ContentOptions::new(self.content_type.as_str())
            .with_encoding(Encoding::parse(&self.content_encoding));
        log::debug!(
            "encoding body {:?} as {} with encoding [{}]",
            field.name,
            options.mime_type,
            options.encoding
        );

        self.encoder
            .encode_body(field, self.registry, &options, body)
            .map_err(|e| e.in_field(&field.group, field.name))
    }
}

impl<E> core::fmt::Debug for OutputsPopulator<'_, E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("OutputsPopulator")
            .field("carrier", &self.port.struct_info().type_name())
            .field("channel", &self.channel)
            .field("content_type", &self.content_type)
            .field("content_encoding", &self.content_encoding)
            .finish_non_exhaustive()
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use pb_content::{ContentOptions, ContentRegistry, EntityRef};
    use serde::{Deserialize, Serialize};

    use super::{OutputEncoder, OutputsPopulator};
    use crate::{
        CardinalityRange, Carrier, FieldGroup, Port, PortDirection, PortError, PortField, PortReflector,
        Shape,
    };

    #[derive(Default, Debug)]
    struct Recorder {
        events: Vec<String>,
    }

    impl OutputEncoder for Recorder {
        fn encode_message_id(&mut self, _: &PortField, value: String) -> Result<(), PortError> {
            self.events.push(format!("id={value}"));
            Ok(())
        }

        fn encode_channel(&mut self, channel: Option<String>) -> Result<(), PortError> {
            self.events.push(format!("channel={channel:?}"));
            Ok(())
        }

        fn encode_header(&mut self, field: &PortField, value: Option<String>) -> Result<(), PortError> {
            self.events.push(format!("{}={value:?}", field.peer));
            Ok(())
        }

        fn encode_body(
            &mut self,
            _: &PortField,
            _: &ContentRegistry,
            options: &ContentOptions,
            body: EntityRef<'_>,
        ) -> Result<(), PortError> {
            let kind = match body {
                EntityRef::Entity(_) => "entity",
                EntityRef::Value(_) => "value",
                EntityRef::Bytes(_) => "bytes",
                EntityRef::Text(_) => "text",
            };
            self.events
                .push(format!("body={kind} {} {}", options.mime_type, options.encoding));
            Ok(())
        }
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct Reply {
        ok: bool,
    }

    #[derive(Carrier, Default)]
    struct Outputs {
        #[port(out = "body")]
        body: Option<Reply>,
        #[port(out = "header=contentEncoding,optional")]
        encoding: Option<String>,
        #[port(out = "header=x-a")]
        a: String,
        #[port(out = "channel")]
        channel: Option<String>,
        #[port(out = "messageId")]
        id: Option<String>,
    }

    fn port() -> Port {
        let group = || FieldGroup::new(CardinalityRange::zero_to_one()).with_shapes([Shape::Primitive]);
        PortReflector::new(PortDirection::Out)
            .with_field_groups([
                ("messageId", group()),
                ("channel", group()),
                ("header", FieldGroup::new(CardinalityRange::zero_to_many())),
                ("body", FieldGroup::new(CardinalityRange::zero_to_one())),
            ])
            .reflect_port::<Outputs>("out")
            .unwrap()
    }

    fn populate(outputs: &Outputs, content_type: &str) -> Result<Vec<String>, PortError> {
        let port = port();
        let registry = ContentRegistry::default();
        let recorder = OutputsPopulator::new(&port, outputs, Recorder::default(), &registry)
            .with_channel("default")
            .with_content_type(content_type)
            .populate()?;
        Ok(recorder.events)
    }

    #[test]
    fn encodes_groups_in_order() {
        let outputs = Outputs {
            body: Some(Reply { ok: true }),
            encoding: Some("gzip".into()),
            a: "va".into(),
            channel: Some("topic".into()),
            id: Some("m1".into()),
        };
        let events = populate(&outputs, "application/json").unwrap();
        assert_eq!(
            events,
            [
                "id=m1",
                "channel=Some(\"topic\")",
                "contentEncoding=Some(\"gzip\")",
                "x-a=Some(\"va\")",
                "body=entity application/json gzip",
            ]
        );
    }

    #[test]
    fn unset_values_are_skipped_or_defaulted() {
        let outputs = Outputs {
            a: "va".into(),
            ..Outputs::default()
        };
        let events = populate(&outputs, "application/json").unwrap();
        assert_eq!(
            events,
            ["channel=Some(\"default\")", "contentEncoding=None", "x-a=Some(\"va\")"]
        );
    }

    #[test]
    fn body_needs_a_content_type() {
        let outputs = Outputs {
            body: Some(Reply { ok: false }),
            a: "va".into(),
            ..Outputs::default()
        };
        let error = populate(&outputs, "").unwrap_err();
        assert!(matches!(error.root_cause(), PortError::MissingContentType));
    }

    #[test]
    fn required_headers_must_be_set() {
        let outputs = Outputs::default();
        let error = populate(&outputs, "application/json").unwrap_err();
        assert!(
            matches!(error, PortError::Field { ref name, .. } if name == "a"),
            "{error}"
        );
    }
}
