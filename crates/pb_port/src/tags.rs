use pb_utils::text::split_pair;

use crate::PortError;

/// A parsed primary annotation: `group[=peer][,option[=value]]*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PrimaryTag<'a> {
    pub group: &'a str,
    pub peer: Option<&'a str>,
    /// Options in annotation order; a bare option has the value `"true"`.
    pub options: Vec<(&'a str, &'a str)>,
}

impl<'a> PrimaryTag<'a> {
    pub fn parse(field: &str, value: &'a str) -> Result<Self, PortError> {
        let mut segments = value.split(',');
        let (group, peer) = split_pair(segments.next().unwrap_or_default());
        if group.is_empty() {
            return Err(PortError::InvalidTag {
                field: field.to_owned(),
                message: format!("missing field group in {value:?}"),
            });
        }

        let mut options = Vec::new();
        for segment in segments {
            let (name, option) = split_pair(segment);
            if name.is_empty() {
                return Err(PortError::InvalidTag {
                    field: field.to_owned(),
                    message: format!("empty option name in {value:?}"),
                });
            }
            options.push((name, option.unwrap_or("true")));
        }

        Ok(Self {
            group,
            peer: peer.filter(|peer| !peer.is_empty()),
            options,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::PrimaryTag;
    use crate::PortError;

    #[test]
    fn group_peer_and_options() {
        let tag = PrimaryTag::parse("a", "header=contentType,optional,default=x=y").unwrap();
        assert_eq!(tag.group, "header");
        assert_eq!(tag.peer, Some("contentType"));
        assert_eq!(tag.options, [("optional", "true"), ("default", "x=y")]);
    }

    #[test]
    fn bare_group() {
        let tag = PrimaryTag::parse("a", "body").unwrap();
        assert_eq!((tag.group, tag.peer), ("body", None));
        assert!(tag.options.is_empty());

        assert_eq!(PrimaryTag::parse("a", "header=").unwrap().peer, None);
    }

    #[test]
    fn malformed_tags() {
        assert!(matches!(
            PrimaryTag::parse("a", "header,,optional"),
            Err(PortError::InvalidTag { .. })
        ));
        assert!(matches!(PrimaryTag::parse("a", "=peer"), Err(PortError::InvalidTag { .. })));
    }
}
