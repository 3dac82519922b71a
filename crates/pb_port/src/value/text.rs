/// Binds a type through its text form.
///
/// The type must implement `FromStr` (with a `Display` error) and `Display`.
/// It classifies as a primitive field with the text handler. An optional
/// `default` value lets `Option` layers and lists of the type be allocated
/// while binding. An optional `validate` function runs after every write.
///
/// # Examples
///
/// ```
/// use core::str::FromStr;
///
/// use pb_port::{FieldValue, Shape, ValidationError, impl_text_field};
///
/// #[derive(Debug, Default, PartialEq)]
/// struct Percent(u8);
///
/// impl FromStr for Percent {
///     type Err = core::num::ParseIntError;
///
///     fn from_str(s: &str) -> Result<Self, Self::Err> {
///         s.trim_end_matches('%').parse().map(Percent)
///     }
/// }
///
/// impl core::fmt::Display for Percent {
///     fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
///         write!(f, "{}%", self.0)
///     }
/// }
///
/// fn at_most_hundred(value: &Percent) -> Result<(), ValidationError> {
///     if value.0 > 100 {
///         return Err(ValidationError::new("must not exceed 100%"));
///     }
///     Ok(())
/// }
///
/// impl_text_field!(Percent, default = Percent(0), validate = at_most_hundred);
///
/// assert_eq!(Percent::field_type().shape, Shape::Primitive);
/// assert_eq!(<Option<Percent>>::field_type().indirections, 1);
/// assert!(Percent(120).validate_value().is_err());
/// ```
#[macro_export]
macro_rules! impl_text_field {
    ($ty:ty $(, default = $default:expr)? $(, validate = $validate:path)? $(,)?) => {
        impl $crate::TextValue for $ty {
            fn marshal_text(&self) -> ::core::result::Result<::std::string::String, $crate::BoxError> {
                ::core::result::Result::Ok(::std::string::ToString::to_string(self))
            }

            fn unmarshal_text(&mut self, text: &str) -> ::core::result::Result<(), $crate::BoxError> {
                *self = <$ty as ::core::str::FromStr>::from_str(text)
                    .map_err(|e| $crate::BoxError::from(::std::string::ToString::to_string(&e)))?;
                ::core::result::Result::Ok(())
            }
        }

        impl $crate::FieldValue for $ty {
            #[inline]
            fn field_type() -> $crate::PortFieldType {
                $crate::PortFieldType::text::<$ty>()
            }

            $(
                #[inline]
                fn new_default() -> ::core::option::Option<Self> {
                    ::core::option::Option::Some($default)
                }
            )?

            #[inline]
            fn value_ref(&self) -> $crate::FieldRef<'_> {
                $crate::FieldRef::Text(self)
            }

            #[inline]
            fn value_mut(&mut self) -> $crate::FieldMut<'_> {
                $crate::FieldMut::Text(self)
            }

            $(
                fn validate_value(&self) -> ::core::result::Result<(), $crate::ValidationError> {
                    $validate(self)
                }
            )?
        }
    };
}

impl_text_field!(
    core::net::IpAddr,
    default = core::net::IpAddr::V4(core::net::Ipv4Addr::UNSPECIFIED),
);
impl_text_field!(core::net::Ipv4Addr, default = core::net::Ipv4Addr::UNSPECIFIED);
impl_text_field!(core::net::Ipv6Addr, default = core::net::Ipv6Addr::UNSPECIFIED);
impl_text_field!(
    core::net::SocketAddr,
    default = core::net::SocketAddr::from((core::net::Ipv4Addr::UNSPECIFIED, 0)),
);

#[cfg(test)]
mod tests {
    use core::net::{IpAddr, Ipv4Addr};

    use crate::{FieldValue, Handler, TextValue};

    #[test]
    fn addresses_bind_as_text() {
        assert_eq!(IpAddr::field_type().handler, Handler::Text);

        let mut addr = IpAddr::from(Ipv4Addr::UNSPECIFIED);
        addr.unmarshal_text("10.0.0.1").unwrap();
        assert_eq!(addr.marshal_text().unwrap(), "10.0.0.1");

        let error = addr.unmarshal_text("10.0.0.256").unwrap_err();
        assert_eq!(error.to_string(), "invalid IP address syntax");
    }
}
