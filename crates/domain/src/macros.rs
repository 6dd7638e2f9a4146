//! Macro for implementing Display and FromStr for status enums
//!
//! Status-like enums are stored as lowercase TEXT columns and sent over the
//! wire as lowercase strings. This macro keeps both directions in one place.
//!
//! # Example
//!
//! ```rust
//! use fieldsync_domain::impl_domain_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum UploadState {
//!     Queued,
//!     Done,
//! }
//!
//! impl_domain_status_conversions!(UploadState {
//!     Queued => "queued",
//!     Done => "done",
//! });
//!
//! assert_eq!(UploadState::Done.to_string(), "done");
//! assert_eq!("QUEUED".parse::<UploadState>().unwrap(), UploadState::Queued);
//! ```

/// Implements Display and FromStr traits for status enums
///
/// - Display writes the mapped lowercase string
/// - FromStr parses case-insensitively and reports the enum name on failure
#[macro_export]
macro_rules! impl_domain_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:literal),+ $(,)? }) => {
        impl ::std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                match self {
                    $(Self::$variant => f.write_str($str),)+
                }
            }
        }

        impl ::std::str::FromStr for $enum_name {
            type Err = ::std::string::String;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($str => ::std::result::Result::Ok(Self::$variant),)+
                    _ => ::std::result::Result::Err(::std::format!(
                        "Invalid {}: {}",
                        ::std::stringify!($enum_name),
                        s
                    )),
                }
            }
        }
    };
}
