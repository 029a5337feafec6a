//! Macros to reduce boilerplate in the codebase

/// Generate Display, FromStr and a `VALUES` table for a closed vocabulary.
///
/// The second argument is the field name reported in
/// `DeskError::InvalidValue` when parsing fails.
///
/// ```rust,ignore
/// vocabulary!(TaskStatus, "status", {
///     Todo => "todo",
///     InProgress => "in_progress",
///     Done => "done",
/// });
/// ```
#[macro_export]
macro_rules! vocabulary {
    (
        $enum_name:ident,
        $field:literal,
        { $($variant:ident => $str:literal),+ $(,)? }
    ) => {
        impl $enum_name {
            /// Every wire value of this vocabulary, in declaration order.
            pub const VALUES: &'static [&'static str] = &[$($str),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($enum_name::$variant => $str,)+
                }
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = $crate::error::DeskError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($str => Ok($enum_name::$variant),)+
                    _ => Err($crate::error::DeskError::InvalidValue {
                        field: $field.to_string(),
                        value: s.to_string(),
                    }),
                }
            }
        }
    };
}
