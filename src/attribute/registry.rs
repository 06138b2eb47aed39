/// Declares a closed registry of COSE labels.
///
/// Every entry gets a signed integer identifier and a canonical uppercase
/// name. The generated type resolves entries by identifier (exact) or by name
/// (case-insensitive) from a static table, and is ordered by identifier only.
///
/// `unknown` maps a failed lookup to the registry's error, `invalid` is the
/// error for a value that is neither an integer nor a text string.
macro_rules! registry {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            unknown = $unknown:expr;
            invalid = $invalid:expr;
            $(
                $(#[$vmeta:meta])*
                $variant:ident = $id:literal => $label:literal,
            )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                $variant,
            )+
        }

        impl $name {
            /// Every registered entry, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            /// Returns the integer identifier.
            pub fn identifier(&self) -> i64 {
                match self {
                    $($name::$variant => $id,)+
                }
            }

            /// Returns the canonical name.
            pub fn name(&self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }

            /// Resolves an entry by its identifier.
            pub fn from_id(id: i64) -> $crate::Result<$name> {
                match id {
                    $($id => Ok($name::$variant),)+
                    _ => {
                        log::debug!(
                            "{} has no entry {}",
                            stringify!($name),
                            id
                        );
                        Err(($unknown)($crate::error::Lookup::Id(id)))
                    }
                }
            }

            /// Resolves an entry by its name, ignoring case.
            pub fn from_name(name: &str) -> $crate::Result<$name> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|e| e.name().eq_ignore_ascii_case(name))
                    .ok_or_else(|| {
                        log::debug!(
                            "{} has no entry {:?}",
                            stringify!($name),
                            name
                        );
                        ($unknown)($crate::error::Lookup::Name(name.into()))
                    })
            }

            /// Resolves an entry from an integer or text string value.
            pub fn from_value(
                value: &$crate::cbor::Value,
            ) -> $crate::Result<$name> {
                match value {
                    $crate::cbor::Value::Integer(id) => Self::from_id(*id),
                    $crate::cbor::Value::Text(name) => Self::from_name(name),
                    _ => Err($invalid),
                }
            }

            /// Returns the identifier as a CBOR value.
            pub fn to_value(&self) -> $crate::cbor::Value {
                $crate::cbor::Value::Integer(self.identifier())
            }
        }

        impl PartialOrd for $name {
            fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
                Some(self.cmp(other))
            }
        }

        impl Ord for $name {
            fn cmp(&self, other: &Self) -> core::cmp::Ordering {
                self.identifier().cmp(&other.identifier())
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

/// Checks the registry round trip by identifier and by name for every entry.
#[cfg(test)]
macro_rules! assert_round_trip {
    ($name:ident) => {
        for entry in $name::ALL {
            let by_id = $name::from_id(entry.identifier()).unwrap();
            let by_name = $name::from_name(entry.name()).unwrap();
            let by_lower =
                $name::from_name(&entry.name().to_ascii_lowercase()).unwrap();
            assert_eq!(*entry, by_id);
            assert_eq!(by_id, by_name);
            assert_eq!(by_name, by_lower);
            assert_eq!(entry.identifier(), by_id.identifier());
        }
    };
}
