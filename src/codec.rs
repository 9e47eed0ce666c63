//! Resilient decoding for open-ended wire enumerations
//!
//! The Gemini backend adds enum values over time (new finish reasons, new harm
//! categories). A client built before such an addition must keep decoding
//! responses, so unknown tags resolve to a designated fallback variant and a
//! diagnostic is emitted instead of an error.
//!
//! The lookup itself ([`lookup`]) is pure. The diagnostic is a separate side
//! effect routed through a [`DiagnosticSink`], which defaults to `tracing`.

use crate::{Error, Result};
use serde::de::{self, Visitor};
use serde::{Deserializer, Serializer};
use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;
use std::sync::OnceLock;

#[doc(hidden)]
pub use serde as __serde;

/// Where unknown enum values should be reported.
pub const ISSUE_TRACKER: &str = "https://github.com/google/generative-ai-android/issues";

/// Log target used for unknown-tag diagnostics.
pub const DIAGNOSTIC_TARGET: &str = "resilient_enum";

/// One entry of an enumeration's static variant table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Variant<T> {
    pub value: T,
    pub wire: &'static str,
}

impl<T> Variant<T> {
    pub const fn new(value: T, wire: &'static str) -> Self {
        Self { value, wire }
    }
}

/// A closed enumeration decoded from an open wire vocabulary.
///
/// Implementations are normally generated by [`resilient_enum!`](crate::resilient_enum),
/// which keeps `VARIANTS` and `wire_name` in sync. Hand-written impls should be
/// checked with [`validate`] at startup.
pub trait ResilientEnum: Copy + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Name used in diagnostics.
    const TYPE_NAME: &'static str;

    /// Every known variant with its canonical wire name.
    const VARIANTS: &'static [Variant<Self>];

    /// Variant returned for unrecognized tags.
    const FALLBACK: Self;

    /// Canonical wire name of this variant.
    fn wire_name(&self) -> &'static str;
}

/// Outcome of a pure lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<T> {
    Known(T),
    Fallback(T),
}

impl<T> Lookup<T> {
    pub fn into_inner(self) -> T {
        match self {
            Lookup::Known(value) | Lookup::Fallback(value) => value,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Lookup::Fallback(_))
    }
}

/// Receives a notification for every tag that fell back.
pub trait DiagnosticSink: Send + Sync {
    fn unknown_tag(&self, type_name: &'static str, tag: &str);
}

/// Default sink: one `tracing` error event per unknown tag.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl DiagnosticSink for TracingDiagnostics {
    fn unknown_tag(&self, type_name: &'static str, tag: &str) {
        tracing::error!(
            target: DIAGNOSTIC_TARGET,
            type_name,
            tag,
            "{}",
            unknown_tag_message(type_name, tag)
        );
    }
}

/// Human-readable description of an unknown tag.
pub fn unknown_tag_message(type_name: &str, tag: &str) -> String {
    format!(
        "Unknown {} value found: {:?}. This usually means the backend was updated and this \
         client needs to be updated to match it. Check for a newer release, otherwise please \
         open an issue at {}",
        type_name, tag, ISSUE_TRACKER
    )
}

static DEFAULT_SINK: TracingDiagnostics = TracingDiagnostics;
static INSTALLED_SINK: OnceLock<Box<dyn DiagnosticSink>> = OnceLock::new();

/// Install the process-wide sink used by [`decode`] and serde deserialization.
///
/// Returns `false` if a sink was already installed; the first one wins.
pub fn install_diagnostic_sink(sink: Box<dyn DiagnosticSink>) -> bool {
    INSTALLED_SINK.set(sink).is_ok()
}

fn diagnostic_sink() -> &'static dyn DiagnosticSink {
    match INSTALLED_SINK.get() {
        Some(sink) => sink.as_ref(),
        None => &DEFAULT_SINK,
    }
}

/// Exact, case-sensitive lookup of `tag` in `T`'s variant table.
pub fn lookup<T: ResilientEnum>(tag: &str) -> Lookup<T> {
    T::VARIANTS
        .iter()
        .find(|variant| variant.wire == tag)
        .map(|variant| Lookup::Known(variant.value))
        .unwrap_or(Lookup::Fallback(T::FALLBACK))
}

/// Decode `tag`, reporting a fallback to `sink`.
pub fn decode_with<T: ResilientEnum>(tag: &str, sink: &dyn DiagnosticSink) -> T {
    let found = lookup::<T>(tag);
    if found.is_fallback() {
        sink.unknown_tag(T::TYPE_NAME, tag);
    }
    found.into_inner()
}

/// Decode `tag`, reporting a fallback to the process-wide sink.
pub fn decode<T: ResilientEnum>(tag: &str) -> T {
    decode_with(tag, diagnostic_sink())
}

pub fn encode<T: ResilientEnum>(value: &T) -> &'static str {
    value.wire_name()
}

/// Check an enumeration's declaration.
///
/// Fails when the table is empty, a wire name or variant is listed twice, a
/// table entry disagrees with `wire_name`, or the fallback is not in the table.
pub fn validate<T: ResilientEnum>() -> Result<()> {
    let invalid = |reason: String| Error::InvalidEnum {
        type_name: T::TYPE_NAME,
        reason,
    };

    if T::VARIANTS.is_empty() {
        return Err(invalid("no variants declared".to_string()));
    }

    let mut wires = HashSet::with_capacity(T::VARIANTS.len());
    for (index, variant) in T::VARIANTS.iter().enumerate() {
        if !wires.insert(variant.wire) {
            return Err(invalid(format!(
                "wire name {:?} is declared more than once",
                variant.wire
            )));
        }
        if T::VARIANTS[..index]
            .iter()
            .any(|earlier| earlier.value == variant.value)
        {
            return Err(invalid(format!(
                "variant {:?} is declared more than once",
                variant.value
            )));
        }
        if variant.value.wire_name() != variant.wire {
            return Err(invalid(format!(
                "variant {:?} encodes as {:?} but its table entry is {:?}",
                variant.value,
                variant.value.wire_name(),
                variant.wire
            )));
        }
    }

    if !T::VARIANTS
        .iter()
        .any(|variant| variant.value == T::FALLBACK)
    {
        return Err(invalid(format!(
            "fallback {:?} is not a declared variant",
            T::FALLBACK
        )));
    }

    Ok(())
}

pub fn serialize<T, S>(value: &T, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    T: ResilientEnum,
    S: Serializer,
{
    serializer.serialize_str(value.wire_name())
}

/// Deserialize a string tag. Only a non-string value is an error.
pub fn deserialize<'de, T, D>(deserializer: D) -> std::result::Result<T, D::Error>
where
    T: ResilientEnum,
    D: Deserializer<'de>,
{
    struct TagVisitor<T>(PhantomData<T>);

    impl<'de, T: ResilientEnum> Visitor<'de> for TagVisitor<T> {
        type Value = T;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            write!(f, "a {} string", T::TYPE_NAME)
        }

        fn visit_str<E: de::Error>(self, tag: &str) -> std::result::Result<T, E> {
            Ok(decode(tag))
        }
    }

    deserializer.deserialize_str(TagVisitor(PhantomData))
}

/// Declare an enum that decodes resiliently from its wire names.
///
/// ```
/// easy_gemini::resilient_enum! {
///     /// Traffic light colour.
///     pub enum Light {
///         fallback = Red;
///         Red = "RED",
///         Amber = "AMBER",
///         Green,
///     }
/// }
///
/// use easy_gemini::codec::{decode, encode};
/// assert_eq!(decode::<Light>("AMBER"), Light::Amber);
/// assert_eq!(decode::<Light>("BLUE"), Light::Red);
/// assert_eq!(encode(&Light::Green), "Green");
/// ```
///
/// A variant without `= "..."` uses its own name on the wire.
#[macro_export]
macro_rules! resilient_enum {
    (@wire $variant:ident $wire:literal) => {
        $wire
    };
    (@wire $variant:ident) => {
        stringify!($variant)
    };
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            fallback = $fallback:ident;
            $(
                $(#[$vmeta:meta])*
                $variant:ident $(= $wire:literal)?
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $(
                $(#[$vmeta])*
                $variant,
            )+
        }

        impl $crate::codec::ResilientEnum for $name {
            const TYPE_NAME: &'static str = stringify!($name);
            const VARIANTS: &'static [$crate::codec::Variant<Self>] = &[
                $(
                    $crate::codec::Variant::new(
                        $name::$variant,
                        $crate::resilient_enum!(@wire $variant $($wire)?),
                    ),
                )+
            ];
            const FALLBACK: Self = $name::$fallback;

            fn wire_name(&self) -> &'static str {
                match self {
                    $(
                        $name::$variant => $crate::resilient_enum!(@wire $variant $($wire)?),
                    )+
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str($crate::codec::ResilientEnum::wire_name(self))
            }
        }

        impl $crate::codec::__serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> ::std::result::Result<S::Ok, S::Error>
            where
                S: $crate::codec::__serde::Serializer,
            {
                $crate::codec::serialize(self, serializer)
            }
        }

        impl<'de> $crate::codec::__serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> ::std::result::Result<Self, D::Error>
            where
                D: $crate::codec::__serde::Deserializer<'de>,
            {
                $crate::codec::deserialize(deserializer)
            }
        }
    };
}
