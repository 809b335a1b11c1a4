//! Process configuration, read from the environment (and a `.env` file when present).
//!
//! Deserialization works like the [`envy`] crate: every variable becomes a map entry keyed by
//! its name, and a `SCREAMING_SNAKE_CASE` struct picks out the ones it knows about. Values are
//! parsed into the field's type on demand.
//!
//! [`envy`]: https://github.com/softprops/envy

use serde::Deserialize;
use serde::de::value::MapDeserializer;
use serde::de::{self, IntoDeserializer};
use thiserror::Error;

pub const DEFAULT_SERVICE_NAME: &str = "fjalingo-progress";

#[inline]
const fn default_max_connections() -> u32 {
    10
}

#[inline]
const fn default_leaderboard_limit() -> u32 {
    crate::constants::DEFAULT_LEADERBOARD_LIMIT
}

#[inline]
fn default_service_name() -> String {
    DEFAULT_SERVICE_NAME.to_string()
}

#[inline]
fn default_log_filter() -> String {
    String::from("fjalingo_progress=debug,fjalingo=debug,sqlx=info,info")
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Config {
    pub database_url: String,
    #[serde(default = "default_max_connections")]
    pub database_max_connections: u32,
    #[serde(default = "default_leaderboard_limit")]
    pub leaderboard_limit: u32,
    /// Traces and logs are only exported when this is set
    pub otel_exporter_otlp_endpoint: Option<String>,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

impl Config {
    pub fn from_env() -> EnvResult<Self> {
        Ok(from_env::<Config>()?)
    }
}

// ---
//  Deserializer implementation
// ---

struct Val(String, String);
struct Varname(String);

struct Vars<Iter>
where
    Iter: Iterator<Item = (String, String)>,
{
    inner: Iter,
}

impl<Iter: Iterator<Item = (String, String)>> Iterator for Vars<Iter> {
    type Item = (Varname, Val);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|(k, v)| (Varname(k.clone()), Val(k, v)))
    }
}

impl<'de> IntoDeserializer<'de, EnvDeserializeError> for Val {
    type Deserializer = Self;
    fn into_deserializer(self) -> Self::Deserializer {
        self
    }
}

impl<'de> IntoDeserializer<'de, EnvDeserializeError> for Varname {
    type Deserializer = Self;
    fn into_deserializer(self) -> Self::Deserializer {
        self
    }
}

macro_rules! forward_parsed_vals {
    ($($ty:ident => $method:ident,)*) => {
        $(
            fn $method<V>(self, visitor: V) -> Result<V::Value, EnvDeserializeError>
            where
                V: de::Visitor<'de>
            {
                match self.1.trim().parse::<$ty>() {
                    Ok(val) => val.into_deserializer().$method(visitor),
                    Err(e) => Err(de::Error::custom(format_args!(
                        "{}: while parsing '{}' (variable: {})",
                        e, self.1, self.0
                    )))
                }
            }
        )*
    };
}

impl<'de> de::Deserializer<'de> for Val {
    type Error = EnvDeserializeError;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        self.1.into_deserializer().deserialize_any(visitor)
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        // an empty assignment (`FOO=`) reads as unset
        if self.1.trim().is_empty() {
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    forward_parsed_vals! {
        bool => deserialize_bool,
        u16 => deserialize_u16,
        u32 => deserialize_u32,
        u64 => deserialize_u64,
        i32 => deserialize_i32,
        i64 => deserialize_i64,
    }

    serde::forward_to_deserialize_any! {
        char str string unit bytes byte_buf map seq
        unit_struct newtype_struct tuple_struct identifier tuple
        ignored_any enum struct u8 i8 i16 f32 f64
    }
}

impl<'de> de::Deserializer<'de> for Varname {
    type Error = EnvDeserializeError;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        self.0.into_deserializer().deserialize_any(visitor)
    }

    serde::forward_to_deserialize_any! {
        char str string unit seq option bytes byte_buf map newtype_struct
        unit_struct tuple_struct identifier tuple ignored_any
        bool u8 u16 u32 u64 i8 i16 i32 i64 f32 f64 enum struct
    }
}

pub fn from_env<T>() -> Result<T, EnvErr>
where
    T: de::DeserializeOwned,
{
    let vars = dotenvy::vars();
    Ok(from_iter(vars)?)
}

pub fn from_iter<Iter, T>(iter: Iter) -> Result<T, EnvDeserializeError>
where
    T: de::DeserializeOwned,
    Iter: IntoIterator<Item = (String, String)>,
{
    let vars = Vars {
        inner: iter.into_iter(),
    };

    let deserializer: MapDeserializer<'_, _, EnvDeserializeError> = MapDeserializer::new(vars);
    T::deserialize(deserializer)
}

impl de::Error for EnvDeserializeError {
    fn custom<T>(msg: T) -> Self
    where
        T: std::fmt::Display,
    {
        EnvDeserializeError::Custom(msg.to_string())
    }

    fn missing_field(field: &'static str) -> Self {
        EnvDeserializeError::MissingValue(field.to_uppercase())
    }
}

pub type EnvResult<T> = core::result::Result<T, EnvErr>;

#[derive(Debug, Error)]
pub enum EnvErr {
    #[error(transparent)]
    Dotenvy(#[from] dotenvy::Error),

    #[error(transparent)]
    DeserializationError(#[from] EnvDeserializeError),
}

#[derive(Debug, Error)]
pub enum EnvDeserializeError {
    #[error("env deserialization error: {0}")]
    Custom(String),

    #[error("missing required variable {0}")]
    MissingValue(String),
}
