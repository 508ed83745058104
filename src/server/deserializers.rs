use serde::{Deserialize, Deserializer};
use serde_aux::field_attributes::deserialize_number_from_string;

// the quiz frontend sends ids as numbers or as strings, depending on where it took them from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct LenientId(#[serde(deserialize_with = "deserialize_number_from_string")] pub i64);

/// Optional number that also accepts numeric strings. Empty strings count as absent.
pub fn deserialize_optional_lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(i64),
        String(String),
    }

    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Number(n)) => Ok(Some(n)),
        Some(NumberOrString::String(s)) if s.trim().is_empty() => Ok(None),
        Some(NumberOrString::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("Wrong value {s}, can not parse to i64"))),
    }
}
