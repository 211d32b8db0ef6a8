use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

const MAX_SYMBOL_LEN: usize = 24;

/// Exchange-suffixed ticker, e.g. `RELIANCE.NS`.
///
/// Always uppercase and always carries a `.<EXCHANGE>` suffix, so it can be
/// sent to the history provider as-is.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TickerSymbol(String);

impl TickerSymbol {
    /// Parse a symbol that already carries its exchange suffix.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let normalized = normalize(input)?;

        match normalized.rsplit_once('.') {
            Some((base, suffix)) if !base.is_empty() && !suffix.is_empty() => Ok(Self(normalized)),
            _ => Err(ValidationError::MissingExchangeSuffix { value: normalized }),
        }
    }

    /// Normalize a raw constituent value and append the default suffix when
    /// it does not end in one of the recognized ones.
    pub fn with_suffix(input: &str, suffixes: &ExchangeSuffixes) -> Result<Self, ValidationError> {
        let normalized = normalize(input)?;
        if suffixes.is_recognized(&normalized) {
            return Self::parse(&normalized);
        }
        Self::parse(&format!("{normalized}{}", suffixes.default_suffix()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Symbol without its exchange suffix (`ACME` for `ACME.NS`).
    pub fn base(&self) -> &str {
        self.0.rsplit_once('.').map_or(self.0.as_str(), |(base, _)| base)
    }

    /// Exchange suffix including the dot (`.NS` for `ACME.NS`).
    pub fn suffix(&self) -> &str {
        self.0
            .rfind('.')
            .map_or("", |index| &self.0[index..])
    }
}

fn normalize(input: &str) -> Result<String, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptySymbol);
    }

    let normalized = trimmed.to_ascii_uppercase();
    let len = normalized.chars().count();
    if len > MAX_SYMBOL_LEN {
        return Err(ValidationError::SymbolTooLong {
            len,
            max: MAX_SYMBOL_LEN,
        });
    }

    if let Some(first) = normalized.chars().next() {
        if !first.is_ascii_alphanumeric() {
            return Err(ValidationError::SymbolInvalidStart { ch: first });
        }
    }

    // NSE symbols such as M&M and BAJAJ-AUTO use '&' and '-'.
    for (index, ch) in normalized.chars().enumerate() {
        let valid = ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '&' | '_');
        if !valid {
            return Err(ValidationError::SymbolInvalidChar { ch, index });
        }
    }

    Ok(normalized)
}

impl Display for TickerSymbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for TickerSymbol {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for TickerSymbol {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<TickerSymbol> for String {
    fn from(value: TickerSymbol) -> Self {
        value.0
    }
}

/// Exchange suffixes known to the provider plus the one appended to bare
/// constituent codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeSuffixes {
    default_suffix: String,
    recognized: Vec<String>,
}

impl Default for ExchangeSuffixes {
    fn default() -> Self {
        Self {
            default_suffix: String::from(".NS"),
            recognized: vec![String::from(".NS"), String::from(".BO")],
        }
    }
}

impl ExchangeSuffixes {
    /// Build a suffix set; the default suffix is always recognized.
    pub fn new(
        default_suffix: &str,
        recognized: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> Result<Self, ValidationError> {
        let default_suffix = normalize_suffix(default_suffix)?;
        let mut suffixes = vec![default_suffix.clone()];
        for suffix in recognized {
            let suffix = normalize_suffix(suffix.as_ref())?;
            if !suffixes.contains(&suffix) {
                suffixes.push(suffix);
            }
        }

        Ok(Self {
            default_suffix,
            recognized: suffixes,
        })
    }

    pub fn default_suffix(&self) -> &str {
        &self.default_suffix
    }

    pub fn recognized(&self) -> &[String] {
        &self.recognized
    }

    pub fn is_recognized(&self, symbol: &str) -> bool {
        self.recognized
            .iter()
            .any(|suffix| symbol.len() > suffix.len() && symbol.ends_with(suffix.as_str()))
    }
}

fn normalize_suffix(input: &str) -> Result<String, ValidationError> {
    let trimmed = input.trim().to_ascii_uppercase();
    let body = trimmed.strip_prefix('.').unwrap_or(&trimmed);
    if body.is_empty() || !body.chars().all(|ch| ch.is_ascii_alphanumeric()) {
        return Err(ValidationError::InvalidExchangeSuffix {
            value: input.to_owned(),
        });
    }
    Ok(format!(".{body}"))
}
