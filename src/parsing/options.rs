//! Parser options derived from the `parserOptions` settings group.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lua dialect the workspace targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum LuaVersion {
    #[default]
    Lua51,
    Lua52,
    Lua53,
    Lua54,
    LuaJit,
}

impl LuaVersion {
    pub fn supports_goto(&self) -> bool {
        !matches!(self, LuaVersion::Lua51)
    }

    pub fn supports_integer_ops(&self) -> bool {
        matches!(self, LuaVersion::Lua53 | LuaVersion::Lua54)
    }

    pub fn supports_attributes(&self) -> bool {
        matches!(self, LuaVersion::Lua54)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LuaVersion::Lua51 => "5.1",
            LuaVersion::Lua52 => "5.2",
            LuaVersion::Lua53 => "5.3",
            LuaVersion::Lua54 => "5.4",
            LuaVersion::LuaJit => "luajit",
        }
    }
}

impl fmt::Display for LuaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LuaVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "5.1" | "lua51" => Ok(LuaVersion::Lua51),
            "5.2" | "lua52" => Ok(LuaVersion::Lua52),
            "5.3" | "lua53" => Ok(LuaVersion::Lua53),
            "5.4" | "lua54" => Ok(LuaVersion::Lua54),
            "luajit" | "jit" => Ok(LuaVersion::LuaJit),
            other => Err(format!("unknown Lua version '{other}'")),
        }
    }
}

/// Options that change how documents are parsed and bound.
///
/// A rebuild captures the options current at the time it starts; changing
/// them never reinterprets an index that was already built.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParserOptions {
    pub version: LuaVersion,
    /// Assignments to undeclared names inside nested scopes define them.
    pub allow_defined: bool,
}

impl ParserOptions {
    /// Parse a `languageVersion` setting, falling back to 5.1.
    pub fn from_settings(language_version: &str, allow_defined: bool) -> Self {
        let version = language_version.parse().unwrap_or_else(|e| {
            tracing::warn!("[parser] {e}, falling back to 5.1");
            LuaVersion::Lua51
        });
        Self {
            version,
            allow_defined,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_parsing() {
        assert_eq!("5.3".parse::<LuaVersion>(), Ok(LuaVersion::Lua53));
        assert_eq!("LuaJIT".parse::<LuaVersion>(), Ok(LuaVersion::LuaJit));
        assert!("6.0".parse::<LuaVersion>().is_err());
    }

    #[test]
    fn test_unknown_version_falls_back() {
        let options = ParserOptions::from_settings("banana", true);
        assert_eq!(options.version, LuaVersion::Lua51);
        assert!(options.allow_defined);
    }

    #[test]
    fn test_feature_gates() {
        assert!(!LuaVersion::Lua51.supports_goto());
        assert!(LuaVersion::LuaJit.supports_goto());
        assert!(!LuaVersion::Lua52.supports_integer_ops());
        assert!(LuaVersion::Lua54.supports_attributes());
        assert!(!LuaVersion::Lua53.supports_attributes());
    }
}
