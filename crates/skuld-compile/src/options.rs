//! Typed pass options.
//!
//! Every pass declares its options up front: a name, a one-line
//! description, a default, and a value domain (boolean, bounded integer,
//! enumeration, or free string). Values are set from text and validated
//! against the domain at that moment, so by the time a pass reads its
//! options they are known-good typed values. The option set freezes when
//! the owning pass is constructed.

use std::fmt;

use crate::error::{CompileError, CompileResult};

/// A typed option value.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    /// Boolean flag.
    Bool(bool),
    /// Bounded integer.
    Int(i64),
    /// One of a declared set of identifiers.
    Enum(String),
    /// Free-form string.
    Str(String),
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(b) => write!(f, "{b}"),
            OptionValue::Int(i) => write!(f, "{i}"),
            OptionValue::Enum(s) | OptionValue::Str(s) => f.write_str(s),
        }
    }
}

/// The declared domain of an option.
#[derive(Debug, Clone)]
enum OptionDomain {
    Bool,
    Int { min: i64, max: i64 },
    Enum(Vec<String>),
    Str,
}

/// One declared option with its current state.
#[derive(Debug, Clone)]
pub struct OptionDecl {
    name: String,
    description: String,
    domain: OptionDomain,
    default: OptionValue,
    value: Option<OptionValue>,
}

impl OptionDecl {
    /// The option's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// One-line description for documentation dumps.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The effective value: explicitly set, or the default.
    pub fn effective(&self) -> &OptionValue {
        self.value.as_ref().unwrap_or(&self.default)
    }

    /// Whether the option was explicitly set.
    pub fn was_set(&self) -> bool {
        self.value.is_some()
    }

    fn parse(&self, text: &str) -> CompileResult<OptionValue> {
        let invalid = |reason: &str| CompileError::InvalidOptionValue {
            option: self.name.clone(),
            value: text.to_string(),
            reason: reason.to_string(),
        };
        match &self.domain {
            OptionDomain::Bool => match text {
                "true" | "yes" | "1" => Ok(OptionValue::Bool(true)),
                "false" | "no" | "0" => Ok(OptionValue::Bool(false)),
                _ => Err(invalid("expected a boolean")),
            },
            OptionDomain::Int { min, max } => {
                let i: i64 = text.parse().map_err(|_| invalid("expected an integer"))?;
                if i < *min || i > *max {
                    return Err(invalid(&format!("expected an integer in [{min}, {max}]")));
                }
                Ok(OptionValue::Int(i))
            }
            OptionDomain::Enum(allowed) => {
                if allowed.iter().any(|a| a == text) {
                    Ok(OptionValue::Enum(text.to_string()))
                } else {
                    Err(invalid(&format!("expected one of {}", allowed.join(", "))))
                }
            }
            OptionDomain::Str => Ok(OptionValue::Str(text.to_string())),
        }
    }
}

/// The ordered option set of one pass.
#[derive(Debug, Clone, Default)]
pub struct Options {
    decls: Vec<OptionDecl>,
    frozen: bool,
}

impl Options {
    /// Empty option set.
    pub fn new() -> Self {
        Self::default()
    }

    fn add(&mut self, decl: OptionDecl) {
        debug_assert!(
            !self.decls.iter().any(|d| d.name == decl.name),
            "option '{}' declared twice",
            decl.name
        );
        self.decls.push(decl);
    }

    /// Declare a boolean option.
    pub fn add_bool(&mut self, name: &str, description: &str, default: bool) {
        self.add(OptionDecl {
            name: name.to_string(),
            description: description.to_string(),
            domain: OptionDomain::Bool,
            default: OptionValue::Bool(default),
            value: None,
        });
    }

    /// Declare a bounded integer option.
    pub fn add_int(&mut self, name: &str, description: &str, default: i64, min: i64, max: i64) {
        self.add(OptionDecl {
            name: name.to_string(),
            description: description.to_string(),
            domain: OptionDomain::Int { min, max },
            default: OptionValue::Int(default),
            value: None,
        });
    }

    /// Declare an enumerated option.
    pub fn add_enum(&mut self, name: &str, description: &str, default: &str, allowed: &[&str]) {
        debug_assert!(allowed.contains(&default));
        self.add(OptionDecl {
            name: name.to_string(),
            description: description.to_string(),
            domain: OptionDomain::Enum(allowed.iter().map(|s| s.to_string()).collect()),
            default: OptionValue::Enum(default.to_string()),
            value: None,
        });
    }

    /// Declare a free string option.
    pub fn add_str(&mut self, name: &str, description: &str, default: &str) {
        self.add(OptionDecl {
            name: name.to_string(),
            description: description.to_string(),
            domain: OptionDomain::Str,
            default: OptionValue::Str(default.to_string()),
            value: None,
        });
    }

    /// Whether an option with this name is declared.
    pub fn has(&self, name: &str) -> bool {
        self.decls.iter().any(|d| d.name == name)
    }

    fn decl(&self, name: &str) -> CompileResult<&OptionDecl> {
        self.decls
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| CompileError::UnknownOption(name.to_string()))
    }

    /// Set an option from text, validating against its domain. Setting an
    /// option on a constructed (frozen) pass is a configuration error;
    /// setting before freeze overwrites any earlier value.
    pub fn set(&mut self, name: &str, text: &str) -> CompileResult<()> {
        if self.frozen {
            return Err(CompileError::OptionFrozen(name.to_string()));
        }
        let value = self.decl(name)?.parse(text)?;
        let decl = self
            .decls
            .iter_mut()
            .find(|d| d.name == name)
            .expect("declaration checked above");
        decl.value = Some(value);
        Ok(())
    }

    /// The effective value rendered as text.
    pub fn get_text(&self, name: &str) -> CompileResult<String> {
        Ok(self.decl(name)?.effective().to_string())
    }

    /// Whether an option was explicitly set.
    pub fn was_set(&self, name: &str) -> CompileResult<bool> {
        Ok(self.decl(name)?.was_set())
    }

    /// Typed read of a boolean option.
    ///
    /// # Panics
    ///
    /// Panics when the option is missing or not boolean; passes only read
    /// options they declared themselves.
    pub fn as_bool(&self, name: &str) -> bool {
        match self.decl(name).expect("pass reads only declared options").effective() {
            OptionValue::Bool(b) => *b,
            other => panic!("option '{name}' is not a bool: {other}"),
        }
    }

    /// Typed read of an integer option.
    pub fn as_int(&self, name: &str) -> i64 {
        match self.decl(name).expect("pass reads only declared options").effective() {
            OptionValue::Int(i) => *i,
            other => panic!("option '{name}' is not an int: {other}"),
        }
    }

    /// Typed read of an enum or string option.
    pub fn as_str(&self, name: &str) -> &str {
        match self.decl(name).expect("pass reads only declared options").effective() {
            OptionValue::Enum(s) | OptionValue::Str(s) => s,
            other => panic!("option '{name}' is not textual: {other}"),
        }
    }

    /// Freeze the set; subsequent `set` calls fail. Idempotent.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Whether the set is frozen.
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Fold in process-wide defaults: any declared option that was not
    /// explicitly set takes the global registry's value when the registry
    /// holds one under the same name. Called on construction, before the
    /// freeze, so per-pass settings shadow the globals.
    pub fn apply_global_defaults(&mut self) -> CompileResult<()> {
        let pending: Vec<(String, String)> = self
            .decls
            .iter()
            .filter(|d| !d.was_set())
            .filter_map(|d| global::get(&d.name).map(|v| (d.name.clone(), v)))
            .collect();
        for (name, value) in pending {
            self.set(&name, &value)?;
        }
        Ok(())
    }

    /// Iterate over the declarations, for documentation dumps.
    pub fn iter(&self) -> impl Iterator<Item = &OptionDecl> {
        self.decls.iter()
    }
}

/// The process-wide options registry.
///
/// Kept for backward compatibility at the API boundary: values placed here
/// act as defaults for every pass option with the same name, and are
/// shadowed by options set on the pass itself. Intended to be populated
/// once at startup. The scheduler core never reads this; everything
/// reaches it through explicit configuration.
pub mod global {
    use rustc_hash::FxHashMap;
    use std::sync::{Mutex, OnceLock};

    fn registry() -> &'static Mutex<FxHashMap<String, String>> {
        static REGISTRY: OnceLock<Mutex<FxHashMap<String, String>>> = OnceLock::new();
        REGISTRY.get_or_init(|| Mutex::new(FxHashMap::default()))
    }

    /// Set a global default.
    pub fn set(name: &str, value: &str) {
        registry()
            .lock()
            .expect("options registry poisoned")
            .insert(name.to_string(), value.to_string());
    }

    /// Read a global default.
    pub fn get(name: &str) -> Option<String> {
        registry()
            .lock()
            .expect("options registry poisoned")
            .get(name)
            .cloned()
    }

    /// Drop every global default. For embedders that re-initialize.
    pub fn clear() {
        registry()
            .lock()
            .expect("options registry poisoned")
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> Options {
        let mut o = Options::new();
        o.add_bool("skip", "Bypass this pass.", false);
        o.add_enum("target", "Scheduling target.", "alap", &["asap", "alap", "uniform"]);
        o.add_int("limit", "Iteration limit.", 10, 0, 100);
        o.add_str("label", "Free-form label.", "");
        o
    }

    #[test]
    fn test_defaults() {
        let o = options();
        assert!(!o.as_bool("skip"));
        assert_eq!(o.as_str("target"), "alap");
        assert_eq!(o.as_int("limit"), 10);
        assert!(!o.was_set("target").unwrap());
    }

    #[test]
    fn test_set_and_parse() {
        let mut o = options();
        o.set("skip", "yes").unwrap();
        o.set("target", "asap").unwrap();
        o.set("limit", "42").unwrap();
        assert!(o.as_bool("skip"));
        assert_eq!(o.as_str("target"), "asap");
        assert_eq!(o.as_int("limit"), 42);
        assert!(o.was_set("target").unwrap());
    }

    #[test]
    fn test_rejects_out_of_domain() {
        let mut o = options();
        assert!(matches!(
            o.set("target", "sideways"),
            Err(CompileError::InvalidOptionValue { .. })
        ));
        assert!(matches!(
            o.set("limit", "1000"),
            Err(CompileError::InvalidOptionValue { .. })
        ));
        assert!(matches!(
            o.set("skip", "maybe"),
            Err(CompileError::InvalidOptionValue { .. })
        ));
    }

    #[test]
    fn test_unknown_option() {
        let mut o = options();
        assert!(matches!(
            o.set("nonsense", "1"),
            Err(CompileError::UnknownOption(_))
        ));
    }

    #[test]
    fn test_freeze_blocks_set() {
        let mut o = options();
        o.set("limit", "5").unwrap();
        o.freeze();
        assert!(matches!(
            o.set("limit", "6"),
            Err(CompileError::OptionFrozen(_))
        ));
        assert_eq!(o.as_int("limit"), 5);
    }

    #[test]
    fn test_overwrite_before_freeze() {
        let mut o = options();
        o.set("limit", "5").unwrap();
        o.set("limit", "6").unwrap();
        assert_eq!(o.as_int("limit"), 6);
    }

    #[test]
    fn test_global_defaults_shadowed_by_explicit() {
        global::set("test_shadowed_limit", "77");
        let mut o = Options::new();
        o.add_int("test_shadowed_limit", "doc", 1, 0, 100);
        o.add_int("other", "doc", 2, 0, 100);
        o.set("other", "3").unwrap();
        o.apply_global_defaults().unwrap();
        assert_eq!(o.as_int("test_shadowed_limit"), 77);
        assert_eq!(o.as_int("other"), 3);
        global::clear();
    }
}
