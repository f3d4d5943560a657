//! Declaration locations and enclosing regions.
//!
//! A [`DeclLocation`] names one physical annotation target in the target
//! module. A [`Region`] names the declaration that encloses a diagnostic.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single annotatable declaration.
///
/// Method members carry their full signature (`find(java.lang.String)`), so two
/// overloads are distinct locations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeclLocation {
    /// The class declaration itself (target of class-level relaxation).
    Class { class: String },
    /// A field declaration.
    Field { class: String, field: String },
    /// A method or constructor return position.
    Method { class: String, method: String },
    /// A formal parameter, zero-based.
    Parameter {
        class: String,
        method: String,
        index: usize,
    },
}

impl DeclLocation {
    pub fn class_decl(class: impl Into<String>) -> Self {
        Self::Class {
            class: class.into(),
        }
    }

    pub fn field(class: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Field {
            class: class.into(),
            field: field.into(),
        }
    }

    pub fn method(class: impl Into<String>, method: impl Into<String>) -> Self {
        Self::Method {
            class: class.into(),
            method: method.into(),
        }
    }

    pub fn parameter(class: impl Into<String>, method: impl Into<String>, index: usize) -> Self {
        Self::Parameter {
            class: class.into(),
            method: method.into(),
            index,
        }
    }

    /// Fully qualified name of the declaring class.
    pub fn class(&self) -> &str {
        match self {
            Self::Class { class }
            | Self::Field { class, .. }
            | Self::Method { class, .. }
            | Self::Parameter { class, .. } => class,
        }
    }

    pub const fn is_field(&self) -> bool {
        matches!(self, Self::Field { .. })
    }

    pub const fn is_method(&self) -> bool {
        matches!(self, Self::Method { .. })
    }

    pub const fn is_parameter(&self) -> bool {
        matches!(self, Self::Parameter { .. })
    }

    /// The method owning this location: itself for a method, the declaring
    /// method for a parameter.
    pub fn enclosing_method(&self) -> Option<Self> {
        match self {
            Self::Method { .. } => Some(self.clone()),
            Self::Parameter { class, method, .. } => Some(Self::method(class.clone(), method.clone())),
            Self::Class { .. } | Self::Field { .. } => None,
        }
    }

    /// Whether the location is a constructor or a constructor parameter.
    pub fn is_constructor(&self) -> bool {
        match self {
            Self::Method { class, method } | Self::Parameter { class, method, .. } => {
                is_constructor_signature(class, method)
            }
            Self::Class { .. } | Self::Field { .. } => false,
        }
    }

    /// The region a diagnostic about this declaration would be reported in.
    pub fn region(&self) -> Region {
        match self {
            Self::Class { class } => Region::initializer(class.clone()),
            Self::Field { class, field } => Region::member(class.clone(), field.clone()),
            Self::Method { class, method } | Self::Parameter { class, method, .. } => {
                Region::member(class.clone(), method.clone())
            }
        }
    }
}

impl fmt::Display for DeclLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class { class } => write!(f, "{class}"),
            Self::Field { class, field } => write!(f, "{class}#{field}"),
            Self::Method { class, method } => write!(f, "{class}#{method}"),
            Self::Parameter {
                class,
                method,
                index,
            } => write!(f, "{class}#{method}[{index}]"),
        }
    }
}

/// What kind of declaration a region's member denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionKind {
    /// Static or instance initializer block (no member).
    Initializer,
    Field,
    Method,
    Constructor,
}

/// Enclosing declaration of a diagnostic: a class plus an optional member.
///
/// Equality is by the class and member strings only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Region {
    pub class: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member: Option<String>,
}

impl Region {
    pub fn member(class: impl Into<String>, member: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            member: Some(member.into()),
        }
    }

    pub fn initializer(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            member: None,
        }
    }

    pub fn kind(&self) -> RegionKind {
        match &self.member {
            None => RegionKind::Initializer,
            Some(member) if member.contains('(') => {
                if is_constructor_signature(&self.class, member) {
                    RegionKind::Constructor
                } else {
                    RegionKind::Method
                }
            }
            Some(_) => RegionKind::Field,
        }
    }

    pub fn is_on_method(&self) -> bool {
        matches!(self.kind(), RegionKind::Method | RegionKind::Constructor)
    }

    pub fn is_on_field(&self) -> bool {
        self.kind() == RegionKind::Field
    }

    pub fn is_on_initializer(&self) -> bool {
        self.kind() == RegionKind::Initializer
    }

    /// Anonymous classes are named `Outer$<n>` by the compiler.
    pub fn is_in_anonymous_class(&self) -> bool {
        self.class.split('$').skip(1).any(|segment| {
            !segment.is_empty() && segment.chars().all(|c| c.is_ascii_digit())
        })
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.member {
            Some(member) => write!(f, "{}#{member}", self.class),
            None => write!(f, "{}#<init>", self.class),
        }
    }
}

fn simple_name(class: &str) -> &str {
    let tail = class.rsplit('.').next().unwrap_or(class);
    tail.rsplit('$').next().unwrap_or(tail)
}

fn is_constructor_signature(class: &str, signature: &str) -> bool {
    signature
        .split('(')
        .next()
        .is_some_and(|name| name == simple_name(class))
}
