//! Value kind descriptor.

use std::fmt;

use mrb_runtime::ValueTag;

/// Dynamic kind of a script value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueType {
    Nil,
    True,
    False,
    Integer,
    Float,
    Symbol,
    String,
    Array,
    Hash,
    Proc,
    Object,
    Class,
    Module,
    Range,
    Exception,
}

impl ValueType {
    pub fn name(self) -> &'static str {
        match self {
            ValueType::Nil => "nil",
            ValueType::True => "true",
            ValueType::False => "false",
            ValueType::Integer => "Integer",
            ValueType::Float => "Float",
            ValueType::Symbol => "Symbol",
            ValueType::String => "String",
            ValueType::Array => "Array",
            ValueType::Hash => "Hash",
            ValueType::Proc => "Proc",
            ValueType::Object => "Object",
            ValueType::Class => "Class",
            ValueType::Module => "Module",
            ValueType::Range => "Range",
            ValueType::Exception => "Exception",
        }
    }

    /// Kinds the conversion bridge carries to the host.
    pub fn is_convertible(self) -> bool {
        !matches!(
            self,
            ValueType::Proc
                | ValueType::Object
                | ValueType::Class
                | ValueType::Module
                | ValueType::Range
                | ValueType::Exception
        )
    }
}

impl From<ValueTag> for ValueType {
    fn from(tag: ValueTag) -> Self {
        match tag {
            ValueTag::Nil => ValueType::Nil,
            ValueTag::True => ValueType::True,
            ValueTag::False => ValueType::False,
            ValueTag::Integer => ValueType::Integer,
            ValueTag::Float => ValueType::Float,
            ValueTag::Symbol => ValueType::Symbol,
            ValueTag::String => ValueType::String,
            ValueTag::Array => ValueType::Array,
            ValueTag::Hash => ValueType::Hash,
            ValueTag::Range => ValueType::Range,
            ValueTag::Proc => ValueType::Proc,
            ValueTag::Object => ValueType::Object,
            ValueTag::Exception => ValueType::Exception,
            ValueTag::Class => ValueType::Class,
            ValueTag::Module => ValueType::Module,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
