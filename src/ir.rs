// Strongly-typed schema IR. No serde_json::Value here.
//
// Produced by `lower` from the extraction wire format (or built by hand), consumed by `compile`.

/// Reserved property name: never read from input, synthesized as `{}` after decode.
pub const ATTRS_KEYWORD: &str = "attrs";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prim {
    String,
    Number,
    Boolean,
    Null,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Ty {
    Primitive(Prim),
    Reference(String),                 // another registered schema or caster, by name
    Array(Box<Ty>),
    Union(Vec<Ty>),                    // first accepting member wins
    Literal(Vec<Property>),            // anonymous inline object
    Generic {
        parameter_name: String,        // factory tag
        parameter_type: Box<Ty>,
    },
    Parameterized {
        self_type: String,             // factory tag
        type_argument: Box<Ty>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub ty: Ty,
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub name: String,
    pub properties: Vec<Property>,
}

impl Ty {
    pub fn string() -> Self { Ty::Primitive(Prim::String) }
    pub fn number() -> Self { Ty::Primitive(Prim::Number) }
    pub fn boolean() -> Self { Ty::Primitive(Prim::Boolean) }
    pub fn null() -> Self { Ty::Primitive(Prim::Null) }

    pub fn reference(name: impl Into<String>) -> Self {
        Ty::Reference(name.into())
    }

    pub fn array(element: Ty) -> Self {
        Ty::Array(Box::new(element))
    }

    /// `T | null`
    pub fn nullable(inner: Ty) -> Self {
        Ty::Union(vec![inner, Ty::null()])
    }

    pub fn parameterized(self_type: impl Into<String>, type_argument: Ty) -> Self {
        Ty::Parameterized {
            self_type: self_type.into(),
            type_argument: Box::new(type_argument),
        }
    }
}

impl Property {
    pub fn required(name: impl Into<String>, ty: Ty) -> Self {
        Self { name: name.into(), ty, optional: false }
    }

    pub fn optional(name: impl Into<String>, ty: Ty) -> Self {
        Self { name: name.into(), ty, optional: true }
    }

    pub fn is_attrs(&self) -> bool {
        self.name == ATTRS_KEYWORD
    }
}

impl Schema {
    pub fn new(name: impl Into<String>, properties: Vec<Property>) -> Self {
        Self { name: name.into(), properties }
    }

    /// Names of every schema this one references directly, in declaration order.
    pub fn references(&self) -> Vec<&str> {
        fn walk<'a>(ty: &'a Ty, out: &mut Vec<&'a str>) {
            match ty {
                Ty::Primitive(_) => {}
                Ty::Reference(name) => {
                    if !out.contains(&name.as_str()) {
                        out.push(name);
                    }
                }
                Ty::Array(elem) => walk(elem, out),
                Ty::Union(members) => members.iter().for_each(|m| walk(m, out)),
                Ty::Literal(props) => props.iter().for_each(|p| walk(&p.ty, out)),
                Ty::Generic { parameter_type: arg, .. }
                | Ty::Parameterized { type_argument: arg, .. } => walk(arg, out),
            }
        }
        let mut out = Vec::new();
        for p in &self.properties {
            if !p.is_attrs() {
                walk(&p.ty, &mut out);
            }
        }
        out
    }
}
