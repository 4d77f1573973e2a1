use serde_json::Value;

use super::{Caster, Codec, Context, Errors, Failure, Validation};
use crate::value::Decoded;

// ------------------------------- Array ----------------------------------- //

struct ArrayCaster {
    name: String,
    element: Caster,
}

impl Codec for ArrayCaster {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self, input: &Value, ctx: &Context<'_>) -> Validation {
        let Value::Array(xs) = input else {
            return Err(ctx.failure(&self.name, Some(input)));
        };
        let mut errors = Errors::default();
        let mut out = Vec::with_capacity(xs.len());
        for (i, x) in xs.iter().enumerate() {
            match self.element.validate(x, &ctx.index(i)) {
                Ok(d) => out.push(d),
                Err(failure) => errors.push(failure)?,
            }
        }
        errors.finish(Decoded::Array(out))
    }

    fn encode(&self, value: &Decoded) -> Value {
        match value {
            Decoded::Array(xs) => Value::Array(xs.iter().map(|x| self.element.encode(x)).collect()),
            other => other.to_value(),
        }
    }

    fn is(&self, value: &Decoded) -> bool {
        matches!(value, Decoded::Array(xs) if xs.iter().all(|x| self.element.is(x)))
    }
}

pub fn array(element: Caster) -> Caster {
    Caster::new(ArrayCaster {
        name: format!("Array<{}>", element.name()),
        element,
    })
}

// ------------------------------- Union ----------------------------------- //

/// First member that accepts wins. On total mismatch every member's errors are reported, in
/// member order.
struct UnionCaster {
    name: String,
    members: Vec<Caster>,
}

impl Codec for UnionCaster {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self, input: &Value, ctx: &Context<'_>) -> Validation {
        let mut failure: Option<Failure> = None;
        for member in &self.members {
            match member.validate(input, ctx) {
                Ok(d) => return Ok(d),
                Err(fatal @ Failure::Fatal(_)) => return Err(fatal),
                Err(invalid) => {
                    failure = Some(match failure.take() {
                        Some(mut acc) => {
                            acc.absorb(invalid);
                            acc
                        }
                        None => invalid,
                    });
                }
            }
        }
        Err(failure.unwrap_or_else(|| ctx.failure(&self.name, Some(input))))
    }

    fn encode(&self, value: &Decoded) -> Value {
        match self.members.iter().find(|m| m.is(value)) {
            Some(m) => m.encode(value),
            None => value.to_value(),
        }
    }

    fn is(&self, value: &Decoded) -> bool {
        self.members.iter().any(|m| m.is(value))
    }
}

/// Union of `members`, folded left to right. A single member is returned as is.
pub fn union(mut members: Vec<Caster>) -> Caster {
    if members.len() == 1 {
        return members.remove(0);
    }
    let name = members.iter().map(Caster::name).collect::<Vec<_>>().join(" | ");
    Caster::new(UnionCaster { name, members })
}

// ---------------------------- Intersection ------------------------------- //

struct IntersectionCaster {
    name: String,
    left: Caster,
    right: Caster,
}

impl Codec for IntersectionCaster {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self, input: &Value, ctx: &Context<'_>) -> Validation {
        let left = self.left.validate(input, ctx);
        let right = self.right.validate(input, ctx);
        match (left, right) {
            (Ok(a), Ok(b)) => Ok(merge(a, b)),
            (Err(mut f), Err(g)) => {
                f.absorb(g);
                Err(f)
            }
            (Err(f), Ok(_)) | (Ok(_), Err(f)) => Err(f),
        }
    }

    fn encode(&self, value: &Decoded) -> Value {
        let base = value.to_value();
        let parts = [self.left.encode(value), self.right.encode(value)];
        let Value::Object(plain) = &base else {
            let [first, _] = parts;
            return first;
        };
        // each part contributes only the keys it changed
        let mut out = plain.clone();
        for part in parts {
            if let Value::Object(m) = part {
                for (k, v) in m {
                    if plain.get(&k) != Some(&v) {
                        out.insert(k, v);
                    }
                }
            }
        }
        Value::Object(out)
    }

    fn is(&self, value: &Decoded) -> bool {
        self.left.is(value) && self.right.is(value)
    }
}

// Each side passes through the keys it does not declare as plain values, so a key decoded into
// an instance by one side must not be overwritten by the other side's plain copy.
// Key order follows the left side.
fn merge(a: Decoded, b: Decoded) -> Decoded {
    match (a, b) {
        (Decoded::Object(mut left), Decoded::Object(right)) => {
            for (k, v) in right {
                match left.get(&k) {
                    Some(l) if constructed(l) && !constructed(&v) => {}
                    _ => {
                        left.insert(k, v);
                    }
                }
            }
            Decoded::Object(left)
        }
        (a, _) => a,
    }
}

fn constructed(d: &Decoded) -> bool {
    match d {
        Decoded::Instance(_) => true,
        Decoded::Array(xs) => xs.iter().any(constructed),
        Decoded::Object(m) => m.values().any(constructed),
        _ => false,
    }
}

pub fn intersection(name: Option<&str>, left: Caster, right: Caster) -> Caster {
    let name = match name {
        Some(n) => n.to_string(),
        None => format!("({} & {})", left.name(), right.name()),
    };
    Caster::new(IntersectionCaster { name, left, right })
}
