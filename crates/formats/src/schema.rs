//! Structural schema for the XML tree
//!
//! Each rule lists the attributes and child elements an element may carry,
//! with cardinalities and value kinds. Rules are keyed by position in the
//! tree (the parent names the child's rule), so the same tag may mean
//! different things in different places: `data` is a float list under a
//! transformation matrix and base64 under a lattice.

use crate::tree::Element;
use sffrw_core::{PrimaryDescriptor, SffError, SffResult};

/// Kind of value an attribute or leaf element holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Value {
    /// Any text
    Text,
    /// Non-empty token without whitespace (element type, byte order)
    Token,
    /// Unsigned integer
    UInt,
    /// Signed integer
    Int,
    /// Finite or non-finite float
    Float,
    /// Float in [0, 1]
    Unit,
    /// Whitespace-separated floats
    FloatList,
    /// Primary descriptor tag
    Descriptor,
    /// Base64 text, whitespace allowed
    Base64,
}

impl Value {
    fn describe(&self) -> &'static str {
        match self {
            Value::Text => "text",
            Value::Token => "token",
            Value::UInt => "unsigned integer",
            Value::Int => "integer",
            Value::Float => "float",
            Value::Unit => "float between 0 and 1",
            Value::FloatList => "list of floats",
            Value::Descriptor => "primary descriptor",
            Value::Base64 => "base64 text",
        }
    }

    fn accepts(&self, raw: &str) -> bool {
        let s = raw.trim();
        match self {
            Value::Text => true,
            Value::Token => !s.is_empty() && !s.contains(char::is_whitespace),
            Value::UInt => s.parse::<u64>().is_ok(),
            Value::Int => s.parse::<i64>().is_ok(),
            Value::Float => s.parse::<f64>().is_ok(),
            Value::Unit => s.parse::<f64>().map_or(false, |v| (0.0..=1.0).contains(&v)),
            Value::FloatList => s.split_whitespace().all(|v| v.parse::<f64>().is_ok()),
            Value::Descriptor => s.parse::<PrimaryDescriptor>().is_ok(),
            Value::Base64 => raw
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'=') || b.is_ascii_whitespace()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Occurs {
    One,
    Optional,
    Many,
}

struct Attr {
    name: &'static str,
    value: Value,
    required: bool,
}

struct Rule {
    attrs: &'static [Attr],
    children: &'static [(&'static str, Occurs, &'static Rule)],
    /// `Some` for leaf elements
    text: Option<Value>,
}

const fn leaf(value: Value) -> Rule {
    Rule {
        attrs: &[],
        children: &[],
        text: Some(value),
    }
}

const fn req(name: &'static str, value: Value) -> Attr {
    Attr {
        name,
        value,
        required: true,
    }
}

const fn opt(name: &'static str, value: Value) -> Attr {
    Attr {
        name,
        value,
        required: false,
    }
}

static TEXT: Rule = leaf(Value::Text);
static UINT: Rule = leaf(Value::UInt);
static FLOAT: Rule = leaf(Value::Float);
static UNIT: Rule = leaf(Value::Unit);
static FLOAT_LIST: Rule = leaf(Value::FloatList);
static DESCRIPTOR: Rule = leaf(Value::Descriptor);
static BASE64: Rule = leaf(Value::Base64);

static SOFTWARE: Rule = Rule {
    attrs: &[req("id", Value::UInt)],
    children: &[
        ("name", Occurs::One, &TEXT),
        ("version", Occurs::Optional, &TEXT),
        ("processing_details", Occurs::Optional, &TEXT),
    ],
    text: None,
};

static SOFTWARE_LIST: Rule = Rule {
    attrs: &[],
    children: &[("software", Occurs::Many, &SOFTWARE)],
    text: None,
};

static TRANSFORM: Rule = Rule {
    attrs: &[req("id", Value::UInt)],
    children: &[
        ("rows", Occurs::One, &UINT),
        ("cols", Occurs::One, &UINT),
        ("data", Occurs::One, &FLOAT_LIST),
    ],
    text: None,
};

static TRANSFORM_LIST: Rule = Rule {
    attrs: &[],
    children: &[("transformation_matrix", Occurs::Many, &TRANSFORM)],
    text: None,
};

static BOUNDING_BOX: Rule = Rule {
    attrs: &[],
    children: &[
        ("xmin", Occurs::Optional, &FLOAT),
        ("xmax", Occurs::One, &FLOAT),
        ("ymin", Occurs::Optional, &FLOAT),
        ("ymax", Occurs::One, &FLOAT),
        ("zmin", Occurs::Optional, &FLOAT),
        ("zmax", Occurs::One, &FLOAT),
    ],
    text: None,
};

static EXTERNAL_REFERENCE: Rule = Rule {
    attrs: &[req("id", Value::UInt)],
    children: &[
        ("resource", Occurs::One, &TEXT),
        ("url", Occurs::One, &TEXT),
        ("accession", Occurs::One, &TEXT),
        ("label", Occurs::Optional, &TEXT),
        ("description", Occurs::Optional, &TEXT),
    ],
    text: None,
};

static EXTERNAL_REFERENCES: Rule = Rule {
    attrs: &[],
    children: &[("external_reference", Occurs::Many, &EXTERNAL_REFERENCE)],
    text: None,
};

static ANNOTATION: Rule = Rule {
    attrs: &[],
    children: &[
        ("name", Occurs::Optional, &TEXT),
        ("description", Occurs::Optional, &TEXT),
        ("external_references", Occurs::Optional, &EXTERNAL_REFERENCES),
        ("number_of_instances", Occurs::Optional, &UINT),
    ],
    text: None,
};

static COLOUR: Rule = Rule {
    attrs: &[],
    children: &[
        ("red", Occurs::One, &UNIT),
        ("green", Occurs::One, &UNIT),
        ("blue", Occurs::One, &UNIT),
        ("alpha", Occurs::Optional, &UNIT),
    ],
    text: None,
};

static VERTICES: Rule = Rule {
    attrs: &[
        req("num_vertices", Value::UInt),
        opt("mode", Value::Token),
        opt("endianness", Value::Token),
    ],
    children: &[],
    text: Some(Value::Base64),
};

static NORMALS: Rule = Rule {
    attrs: &[
        req("num_normals", Value::UInt),
        opt("mode", Value::Token),
        opt("endianness", Value::Token),
    ],
    children: &[],
    text: Some(Value::Base64),
};

static TRIANGLES: Rule = Rule {
    attrs: &[
        req("num_triangles", Value::UInt),
        opt("mode", Value::Token),
        opt("endianness", Value::Token),
    ],
    children: &[],
    text: Some(Value::Base64),
};

static MESH: Rule = Rule {
    attrs: &[req("id", Value::UInt)],
    children: &[
        ("vertices", Occurs::One, &VERTICES),
        ("normals", Occurs::Optional, &NORMALS),
        ("triangles", Occurs::One, &TRIANGLES),
        ("transform_id", Occurs::Optional, &UINT),
    ],
    text: None,
};

static MESH_LIST: Rule = Rule {
    attrs: &[],
    children: &[("mesh", Occurs::Many, &MESH)],
    text: None,
};

const SHAPE_ATTRS: &[Attr] = &[
    req("id", Value::UInt),
    req("transform_id", Value::UInt),
    opt("attribute", Value::Float),
];

static CONE: Rule = Rule {
    attrs: SHAPE_ATTRS,
    children: &[
        ("height", Occurs::One, &FLOAT),
        ("bottom_radius", Occurs::One, &FLOAT),
    ],
    text: None,
};

static CYLINDER: Rule = Rule {
    attrs: SHAPE_ATTRS,
    children: &[
        ("height", Occurs::One, &FLOAT),
        ("diameter", Occurs::One, &FLOAT),
    ],
    text: None,
};

static BOX_LIKE: Rule = Rule {
    attrs: SHAPE_ATTRS,
    children: &[
        ("x", Occurs::One, &FLOAT),
        ("y", Occurs::One, &FLOAT),
        ("z", Occurs::One, &FLOAT),
    ],
    text: None,
};

static SHAPE_LIST: Rule = Rule {
    attrs: &[],
    children: &[
        ("cone", Occurs::Many, &CONE),
        ("cuboid", Occurs::Many, &BOX_LIKE),
        ("cylinder", Occurs::Many, &CYLINDER),
        ("ellipsoid", Occurs::Many, &BOX_LIKE),
    ],
    text: None,
};

static VOLUME: Rule = Rule {
    attrs: &[],
    children: &[
        ("lattice_id", Occurs::One, &UINT),
        ("value", Occurs::One, &FLOAT),
        ("transform_id", Occurs::Optional, &UINT),
    ],
    text: None,
};

static SEGMENT: Rule = Rule {
    attrs: &[req("id", Value::UInt), opt("parent_id", Value::UInt)],
    children: &[
        ("biological_annotation", Occurs::Optional, &ANNOTATION),
        ("colour", Occurs::Optional, &COLOUR),
        ("mesh_list", Occurs::Optional, &MESH_LIST),
        ("shape_primitive_list", Occurs::Optional, &SHAPE_LIST),
        ("three_d_volume", Occurs::Optional, &VOLUME),
    ],
    text: None,
};

static SEGMENT_LIST: Rule = Rule {
    attrs: &[],
    children: &[("segment", Occurs::Many, &SEGMENT)],
    text: None,
};

static GRID: Rule = Rule {
    attrs: &[
        req("cols", Value::Int),
        req("rows", Value::Int),
        req("sections", Value::Int),
    ],
    children: &[],
    text: None,
};

static LATTICE: Rule = Rule {
    attrs: &[
        req("id", Value::UInt),
        req("mode", Value::Token),
        opt("endianness", Value::Token),
    ],
    children: &[
        ("size", Occurs::One, &GRID),
        ("start", Occurs::Optional, &GRID),
        ("data", Occurs::One, &BASE64),
    ],
    text: None,
};

static LATTICE_LIST: Rule = Rule {
    attrs: &[],
    children: &[("lattice", Occurs::Many, &LATTICE)],
    text: None,
};

static SEGMENTATION: Rule = Rule {
    attrs: &[],
    children: &[
        ("version", Occurs::One, &TEXT),
        ("name", Occurs::One, &TEXT),
        ("software_list", Occurs::Optional, &SOFTWARE_LIST),
        ("primary_descriptor", Occurs::One, &DESCRIPTOR),
        ("transform_list", Occurs::Optional, &TRANSFORM_LIST),
        ("bounding_box", Occurs::Optional, &BOUNDING_BOX),
        ("global_external_references", Occurs::Optional, &EXTERNAL_REFERENCES),
        ("segment_list", Occurs::Optional, &SEGMENT_LIST),
        ("lattice_list", Occurs::Optional, &LATTICE_LIST),
        ("details", Occurs::Optional, &TEXT),
    ],
    text: None,
};

/// Root tag of a segmentation document
pub const ROOT: &str = "segmentation";

/// Check a parsed document against the segmentation schema.
///
/// Reports the first violation with its slash-separated tag path, e.g.
/// `segmentation/segment_list/segment[1]/colour/red`.
pub fn validate(root: &Element) -> SffResult<()> {
    if root.name != ROOT {
        return Err(SffError::schema(
            root.name.as_str(),
            format!("expected root element '{}'", ROOT),
        ));
    }
    check(root, &SEGMENTATION, ROOT)
}

fn check(element: &Element, rule: &Rule, path: &str) -> SffResult<()> {
    for (name, _) in &element.attrs {
        if !rule.attrs.iter().any(|a| a.name == name) {
            return Err(SffError::schema(
                format!("{}/@{}", path, name),
                "unexpected attribute",
            ));
        }
    }
    for attr in rule.attrs {
        match element.attr(attr.name) {
            Some(raw) => check_value(attr.value, raw, &format!("{}/@{}", path, attr.name))?,
            None if attr.required => {
                return Err(SffError::schema(
                    format!("{}/@{}", path, attr.name),
                    "missing required attribute",
                ))
            }
            None => {}
        }
    }

    match rule.text {
        Some(value) => {
            if let Some(child) = element.children.first() {
                return Err(SffError::schema(
                    format!("{}/{}", path, child.name),
                    "unexpected element",
                ));
            }
            check_value(value, &element.text, path)?;
        }
        None => {
            if !element.text.trim().is_empty() {
                return Err(SffError::schema(path, "unexpected text content"));
            }
        }
    }

    for child in &element.children {
        if !rule.children.iter().any(|(tag, _, _)| *tag == child.name) {
            return Err(SffError::schema(
                format!("{}/{}", path, child.name),
                "unexpected element",
            ));
        }
    }
    for (tag, occurs, child_rule) in rule.children {
        let matching: Vec<&Element> = element.children_named(tag).collect();
        let child_path = format!("{}/{}", path, tag);
        match (occurs, matching.len()) {
            (Occurs::One, 0) => {
                return Err(SffError::schema(child_path, "missing required element"))
            }
            (Occurs::One | Occurs::Optional, n) if n > 1 => {
                return Err(SffError::schema(
                    child_path,
                    format!("expected at most one element, found {}", n),
                ))
            }
            _ => {}
        }
        for (i, child) in matching.into_iter().enumerate() {
            let path = if *occurs == Occurs::Many {
                format!("{}[{}]", child_path, i)
            } else {
                child_path.clone()
            };
            check(child, child_rule, &path)?;
        }
    }
    Ok(())
}

fn check_value(value: Value, raw: &str, path: &str) -> SffResult<()> {
    if value.accepts(raw) {
        Ok(())
    } else {
        Err(SffError::schema(
            path,
            format!("'{}' is not a valid {}", raw.trim(), value.describe()),
        ))
    }
}
