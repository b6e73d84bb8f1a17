use serde::{Serialize, Deserialize};

use crate::error::{EnsembleError, Result};


/// The type of an attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    /// A real-valued attribute.
    Numeric,
    /// A categorical attribute.
    /// Values are stored as the index into `values`.
    Nominal {
        /// The category labels.
        values: Vec<String>,
    },
}


/// A named attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    name: String,
    kind: AttributeKind,
}


impl Attribute {
    /// Construct a numeric attribute.
    pub fn numeric<S: Into<String>>(name: S) -> Self {
        Self { name: name.into(), kind: AttributeKind::Numeric }
    }


    /// Construct a nominal attribute with the given category labels.
    pub fn nominal<S, I, T>(name: S, values: I) -> Self
        where S: Into<String>,
              I: IntoIterator<Item = T>,
              T: Into<String>,
    {
        let values = values.into_iter()
            .map(Into::into)
            .collect::<Vec<_>>();
        Self { name: name.into(), kind: AttributeKind::Nominal { values } }
    }


    /// Name of the attribute.
    pub fn name(&self) -> &str {
        &self.name
    }


    /// Kind of the attribute.
    pub fn kind(&self) -> &AttributeKind {
        &self.kind
    }


    /// Returns `true` if the attribute is numeric.
    pub fn is_numeric(&self) -> bool {
        matches!(self.kind, AttributeKind::Numeric)
    }


    /// Returns `true` if the attribute is nominal.
    pub fn is_nominal(&self) -> bool {
        !self.is_numeric()
    }


    /// Number of category labels. `0` for a numeric attribute.
    pub fn num_values(&self) -> usize {
        match &self.kind {
            AttributeKind::Numeric => 0,
            AttributeKind::Nominal { values } => values.len(),
        }
    }


    /// Returns the label of the `index`-th category.
    pub fn value(&self, index: usize) -> Option<&str> {
        match &self.kind {
            AttributeKind::Numeric => None,
            AttributeKind::Nominal { values } => {
                values.get(index).map(String::as_str)
            },
        }
    }
}


/// The header shared by every instance of a [`Dataset`].
///
/// [`Dataset`]: crate::Dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    relation_name: String,
    attributes: Vec<Attribute>,
    class_attribute: Attribute,
}


impl Schema {
    /// Construct a new schema.
    /// `attributes` are the predictors,
    /// `class_attribute` is the target.
    ///
    /// A nominal class needs at least two labels.
    pub fn new<S: Into<String>>(
        relation_name: S,
        attributes: Vec<Attribute>,
        class_attribute: Attribute,
    ) -> Result<Self>
    {
        if class_attribute.is_nominal() && class_attribute.num_values() < 2 {
            return Err(EnsembleError::invalid_parameter(
                "class_attribute",
                class_attribute.name(),
                "a nominal class needs at least two values",
            ));
        }
        let schema = Self {
            relation_name: relation_name.into(),
            attributes,
            class_attribute,
        };
        Ok(schema)
    }


    /// Name of the relation. Used to locate on-demand cost files.
    pub fn relation_name(&self) -> &str {
        &self.relation_name
    }


    /// The predictor attributes.
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes[..]
    }


    /// Number of predictor attributes.
    /// The class attribute is not counted.
    pub fn num_attributes(&self) -> usize {
        self.attributes.len()
    }


    /// The class attribute.
    pub fn class_attribute(&self) -> &Attribute {
        &self.class_attribute
    }


    /// Returns `true` if the class is nominal.
    pub fn class_is_nominal(&self) -> bool {
        self.class_attribute.is_nominal()
    }


    /// Returns `true` if the class is numeric.
    pub fn class_is_numeric(&self) -> bool {
        self.class_attribute.is_numeric()
    }


    /// Number of classes.
    /// A numeric class counts as one "class",
    /// so that distributions of regression models have length `1`.
    pub fn num_classes(&self) -> usize {
        match self.class_attribute.kind() {
            AttributeKind::Numeric => 1,
            AttributeKind::Nominal { values } => values.len(),
        }
    }


    /// Returns a copy of `self` whose class attribute is replaced
    /// by a numeric attribute named `name`.
    pub fn with_numeric_class<S: Into<String>>(&self, name: S) -> Self {
        Self {
            relation_name: self.relation_name.clone(),
            attributes: self.attributes.clone(),
            class_attribute: Attribute::numeric(name),
        }
    }


    /// Checks that `other` describes the same data as `self`.
    /// The relation name is not compared.
    pub fn check_compatible(&self, other: &Schema) -> Result<()> {
        if self.num_attributes() != other.num_attributes() {
            return Err(EnsembleError::SchemaMismatch {
                reason: format!(
                    "different number of attributes: {} vs {}",
                    self.num_attributes(),
                    other.num_attributes(),
                ),
            });
        }

        let pairs = self.attributes.iter()
            .zip(other.attributes.iter())
            .chain(Some((&self.class_attribute, &other.class_attribute)));
        for (ours, theirs) in pairs {
            if ours != theirs {
                return Err(EnsembleError::SchemaMismatch {
                    reason: format!(
                        "attribute `{}` differs from `{}`",
                        ours.name(),
                        theirs.name(),
                    ),
                });
            }
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema::new(
            "weather",
            vec![Attribute::numeric("temperature")],
            Attribute::nominal("play", ["yes", "no"]),
        ).unwrap()
    }

    #[test]
    fn nominal_class_needs_two_values() {
        let result = Schema::new(
            "weather",
            vec![Attribute::numeric("temperature")],
            Attribute::nominal("play", ["yes"]),
        );
        assert!(matches!(result, Err(EnsembleError::InvalidParameter { .. })));
    }

    #[test]
    fn compatible_schemas() {
        let a = schema();
        let b = schema();
        assert!(a.check_compatible(&b).is_ok());

        let c = a.with_numeric_class("play");
        assert!(matches!(
            a.check_compatible(&c),
            Err(EnsembleError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn num_classes() {
        let a = schema();
        assert_eq!(a.num_classes(), 2);
        assert_eq!(a.with_numeric_class("z").num_classes(), 1);
    }
}
