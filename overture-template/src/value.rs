/// A value that may carry its pre-substitution form.
///
/// `Tagged` values are structurally identical to `Raw` ones for any consumer
/// that only reads `value()`, but they also retain the original template so
/// it can be recovered for reporting after substitution. The source is never
/// mutated; formatting always produces a new structure.
#[derive(Clone, Debug, PartialEq)]
pub enum TemplateValue<T> {
    Raw(T),
    Tagged { value: T, source: T },
}

impl<T: Clone> TemplateValue<T> {
    pub fn raw(value: T) -> Self {
        TemplateValue::Raw(value)
    }

    pub fn tagged(value: T) -> Self {
        TemplateValue::Tagged {
            source: value.clone(),
            value,
        }
    }

    pub fn is_tagged(&self) -> bool {
        matches!(self, TemplateValue::Tagged { .. })
    }

    pub fn value(&self) -> &T {
        match self {
            TemplateValue::Raw(value) => value,
            TemplateValue::Tagged { value, .. } => value,
        }
    }

    /// The original pre-substitution form, or `None` for untagged values.
    pub fn source(&self) -> Option<&T> {
        match self {
            TemplateValue::Raw(_) => None,
            TemplateValue::Tagged { source, .. } => Some(source),
        }
    }
}
