//! Resource type inclusion and exclusion prefixes.

/// Prefix rules deciding which resource types are checked for obsolescence.
///
/// Matching is a plain string-prefix test: an exclusion of `/libs/ignored`
/// also excludes `/libs/ignored/foo` and `/libs/ignoredfoo`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InclusionRules {
    included: Vec<String>,
    excluded: Vec<String>,
}

impl InclusionRules {
    /// Build rules from raw configuration values, dropping blank entries.
    pub fn new<I, E, S, T>(included: I, excluded: E) -> Self
    where
        I: IntoIterator<Item = S>,
        E: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        InclusionRules {
            included: non_blank(included),
            excluded: non_blank(excluded),
        }
    }

    /// Rules that include nothing.
    pub fn unconfigured() -> Self {
        InclusionRules::default()
    }

    /// Without at least one inclusion prefix nothing is ever classified.
    pub fn is_configured(&self) -> bool {
        !self.included.is_empty()
    }

    pub fn included(&self) -> &[String] {
        &self.included
    }

    pub fn excluded(&self) -> &[String] {
        &self.excluded
    }

    /// Is this resource type within the checked types?
    ///
    /// True iff the type starts with an included prefix and with no excluded
    /// prefix. Blank types are never included.
    pub fn is_included(&self, resource_type: &str) -> bool {
        if resource_type.trim().is_empty() {
            return false;
        }

        let included = self
            .included
            .iter()
            .any(|prefix| resource_type.starts_with(prefix.as_str()));

        included
            && !self
                .excluded
                .iter()
                .any(|prefix| resource_type.starts_with(prefix.as_str()))
    }
}

fn non_blank<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    values
        .into_iter()
        .map(Into::into)
        .filter(|value| !value.trim().is_empty())
        .collect()
}
