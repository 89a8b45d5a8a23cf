//! Mapping Shopify variant options onto the six option categories.

use std::collections::BTreeMap;

use thiserror::Error;

use cobbler_core::OptionCategory;

use crate::shopify::SelectedOption;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    #[error("variant has no value for: {}", join(.0))]
    MissingCategories(Vec<OptionCategory>),

    #[error("variant names {0} more than once")]
    DuplicateCategory(OptionCategory),

    #[error("variant has an empty {0} value")]
    EmptyValue(OptionCategory),
}

fn join(categories: &[OptionCategory]) -> String {
    categories
        .iter()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// One trimmed value name per option category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionNames {
    values: BTreeMap<OptionCategory, String>,
}

impl OptionNames {
    /// The value named for `category`. Always present once mapped.
    #[must_use]
    pub fn get(&self, category: OptionCategory) -> &str {
        self.values.get(&category).map_or("", String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (OptionCategory, &str)> {
        self.values.iter().map(|(c, v)| (*c, v.as_str()))
    }
}

/// Map a variant's selected options to the six categories.
///
/// Option names are matched with [`OptionCategory::from_option_name`];
/// unrecognised names such as Shopify's default `Title` are ignored.
///
/// # Errors
///
/// Returns a [`MappingError`] when a category is missing, named twice, or
/// has a blank value.
pub fn map_selected_options(options: &[SelectedOption]) -> Result<OptionNames, MappingError> {
    let mut values = BTreeMap::new();

    for option in options {
        let Some(category) = OptionCategory::from_option_name(&option.name) else {
            continue;
        };
        let value = option.value.trim();
        if value.is_empty() {
            return Err(MappingError::EmptyValue(category));
        }
        if values.insert(category, value.to_owned()).is_some() {
            return Err(MappingError::DuplicateCategory(category));
        }
    }

    let missing: Vec<OptionCategory> = OptionCategory::ALL
        .into_iter()
        .filter(|c| !values.contains_key(c))
        .collect();
    if !missing.is_empty() {
        return Err(MappingError::MissingCategories(missing));
    }

    Ok(OptionNames { values })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn full() -> Vec<SelectedOption> {
        vec![
            SelectedOption::new("Size", "42"),
            SelectedOption::new("Style", "Chelsea"),
            SelectedOption::new("Sole", "Crepe"),
            SelectedOption::new("Material", "Suede"),
            SelectedOption::new("Colour", " Oxblood "),
            SelectedOption::new("Panel", "Elastic"),
        ]
    }

    #[test]
    fn test_maps_all_six() {
        let names = map_selected_options(&full()).unwrap();
        assert_eq!(names.get(OptionCategory::Color), "Oxblood");
        assert_eq!(names.get(OptionCategory::Size), "42");
        assert_eq!(names.iter().count(), 6);
    }

    #[test]
    fn test_ignores_unknown_names() {
        let mut options = full();
        options.push(SelectedOption::new("Title", "Default Title"));
        assert!(map_selected_options(&options).is_ok());
    }

    #[test]
    fn test_reports_missing_categories_in_order() {
        let options = vec![
            SelectedOption::new("Size", "42"),
            SelectedOption::new("Color", "Black"),
        ];
        assert_eq!(
            map_selected_options(&options),
            Err(MappingError::MissingCategories(vec![
                OptionCategory::Material,
                OptionCategory::Sole,
                OptionCategory::Style,
                OptionCategory::Panel,
            ]))
        );
    }

    #[test]
    fn test_default_title_variant_is_missing_everything() {
        let err = map_selected_options(&[SelectedOption::new("Title", "Default Title")])
            .unwrap_err();
        assert!(matches!(err, MappingError::MissingCategories(ref m) if m.len() == 6));
    }

    #[test]
    fn test_duplicate_and_empty() {
        let mut options = full();
        options.push(SelectedOption::new("Colors", "Black"));
        assert_eq!(
            map_selected_options(&options),
            Err(MappingError::DuplicateCategory(OptionCategory::Color))
        );

        let mut options = full();
        options[2].value = "  ".to_owned();
        assert_eq!(
            map_selected_options(&options),
            Err(MappingError::EmptyValue(OptionCategory::Sole))
        );
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            MappingError::MissingCategories(vec![OptionCategory::Sole, OptionCategory::Panel])
                .to_string(),
            "variant has no value for: sole, panel"
        );
    }
}
