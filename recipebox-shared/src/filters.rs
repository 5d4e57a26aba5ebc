/// Query parameter parsing for list endpoints
///
/// Recipe lists take `tags` and `ingredients` as comma-separated id lists;
/// tag and ingredient lists take an `assigned_only` flag. Parsing lives here
/// so malformed input is rejected before any query runs.
///
/// # Example
///
/// ```
/// use recipebox_shared::filters::{parse_id_list, RecipeFilter};
///
/// assert_eq!(parse_id_list("tags", "3,1").unwrap(), Some(vec![3, 1]));
///
/// let filter = RecipeFilter::parse(Some("2"), None).unwrap();
/// assert_eq!(filter.tag_ids, Some(vec![2]));
/// assert!(filter.ingredient_ids.is_none());
/// ```

/// Error type for malformed filter parameters
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    /// A segment of an id list is not an integer
    #[error("Invalid value '{value}' in '{param}': expected a comma-separated list of integer ids")]
    InvalidId { param: String, value: String },

    /// A flag is neither an integer nor a boolean
    #[error("Invalid value '{value}' for '{param}': expected 0 or 1")]
    InvalidFlag { param: String, value: String },
}

/// Parses `"1,2,3"` into ids
///
/// Whitespace around segments and empty segments are ignored. Returns
/// `None` when nothing is left, meaning "no filter".
pub fn parse_id_list(param: &str, raw: &str) -> Result<Option<Vec<i64>>, FilterError> {
    let ids = raw
        .split(',')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            segment.parse::<i64>().map_err(|_| FilterError::InvalidId {
                param: param.to_string(),
                value: segment.to_string(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(if ids.is_empty() { None } else { Some(ids) })
}

/// Parses an integer-valued flag; any nonzero integer is `true`
///
/// `true` and `false` are accepted as well.
pub fn parse_flag(param: &str, raw: &str) -> Result<bool, FilterError> {
    let raw = raw.trim();

    if let Ok(value) = raw.parse::<i64>() {
        return Ok(value != 0);
    }

    match raw.to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(FilterError::InvalidFlag {
            param: param.to_string(),
            value: raw.to_string(),
        }),
    }
}

/// Parsed recipe list filter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    /// Keep recipes linked to at least one of these tags
    pub tag_ids: Option<Vec<i64>>,

    /// Keep recipes linked to at least one of these ingredients
    pub ingredient_ids: Option<Vec<i64>>,
}

impl RecipeFilter {
    pub fn parse(tags: Option<&str>, ingredients: Option<&str>) -> Result<Self, FilterError> {
        Ok(Self {
            tag_ids: tags.map(|raw| parse_id_list("tags", raw)).transpose()?.flatten(),
            ingredient_ids: ingredients
                .map(|raw| parse_id_list("ingredients", raw))
                .transpose()?
                .flatten(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.tag_ids.is_none() && self.ingredient_ids.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id_list() {
        assert_eq!(parse_id_list("tags", "1,2,3").unwrap(), Some(vec![1, 2, 3]));
        assert_eq!(parse_id_list("tags", " 4 , 5 ").unwrap(), Some(vec![4, 5]));
        assert_eq!(parse_id_list("tags", "7,,8,").unwrap(), Some(vec![7, 8]));
    }

    #[test]
    fn test_parse_id_list_empty_means_no_filter() {
        assert_eq!(parse_id_list("tags", "").unwrap(), None);
        assert_eq!(parse_id_list("tags", ",, ,").unwrap(), None);
    }

    #[test]
    fn test_parse_id_list_rejects_non_integers() {
        let err = parse_id_list("ingredients", "1,abc").unwrap_err();
        assert_eq!(
            err,
            FilterError::InvalidId {
                param: "ingredients".to_string(),
                value: "abc".to_string(),
            }
        );
        assert!(err.to_string().contains("ingredients"));

        assert!(parse_id_list("tags", "1.5").is_err());
    }

    #[test]
    fn test_parse_flag() {
        assert!(!parse_flag("assigned_only", "0").unwrap());
        assert!(parse_flag("assigned_only", "1").unwrap());
        assert!(parse_flag("assigned_only", "2").unwrap());
        assert!(parse_flag("assigned_only", "true").unwrap());
        assert!(!parse_flag("assigned_only", "False").unwrap());
    }

    #[test]
    fn test_parse_flag_rejects_garbage() {
        let err = parse_flag("assigned_only", "yes").unwrap_err();
        assert!(matches!(err, FilterError::InvalidFlag { .. }));
        assert!(parse_flag("assigned_only", "").is_err());
    }

    #[test]
    fn test_recipe_filter_parse() {
        let filter = RecipeFilter::parse(Some("1,2"), Some("3")).unwrap();
        assert_eq!(filter.tag_ids, Some(vec![1, 2]));
        assert_eq!(filter.ingredient_ids, Some(vec![3]));
        assert!(!filter.is_empty());

        let filter = RecipeFilter::parse(None, Some("")).unwrap();
        assert!(filter.is_empty());

        assert!(RecipeFilter::parse(Some("x"), None).is_err());
    }
}
